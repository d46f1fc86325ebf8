//! Single-document flow: upload every image referenced by one note and
//! rewrite that note in place.
//!
//! Unlike the batch path, this flow scans one document wholesale and
//! rewrites by replacing each reference's literal original snippet, the
//! legacy matcher carried in [`ImageRef::source`]. Network-targeted
//! references participate when `work_on_network` is enabled and the host is
//! not blacklisted.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::batch::{BatchError, BatchOutcome};
use crate::config::Settings;
use crate::grammar;
use crate::ledger::UploadLedger;
use crate::naming;
use crate::progress::ProgressLog;
use crate::uploader::{ImageRef, Uploader};
use crate::vault::Vault;

/// Scan `content` for image references and resolve each to an upload
/// candidate. Local targets resolve through the corpus's link resolution and
/// must be image files; network targets are kept only when `work_on_network`
/// is set and their host is not blacklisted.
pub fn collect_image_links(
    vault: &Vault,
    settings: &Settings,
    doc: &Path,
    content: &str,
) -> Vec<ImageRef> {
    let mut images = Vec::new();

    for link in grammar::inline_image_links(content) {
        let source = content[link.start..link.end].to_string();
        if link.is_network {
            if settings.work_on_network
                && !has_black_domain(&link.target, &settings.network_domain_blacklist)
            {
                images.push(ImageRef {
                    path: PathBuf::from(&link.target),
                    name: link.display.clone(),
                    source,
                });
            }
            continue;
        }
        let Some(resolved) = vault.resolve_link(&link.target, doc) else {
            continue;
        };
        if !vault.is_image_type(&resolved) {
            continue;
        }
        images.push(ImageRef {
            path: resolved,
            name: link.display.clone(),
            source,
        });
    }

    for link in grammar::wiki_image_links(content) {
        let source = content[link.start..link.end].to_string();
        let (link_path, _subpath) = grammar::parse_linktext(&link.linktext);
        let Some(resolved) = vault.resolve_link(link_path, doc) else {
            continue;
        };
        if !vault.is_image_type(&resolved) {
            continue;
        }
        images.push(ImageRef {
            path: resolved,
            name: link.linktext.clone(),
            source,
        });
    }

    images
}

/// Replace each image's literal source snippet with `![name](url)`, with the
/// display name run through the naming policy. URLs align positionally with
/// `images`.
pub fn replace_by_source(
    content: &str,
    images: &[ImageRef],
    urls: &[String],
    settings: &Settings,
) -> String {
    let mut content = content.to_string();
    for (image, url) in images.iter().zip(urls) {
        let name = naming::display_name(&image.name, settings);
        content = content.replace(&image.source, &format!("![{name}]({url})"));
    }
    content
}

/// Upload every image referenced by `doc` and rewrite the document.
pub async fn upload_document_images(
    vault: &mut Vault,
    settings: &Settings,
    uploader: &dyn Uploader,
    ledger: &mut UploadLedger,
    doc: &Path,
    progress: &mut ProgressLog,
) -> Result<BatchOutcome, BatchError> {
    let content = vault.read_document(doc)?;
    let images = collect_image_links(vault, settings, doc, &content);

    if images.is_empty() {
        progress.commit("Can not find image file");
        return Ok(BatchOutcome::default());
    }
    progress.commit(format!("Have found {} images", images.len()));

    progress.status(format!(
        "Uploading {} image file(s), it may take a while...",
        images.len()
    ));
    let outcome = uploader.upload(&images).await?;
    if !outcome.success {
        progress.commit("Upload error. Aborted.");
        return Err(BatchError::UploadFailed);
    }
    if outcome.result.len() != images.len() {
        progress.commit(
            "Warning: uploaded file count differs from the count received from the api. Aborted.",
        );
        return Err(BatchError::UploadMismatch {
            requested: images.len(),
            received: outcome.result.len(),
        });
    }
    progress.commit(format!(
        "Uploading {} image file(s), it may take a while... Done",
        images.len()
    ));

    // The spans-by-snippet rewrite assumes the content read above; abort if
    // the document changed under us during the upload
    let current = vault.read_document(doc)?;
    if current != content {
        progress.commit("File has been changed, upload failure");
        return Err(BatchError::StaleDocument);
    }

    let new_content = replace_by_source(&content, &images, &outcome.result, settings);
    vault.write_document(doc, &new_content)?;
    debug!(document = %doc.display(), images = images.len(), "document rewritten");

    for (image, url) in images.iter().zip(outcome.result.iter()) {
        let relative = vault
            .vault_relative(&image.path)
            .unwrap_or_else(|| image.path.clone());
        ledger.record(&relative, url);
    }
    ledger.save()?;

    if settings.delete_source {
        for image in &images {
            // Network-sourced refs have no local file to trash
            if !vault.has_file(&image.path) {
                continue;
            }
            if vault.trash(&image.path).is_ok() {
                let relative = vault
                    .vault_relative(&image.path)
                    .unwrap_or_else(|| image.path.clone());
                ledger.remove_by_path(&relative);
            }
        }
        ledger.save()?;
    }

    info!(document = %doc.display(), images = images.len(), "document images uploaded");
    Ok(BatchOutcome {
        uploaded: images.len(),
        affected_documents: 1,
        skipped_conflicts: vec![],
    })
}

/// Whether a network URL's host matches any blacklisted domain.
pub fn has_black_domain(url: &str, blacklist: &[String]) -> bool {
    let host = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or("");
    blacklist
        .iter()
        .any(|domain| !domain.is_empty() && host.contains(domain.as_str()))
}
