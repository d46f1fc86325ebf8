//! Batch rewrite coordinator.
//!
//! Drives one user-triggered batch end-to-end: build the reverse link index,
//! compute replacement spans, upload the whole batch once, align the
//! returned URLs positionally, rewrite each affected document in a single
//! pass, and optionally trash the originals. Rewrites are self-contained per
//! document and are not transactional across documents; the explicit
//! consistency checks (URL-count alignment, span non-overlap) are the only
//! abort paths, and neither ever leaves a document partially rewritten.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::index::ReverseLinkIndex;
use crate::ledger::UploadLedger;
use crate::progress::ProgressLog;
use crate::resolver::{self, LinkSpan};
use crate::uploader::{ImageRef, Uploader};
use crate::vault::Vault;

#[derive(Debug, Error)]
pub enum BatchError {
    /// The uploader reported failure; no URL map was built, nothing mutated.
    #[error("upload collaborator reported failure")]
    UploadFailed,
    /// URL count differs from the requested image count. Uploads may have
    /// succeeded server-side, but no local document is touched.
    #[error("upload returned {received} URLs for {requested} requested images")]
    UploadMismatch { requested: usize, received: usize },
    /// The document changed on disk between the scan and the rewrite.
    #[error("document changed during upload")]
    StaleDocument,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("upload transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub uploaded: usize,
    pub affected_documents: usize,
    /// Documents excluded from rewriting because of overlapping spans.
    pub skipped_conflicts: Vec<PathBuf>,
}

/// Run one batch over `targets`. Non-image targets are dropped up front;
/// targets nobody references still upload but rewrite nothing.
pub async fn run_batch(
    vault: &mut Vault,
    settings: &Settings,
    uploader: &dyn Uploader,
    ledger: &mut UploadLedger,
    targets: &[PathBuf],
    progress: &mut ProgressLog,
) -> Result<BatchOutcome, BatchError> {
    let images: Vec<PathBuf> = targets
        .iter()
        .filter(|path| vault.is_image_type(path))
        .cloned()
        .collect();
    if images.len() != targets.len() {
        progress.commit(format!(
            "Omitting {} non-image file(s)",
            targets.len() - images.len()
        ));
    }
    progress.commit(format!("Uploading {} image file(s)...", images.len()));

    let index = ReverseLinkIndex::build(vault.forward_link_graph(), &images, |count, total| {
        progress.status(format!("Resolving links in vault ({count}/{total})..."));
    });
    progress.commit(format!(
        "Resolving links in vault ({n}/{n})... Done",
        n = vault.forward_link_graph().len()
    ));

    let resolution = resolver::find_spans(vault, settings, &images, &index, |count, total, target| {
        progress.status(format!(
            "Finding relevant notes for {} ({count}/{total})...",
            file_name(target)
        ));
    });
    for conflict in &resolution.conflicts {
        warn!(document = %conflict.document.display(), line = conflict.line, "span overlap");
        progress.commit(format!(
            "Warning: image link overlap detected in {} at line {}; document skipped.",
            conflict.document.display(),
            conflict.line + 1
        ));
    }
    progress.commit(format!(
        "Finding relevant notes for {} image file(s)... Done",
        images.len()
    ));

    let image_refs: Vec<ImageRef> = images
        .iter()
        .map(|path| {
            let name = file_name(path);
            let relative = vault
                .vault_relative(path)
                .unwrap_or_else(|| path.clone());
            // Canonical inline form of the file's own path; only used as the
            // legacy matcher for single-file flows
            let source = format!("![{}]({})", name, relative.display());
            ImageRef {
                path: path.clone(),
                name,
                source,
            }
        })
        .collect();

    // Upload latency is opaque to this layer, so no percentage here
    progress.status(format!(
        "Uploading {} image file(s), it may take a while...",
        image_refs.len()
    ));
    let outcome = uploader.upload(&image_refs).await?;
    if !outcome.success {
        progress.commit("Upload error. Aborted.");
        return Err(BatchError::UploadFailed);
    }
    progress.commit(format!(
        "Uploading {} image file(s), it may take a while... Done",
        image_refs.len()
    ));

    if outcome.result.len() != images.len() {
        progress.commit(
            "Error: uploaded file count differs from the count received from the api. Aborted.",
        );
        return Err(BatchError::UploadMismatch {
            requested: images.len(),
            received: outcome.result.len(),
        });
    }
    let url_map: HashMap<PathBuf, String> = images
        .iter()
        .cloned()
        .zip(outcome.result.iter().cloned())
        .collect();

    let documents: Vec<PathBuf> = resolution.spans.keys().sorted().cloned().collect();
    let total = documents.len();
    let mut affected = 0;
    for (count, document) in documents.iter().enumerate() {
        progress.status(format!(
            "Replacing links in {} ({}/{})...",
            document.display(),
            count + 1,
            total
        ));
        let spans = &resolution.spans[document];
        // Rewrite against the same read the spans were computed from, so
        // offsets never apply to mutated content
        let Some(content) = resolution.contents.get(document) else {
            continue;
        };
        let new_content = rewrite_content(content, spans, &url_map);
        vault.write_document(document, &new_content)?;
        affected += 1;
    }
    progress.commit(format!("Replacing links in {total} file(s)... Done"));
    info!(documents = affected, images = images.len(), "batch rewrite applied");

    for (path, url) in images.iter().zip(outcome.result.iter()) {
        let relative = vault.vault_relative(path).unwrap_or_else(|| path.clone());
        ledger.record(&relative, url);
    }
    ledger.save()?;

    if settings.delete_source {
        progress.status(format!(
            "Deleting {} local image file(s), this may take a while...",
            images.len()
        ));
        for path in &images {
            if let Err(err) = vault.trash(path) {
                warn!(file = %path.display(), %err, "failed to trash source file");
                progress.commit(format!("Warning: could not delete {}", path.display()));
                continue;
            }
            let relative = vault.vault_relative(path).unwrap_or_else(|| path.clone());
            ledger.remove_by_path(&relative);
        }
        ledger.save()?;
        progress.commit(format!(
            "Deleting {} local image file(s), this may take a while... Done",
            images.len()
        ));
    }

    Ok(BatchOutcome {
        uploaded: images.len(),
        affected_documents: affected,
        skipped_conflicts: resolution
            .conflicts
            .into_iter()
            .map(|conflict| conflict.document)
            .collect(),
    })
}

/// Reconstruct a document's content, substituting `![display](url)` at each
/// span whose target has a URL. Spans without a URL are left as the literal
/// original text. Text outside spans is copied byte for byte.
pub fn rewrite_content(
    content: &str,
    spans: &[LinkSpan],
    url_map: &HashMap<PathBuf, String>,
) -> String {
    let mut out = String::with_capacity(content.len());
    let mut ptr = 0;
    for span in spans {
        let Some(url) = url_map.get(&span.target) else {
            continue;
        };
        out.push_str(&content[ptr..span.start]);
        out.push_str(&format!("![{}]({})", span.display_name, url));
        ptr = span.end;
    }
    out.push_str(&content[ptr..]);
    out
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(target: &str, display: &str, start: usize, end: usize) -> LinkSpan {
        LinkSpan {
            target: PathBuf::from(target),
            display_name: display.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_rewrite_preserves_surrounding_text() {
        let content = "before ![a](x.png) after";
        let spans = vec![span("x.png", "a", 7, 18)];
        let url_map = HashMap::from([(PathBuf::from("x.png"), "https://h/x.png".to_string())]);

        let out = rewrite_content(content, &spans, &url_map);
        assert_eq!(out, "before ![a](https://h/x.png) after");
    }

    #[test]
    fn test_rewrite_two_spans_left_to_right() {
        let content = "![a](one.png) mid ![b](two.png)";
        let spans = vec![
            span("one.png", "a", 0, 13),
            span("two.png", "b", 18, 31),
        ];
        let url_map = HashMap::from([
            (PathBuf::from("one.png"), "https://h/1.png".to_string()),
            (PathBuf::from("two.png"), "https://h/2.png".to_string()),
        ]);

        let out = rewrite_content(content, &spans, &url_map);
        assert_eq!(out, "![a](https://h/1.png) mid ![b](https://h/2.png)");
    }

    #[test]
    fn test_span_without_url_left_verbatim() {
        let content = "![a](one.png) mid ![b](two.png)";
        let spans = vec![
            span("one.png", "a", 0, 13),
            span("two.png", "b", 18, 31),
        ];
        let url_map = HashMap::from([(PathBuf::from("two.png"), "https://h/2.png".to_string())]);

        let out = rewrite_content(content, &spans, &url_map);
        assert_eq!(out, "![a](one.png) mid ![b](https://h/2.png)");
    }

    #[test]
    fn test_rewrite_with_no_spans_is_identity() {
        let content = "nothing to do";
        assert_eq!(rewrite_content(content, &[], &HashMap::new()), content);
    }
}
