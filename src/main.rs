//! picshift CLI tool
//!
//! Command-line interface for uploading vault images and rewriting the
//! Markdown references that point at them.
//!
//! ## Commands
//!
//! - `upload-files <images...>`: Upload the given images and rewrite every
//!   document in the vault that references them
//! - `upload-doc <doc>`: Upload every image referenced by one document and
//!   rewrite that document in place
//!
//! Both commands read settings from `~/.config/picshift/settings` and the
//! vault-local `.picshift` file; `--delete-source` overrides the configured
//! deletion behavior for one run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use picshift::batch;
use picshift::config::Settings;
use picshift::document;
use picshift::ledger::UploadLedger;
use picshift::progress::{ProgressLog, ProgressSink};
use picshift::uploader::CommandUploader;
use picshift::vault::Vault;

#[derive(Parser)]
#[command(name = "picshift")]
#[command(author, version, about = "Bulk image upload and link rewriting for Markdown vaults", long_about = None)]
struct Cli {
    /// Vault root directory
    #[arg(long, default_value = ".")]
    vault: PathBuf,

    /// Trash local image files after a successful rewrite
    #[arg(long)]
    delete_source: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload image files and rewrite every document referencing them
    UploadFiles {
        /// Image files to upload, relative to the vault root
        images: Vec<PathBuf>,
    },

    /// Upload every image referenced by one document and rewrite it
    UploadDoc {
        /// The document to process, relative to the vault root
        doc: PathBuf,
    },
}

/// Prints each progress change as its own line on stderr.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn on_update(&self, rendered: &str) {
        if let Some(line) = rendered.lines().last() {
            eprintln!("{line}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let vault_root = cli.vault.canonicalize()?;

    let mut settings = Settings::new(&vault_root)?;
    if cli.delete_source {
        settings.delete_source = true;
    }

    let mut vault = Vault::construct_vault(&vault_root)?;
    let uploader = CommandUploader::new(&settings);
    let mut ledger = UploadLedger::load(&vault_root, &settings);
    let mut progress = ProgressLog::with_sink(Box::new(ConsoleSink));

    let result = match cli.command {
        Commands::UploadFiles { images } => {
            let targets: Vec<PathBuf> = images
                .iter()
                .map(|path| {
                    if path.is_absolute() {
                        path.clone()
                    } else {
                        vault_root.join(path)
                    }
                })
                .collect();
            batch::run_batch(
                &mut vault,
                &settings,
                &uploader,
                &mut ledger,
                &targets,
                &mut progress,
            )
            .await
        }
        Commands::UploadDoc { doc } => {
            let doc = if doc.is_absolute() {
                doc
            } else {
                vault_root.join(doc)
            };
            document::upload_document_images(
                &mut vault,
                &settings,
                &uploader,
                &mut ledger,
                &doc,
                &mut progress,
            )
            .await
        }
    };

    match result {
        Ok(outcome) => {
            println!(
                "Uploaded {} image(s); rewrote {} document(s).",
                outcome.uploaded, outcome.affected_documents
            );
            if !outcome.skipped_conflicts.is_empty() {
                println!(
                    "Skipped {} document(s) due to link overlap.",
                    outcome.skipped_conflicts.len()
                );
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
