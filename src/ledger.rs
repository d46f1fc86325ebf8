//! Persisted record of uploaded images.
//!
//! Every successful upload is recorded as `(local path, remote URL)` so the
//! host environment can later offer remote-side deletion or de-duplication.
//! Trashing a local source file removes its entry in the same operation,
//! keeping the ledger consistent with the vault.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub img_url: String,
    pub local_path: String,
}

#[derive(Debug, Default)]
pub struct UploadLedger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl UploadLedger {
    /// Load the ledger from its vault-relative location. A missing or
    /// unparsable file yields an empty ledger.
    pub fn load(vault_root: &Path, settings: &Settings) -> UploadLedger {
        let path = vault_root.join(&settings.ledger_path);
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                warn!(ledger = %path.display(), %err, "ledger unparsable, starting empty");
                vec![]
            }),
            Err(_) => vec![],
        };
        UploadLedger { path, entries }
    }

    pub fn save(&self) -> io::Result<()> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, text)
    }

    pub fn record(&mut self, local_path: &Path, img_url: &str) {
        let local_path = local_path.to_string_lossy().to_string();
        // Re-uploading the same file replaces its previous entry
        self.entries.retain(|entry| entry.local_path != local_path);
        self.entries.push(LedgerEntry {
            img_url: img_url.to_string(),
            local_path,
        });
    }

    pub fn remove_by_path(&mut self, local_path: &Path) {
        let local_path = local_path.to_string_lossy();
        self.entries.retain(|entry| entry.local_path != local_path);
    }

    pub fn find_by_url(&self, img_url: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|entry| entry.img_url == img_url)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }
}
