//! Corpus link index: reverse mapping from selected target files to the
//! documents that reference them.
//!
//! Inverting the forward link graph restricted to the selected targets
//! bounds the span resolver's scan to documents that can possibly reference
//! a selected file, instead of every document times every target.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use itertools::Itertools;

/// `target -> source document -> reference count`, limited to the selected
/// target set. Built fresh per batch; transient.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReverseLinkIndex {
    inbound: HashMap<PathBuf, HashMap<PathBuf, usize>>,
}

impl ReverseLinkIndex {
    /// Invert `forward` restricted to `targets`. `on_entry(count, total)` is
    /// called once per forward-graph entry scanned, for progress reporting.
    pub fn build(
        forward: &HashMap<PathBuf, HashMap<PathBuf, usize>>,
        targets: &[PathBuf],
        mut on_entry: impl FnMut(usize, usize),
    ) -> ReverseLinkIndex {
        let mut inbound: HashMap<PathBuf, HashMap<PathBuf, usize>> = targets
            .iter()
            .map(|target| (target.clone(), HashMap::new()))
            .collect();

        let total = forward.len();
        for (count, (source, links)) in forward.iter().enumerate() {
            on_entry(count + 1, total);
            for (target, n_links) in links {
                // Membership check doubles as the selected-target filter
                let Some(sources) = inbound.get_mut(target) else {
                    continue;
                };
                *sources.entry(source.clone()).or_default() += n_links;
            }
        }

        ReverseLinkIndex { inbound }
    }

    /// Documents referencing `target`, sorted for deterministic scanning
    /// order. Empty for targets with no inbound references.
    pub fn referencing_documents(&self, target: &Path) -> Vec<&PathBuf> {
        self.inbound
            .get(target)
            .map(|sources| sources.keys().sorted().collect())
            .unwrap_or_default()
    }

    pub fn reference_count(&self, target: &Path, source: &Path) -> usize {
        self.inbound
            .get(target)
            .and_then(|sources| sources.get(source))
            .copied()
            .unwrap_or(0)
    }
}
