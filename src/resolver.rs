//! Replacement-span computation.
//!
//! For each selected target file and each document the reverse index says
//! references it, scan the document's structural sections with the reference
//! grammar, canonicalize every match's target, and collect the matches that
//! hit the selected file as absolute-offset replacement spans. Spans are
//! validated for non-overlap once per document, before anything is mutated;
//! a document with physically overlapping spans is excluded from rewriting
//! rather than rewritten on a best-effort basis.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ropey::Rope;
use tracing::warn;

use crate::config::Settings;
use crate::grammar;
use crate::index::ReverseLinkIndex;
use crate::vault::Vault;

/// Display name used when an inline match has an empty display text.
const FALLBACK_DISPLAY: &str = "image";

/// One reference to be replaced, as a half-open byte range into the original
/// content of one specific document.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LinkSpan {
    pub target: PathBuf,
    pub display_name: String,
    pub start: usize,
    pub end: usize,
}

/// document -> ascending, non-overlapping spans. Built once per batch,
/// consumed exactly once when rewriting.
pub type DocumentSpanSet = HashMap<PathBuf, Vec<LinkSpan>>;

/// A document excluded from rewriting because two of its computed spans
/// physically overlap (e.g. a wiki link nested in an inline link's display
/// text). Position points at the second span of the offending pair.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SpanConflict {
    pub document: PathBuf,
    pub line: usize,
    pub character: usize,
}

#[derive(Debug, Default)]
pub struct SpanResolution {
    pub spans: DocumentSpanSet,
    pub conflicts: Vec<SpanConflict>,
    /// The exact content each document's spans were computed against.
    pub contents: HashMap<PathBuf, String>,
}

/// Accumulates spans for one document and validates them in a single pass,
/// never interleaved with scanning.
#[derive(Debug, Default)]
pub struct SpanBuilder {
    spans: Vec<LinkSpan>,
}

impl SpanBuilder {
    pub fn push(&mut self, span: LinkSpan) {
        self.spans.push(span);
    }

    /// Sort by start offset and check adjacent non-overlap. On violation,
    /// returns the start offset of the second span of the offending pair.
    pub fn finish(mut self) -> Result<Vec<LinkSpan>, usize> {
        self.spans.sort_by_key(|span| span.start);
        for pair in self.spans.windows(2) {
            if pair[0].end > pair[1].start {
                return Err(pair[1].start);
            }
        }
        Ok(self.spans)
    }
}

/// Compute the replacement spans for every `targets` entry across the
/// documents the reverse index names. `on_target(count, total, target)` is
/// called once per target for progress reporting.
pub fn find_spans(
    vault: &Vault,
    settings: &Settings,
    targets: &[PathBuf],
    index: &ReverseLinkIndex,
    mut on_target: impl FnMut(usize, usize, &Path),
) -> SpanResolution {
    let mut builders: HashMap<PathBuf, SpanBuilder> = HashMap::new();
    let mut contents: HashMap<PathBuf, String> = HashMap::new();

    let total = targets.len();
    for (count, target) in targets.iter().enumerate() {
        on_target(count + 1, total, target);

        for doc in index.referencing_documents(target) {
            let content = match contents.entry(doc.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => match vault.read_document(doc) {
                    Ok(text) => entry.insert(text),
                    Err(err) => {
                        warn!(document = %doc.display(), %err, "skipping unreadable document");
                        continue;
                    }
                },
            };
            let Some(sections) = vault.sections(doc) else {
                continue;
            };

            let builder = builders.entry(doc.clone()).or_default();
            for section in sections {
                if !section.scannable(&settings.allowed_code_fences) {
                    continue;
                }
                let Some(section_text) = content.get(section.start..section.end) else {
                    continue;
                };

                for m in grammar::inline_image_links(section_text) {
                    if m.is_network {
                        continue;
                    }
                    if vault.resolve_inline_target(&m.target, doc).as_deref()
                        != Some(target.as_path())
                    {
                        continue;
                    }
                    let display_name = if m.display.is_empty() {
                        FALLBACK_DISPLAY.to_string()
                    } else {
                        m.display.clone()
                    };
                    builder.push(LinkSpan {
                        target: target.clone(),
                        display_name,
                        start: section.start + m.start,
                        end: section.start + m.end,
                    });
                }

                for m in grammar::wiki_image_links(section_text) {
                    let (link_path, _subpath) = grammar::parse_linktext(&m.linktext);
                    if vault.resolve_link(link_path, doc).as_deref() != Some(target.as_path()) {
                        continue;
                    }
                    // Original link text plus any |display suffix, verbatim
                    let display_name =
                        format!("{}{}", m.linktext, m.residual.as_deref().unwrap_or(""));
                    builder.push(LinkSpan {
                        target: target.clone(),
                        display_name,
                        start: section.start + m.start,
                        end: section.start + m.end,
                    });
                }
            }
        }
    }

    let mut resolution = SpanResolution {
        contents,
        ..Default::default()
    };
    for (doc, builder) in builders {
        match builder.finish() {
            Ok(spans) if spans.is_empty() => {}
            Ok(spans) => {
                resolution.spans.insert(doc, spans);
            }
            Err(offset) => {
                let (line, character) = resolution
                    .contents
                    .get(&doc)
                    .map(|text| line_character(text, offset))
                    .unwrap_or((0, 0));
                resolution.conflicts.push(SpanConflict {
                    document: doc,
                    line,
                    character,
                });
            }
        }
    }
    resolution.conflicts.sort_by(|a, b| a.document.cmp(&b.document));

    resolution
}

/// Convert a byte offset into a zero-based line/character position.
fn line_character(text: &str, offset: usize) -> (usize, usize) {
    let rope = Rope::from_str(text);
    let char_idx = rope.byte_to_char(offset.min(text.len()));
    let line = rope.char_to_line(char_idx);
    let character = char_idx - rope.line_to_char(line);
    (line, character)
}
