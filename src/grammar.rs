//! The two image-reference matchers.
//!
//! Markdown vaults embed images in two syntaxes: inline
//! (`![display](target)`) and wiki (`![[target|display]]`). Each matcher
//! scans a bounded span of text and returns structured match records with
//! byte offsets relative to that span, so callers can rebase them onto
//! whole-document offsets.

use once_cell::sync::Lazy;
use regex::Regex;

/// An inline image embed: `![display](<path>)`, `![display](path.ext)` with
/// an optional quoted title or pipe-delimited attributes, or
/// `![display](https://...)`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InlineImageLink {
    pub display: String,
    pub target: String,
    /// Target is an `http(s)` or `data:` URL rather than a vault path.
    pub is_network: bool,
    pub start: usize,
    pub end: usize,
}

/// A wiki image embed: `![[target]]` or `![[target|display]]`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WikiImageLink {
    pub linktext: String,
    /// The raw `|display` suffix, pipe included, verbatim.
    pub residual: Option<String>,
    pub start: usize,
    pub end: usize,
}

static INLINE_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"!\[(?<display_a>.*?)\]\(<(?<target_a>\S+\.\w+)>\)|!\[(?<display_b>.*?)\]\((?<target_b>\S+\.\w+)(?:\s+"[^"]*"|\s*\|[^)]*)*\)|!\[(?<display_c>.*?)\]\((?<target_c>https?://[^)]*)\)"#,
    )
    .unwrap()
}); // Alternatives in preference order: angle-bracket path, bare path, network URL

static WIKI_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[\[(?<linktext>[^\[\]|]*)(?<residual>\s*\|[^\]]*)?\]\]").unwrap());

fn is_network_target(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with("data:")
}

/// Match every inline image embed in `text`. Network-targeted matches are
/// flagged, not dropped; file resolution skips them but the network
/// mirroring path still wants them.
pub fn inline_image_links(text: &str) -> Vec<InlineImageLink> {
    INLINE_IMAGE_RE
        .captures_iter(text)
        .filter_map(|captures| {
            let full = captures.get(0)?;
            let target = captures
                .name("target_a")
                .or_else(|| captures.name("target_b"))
                .or_else(|| captures.name("target_c"))?
                .as_str();
            Some(InlineImageLink {
                display: captures
                    .name("display_a")
                    .or_else(|| captures.name("display_b"))
                    .or_else(|| captures.name("display_c"))
                    .map(|d| d.as_str().to_string())
                    .unwrap_or_default(),
                target: target.to_string(),
                is_network: is_network_target(target),
                start: full.start(),
                end: full.end(),
            })
        })
        .collect()
}

/// Match every wiki image embed in `text`.
pub fn wiki_image_links(text: &str) -> Vec<WikiImageLink> {
    WIKI_IMAGE_RE
        .captures_iter(text)
        .filter_map(|captures| {
            let full = captures.get(0)?;
            Some(WikiImageLink {
                linktext: captures.name("linktext")?.as_str().to_string(),
                residual: captures.name("residual").map(|r| r.as_str().to_string()),
                start: full.start(),
                end: full.end(),
            })
        })
        .collect()
}

/// Split a wiki link target into its path and optional `#sub-path` fragment.
pub fn parse_linktext(linktext: &str) -> (&str, Option<&str>) {
    match linktext.find('#') {
        Some(i) => (&linktext[..i], Some(&linktext[i..])),
        None => (linktext, None),
    }
}
