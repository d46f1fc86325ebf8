//! Structural section segmentation.
//!
//! Splits a document into its top-level blocks (paragraphs, headings, code
//! blocks, ...) with byte offsets, by traversing the markdown-rs AST. The
//! span resolver scans sections rather than whole documents so fenced code
//! blocks can opt out of link rewriting unless their fence tag is
//! allow-listed.

use markdown::{mdast::Node, to_mdast, Constructs, ParseOptions};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SectionKind {
    Paragraph,
    Heading,
    Code,
    List,
    Frontmatter,
    Other,
}

/// One top-level block of a document, as a half-open byte range of the
/// original text.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Section {
    pub kind: SectionKind,
    /// Fence tag of a code block (` ```tag `), if any.
    pub fence: Option<String>,
    pub start: usize,
    pub end: usize,
}

impl Section {
    /// Whether the resolver should scan this section for references. Code
    /// blocks hold literal example text and are skipped unless their fence
    /// tag is on the allow-list.
    pub fn scannable(&self, allowed_code_fences: &[String]) -> bool {
        match self.kind {
            SectionKind::Code => self
                .fence
                .as_ref()
                .is_some_and(|fence| allowed_code_fences.iter().any(|tag| tag == fence)),
            SectionKind::Frontmatter => false,
            _ => true,
        }
    }
}

fn parse_options() -> ParseOptions {
    ParseOptions {
        constructs: Constructs {
            frontmatter: true,
            ..Constructs::gfm()
        },
        ..ParseOptions::gfm()
    }
}

/// Segment `text` into top-level sections. Documents the parser rejects
/// (only possible for MDX constructs, which are disabled) degrade to one
/// whole-document section.
pub fn sections(text: &str) -> Vec<Section> {
    let Ok(ast) = to_mdast(text, &parse_options()) else {
        return vec![Section {
            kind: SectionKind::Other,
            fence: None,
            start: 0,
            end: text.len(),
        }];
    };

    let Node::Root(root) = ast else {
        return vec![];
    };

    root.children
        .iter()
        .filter_map(|node| {
            let position = node.position()?;
            let (kind, fence) = match node {
                Node::Paragraph(_) => (SectionKind::Paragraph, None),
                Node::Heading(_) => (SectionKind::Heading, None),
                Node::Code(code) => (SectionKind::Code, code.lang.clone()),
                Node::List(_) => (SectionKind::List, None),
                Node::Yaml(_) | Node::Toml(_) => (SectionKind::Frontmatter, None),
                _ => (SectionKind::Other, None),
            };
            Some(Section {
                kind,
                fence,
                start: position.start.offset,
                end: position.end.offset,
            })
        })
        .collect()
}
