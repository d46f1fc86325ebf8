//! Filesystem-backed corpus of Markdown documents.
//!
//! The in memory representation of the vault files. This data is exposed
//! through an interface of methods to select the vaults data: document text,
//! structural sections, the forward link graph snapshot, and link/path
//! resolution. The rewrite pipeline consumes the snapshot taken at
//! construction; documents changed behind its back are an accepted risk
//! window, not something the vault locks against.

pub mod sections;

pub use sections::{Section, SectionKind};

use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Component, Path, PathBuf},
};

use itertools::Itertools;
use rayon::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use crate::grammar::{self, InlineImageLink, WikiImageLink};

/// Extensions the corpus classifies as image files.
const IMAGE_EXTENSIONS: [&str; 10] = [
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "avif", "ico", "tiff",
];

/// One indexed Markdown document: its structural sections and every image
/// embed found in it, with whole-document byte offsets.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MDDocument {
    pub path: PathBuf,
    pub sections: Vec<Section>,
    pub inline_links: Vec<InlineImageLink>,
    pub wiki_links: Vec<WikiImageLink>,
}

impl MDDocument {
    fn new(text: &str, path: PathBuf) -> MDDocument {
        MDDocument {
            path,
            sections: sections::sections(text),
            inline_links: grammar::inline_image_links(text),
            wiki_links: grammar::wiki_image_links(text),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Vault {
    docs: HashMap<PathBuf, MDDocument>,
    /// Every non-hidden file under the root, Markdown or not.
    files: HashSet<PathBuf>,
    /// document -> target -> reference count, resolved at construction.
    forward_links: HashMap<PathBuf, HashMap<PathBuf, usize>>,
    root_dir: PathBuf,
}

impl Vault {
    pub fn construct_vault(root_dir: &Path) -> Result<Vault, io::Error> {
        let entries = WalkDir::new(root_dir)
            .into_iter()
            .filter_entry(|e| {
                !e.file_name()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
            })
            .flatten()
            .filter(|e| e.file_type().is_file())
            .collect_vec();

        let files: HashSet<PathBuf> = entries.iter().map(|e| e.path().to_path_buf()).collect();

        let docs: HashMap<PathBuf, MDDocument> = entries
            .par_iter()
            .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("md"))
            .flat_map(|e| {
                let text = std::fs::read_to_string(e.path())?;
                let doc = MDDocument::new(&text, e.path().to_path_buf());

                Ok::<(PathBuf, MDDocument), io::Error>((e.path().into(), doc))
            })
            .collect();

        let mut vault = Vault {
            docs,
            files,
            forward_links: HashMap::new(),
            root_dir: root_dir.into(),
        };
        let forward_links = vault
            .docs
            .iter()
            .map(|(path, doc)| (path.clone(), vault.targets_for(path, doc)))
            .collect();
        vault.forward_links = forward_links;

        debug!(
            documents = vault.docs.len(),
            files = vault.files.len(),
            "vault constructed"
        );
        Ok(vault)
    }

    /// Re-index one document after its content changed (e.g. a rewrite).
    pub fn update_document(&mut self, path: &Path, text: &str) {
        let doc = MDDocument::new(text, path.to_path_buf());
        let targets = self.targets_for(path, &doc);
        self.forward_links.insert(path.to_path_buf(), targets);
        self.docs.insert(path.to_path_buf(), doc);
        self.files.insert(path.to_path_buf());
    }

    /// Resolve the targets a single document references, with counts.
    fn targets_for(&self, path: &Path, doc: &MDDocument) -> HashMap<PathBuf, usize> {
        let mut targets: HashMap<PathBuf, usize> = HashMap::new();
        for link in &doc.inline_links {
            if link.is_network {
                continue;
            }
            let resolved = self
                .resolve_inline_target(&link.target, path)
                .or_else(|| self.resolve_link(&link.target, path));
            if let Some(resolved) = resolved {
                *targets.entry(resolved).or_default() += 1;
            }
        }
        for link in &doc.wiki_links {
            let (link_path, _subpath) = grammar::parse_linktext(&link.linktext);
            if let Some(resolved) = self.resolve_link(link_path, path) {
                *targets.entry(resolved).or_default() += 1;
            }
        }
        targets
    }

    /// Strict inline-target resolution: percent-decode, reject absolute
    /// paths (assumed external to the vault), resolve relative to the
    /// referencing document's directory.
    pub fn resolve_inline_target(&self, raw: &str, from: &Path) -> Option<PathBuf> {
        let decoded = percent_decode(raw);
        if Path::new(decoded.as_str()).is_absolute() {
            return None;
        }
        let resolved = normalize_path(&from.parent()?.join(decoded.as_str()));
        self.files.contains(&resolved).then_some(resolved)
    }

    /// First-match link resolution, consistent with how the corpus itself
    /// resolves wiki links: exact vault-relative path, then relative to the
    /// referencing document, then the shortest path with a matching file
    /// name. Links without an extension match Markdown files by stem.
    pub fn resolve_link(&self, raw: &str, from: &Path) -> Option<PathBuf> {
        let decoded = percent_decode(raw);
        let decoded = decoded.trim();
        if decoded.is_empty() || Path::new(decoded).is_absolute() {
            return None;
        }

        let rooted = normalize_path(&self.root_dir.join(decoded));
        if self.files.contains(&rooted) {
            return Some(rooted);
        }

        if let Some(parent) = from.parent() {
            let relative = normalize_path(&parent.join(decoded));
            if self.files.contains(&relative) {
                return Some(relative);
            }
        }

        let wanted = Path::new(decoded).file_name()?.to_str()?.to_string();
        let wanted_md = format!("{wanted}.md");
        let has_extension = wanted.contains('.');
        self.files
            .iter()
            .filter(|file| {
                file.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
                    if has_extension {
                        name == wanted
                    } else {
                        name == wanted_md
                    }
                })
            })
            .sorted_by_key(|file| (file.as_os_str().len(), (*file).clone()))
            .next()
            .cloned()
    }

    pub fn read_document(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    pub fn write_document(&mut self, path: &Path, text: &str) -> io::Result<()> {
        std::fs::write(path, text)?;
        self.update_document(path, text);
        Ok(())
    }

    pub fn sections(&self, path: &Path) -> Option<&[Section]> {
        self.docs.get(path).map(|doc| doc.sections.as_slice())
    }

    pub fn document(&self, path: &Path) -> Option<&MDDocument> {
        self.docs.get(path)
    }

    pub fn forward_link_graph(&self) -> &HashMap<PathBuf, HashMap<PathBuf, usize>> {
        &self.forward_links
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn is_image_type(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Best-effort delete: move the file into `<vault>/.trash/`, never over
    /// an existing trashed file of the same name.
    pub fn trash(&mut self, path: &Path) -> io::Result<()> {
        let trash_dir = self.root_dir.join(".trash");
        std::fs::create_dir_all(&trash_dir)?;
        let name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let mut dest = trash_dir.join(name);
        let mut counter = 1;
        while dest.exists() {
            dest = trash_dir.join(format!("{}-{}", counter, name.to_string_lossy()));
            counter += 1;
        }
        std::fs::rename(path, &dest)?;
        self.files.remove(path);
        Ok(())
    }

    pub fn root_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    pub fn vault_relative(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root_dir).ok().map(PathBuf::from)
    }
}

fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |d| d.to_string())
}

/// Lexically normalize a path: resolve `.` and `..` without touching the
/// filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_vault_dir;
    use std::fs;

    #[test]
    fn test_construct_vault_indexes_markdown_only() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(vault_dir.join("note.md"), "# Note\n\n![a](pic.png)\n").unwrap();
        fs::write(vault_dir.join("pic.png"), b"fake").unwrap();

        let vault = Vault::construct_vault(&vault_dir).unwrap();
        assert!(vault.document(&vault_dir.join("note.md")).is_some());
        assert!(vault.document(&vault_dir.join("pic.png")).is_none());
        assert!(vault.has_file(&vault_dir.join("pic.png")));
    }

    #[test]
    fn test_forward_link_graph_counts() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(
            vault_dir.join("note.md"),
            "![a](pic.png)\n\n![b](pic.png)\n\n![[other.png]]\n",
        )
        .unwrap();
        fs::write(vault_dir.join("pic.png"), b"fake").unwrap();
        fs::write(vault_dir.join("other.png"), b"fake").unwrap();

        let vault = Vault::construct_vault(&vault_dir).unwrap();
        let graph = vault.forward_link_graph();
        let targets = graph.get(&vault_dir.join("note.md")).unwrap();
        assert_eq!(targets.get(&vault_dir.join("pic.png")), Some(&2));
        assert_eq!(targets.get(&vault_dir.join("other.png")), Some(&1));
    }

    #[test]
    fn test_resolve_link_prefers_exact_then_relative_then_name() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::create_dir(vault_dir.join("sub")).unwrap();
        fs::write(vault_dir.join("sub/note.md"), "content").unwrap();
        fs::write(vault_dir.join("sub/pic.png"), b"fake").unwrap();
        fs::write(vault_dir.join("pic.png"), b"fake").unwrap();

        let vault = Vault::construct_vault(&vault_dir).unwrap();
        let from = vault_dir.join("sub/note.md");

        // Exact vault-relative path wins
        assert_eq!(
            vault.resolve_link("sub/pic.png", &from),
            Some(vault_dir.join("sub/pic.png"))
        );
        // Bare name resolves relative to the referencing document first
        assert_eq!(
            vault.resolve_link("pic.png", &from),
            Some(vault_dir.join("sub/pic.png"))
        );
        // Shortest-path fallback when nothing matches locally
        let from_root = vault_dir.join("unindexed.md");
        assert_eq!(
            vault.resolve_link("pic.png", &from_root),
            Some(vault_dir.join("pic.png"))
        );
    }

    #[test]
    fn test_resolve_link_rejects_absolute() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(vault_dir.join("note.md"), "x").unwrap();
        let vault = Vault::construct_vault(&vault_dir).unwrap();
        assert_eq!(
            vault.resolve_link("/etc/pic.png", &vault_dir.join("note.md")),
            None
        );
    }

    #[test]
    fn test_resolve_inline_target_decodes_percent_encoding() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(vault_dir.join("note.md"), "x").unwrap();
        fs::write(vault_dir.join("my pic.png"), b"fake").unwrap();
        let vault = Vault::construct_vault(&vault_dir).unwrap();
        assert_eq!(
            vault.resolve_inline_target("my%20pic.png", &vault_dir.join("note.md")),
            Some(vault_dir.join("my pic.png"))
        );
    }

    #[test]
    fn test_is_image_type() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        let vault = Vault::construct_vault(&vault_dir).unwrap();
        assert!(vault.is_image_type(Path::new("a/b.PNG")));
        assert!(vault.is_image_type(Path::new("b.webp")));
        assert!(!vault.is_image_type(Path::new("b.md")));
        assert!(!vault.is_image_type(Path::new("noext")));
    }

    #[test]
    fn test_trash_moves_file() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(vault_dir.join("pic.png"), b"fake").unwrap();
        let mut vault = Vault::construct_vault(&vault_dir).unwrap();

        vault.trash(&vault_dir.join("pic.png")).unwrap();
        assert!(!vault_dir.join("pic.png").exists());
        assert!(vault_dir.join(".trash/pic.png").exists());
        assert!(!vault.has_file(&vault_dir.join("pic.png")));
    }

    #[test]
    fn test_update_document_refreshes_links() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(vault_dir.join("note.md"), "![a](pic.png)\n").unwrap();
        fs::write(vault_dir.join("pic.png"), b"fake").unwrap();
        let mut vault = Vault::construct_vault(&vault_dir).unwrap();

        vault.update_document(&vault_dir.join("note.md"), "no links anymore\n");
        let targets = vault
            .forward_link_graph()
            .get(&vault_dir.join("note.md"))
            .unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d.png")),
            PathBuf::from("/a/c/d.png")
        );
    }
}
