//! picshift: batch image upload and link rewriting for Markdown vaults
//!
//! This crate finds every textual reference to a set of image files across a
//! Markdown vault, uploads the images through a pluggable uploader, and
//! rewrites the references in place to point at the returned URLs, optionally
//! trashing the local originals afterward.
//!
//! # Overview
//!
//! The pipeline is built from a few cooperating pieces:
//!
//! - **Vault indexing**: walk a vault directory, index every Markdown
//!   document, and snapshot the forward link graph
//! - **Reference grammar**: recognize inline (`![name](path)`) and wiki
//!   (`![[path|name]]`) image embeds with exact byte offsets
//! - **Span resolution**: narrow the search with a reverse link index, then
//!   compute conflict-checked replacement spans per document
//! - **Batch coordination**: upload, align URLs positionally, and rewrite
//!   each affected document in a single pass
//!
//! # Architecture
//!
//! The crate is organized around several key modules:
//!
//! - [`vault`]: Filesystem-backed corpus (documents, sections, link graph)
//! - [`grammar`]: The two image-reference matchers
//! - [`resolver`]: Replacement-span computation and overlap checking
//! - [`batch`]: The end-to-end upload-and-rewrite coordinator
//! - [`document`]: The single-document flow (scan one note, upload, rewrite)
//!
//! # Usage
//!
//! ```ignore
//! use picshift::config::Settings;
//! use picshift::vault::Vault;
//!
//! let settings = Settings::default();
//! let mut vault = Vault::construct_vault(&vault_path)?;
//! ```

// Core modules - vault and link structure
pub mod vault;

// Pipeline modules
pub mod batch;
pub mod document;
pub mod grammar;
pub mod index;
pub mod resolver;

// Collaborator seams
pub mod ledger;
pub mod progress;
pub mod uploader;

// Configuration and policy
pub mod config;
pub mod naming;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
