//! Shared test utilities for picshift.
//!
//! This module provides common helpers used across multiple test modules.
//! It is only compiled when running tests.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::vault::Vault;

/// Creates a temporary vault directory for testing.
///
/// Returns a tuple of (TempDir, PathBuf) where:
/// - TempDir: The temp directory handle (must be kept alive for the test duration)
/// - PathBuf: The path to the vault subdirectory
///
/// # Why this helper exists
///
/// The vault construction uses WalkDir which filters out hidden directories
/// (those starting with `.`). On some systems, temp directories are created
/// under paths like `/tmp/.tmpXXXXX`. By creating a non-hidden subdirectory
/// called "vault", we ensure the vault can properly index the test files.
pub fn create_test_vault_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    // Create a non-hidden subdirectory since WalkDir filters out .* dirs
    let vault_dir = temp_dir.path().join("vault");
    fs::create_dir(&vault_dir).expect("Failed to create vault subdirectory");
    (temp_dir, vault_dir)
}

/// Creates a test vault from a temporary directory.
///
/// This is a convenience function that combines `create_test_vault_dir`
/// with `Vault::construct_vault`.
///
/// # Arguments
///
/// * `setup_fn` - A closure that receives the vault directory path and can
///   create files before the vault is constructed.
#[allow(dead_code)]
pub fn create_test_vault<F>(setup_fn: F) -> (TempDir, PathBuf, Vault)
where
    F: FnOnce(&PathBuf),
{
    let (temp_dir, vault_dir) = create_test_vault_dir();
    setup_fn(&vault_dir);
    let vault = Vault::construct_vault(&vault_dir).expect("Failed to construct test vault");
    (temp_dir, vault_dir, vault)
}
