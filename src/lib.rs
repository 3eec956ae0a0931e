//! dupkeep - content-duplicate detection with a durable catalog.
//!
//! The crate scans a directory tree, fingerprints candidate files with a fast
//! non-cryptographic hash, groups files by fingerprint, and persists the
//! resulting duplicate catalog so an interrupted session can resume without
//! rescanning. An interactive resolution workflow walks the operator through
//! each duplicate group and keeps the catalog consistent with the filesystem
//! after deletions.
//!
//! Modules:
//!
//! - [`scanner`]: recursive directory traversal and extension discovery
//! - [`fingerprint`]: chunked streaming content fingerprints
//! - [`index`]: grouping scanned files into a duplicate catalog
//! - [`catalog`]: catalog types and durable storage
//! - [`resolve`]: the interactive keep/delete workflow
//! - [`error`]: crate error taxonomy

pub mod catalog;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod resolve;
pub mod scanner;

use std::path::PathBuf;

pub use catalog::{CatalogStore, DuplicateCatalog};
pub use error::{Error, Result};
pub use fingerprint::{ContentHasher, Fingerprint, XxFingerprinter};
pub use index::build_catalog;
pub use resolve::resolve_catalog;
pub use scanner::Scanner;

/// A candidate file discovered during the scan.
///
/// Created by the extension filter on top of the raw walk, consumed by the
/// index builder, and discarded once grouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Normalized lowercase extension, including the leading dot (".jpg").
    pub extension: String,
}

impl FileEntry {
    pub fn new(path: PathBuf, extension: String) -> Self {
        Self { path, extension }
    }
}

/// Normalize an extension to the catalog form: lowercase with a leading dot.
///
/// Accepts `"jpg"`, `".jpg"`, `"JPG"` and so on.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("jpg"), ".jpg");
        assert_eq!(normalize_extension(".JPG"), ".jpg");
        assert_eq!(normalize_extension(" .Png "), ".png");
    }
}
