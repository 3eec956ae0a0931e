use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Errors local to one file or one group are handled where they occur
/// (skip, diagnose, continue); only catalog load failures and operator quit
/// terminate a whole pass. Unreadable paths met during traversal never
/// become an `Error` at all: the walk skips them and records the path in
/// the scan statistics.
#[derive(Debug, Error)]
pub enum Error {
    /// A candidate file could not be opened or read while fingerprinting.
    /// The file is skipped and the index build continues.
    #[error("cannot fingerprint '{path}': {source}")]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The persisted catalog does not conform to the expected
    /// canonical-to-alternates mapping. Fatal for a load; no partial
    /// catalog is returned.
    #[error("catalog '{path}' is not a valid duplicate catalog: {reason}")]
    CatalogFormat { path: PathBuf, reason: String },

    /// I/O failure reading or writing the catalog file.
    #[error("catalog I/O on '{path}': {source}")]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure on the operator I/O channel (prompt read/write).
    #[error(transparent)]
    Prompt(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
