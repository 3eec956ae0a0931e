use std::fmt;
use std::fs::File;
use std::hash::Hasher;
use std::io::Read;
use std::path::Path;

use twox_hash::XxHash64;

use crate::error::{Error, Result};

/// Default read size while fingerprinting, in bytes.
///
/// Small on purpose: most duplicate sets diverge within the first few
/// hundred bytes, and the accumulator streams the rest either way.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Content identity key: a fast, non-cryptographic 64-bit digest.
///
/// Equal fingerprints are *treated* as duplicate content. Collisions between
/// distinct content are a known, unmitigated false-positive risk; this is
/// not a security primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn from_raw(digest: u64) -> Self {
        Self(digest)
    }
}

impl fmt::Display for Fingerprint {
    /// Fixed-width lowercase hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Seam between the index builder and the hash implementation, so tests can
/// substitute a double (including one that forces collisions).
pub trait ContentHasher {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint>;
}

/// Streaming XXH64 fingerprinter with chunked reads.
#[derive(Debug, Clone)]
pub struct XxFingerprinter {
    chunk_size: usize,
}

impl XxFingerprinter {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for XxFingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ContentHasher for XxFingerprinter {
    /// Read the file in fixed-size chunks and feed each into the hash
    /// accumulator. The whole file is never held in memory. A zero-length
    /// file produces the digest of empty input, not an error.
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint> {
        let wrap = |source| Error::Fingerprint {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(wrap)?;
        let mut hasher = XxHash64::with_seed(0);
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let bytes_read = file.read(&mut buffer).map_err(wrap)?;
            if bytes_read == 0 {
                break;
            }
            hasher.write(&buffer[..bytes_read]);
        }

        Ok(Fingerprint(hasher.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_identical_content_same_fingerprint() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, b"the same bytes").unwrap();
        fs::write(&b, b"the same bytes").unwrap();

        let fp = XxFingerprinter::default();
        assert_eq!(fp.fingerprint(&a).unwrap(), fp.fingerprint(&b).unwrap());
    }

    #[test]
    fn test_distinct_content_distinct_fingerprint() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, b"first").unwrap();
        fs::write(&b, b"second").unwrap();

        let fp = XxFingerprinter::default();
        assert_ne!(fp.fingerprint(&a).unwrap(), fp.fingerprint(&b).unwrap());
    }

    #[test]
    fn test_chunk_size_does_not_change_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        // Larger than any chunk size used below, not a multiple of either.
        fs::write(&path, vec![0xabu8; 1037]).unwrap();

        let small = XxFingerprinter::new(7).fingerprint(&path).unwrap();
        let large = XxFingerprinter::new(4096).fingerprint(&path).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn test_empty_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let digest = XxFingerprinter::default().fingerprint(&path).unwrap();
        // XXH64 of empty input with seed 0.
        assert_eq!(digest, Fingerprint::from_raw(0xef46_db37_51d8_e999));
    }

    #[test]
    fn test_missing_file_carries_path() {
        let err = XxFingerprinter::default()
            .fingerprint(Path::new("/no/such/file.jpg"))
            .unwrap_err();
        match err {
            Error::Fingerprint { path, .. } => {
                assert_eq!(path, Path::new("/no/such/file.jpg"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(Fingerprint::from_raw(0x2a).to_string(), "000000000000002a");
    }
}
