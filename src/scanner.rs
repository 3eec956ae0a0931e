use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::normalize_extension;

/// Recursive directory walker.
///
/// The walk is lazy and restartable: every call to [`Scanner::entries`]
/// starts a fresh traversal from the root. Filtering to "regular files with
/// an allow-listed extension" is the caller's job (see [`ExtensionFilter`]),
/// which keeps the walker reusable for extension discovery.
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yield every entry reachable from the root, directories
    /// included. Unreadable entries surface as `Err` items; the traversal
    /// itself continues past them.
    pub fn entries(&self) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
        WalkDir::new(&self.root).follow_links(false).into_iter()
    }

    /// Collect the distinct normalized extensions of all regular files under
    /// the root, along with the paths that could not be read.
    pub fn collect_extensions(&self) -> (BTreeSet<String>, Vec<PathBuf>) {
        let mut extensions = BTreeSet::new();
        let mut errors = Vec::new();

        for entry in self.entries() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if let Some(ext) = entry.path().extension() {
                        extensions.insert(normalize_extension(&ext.to_string_lossy()));
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    debug!("skipping unreadable entry {}: {}", path.display(), err);
                    errors.push(path);
                }
            }
        }

        (extensions, errors)
    }
}

/// Allow-list of file extensions, normalized to lowercase with a leading dot.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    allowed: HashSet<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    /// If the path's extension is on the allow-list, return it in
    /// normalized form. Files without an extension never match.
    pub fn matches(&self, path: &Path) -> Option<String> {
        let ext = normalize_extension(&path.extension()?.to_string_lossy());
        self.allowed.contains(&ext).then_some(ext)
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_walk_recurses_into_subdirectories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(dir.path().join("sub/b.jpg")).unwrap();

        let scanner = Scanner::new(dir.path());
        let files: Vec<_> = scanner
            .entries()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .collect();

        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("sub/b.jpg")));
    }

    #[test]
    fn test_entries_is_restartable() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();

        let scanner = Scanner::new(dir.path());
        let first: usize = scanner.entries().count();
        let second: usize = scanner.entries().count();
        assert_eq!(first, second);
    }

    #[test]
    fn test_collect_extensions_normalizes_and_dedups() {
        let dir = tempdir().unwrap();
        let mut f = File::create(dir.path().join("a.JPG")).unwrap();
        f.write_all(b"x").unwrap();
        File::create(dir.path().join("b.jpg")).unwrap();
        File::create(dir.path().join("c.png")).unwrap();
        File::create(dir.path().join("noext")).unwrap();

        let scanner = Scanner::new(dir.path());
        let (exts, errors) = scanner.collect_extensions();

        assert!(errors.is_empty());
        assert_eq!(
            exts.into_iter().collect::<Vec<_>>(),
            vec![".jpg".to_string(), ".png".to_string()]
        );
    }

    #[test]
    fn test_extension_filter_matches_normalized() {
        let filter = ExtensionFilter::new(["jpg", ".PNG"]);

        assert_eq!(
            filter.matches(Path::new("/tmp/photo.JPG")),
            Some(".jpg".to_string())
        );
        assert_eq!(
            filter.matches(Path::new("/tmp/photo.png")),
            Some(".png".to_string())
        );
        assert_eq!(filter.matches(Path::new("/tmp/clip.mov")), None);
        assert_eq!(filter.matches(Path::new("/tmp/noext")), None);
    }
}
