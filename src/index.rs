use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use rayon::prelude::*;

use crate::catalog::{AltEntry, DuplicateCatalog};
use crate::fingerprint::{ContentHasher, Fingerprint};
use crate::scanner::{ExtensionFilter, Scanner};
use crate::FileEntry;

/// Counters and skip records accumulated over one scan.
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Regular files seen by the walk, before extension filtering.
    pub files_seen: usize,
    /// Files that were fingerprinted successfully.
    pub files_hashed: usize,
    /// Total size of fingerprinted files, in bytes.
    pub bytes_hashed: u64,
    /// Paths skipped because of traversal or read failures.
    pub errors: Vec<PathBuf>,
}

/// Result of one scan: the duplicate catalog plus scan statistics.
#[derive(Debug)]
pub struct ScanOutcome {
    pub catalog: DuplicateCatalog,
    pub stats: ScanStats,
}

/// Walk the tree, fingerprint every allow-listed file, and derive the
/// duplicate catalog.
///
/// Fingerprinting runs on the rayon pool; results are re-ordered by a
/// monotonic discovery sequence number before grouping, so two entries with
/// the same fingerprint are always grouped in discovery order and the
/// first-discovered member becomes the canonical key. Unreadable paths are
/// skipped, diagnosed, and recorded in the statistics; they never abort the
/// scan.
pub fn build_catalog<H>(
    scanner: &Scanner,
    filter: &ExtensionFilter,
    hasher: &H,
    show_progress: bool,
) -> ScanOutcome
where
    H: ContentHasher + Sync,
{
    let mut stats = ScanStats::default();
    let candidates = collect_candidates(scanner, filter, &mut stats);
    let catalog = group_entries(candidates, hasher, show_progress, &mut stats);
    ScanOutcome { catalog, stats }
}

/// First pass: collect allow-listed files in discovery order.
fn collect_candidates(
    scanner: &Scanner,
    filter: &ExtensionFilter,
    stats: &mut ScanStats,
) -> Vec<FileEntry> {
    let mut candidates = Vec::new();

    for entry in scanner.entries() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                stats.files_seen += 1;
                if let Some(extension) = filter.matches(entry.path()) {
                    candidates.push(FileEntry::new(entry.path().to_path_buf(), extension));
                }
            }
            Ok(_) => {}
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| scanner.root().to_path_buf());
                warn!("skipping unreadable entry {}: {}", path.display(), err);
                stats.errors.push(path);
            }
        }
    }

    debug!(
        "collected {} candidates out of {} files",
        candidates.len(),
        stats.files_seen
    );
    candidates
}

/// Second pass: fingerprint candidates in parallel and group by fingerprint.
///
/// Groups with a single member are not duplicates and never reach the
/// catalog.
pub fn group_entries<H>(
    candidates: Vec<FileEntry>,
    hasher: &H,
    show_progress: bool,
    stats: &mut ScanStats,
) -> DuplicateCatalog
where
    H: ContentHasher + Sync,
{
    let progress = if show_progress {
        let bar = ProgressBar::new(candidates.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap()
                .progress_chars("##-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    // Tag each candidate with its discovery sequence number before handing
    // it to the pool, then restore that order so grouping is deterministic.
    let mut hashed: Vec<(usize, FileEntry, crate::Result<Fingerprint>)> = candidates
        .into_par_iter()
        .enumerate()
        .map(|(seq, entry)| {
            let digest = hasher.fingerprint(&entry.path);
            progress.inc(1);
            (seq, entry, digest)
        })
        .collect();
    hashed.sort_by_key(|(seq, _, _)| *seq);
    progress.finish_and_clear();

    let mut groups: HashMap<Fingerprint, Vec<FileEntry>> = HashMap::new();
    let mut order: Vec<Fingerprint> = Vec::new();

    for (_, entry, digest) in hashed {
        match digest {
            Ok(fingerprint) => {
                stats.files_hashed += 1;
                if let Ok(meta) = entry.path.metadata() {
                    stats.bytes_hashed += meta.len();
                }
                let members = groups.entry(fingerprint).or_default();
                if members.is_empty() {
                    order.push(fingerprint);
                }
                members.push(entry);
            }
            Err(err) => {
                warn!("{err}");
                stats.errors.push(entry.path);
            }
        }
    }

    let mut catalog = DuplicateCatalog::new();
    for fingerprint in order {
        let members = &groups[&fingerprint];
        if members.len() < 2 {
            continue;
        }
        debug!(
            "fingerprint {} has {} members, canonical {}",
            fingerprint,
            members.len(),
            members[0].path.display()
        );
        let canonical = members[0].path.to_string_lossy().into_owned();
        let alternates = members[1..].iter().map(AltEntry::from).collect();
        catalog.insert_group(canonical, alternates);
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::XxFingerprinter;
    use crate::Error;
    use std::fs;
    use tempfile::tempdir;

    /// Test double: fingerprint is the first byte of the file name, so
    /// collisions can be forced regardless of content.
    struct FirstLetterHasher;

    impl ContentHasher for FirstLetterHasher {
        fn fingerprint(&self, path: &Path) -> crate::Result<Fingerprint> {
            let name = path.file_name().unwrap().to_string_lossy();
            Ok(Fingerprint::from_raw(name.as_bytes()[0] as u64))
        }
    }

    fn entry(path: &str) -> FileEntry {
        FileEntry::new(PathBuf::from(path), ".jpg".to_string())
    }

    #[test]
    fn test_disallowed_extensions_absent_from_catalog() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"same").unwrap();
        fs::write(dir.path().join("b.jpg"), b"same").unwrap();
        fs::write(dir.path().join("c.txt"), b"same").unwrap();
        fs::write(dir.path().join("d.txt"), b"same").unwrap();

        let outcome = build_catalog(
            &Scanner::new(dir.path()),
            &ExtensionFilter::new([".jpg"]),
            &XxFingerprinter::default(),
            false,
        );

        assert_eq!(outcome.catalog.len(), 1);
        for (canonical, alts) in outcome.catalog.iter() {
            assert!(canonical.ends_with(".jpg"));
            assert!(alts.iter().all(|a| a.extension == ".jpg"));
        }
        assert_eq!(outcome.stats.files_seen, 4);
        assert_eq!(outcome.stats.files_hashed, 2);
    }

    #[test]
    fn test_identical_content_lands_in_one_group() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"dup").unwrap();
        fs::write(dir.path().join("b.jpg"), b"dup").unwrap();
        fs::write(dir.path().join("c.jpg"), b"dup").unwrap();
        fs::write(dir.path().join("lone.jpg"), b"unique").unwrap();

        let outcome = build_catalog(
            &Scanner::new(dir.path()),
            &ExtensionFilter::new([".jpg"]),
            &XxFingerprinter::default(),
            false,
        );

        // One group of three; the singleton never appears.
        assert_eq!(outcome.catalog.len(), 1);
        let (canonical, alts) = outcome.catalog.iter().next().unwrap();
        assert_eq!(alts.len(), 2);
        assert!(!canonical.ends_with("lone.jpg"));
        assert!(alts.iter().all(|a| !a.path.ends_with("lone.jpg")));
    }

    #[test]
    fn test_canonical_is_first_discovered_alternates_in_order() {
        let mut stats = ScanStats::default();
        let candidates = vec![entry("/t/alpha.jpg"), entry("/t/beta.jpg"), entry("/t/another.jpg")];

        // All three collide under the test double ('a' vs 'b'): alpha and
        // another share a fingerprint, beta is a singleton.
        let catalog = group_entries(candidates, &FirstLetterHasher, false, &mut stats);

        assert_eq!(catalog.len(), 1);
        let (canonical, alts) = catalog.iter().next().unwrap();
        assert_eq!(canonical, "/t/alpha.jpg");
        assert_eq!(alts.len(), 1);
        assert_eq!(alts[0].path, "/t/another.jpg");
    }

    #[test]
    fn test_forced_collision_still_groups_as_duplicates() {
        // Distinct content, same forced fingerprint: the documented
        // false-positive risk is reproducible.
        let mut stats = ScanStats::default();
        let candidates = vec![entry("/t/x-one.jpg"), entry("/t/x-two.jpg")];

        let catalog = group_entries(candidates, &FirstLetterHasher, false, &mut stats);

        assert_eq!(catalog.len(), 1);
        let (canonical, alts) = catalog.iter().next().unwrap();
        assert_eq!(canonical, "/t/x-one.jpg");
        assert_eq!(alts[0].path, "/t/x-two.jpg");
    }

    #[test]
    fn test_unreadable_file_skipped_and_recorded() {
        struct FailSecond;
        impl ContentHasher for FailSecond {
            fn fingerprint(&self, path: &Path) -> crate::Result<Fingerprint> {
                if path.to_string_lossy().contains("bad") {
                    Err(Error::Fingerprint {
                        path: path.to_path_buf(),
                        source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                    })
                } else {
                    Ok(Fingerprint::from_raw(7))
                }
            }
        }

        let mut stats = ScanStats::default();
        let candidates = vec![entry("/t/good1.jpg"), entry("/t/bad.jpg"), entry("/t/good2.jpg")];

        let catalog = group_entries(candidates, &FailSecond, false, &mut stats);

        assert_eq!(stats.errors, vec![PathBuf::from("/t/bad.jpg")]);
        assert_eq!(stats.files_hashed, 2);
        assert_eq!(catalog.len(), 1);
        let (canonical, _) = catalog.iter().next().unwrap();
        assert_eq!(canonical, "/t/good1.jpg");
    }
}
