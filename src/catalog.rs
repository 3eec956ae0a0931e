use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::FileEntry;

/// A non-canonical member of a duplicate group, candidate for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltEntry {
    pub path: String,
    pub extension: String,
}

impl From<&FileEntry> for AltEntry {
    fn from(entry: &FileEntry) -> Self {
        Self {
            path: entry.path.to_string_lossy().into_owned(),
            extension: entry.extension.clone(),
        }
    }
}

/// Mapping from canonical path (the first-discovered member of a duplicate
/// group) to its alternates.
///
/// Invariants: canonical paths are unique keys, no alternate list is empty,
/// and a canonical path never appears as an alternate of another entry. The
/// map is ordered so resolution and serialization iterate in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuplicateCatalog {
    groups: BTreeMap<String, Vec<AltEntry>>,
}

impl DuplicateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a duplicate group. Groups without at least one alternate are
    /// not duplicates and are ignored.
    pub fn insert_group(&mut self, canonical: String, alternates: Vec<AltEntry>) {
        if !alternates.is_empty() {
            self.groups.insert(canonical, alternates);
        }
    }

    pub fn remove(&mut self, canonical: &str) -> Option<Vec<AltEntry>> {
        self.groups.remove(canonical)
    }

    pub fn get(&self, canonical: &str) -> Option<&Vec<AltEntry>> {
        self.groups.get(canonical)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<AltEntry>)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Canonical keys in iteration order. Used to drive resolution without
    /// holding a borrow across catalog mutations.
    pub fn canonicals(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    fn check_shape(self, path: &Path) -> Result<Self> {
        if let Some(canonical) = self
            .groups
            .iter()
            .find_map(|(c, alts)| alts.is_empty().then_some(c))
        {
            return Err(Error::CatalogFormat {
                path: path.to_path_buf(),
                reason: format!("entry '{canonical}' has no alternates"),
            });
        }
        Ok(self)
    }
}

/// Durable storage for a [`DuplicateCatalog`] at a fixed location.
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the catalog, replacing any prior content. The document is
    /// written to a temporary sibling and renamed into place, so a crash
    /// mid-write never leaves a truncated file that loads as a valid
    /// catalog.
    pub fn save(&self, catalog: &DuplicateCatalog) -> Result<()> {
        let io_err = |source| Error::CatalogIo {
            path: self.path.clone(),
            source,
        };

        let tmp = self.path.with_extension("tmp");
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, catalog).map_err(|e| Error::CatalogIo {
            path: self.path.clone(),
            source: e.into(),
        })?;
        writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!(
            "saved catalog with {} groups to {}",
            catalog.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Deserialize the catalog. A document that does not parse as a mapping
    /// of canonical path to a non-empty alternate list is a fatal
    /// [`Error::CatalogFormat`]; no partial catalog is returned.
    pub fn load(&self) -> Result<DuplicateCatalog> {
        let file = File::open(&self.path).map_err(|source| Error::CatalogIo {
            path: self.path.clone(),
            source,
        })?;
        let reader = BufReader::new(file);
        let catalog: DuplicateCatalog =
            serde_json::from_reader(reader).map_err(|e| Error::CatalogFormat {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        catalog.check_shape(&self.path)
    }

    /// Remove the given resolved canonical entries and persist the result.
    pub fn prune(&self, catalog: &mut DuplicateCatalog, resolved: &[String]) -> Result<()> {
        for canonical in resolved {
            catalog.remove(canonical);
        }
        self.save(catalog)
    }
}
