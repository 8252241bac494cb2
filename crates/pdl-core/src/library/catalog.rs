//! Catalog format and enumeration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::error::LibraryError;
use crate::runner::{MediaKind, Version};
use crate::store::SourceKind;

/// File name of the catalog inside a library directory.
pub const CATALOG_FILE: &str = "catalog.json";

/// Parsed `catalog.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub assets: Vec<CatalogAsset>,
}

/// One asset entry in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAsset {
    /// Library-local identifier (may contain `/`).
    pub id: String,
    /// `image`, `video`, `audio`; anything else is treated as unknown.
    pub media_type: String,
    pub creation_date: DateTime<Utc>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub source: Option<String>,
    /// Version name → file path, relative to the library root unless absolute.
    #[serde(default)]
    pub versions: BTreeMap<String, PathBuf>,
}

impl CatalogAsset {
    pub fn kind(&self) -> MediaKind {
        MediaKind::parse(&self.media_type)
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source
            .as_deref()
            .map(SourceKind::parse)
            .unwrap_or_default()
    }

    /// Path of `version` as listed in the catalog.
    ///
    /// An unedited asset has no separate unadjusted/original files; those
    /// fall back to `current`. A missing `current` yields `None`.
    pub fn version_path(&self, version: Version) -> Option<&Path> {
        self.versions
            .get(version.as_str())
            .or_else(|| match version {
                Version::Current => None,
                Version::Unadjusted | Version::Original => {
                    self.versions.get(Version::Current.as_str())
                }
            })
            .map(PathBuf::as_path)
    }
}

/// Filters applied when enumerating the catalog.
#[derive(Debug, Clone, Default)]
pub struct EnumerateOptions {
    /// Only assets created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Include assets flagged hidden.
    pub include_hidden: bool,
}

/// A loaded library directory.
#[derive(Debug, Clone)]
pub struct AssetLibrary {
    root: PathBuf,
    catalog: Catalog,
}

impl AssetLibrary {
    /// Load `<root>/catalog.json`. Rejects empty or duplicate asset ids.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let root = root.as_ref().to_path_buf();
        let path = root.join(CATALOG_FILE);
        let data = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| LibraryError::Read {
                path: path.clone(),
                source,
            })?;
        let catalog: Catalog =
            serde_json::from_str(&data).map_err(|source| LibraryError::Parse { path, source })?;
        Self::from_catalog(root, catalog)
    }

    /// Build a library from an in-memory catalog.
    pub fn from_catalog(root: impl Into<PathBuf>, catalog: Catalog) -> Result<Self, LibraryError> {
        let mut seen = HashSet::new();
        for asset in &catalog.assets {
            if asset.id.is_empty() {
                return Err(LibraryError::EmptyId);
            }
            if !seen.insert(asset.id.as_str()) {
                return Err(LibraryError::DuplicateId(asset.id.clone()));
            }
        }
        tracing::debug!(assets = catalog.assets.len(), "library catalog loaded");
        Ok(Self {
            root: root.into(),
            catalog,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.catalog.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.assets.is_empty()
    }

    /// Eligible assets, oldest creation date first (ties keep catalog order).
    pub fn enumerate(&self, opts: &EnumerateOptions) -> Vec<&CatalogAsset> {
        let mut out: Vec<&CatalogAsset> = self
            .catalog
            .assets
            .iter()
            .filter(|a| opts.include_hidden || !a.hidden)
            .filter(|a| opts.since.map_or(true, |since| a.creation_date >= since))
            .collect();
        out.sort_by_key(|a| a.creation_date);
        out
    }

    /// Resolve a catalog path against the library root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, day: u32, hidden: bool) -> CatalogAsset {
        CatalogAsset {
            id: id.to_string(),
            media_type: "image".to_string(),
            creation_date: Utc.with_ymd_and_hms(2018, 1, day, 12, 0, 0).unwrap(),
            hidden,
            source: None,
            versions: BTreeMap::from([("current".to_string(), PathBuf::from(format!("{id}.jpg")))]),
        }
    }

    fn library(assets: Vec<CatalogAsset>) -> AssetLibrary {
        AssetLibrary::from_catalog("/lib", Catalog { assets }).unwrap()
    }

    #[test]
    fn enumerate_sorts_by_creation_date() {
        let lib = library(vec![entry("c", 3, false), entry("a", 1, false), entry("b", 2, false)]);
        let ids: Vec<&str> = lib
            .enumerate(&EnumerateOptions {
                since: None,
                include_hidden: true,
            })
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn enumerate_applies_since_and_hidden() {
        let lib = library(vec![entry("a", 1, false), entry("b", 2, true), entry("c", 3, false)]);
        let opts = EnumerateOptions {
            since: Some(Utc.with_ymd_and_hms(2018, 1, 2, 0, 0, 0).unwrap()),
            include_hidden: false,
        };
        let ids: Vec<&str> = lib.enumerate(&opts).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn duplicate_and_empty_ids_rejected() {
        let dup = AssetLibrary::from_catalog(
            "/lib",
            Catalog {
                assets: vec![entry("a", 1, false), entry("a", 2, false)],
            },
        );
        assert!(matches!(dup, Err(LibraryError::DuplicateId(id)) if id == "a"));
        let empty = AssetLibrary::from_catalog(
            "/lib",
            Catalog {
                assets: vec![entry("", 1, false)],
            },
        );
        assert!(matches!(empty, Err(LibraryError::EmptyId)));
    }

    #[test]
    fn version_path_falls_back_to_current() {
        let mut a = entry("a", 1, false);
        assert_eq!(a.version_path(Version::Original), Some(Path::new("a.jpg")));
        a.versions
            .insert("original".to_string(), PathBuf::from("a.heic"));
        assert_eq!(a.version_path(Version::Original), Some(Path::new("a.heic")));
        a.versions.clear();
        assert_eq!(a.version_path(Version::Unadjusted), None);
    }

    #[test]
    fn parses_catalog_json() {
        let json = r#"{
            "assets": [
                {"id": "X/L0/001", "media_type": "video", "creation_date": "2018-01-12T08:00:00Z",
                 "source": "cloud_shared", "versions": {"current": "x.mov"}},
                {"id": "Y", "media_type": "livePhoto", "creation_date": "2018-01-13T08:00:00Z"}
            ]
        }"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.assets[0].kind(), MediaKind::Video);
        assert_eq!(catalog.assets[0].source_kind(), SourceKind::CloudShared);
        assert_eq!(catalog.assets[1].kind(), MediaKind::Unknown);
        assert_eq!(catalog.assets[1].source_kind(), SourceKind::UserLibrary);
        assert!(!catalog.assets[1].hidden);
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let lib = library(vec![]);
        assert_eq!(lib.resolve(Path::new("x.jpg")), PathBuf::from("/lib/x.jpg"));
        assert_eq!(lib.resolve(Path::new("/abs/y.jpg")), PathBuf::from("/abs/y.jpg"));
    }
}
