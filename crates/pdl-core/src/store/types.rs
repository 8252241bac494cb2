//! Types used by the asset store.

use crate::runner::MediaKind;

/// Asset identifier (the library's local identifier).
pub type AssetId = String;

/// Where an asset comes from in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    UserLibrary,
    CloudShared,
    ItunesSynced,
    Unknown,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::UserLibrary => "user_library",
            SourceKind::CloudShared => "cloud_shared",
            SourceKind::ItunesSynced => "itunes_synced",
            SourceKind::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "user_library" => SourceKind::UserLibrary,
            "cloud_shared" => SourceKind::CloudShared,
            "itunes_synced" => SourceKind::ItunesSynced,
            _ => SourceKind::Unknown,
        }
    }

    /// Human-readable label for the status table.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::UserLibrary => "Photo Library",
            SourceKind::CloudShared => "Cloud Sharing",
            SourceKind::ItunesSynced => "iTunes Synced",
            SourceKind::Unknown => "Unknown Source",
        }
    }
}

/// Fields written when an asset is (re)discovered in the library.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub local_identifier: AssetId,
    pub media_kind: MediaKind,
    pub source: SourceKind,
    /// Unix seconds.
    pub creation_date: i64,
}

/// Persisted progress record for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub local_identifier: AssetId,
    pub media_kind: MediaKind,
    pub source: SourceKind,
    /// Unix seconds.
    pub creation_date: i64,
    pub download_progress: f64,
    pub failed_to_download: bool,
    pub updated_at: i64,
}

impl AssetRecord {
    pub fn is_complete(&self) -> bool {
        self.download_progress >= 1.0
    }

    /// Display state of the asset: failed, or in progress with a fraction.
    pub fn state(&self) -> AssetState {
        if self.failed_to_download {
            AssetState::Failed
        } else {
            AssetState::InProgress(self.download_progress)
        }
    }
}

/// What the status view shows for an asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssetState {
    InProgress(f64),
    Failed,
}
