//! SQLite-backed asset store implementation.
//!
//! Handles connection, migrations, and timestamp helpers. Asset CRUD lives in `assets`.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed asset store.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/pdl/assets.db`.
#[derive(Clone)]
pub struct AssetStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl AssetStore {
    /// Default database location.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("pdl")?;
        Ok(xdg_dirs.get_state_home().join("pdl").join("assets.db"))
    }

    /// Open (or create) the default asset database and run migrations.
    pub async fn open_default() -> Result<Self> {
        Self::open_at(Self::default_path()?).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let store = AssetStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        // - `download_progress` is the fraction of all requested versions fetched.
        // - `failed_to_download` stays set until cleared by `reset_failed`.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assets (
                local_identifier TEXT PRIMARY KEY NOT NULL,
                media_kind TEXT NOT NULL,
                source TEXT NOT NULL,
                creation_date INTEGER NOT NULL,
                download_progress REAL NOT NULL DEFAULT 0.0,
                failed_to_download INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS assets_by_creation_date
            ON assets (creation_date);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Current time as Unix seconds (for DB timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Open an in-memory database (no disk I/O). Used by unit tests.
#[cfg(test)]
pub(crate) async fn open_memory() -> Result<AssetStore> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = AssetStore { pool };
    store.migrate().await?;
    Ok(store)
}
