//! Asset read operations: get and list.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::AssetStore;
use super::super::types::{AssetRecord, SourceKind};
use crate::runner::MediaKind;

fn record_from_row(row: &SqliteRow) -> AssetRecord {
    let kind: String = row.get("media_kind");
    let source: String = row.get("source");
    let failed: i64 = row.get("failed_to_download");
    AssetRecord {
        local_identifier: row.get("local_identifier"),
        media_kind: MediaKind::parse(&kind),
        source: SourceKind::parse(&source),
        creation_date: row.get("creation_date"),
        download_progress: row.get("download_progress"),
        failed_to_download: failed != 0,
        updated_at: row.get("updated_at"),
    }
}

impl AssetStore {
    /// Fetch one asset by local identifier.
    pub async fn get_asset(&self, id: &str) -> Result<Option<AssetRecord>> {
        let row = sqlx::query(
            r#"
            SELECT local_identifier, media_kind, source, creation_date,
                   download_progress, failed_to_download, updated_at
            FROM assets
            WHERE local_identifier = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    /// Assets not yet fully downloaded, oldest creation date first (the status view).
    pub async fn list_pending(&self) -> Result<Vec<AssetRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT local_identifier, media_kind, source, creation_date,
                   download_progress, failed_to_download, updated_at
            FROM assets
            WHERE download_progress < 1.0
            ORDER BY creation_date ASC, local_identifier ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Every known asset, oldest creation date first.
    pub async fn list_all(&self) -> Result<Vec<AssetRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT local_identifier, media_kind, source, creation_date,
                   download_progress, failed_to_download, updated_at
            FROM assets
            ORDER BY creation_date ASC, local_identifier ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    /// `(total, complete, failed)` counts for a one-line summary.
    pub async fn counts(&self) -> Result<(i64, i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN download_progress >= 1.0 THEN 1 ELSE 0 END), 0) AS complete,
                   COALESCE(SUM(CASE WHEN failed_to_download != 0 THEN 1 ELSE 0 END), 0) AS failed
            FROM assets
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((row.get("total"), row.get("complete"), row.get("failed")))
    }
}
