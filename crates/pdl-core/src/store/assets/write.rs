//! Asset write operations: upsert, progress, failure, completion.

use anyhow::Result;

use super::super::db::{unix_timestamp, AssetStore};
use super::super::types::NewAsset;

impl AssetStore {
    /// Insert a newly discovered asset, or refresh its library metadata.
    ///
    /// Progress and failure state of an existing row are left untouched.
    pub async fn upsert_asset(&self, asset: &NewAsset) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            INSERT INTO assets (
                local_identifier, media_kind, source, creation_date,
                download_progress, failed_to_download, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0.0, 0, ?5)
            ON CONFLICT(local_identifier) DO UPDATE SET
                media_kind = excluded.media_kind,
                source = excluded.source,
                creation_date = excluded.creation_date
            "#,
        )
        .bind(&asset.local_identifier)
        .bind(asset.media_kind.as_str())
        .bind(asset.source.as_str())
        .bind(asset.creation_date)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record download progress (clamped to `0.0..=1.0`).
    pub async fn set_progress(&self, id: &str, progress: f64) -> Result<()> {
        let now = unix_timestamp();
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        sqlx::query(
            r#"
            UPDATE assets
            SET download_progress = ?1,
                updated_at = ?2
            WHERE local_identifier = ?3
            "#,
        )
        .bind(progress)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark the asset failed and reset its progress to zero.
    pub async fn mark_failed(&self, id: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE assets
            SET failed_to_download = 1,
                download_progress = 0.0,
                updated_at = ?1
            WHERE local_identifier = ?2
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark every requested version of the asset as downloaded.
    pub async fn mark_completed(&self, id: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE assets
            SET download_progress = 1.0,
                failed_to_download = 0,
                updated_at = ?1
            WHERE local_identifier = ?2
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Clear the failure flag on every failed asset so the next run retries it.
    /// Returns the number of assets reset.
    pub async fn reset_failed(&self) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE assets
            SET failed_to_download = 0,
                download_progress = 0.0,
                updated_at = ?1
            WHERE failed_to_download != 0
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Permanently remove an asset row.
    pub async fn remove_asset(&self, id: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM assets
            WHERE local_identifier = ?1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
