//! `pdl reset-failed` – clear failure flags so the next run retries those assets.

use anyhow::Result;
use pdl_core::store::AssetStore;

pub async fn run_reset_failed(store: &AssetStore) -> Result<()> {
    let n = store.reset_failed().await?;
    println!("Reset {n} failed asset(s).");
    Ok(())
}
