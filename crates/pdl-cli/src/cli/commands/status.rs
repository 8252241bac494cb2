//! `pdl status` – list assets and their download state, oldest first.

use anyhow::Result;
use chrono::DateTime;
use pdl_core::store::{AssetState, AssetStore};

pub(crate) fn format_state(state: AssetState) -> String {
    match state {
        AssetState::Failed => "failed".to_string(),
        AssetState::InProgress(p) if p >= 1.0 => "done".to_string(),
        AssetState::InProgress(p) => format!("{:.0}%", (p * 100.0).floor()),
    }
}

pub(crate) fn format_date(unix_secs: i64) -> String {
    DateTime::from_timestamp(unix_secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn run_status(store: &AssetStore, all: bool) -> Result<()> {
    let assets = if all {
        store.list_all().await?
    } else {
        store.list_pending().await?
    };

    if assets.is_empty() {
        println!("No download session.");
    } else {
        println!(
            "{:<19} {:<7} {:<14} {:<7} {}",
            "CREATED", "KIND", "SOURCE", "STATE", "ID"
        );
        for a in &assets {
            println!(
                "{:<19} {:<7} {:<14} {:<7} {}",
                format_date(a.creation_date),
                a.media_kind.as_str(),
                a.source.label(),
                format_state(a.state()),
                a.local_identifier
            );
        }
    }

    let (total, complete, failed) = store.counts().await?;
    println!("{total} asset(s): {complete} complete, {failed} failed");
    Ok(())
}
