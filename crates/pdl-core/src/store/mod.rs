//! Persistent asset progress store (SQLite via sqlx).
//!
//! One row per asset: creation date, media kind and source, download
//! progress in `0.0..=1.0`, and whether the last attempt failed.

mod assets;
pub mod db;
pub mod types;

pub use db::*;
pub use types::*;
