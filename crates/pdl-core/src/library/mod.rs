//! Asset library: the job source and the persistence side of a run.
//!
//! A library is a directory with a `catalog.json` describing each asset and
//! where each of its versions lives. Planning a run enumerates the catalog,
//! registers assets in the store, and builds one runner job per asset whose
//! sub-tasks copy every requested version into the destination directory.

mod catalog;
mod error;
mod paths;
mod persist;
mod plan;
mod transfer;

pub use catalog::{AssetLibrary, Catalog, CatalogAsset, EnumerateOptions, CATALOG_FILE};
pub use error::LibraryError;
pub use paths::{asset_dir_name, version_file_name};
pub use persist::{run_persistence_loop, ChannelDelegate, PersistSummary, RunEvent, RunStats};
pub use plan::{build_jobs, plan_run, PlanOptions, RunPlan};
pub use transfer::CopyTransfer;
