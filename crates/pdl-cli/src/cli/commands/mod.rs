//! CLI command handlers, one file per command.

mod control;
mod reset_failed;
mod run;
mod status;

pub use control::run_control;
pub use reset_failed::run_reset_failed;
pub use run::{run_downloads, RunArgs};
pub use status::run_status;

#[cfg(test)]
pub(crate) use status::{format_date, format_state};
