pub mod config;
pub mod logging;

pub mod control;
pub mod library;
pub mod runner;
pub mod store;
