// src/lib.rs
// Library interface for sct-demo
pub mod augment;
pub mod cache;
pub mod certificate;
pub mod cli;
pub mod config;
pub mod ct_log;
pub mod error;
pub mod hostname;
pub mod metrics;
pub mod sct;
pub mod server;
pub mod status;
pub mod types;
pub mod watcher;

pub use error::{Error, Result};
