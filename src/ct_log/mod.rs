// src/ct_log/mod.rs
pub mod client;
pub mod log_list;
pub mod types;

pub use client::{add_chain, build_http_client};
pub use log_list::{LogList, DEFAULT_LOG_LIST_URL};
pub use types::{CtLog, LogId, LogListV3};
