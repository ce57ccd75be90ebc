//! Sitechat command-line front end
//!
//! Offline index builds and ad-hoc queries against the retrieval core.

pub mod commands;
pub mod ingest;
