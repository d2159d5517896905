//! pgprobe - One-shot PostgreSQL health and replication probe library.
//!
//! This library provides the probing core used by the `pgprobe` binary:
//! - `config` - connection parameter validation
//! - `model` - the metric snapshot data model
//! - `probe` - connection handling and metric collection

pub mod config;
pub mod model;
pub mod probe;
