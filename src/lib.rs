//! shard-report library
//!
//! Read-only diagnostic reports over the metadata database of a sharded
//! MongoDB cluster: cluster status, recent split activity and chunk
//! distribution.

pub mod client;
pub mod cluster;
pub mod config;
pub mod metrics;
pub mod report;
pub mod utils;
