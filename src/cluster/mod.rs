//! Cluster metadata model
//!
//! This module provides the typed view of a sharded cluster's config
//! database:
//! - Records for shards, routers, collections, chunks and log events
//! - The flattened settings view
//! - Collection unique id to namespace resolution
//! - The snapshot reference time used by windowed reports

pub mod directory;
pub mod records;
pub mod settings;
pub mod time_window;

pub use directory::CollectionDirectory;
pub use records::{ActivityEvent, Chunk, CollectionMeta, RouterInstance, Shard};
pub use settings::SettingsView;
pub use time_window::resolve_reference_time;
