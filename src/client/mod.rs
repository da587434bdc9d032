//! Metadata store access layer

pub mod memory;
pub mod metadata_store;
pub mod mongo;

pub use memory::MemoryStore;
pub use metadata_store::{
    Filter, MetadataStore, MetadataStoreExt, Query, SortOrder, SIGNATURE_COLLECTIONS,
};
pub use mongo::MongoStore;
