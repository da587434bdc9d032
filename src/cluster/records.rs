//! Typed views of config database records
//!
//! Each record is decoded from its raw document. Required fields missing
//! from a document are a decode error; optional ones fall back to the
//! server's own defaults.

use mongodb::bson::{self, Bson, Document};

use crate::utils::{Result, StoreError};

pub const SHARDS: &str = "shards";
pub const MONGOS: &str = "mongos";
pub const COLLECTIONS: &str = "collections";
pub const CHUNKS: &str = "chunks";
pub const SETTINGS: &str = "settings";
pub const VERSION: &str = "version";
pub const CHANGELOG: &str = "changelog";
pub const ACTIONLOG: &str = "actionlog";

/// A shard registered in the cluster
#[derive(Debug, Clone, PartialEq)]
pub struct Shard {
    pub id: String,
    /// Replica set connection string
    pub host: String,
    pub state: Option<i64>,
    /// Zone tags
    pub tags: Vec<String>,
    /// Shard is being removed
    pub draining: bool,
}

impl Shard {
    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(Self {
            id: required_str(SHARDS, document, "_id")?,
            host: required_str(SHARDS, document, "host")?,
            state: optional_int(document, "state"),
            tags: document
                .get_array("tags")
                .map(|tags| {
                    tags.iter()
                        .filter_map(|t| t.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
            draining: document.get_bool("draining").unwrap_or(false),
        })
    }
}

/// A query router ("mongos") and its last heartbeat
#[derive(Debug, Clone, PartialEq)]
pub struct RouterInstance {
    /// `host:port`
    pub id: String,
    /// Software version, when the router reported one
    pub version: Option<String>,
    pub ping: bson::DateTime,
}

impl RouterInstance {
    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(Self {
            id: required_str(MONGOS, document, "_id")?,
            version: document.get_str("mongoVersion").ok().map(String::from),
            ping: required_datetime(MONGOS, document, "ping")?,
        })
    }
}

/// A sharded collection entry from the collection directory
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMeta {
    /// `db.collection`
    pub namespace: String,
    /// Unique collection id (binary UUID); absent on very old metadata
    pub uuid: Option<Bson>,
    pub shard_key: Document,
    pub unique: bool,
    /// Balancer is allowed to move this collection's chunks
    pub balancing: bool,
    /// Soft-deleted entry
    pub dropped: bool,
}

impl CollectionMeta {
    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(Self {
            namespace: required_str(COLLECTIONS, document, "_id")?,
            uuid: document.get("uuid").cloned(),
            shard_key: document.get_document("key").cloned().unwrap_or_default(),
            unique: document.get_bool("unique").unwrap_or(false),
            balancing: !document.get_bool("noBalance").unwrap_or(false),
            dropped: document.get_bool("dropped").unwrap_or(false),
        })
    }
}

/// A chunk: a contiguous shard-key range owned by one shard
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Owning collection's unique id, `Bson::Null` if the record has none
    pub collection: Bson,
    pub shard: String,
    pub jumbo: bool,
}

impl Chunk {
    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(Self {
            collection: document.get("uuid").cloned().unwrap_or(Bson::Null),
            shard: required_str(CHUNKS, document, "shard")?,
            jumbo: document.get_bool("jumbo").unwrap_or(false),
        })
    }
}

/// A change-log or action-log event
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEvent {
    pub time: bson::DateTime,
    /// Event kind (`split`, `multi-split`, `balancer.round`, ...)
    pub what: String,
    pub namespace: Option<String>,
    /// Shard that logged the event
    pub shard: Option<String>,
    pub details: Document,
}

impl ActivityEvent {
    pub fn from_document(collection: &str, document: &Document) -> Result<Self> {
        let details = document.get_document("details").cloned().unwrap_or_default();
        let shard = document
            .get_str("shard")
            .or_else(|_| details.get_str("shard"))
            .ok()
            .map(String::from);

        Ok(Self {
            time: required_datetime(collection, document, "time")?,
            what: required_str(collection, document, "what")?,
            namespace: document.get_str("ns").ok().map(String::from),
            shard,
            details,
        })
    }

    /// Balancer round reported an error
    pub fn error_occurred(&self) -> bool {
        // the server spells it "errorOccured"
        self.details
            .get_bool("errorOccured")
            .or_else(|_| self.details.get_bool("errorOccurred"))
            .unwrap_or(false)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.details.get_str("errmsg").ok()
    }
}

fn required_str(collection: &str, document: &Document, field: &str) -> Result<String> {
    document
        .get_str(field)
        .map(String::from)
        .map_err(|_| StoreError::decode(collection, format!("missing string field '{}'", field)).into())
}

fn required_datetime(collection: &str, document: &Document, field: &str) -> Result<bson::DateTime> {
    document
        .get_datetime(field)
        .copied()
        .map_err(|_| StoreError::decode(collection, format!("missing datetime field '{}'", field)).into())
}

fn optional_int(document: &Document, field: &str) -> Option<i64> {
    match document.get(field)? {
        Bson::Int32(i) => Some(*i as i64),
        Bson::Int64(i) => Some(*i),
        Bson::Double(d) => Some(*d as i64),
        _ => None,
    }
}
