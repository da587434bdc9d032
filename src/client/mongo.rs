//! MongoDB-backed metadata store
//!
//! Wraps the async driver in a private tokio runtime so the report
//! builders can stay synchronous.

use std::time::Duration;

use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::metadata_store::{MetadataStore, MetadataStoreExt, Query, SIGNATURE_COLLECTIONS};
use crate::config::ReportConfig;
use crate::utils::{ReportError, Result, StoreError};

const APP_NAME: &str = "shard-report";

/// Metadata store backed by a live `config` database
pub struct MongoStore {
    /// Metadata database handle; dropped before the runtime
    database: Database,
    /// Tokio runtime driving the async client
    runtime: Runtime,
}

impl MongoStore {
    /// Connect and verify that the target database holds cluster metadata
    pub fn connect(config: &ReportConfig) -> Result<Self> {
        let runtime = Runtime::new()
            .map_err(|e| StoreError::Runtime(format!("Failed to create tokio runtime: {}", e)))?;

        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let client = runtime.block_on(async {
            let mut options = ClientOptions::parse(&config.uri)
                .await
                .map_err(|e| connect_error(&config.uri, e))?;
            options.app_name = Some(APP_NAME.to_string());
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);
            Client::with_options(options).map_err(|e| connect_error(&config.uri, e))
        })?;

        let database = client.database(&config.database);

        // Fail fast on an unreachable deployment instead of on the first report query
        runtime
            .block_on(async { database.run_command(doc! { "ping": 1 }).await })
            .map_err(|e| connect_error(&config.uri, e))?;
        info!("Connected to {} (database '{}')", config.uri, config.database);

        let store = Self { database, runtime };

        if !store.is_metadata_database()? {
            return Err(ReportError::Configuration(format!(
                "database '{}' is not a sharded cluster config database (none of {:?} found)",
                config.database, SIGNATURE_COLLECTIONS
            )));
        }

        Ok(store)
    }
}

impl MetadataStore for MongoStore {
    fn collection_names(&self) -> Result<Vec<String>> {
        let names = self
            .runtime
            .block_on(async { self.database.list_collection_names().await })
            .map_err(|e| StoreError::query("<list collections>", e))?;
        Ok(names)
    }

    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let filter = query.filter.to_document();
        debug!(
            "find {}: filter={} sort={:?} limit={:?}",
            collection, filter, query.sort, query.limit
        );

        let handle = self.database.collection::<Document>(collection);
        let documents = self
            .runtime
            .block_on(async {
                let mut find = handle.find(filter);
                if let Some(sort) = query.sort_document() {
                    find = find.sort(sort);
                }
                if let Some(projection) = query.projection_document() {
                    find = find.projection(projection);
                }
                if let Some(limit) = query.limit {
                    find = find.limit(limit);
                }
                let cursor = find.await?;
                cursor.try_collect::<Vec<Document>>().await
            })
            .map_err(|e| StoreError::query(collection, e))?;

        debug!("find {}: {} records", collection, documents.len());
        Ok(documents)
    }

    fn estimated_count(&self, collection: &str) -> Result<u64> {
        let handle = self.database.collection::<Document>(collection);
        let count = self
            .runtime
            .block_on(async { handle.estimated_document_count().await })
            .map_err(|e| StoreError::query(collection, e))?;
        Ok(count)
    }
}

fn connect_error(uri: &str, error: mongodb::error::Error) -> ReportError {
    StoreError::Connect {
        uri: uri.to_string(),
        message: error.to_string(),
    }
    .into()
}
