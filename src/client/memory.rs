//! In-memory metadata store
//!
//! Holds config-database documents per collection and answers queries by
//! evaluating the `Filter` model client-side. Used by the test suite and
//! for reports over an exported snapshot.

use std::cmp::Ordering;
use std::collections::HashMap;

use mongodb::bson::Document;

use super::metadata_store::{lookup, sort_cmp, MetadataStore, Query, SortOrder};
use crate::utils::Result;

/// Snapshot of a metadata database held in process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a whole collection
    pub fn with_collection(mut self, name: &str, documents: Vec<Document>) -> Self {
        self.collections.insert(name.to_string(), documents);
        self
    }
}

impl MetadataStore for MemoryStore {
    fn collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = documents
            .iter()
            .filter(|d| query.filter.matches(d))
            .cloned()
            .collect();

        if !query.sort.is_empty() {
            // Stable: equal keys keep insertion order, like a natural-order scan
            matched.sort_by(|a, b| {
                for (field, order) in &query.sort {
                    let ordering = sort_cmp(lookup(a, field), lookup(b, field));
                    let ordering = match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = query.limit {
            // non-positive limits are not row caps on the server either
            if limit > 0 {
                matched.truncate(limit as usize);
            }
        }

        if !query.projection.is_empty() {
            for document in &mut matched {
                // `_id` is returned unless excluded, as on the server
                *document = document
                    .iter()
                    .filter(|(key, _)| *key == "_id" || query.projection.contains(*key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
            }
        }

        Ok(matched)
    }

    fn estimated_count(&self, collection: &str) -> Result<u64> {
        Ok(self
            .collections
            .get(collection)
            .map(|d| d.len() as u64)
            .unwrap_or(0))
    }
}
