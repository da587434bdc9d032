//! Chunk distribution report
//!
//! Per-shard chunk counts, the collections with the most chunks and a
//! census of jumbo chunks.

use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use super::section::{Report, ReportSection};
use crate::client::{MetadataStoreExt, Query};
use crate::cluster::records::CHUNKS;
use crate::cluster::{Chunk, CollectionDirectory};
use crate::metrics::GroupCounter;
use crate::utils::Result;

/// Number of collections listed under `largest_collections`
pub const LARGEST_COLLECTIONS: usize = 5;

/// Top-level sections of the chunk report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChunkSection {
    Total,
    Shards,
    #[value(alias = "largest_collections")]
    LargestCollections,
    Jumbos,
    Imbalances,
}

impl ReportSection for ChunkSection {
    fn key(self) -> &'static str {
        match self {
            ChunkSection::Total => "total",
            ChunkSection::Shards => "shards",
            ChunkSection::LargestCollections => "largest_collections",
            ChunkSection::Jumbos => "jumbos",
            ChunkSection::Imbalances => "imbalances",
        }
    }

    fn all() -> &'static [Self] {
        &[
            ChunkSection::Total,
            ChunkSection::Shards,
            ChunkSection::LargestCollections,
            ChunkSection::Jumbos,
            ChunkSection::Imbalances,
        ]
    }
}

/// Composed chunk report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkReport {
    /// Estimated chunk count from collection metadata
    pub total: u64,
    /// Largest shard first
    pub shards: Vec<ShardChunks>,
    pub largest_collections: Vec<CollectionChunks>,
    /// namespace -> shard -> jumbo chunk count
    pub jumbos: BTreeMap<String, BTreeMap<String, u64>>,
    pub imbalances: Imbalances,
}

impl Report for ChunkReport {
    type Section = ChunkSection;
    const NAME: &'static str = "chunks";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardChunks {
    pub shard: String,
    pub chunks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionChunks {
    pub namespace: String,
    pub chunks: u64,
}

/// Placeholder for per-collection imbalance detection, which is not
/// computed; always serializes as an empty object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Imbalances {}

/// Builds a `ChunkReport` from a metadata store
pub struct ChunkReportBuilder<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: MetadataStoreExt + ?Sized> ChunkReportBuilder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn build(&self) -> Result<ChunkReport> {
        let directory = CollectionDirectory::load(self.store)?;
        let total = self.store.estimated_count(CHUNKS)?;

        let query = Query::all().project(&["uuid", "shard", "jumbo"]);
        let chunks = self
            .store
            .find(CHUNKS, &query)?
            .iter()
            .map(Chunk::from_document)
            .collect::<Result<Vec<_>>>()?;

        let report = ChunkReport {
            total,
            shards: shard_distribution(&chunks),
            largest_collections: largest_collections(&chunks, &directory, LARGEST_COLLECTIONS)?,
            jumbos: jumbo_census(&chunks, &directory)?,
            imbalances: Imbalances::default(),
        };

        info!(
            "chunk report: ~{} chunks over {} shards, {} namespaces with jumbo chunks",
            report.total,
            report.shards.len(),
            report.jumbos.len()
        );
        Ok(report)
    }
}

/// Chunks per shard, largest first; equal counts keep store order
pub fn shard_distribution(chunks: &[Chunk]) -> Vec<ShardChunks> {
    chunks
        .iter()
        .map(|c| c.shard.clone())
        .collect::<GroupCounter<String>>()
        .into_descending()
        .into_iter()
        .map(|(shard, chunks)| ShardChunks { shard, chunks })
        .collect()
}

/// The `limit` collections with the most chunks.
///
/// Chunks of soft-deleted collections are ignored; a chunk whose
/// collection id cannot be resolved fails the report.
pub fn largest_collections(
    chunks: &[Chunk],
    directory: &CollectionDirectory,
    limit: usize,
) -> Result<Vec<CollectionChunks>> {
    let mut counter = GroupCounter::new();
    for chunk in chunks {
        if let Some(namespace) = directory.resolve(&chunk.collection)? {
            counter.add(namespace);
        }
    }

    Ok(counter
        .top(limit)
        .into_iter()
        .map(|(namespace, chunks)| CollectionChunks {
            namespace: namespace.to_string(),
            chunks,
        })
        .collect())
}

/// Jumbo chunk counts per namespace and shard
pub fn jumbo_census(
    chunks: &[Chunk],
    directory: &CollectionDirectory,
) -> Result<BTreeMap<String, BTreeMap<String, u64>>> {
    let mut census: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();

    for chunk in chunks.iter().filter(|c| c.jumbo) {
        let Some(namespace) = directory.resolve(&chunk.collection)? else {
            continue;
        };
        *census
            .entry(namespace.to_string())
            .or_default()
            .entry(chunk.shard.clone())
            .or_insert(0) += 1;
    }

    Ok(census)
}
