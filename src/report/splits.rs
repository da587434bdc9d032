//! Recent chunk split activity
//!
//! Buckets split events from the change log by hour, namespace and shard
//! over the 24 hours preceding the snapshot's reference time.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mongodb::bson;
use serde::Serialize;
use tracing::info;

use crate::client::{Filter, MetadataStoreExt, Query};
use crate::cluster::records::CHANGELOG;
use crate::cluster::{resolve_reference_time, ActivityEvent};
use crate::utils::time::{format_hour, hour_bucket};
use crate::utils::Result;

/// Lookback window, anchored on the snapshot reference time
pub const SPLIT_WINDOW_HOURS: i64 = 24;

/// Split events per hour for the lookback window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitActivityReport {
    /// Most recent hour first
    #[serde(rename = "last 24 hours")]
    pub hours: Vec<HourSplits>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSplits {
    /// Start of the UTC hour
    pub hour: String,
    pub total: u64,
    /// Ordered by namespace, then shard
    pub splits: Vec<SplitCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitCount {
    pub namespace: String,
    pub shard: String,
    pub count: u64,
}

/// Builds a `SplitActivityReport` from a metadata store
pub struct SplitActivityReportBuilder<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: MetadataStoreExt + ?Sized> SplitActivityReportBuilder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn build(&self) -> Result<SplitActivityReport> {
        let reference = resolve_reference_time(self.store)?;
        let since = bson::DateTime::from_millis(
            reference.timestamp_millis() - SPLIT_WINDOW_HOURS * 3_600_000,
        );

        let events = self
            .store
            .find(CHANGELOG, &split_query(since))?
            .iter()
            .map(|d| ActivityEvent::from_document(CHANGELOG, d))
            .collect::<Result<Vec<_>>>()?;

        let report = bucket_splits(&events);
        info!(
            "split report: {} events in {} hours since {}",
            events.len(),
            report.hours.len(),
            since
        );
        Ok(report)
    }
}

/// Split-like change-log events since `since`, excluding events whose
/// split number is exactly 1
pub fn split_query(since: bson::DateTime) -> Query {
    Query::filter(Filter::And(vec![
        Filter::contains("what", "split"),
        Filter::ne("details.number", 1),
        Filter::gte("time", since),
    ]))
}

/// Group events by (hour, namespace, shard) and roll the groups up per hour
pub fn bucket_splits(events: &[ActivityEvent]) -> SplitActivityReport {
    // Reverse keys iterate newest hour first; inner keys sort by namespace then shard
    let mut buckets: BTreeMap<Reverse<DateTime<Utc>>, BTreeMap<(String, String), u64>> =
        BTreeMap::new();

    for event in events {
        let namespace = event.namespace.clone().unwrap_or_default();
        let shard = event.shard.clone().unwrap_or_default();
        *buckets
            .entry(Reverse(hour_bucket(event.time)))
            .or_default()
            .entry((namespace, shard))
            .or_insert(0) += 1;
    }

    let hours = buckets
        .into_iter()
        .map(|(Reverse(hour), groups)| {
            let splits: Vec<SplitCount> = groups
                .into_iter()
                .map(|((namespace, shard), count)| SplitCount {
                    namespace,
                    shard,
                    count,
                })
                .collect();
            HourSplits {
                hour: format_hour(hour),
                total: splits.iter().map(|s| s.count).sum(),
                splits,
            }
        })
        .collect();

    SplitActivityReport { hours }
}
