//! Cluster status report
//!
//! Routers, balancer health, the collection directory, shards and the time
//! span covered by the change and action logs.

use std::collections::BTreeMap;

use chrono::{FixedOffset, Offset, Utc};
use clap::ValueEnum;
use mongodb::bson::{self, Bson, Document};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::section::{Report, ReportSection};
use crate::client::{Filter, MetadataStoreExt, Query, SortOrder};
use crate::cluster::records::{ACTIONLOG, CHANGELOG, MONGOS, SHARDS, VERSION};
use crate::cluster::{ActivityEvent, CollectionDirectory, RouterInstance, SettingsView, Shard};
use crate::utils::time::{format_duration_millis, format_in_offset, format_utc};
use crate::utils::Result;

/// Routers whose last ping is within this window of the newest ping are active
pub const ACTIVE_ROUTER_WINDOW_MS: i64 = 60_000;

/// Number of most recent balancer rounds inspected for failures
pub const BALANCER_ROUNDS: i64 = 5;

const BALANCER_ROUND: &str = "balancer.round";
const UNKNOWN_VERSION: &str = "unknown";

/// Top-level sections of the status report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusSection {
    Coverage,
    Version,
    Shards,
    Collections,
    Mongos,
    Autosplit,
    Balancer,
}

impl ReportSection for StatusSection {
    fn key(self) -> &'static str {
        match self {
            StatusSection::Coverage => "coverage",
            StatusSection::Version => "version",
            StatusSection::Shards => "shards",
            StatusSection::Collections => "collections",
            StatusSection::Mongos => "mongos",
            StatusSection::Autosplit => "autosplit",
            StatusSection::Balancer => "balancer",
        }
    }

    fn all() -> &'static [Self] {
        &[
            StatusSection::Coverage,
            StatusSection::Version,
            StatusSection::Shards,
            StatusSection::Collections,
            StatusSection::Mongos,
            StatusSection::Autosplit,
            StatusSection::Balancer,
        ]
    }
}

/// Composed status report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// The cluster's version record, as stored
    pub version: Value,
    pub shards: Vec<ShardSummary>,
    pub collections: CollectionsSummary,
    /// Active routers per software version
    pub mongos: BTreeMap<String, u64>,
    pub autosplit: Value,
    pub balancer: BalancerStatus,
    pub coverage: Coverage,
}

impl Report for StatusReport {
    type Section = StatusSection;
    const NAME: &'static str = "status";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardSummary {
    pub id: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<i64>,
    pub tags: Vec<String>,
    pub draining: bool,
}

impl From<Shard> for ShardSummary {
    fn from(shard: Shard) -> Self {
        Self {
            id: shard.id,
            host: shard.host,
            state: shard.state,
            tags: shard.tags,
            draining: shard.draining,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionsSummary {
    #[serde(rename = "total number")]
    pub total: usize,
    pub list: BTreeMap<String, CollectionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
    #[serde(rename = "shardKey")]
    pub shard_key: Value,
    pub unique: bool,
    pub balancing: bool,
}

/// Balancer state as far as static metadata can tell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancerStatus {
    pub enabled: bool,
    pub running: RunningState,
    #[serde(rename = "failed attempts in last 5 rounds")]
    pub failed_attempts: FailedAttempts,
    #[serde(rename = "chunk size (MB)", skip_serializing_if = "Option::is_none")]
    pub chunk_size_mb: Option<i64>,
}

/// Whether a balancer round is in progress.
///
/// Nothing in the config database records this, so it is always unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunningState {
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAttempts {
    pub count: usize,
    pub attempts: Vec<FailedAttempt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAttempt {
    pub time: String,
    pub error: Option<String>,
}

/// Time span covered by each activity log; a log without records is omitted
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Coverage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<CoverageWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actionlog: Option<CoverageWindow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageWindow {
    pub start: String,
    pub end: String,
    pub duration: String,
}

impl CoverageWindow {
    pub fn new(start: bson::DateTime, end: bson::DateTime) -> Self {
        Self {
            start: format_utc(start),
            end: format_utc(end),
            duration: format_duration_millis(end.timestamp_millis() - start.timestamp_millis()),
        }
    }
}

/// Builds a `StatusReport` from a metadata store
pub struct StatusReportBuilder<'a, S: ?Sized> {
    store: &'a S,
    display_offset: FixedOffset,
}

impl<'a, S: MetadataStoreExt + ?Sized> StatusReportBuilder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            display_offset: Utc.fix(),
        }
    }

    /// Offset used to render balancer attempt times
    pub fn display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }

    pub fn build(&self) -> Result<StatusReport> {
        let settings = SettingsView::load(self.store)?;
        let directory = CollectionDirectory::load(self.store)?;

        let report = StatusReport {
            version: self.version()?,
            shards: self.shards()?,
            collections: collections_summary(&directory),
            mongos: self.mongos()?,
            autosplit: document_to_json(&settings.autosplit),
            balancer: self.balancer(&settings)?,
            coverage: self.coverage()?,
        };

        info!(
            "status report: {} shards, {} collections, {} active routers",
            report.shards.len(),
            report.collections.total,
            report.mongos.values().sum::<u64>()
        );
        debug!(
            "balancer enabled: {}, autosplit enabled: {}",
            report.balancer.enabled,
            settings.autosplit_enabled()
        );
        Ok(report)
    }

    fn version(&self) -> Result<Value> {
        Ok(self
            .store
            .find(VERSION, &Query::all().limit(1))?
            .first()
            .map(document_to_json)
            .unwrap_or(Value::Null))
    }

    fn shards(&self) -> Result<Vec<ShardSummary>> {
        self.store
            .find_all(SHARDS)?
            .iter()
            .map(|d| Shard::from_document(d).map(ShardSummary::from))
            .collect()
    }

    fn mongos(&self) -> Result<BTreeMap<String, u64>> {
        let routers = self
            .store
            .find_all(MONGOS)?
            .iter()
            .map(RouterInstance::from_document)
            .collect::<Result<Vec<_>>>()?;
        Ok(active_router_histogram(&routers))
    }

    fn balancer(&self, settings: &SettingsView) -> Result<BalancerStatus> {
        let query = Query::filter(Filter::eq("what", BALANCER_ROUND))
            .sort_by("time", SortOrder::Descending)
            .limit(BALANCER_ROUNDS);
        let rounds = self
            .store
            .find(ACTIONLOG, &query)?
            .iter()
            .map(|d| ActivityEvent::from_document(ACTIONLOG, d))
            .collect::<Result<Vec<_>>>()?;

        Ok(BalancerStatus {
            enabled: settings.balancer_enabled(),
            running: RunningState::Unknown,
            failed_attempts: failed_attempts(&rounds, self.display_offset),
            chunk_size_mb: settings.chunk_size_mb,
        })
    }

    fn coverage(&self) -> Result<Coverage> {
        Ok(Coverage {
            changelog: self.coverage_window(CHANGELOG)?,
            actionlog: self.coverage_window(ACTIONLOG)?,
        })
    }

    fn coverage_window(&self, collection: &str) -> Result<Option<CoverageWindow>> {
        let start = self.store.earliest_time(collection, "time")?;
        let end = self.store.latest_time(collection, "time")?;
        Ok(match (start, end) {
            (Some(start), Some(end)) => Some(CoverageWindow::new(start, end)),
            _ => None,
        })
    }
}

/// Count active routers per version.
///
/// A router is active when its ping is no older than
/// `ACTIVE_ROUTER_WINDOW_MS` before the newest ping among all routers.
pub fn active_router_histogram(routers: &[RouterInstance]) -> BTreeMap<String, u64> {
    let mut histogram = BTreeMap::new();
    let Some(newest) = routers.iter().map(|r| r.ping.timestamp_millis()).max() else {
        return histogram;
    };
    let threshold = newest - ACTIVE_ROUTER_WINDOW_MS;

    for router in routers {
        if router.ping.timestamp_millis() < threshold {
            continue;
        }
        let version = match &router.version {
            Some(v) => v.clone(),
            None => {
                warn!("router {} reported no version", router.id);
                UNKNOWN_VERSION.to_string()
            }
        };
        *histogram.entry(version).or_insert(0) += 1;
    }

    histogram
}

/// Failed rounds among `rounds`, which must already be the most recent
/// balancer rounds in descending time order
pub fn failed_attempts(rounds: &[ActivityEvent], offset: FixedOffset) -> FailedAttempts {
    let attempts: Vec<FailedAttempt> = rounds
        .iter()
        .filter(|r| r.error_occurred())
        .map(|r| FailedAttempt {
            time: format_in_offset(r.time, offset),
            error: r.error_message().map(String::from),
        })
        .collect();

    FailedAttempts {
        count: attempts.len(),
        attempts,
    }
}

fn collections_summary(directory: &CollectionDirectory) -> CollectionsSummary {
    let list = directory
        .live()
        .iter()
        .map(|c| {
            (
                c.namespace.clone(),
                CollectionSummary {
                    shard_key: document_to_json(&c.shard_key),
                    unique: c.unique,
                    balancing: c.balancing,
                },
            )
        })
        .collect();

    CollectionsSummary {
        total: directory.len(),
        list,
    }
}

pub(crate) fn document_to_json(document: &Document) -> Value {
    Bson::Document(document.clone()).into_relaxed_extjson()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryStore;
    use crate::cluster::records::{COLLECTIONS, SETTINGS};
    use crate::report::select_section;
    use mongodb::bson::{doc, Uuid};

    const BASE: i64 = 1_709_290_800_000; // 2024-03-01T11:00:00Z

    fn at(offset_ms: i64) -> bson::DateTime {
        bson::DateTime::from_millis(BASE + offset_ms)
    }

    fn router(id: &str, version: Option<&str>, ping_offset_ms: i64) -> RouterInstance {
        RouterInstance {
            id: id.to_string(),
            version: version.map(String::from),
            ping: at(ping_offset_ms),
        }
    }

    fn round(offset_ms: i64, error: Option<&str>) -> Document {
        match error {
            Some(msg) => doc! {
                "time": at(offset_ms),
                "what": BALANCER_ROUND,
                "details": { "errorOccured": true, "errmsg": msg },
            },
            None => doc! {
                "time": at(offset_ms),
                "what": BALANCER_ROUND,
                "details": { "errorOccured": false },
            },
        }
    }

    fn cluster() -> MemoryStore {
        MemoryStore::new()
            .with_collection(
                VERSION,
                vec![doc! { "_id": 1, "minCompatibleVersion": 5, "currentVersion": 6 }],
            )
            .with_collection(
                SHARDS,
                vec![
                    doc! { "_id": "s1", "host": "rs1/a:27018", "state": 1 },
                    doc! { "_id": "s2", "host": "rs2/b:27018", "state": 1, "tags": ["eu"] },
                ],
            )
            .with_collection(
                COLLECTIONS,
                vec![
                    doc! { "_id": "app.users", "uuid": Uuid::from_bytes([1; 16]), "key": { "uid": 1 }, "unique": true },
                    doc! { "_id": "app.logs", "uuid": Uuid::from_bytes([2; 16]), "key": { "ts": "hashed" }, "noBalance": true },
                    doc! { "_id": "app.old", "uuid": Uuid::from_bytes([3; 16]), "key": { "x": 1 }, "dropped": true },
                ],
            )
            .with_collection(
                MONGOS,
                vec![
                    doc! { "_id": "r1:27017", "ping": at(0), "mongoVersion": "7.0.2" },
                    doc! { "_id": "r2:27017", "ping": at(-30_000), "mongoVersion": "7.0.2" },
                    doc! { "_id": "r3:27017", "ping": at(-60_000), "mongoVersion": "6.0.9" },
                    doc! { "_id": "r4:27017", "ping": at(-60_001), "mongoVersion": "6.0.9" },
                ],
            )
            .with_collection(
                ACTIONLOG,
                vec![
                    round(-6_000, Some("too old to count")),
                    round(-5_000, None),
                    round(-4_000, Some("could not acquire lock")),
                    round(-3_000, None),
                    round(-2_000, None),
                    round(-1_000, Some("shard s2 unreachable")),
                ],
            )
            .with_collection(
                SETTINGS,
                vec![doc! { "_id": "balancer", "stopped": true }],
            )
    }

    #[test]
    fn test_full_status_report() {
        let store = cluster();
        let report = StatusReportBuilder::new(&store).build().unwrap();

        assert_eq!(report.version["currentVersion"], 6);
        assert_eq!(report.shards.len(), 2);
        assert_eq!(report.shards[1].tags, vec!["eu".to_string()]);

        assert_eq!(report.collections.total, 2);
        assert!(report.collections.list.contains_key("app.users"));
        assert!(!report.collections.list.contains_key("app.old"));
        let logs = &report.collections.list["app.logs"];
        assert!(!logs.balancing);
        assert_eq!(logs.shard_key, serde_json::json!({ "ts": "hashed" }));

        assert_eq!(report.mongos.get("7.0.2"), Some(&2));
        assert_eq!(report.mongos.get("6.0.9"), Some(&1));

        assert_eq!(report.autosplit, serde_json::json!({ "enabled": true }));
        assert!(!report.balancer.enabled);
        assert_eq!(report.balancer.running, RunningState::Unknown);

        // five most recent rounds: -5000..-1000; two of them failed
        let failed = &report.balancer.failed_attempts;
        assert_eq!(failed.count, 2);
        assert_eq!(failed.attempts[0].time, "2024-03-01T10:59:59+00:00");
        assert_eq!(failed.attempts[0].error.as_deref(), Some("shard s2 unreachable"));
        assert_eq!(failed.attempts[1].error.as_deref(), Some("could not acquire lock"));

        assert!(report.coverage.changelog.is_none());
        let actionlog = report.coverage.actionlog.as_ref().unwrap();
        assert_eq!(actionlog.start, "2024-03-01T10:59:54Z");
        assert_eq!(actionlog.end, "2024-03-01T10:59:59Z");
        assert_eq!(actionlog.duration, "0d 00:00:05");
    }

    #[test]
    fn test_serialized_shape() {
        let store = cluster();
        let report = StatusReportBuilder::new(&store).build().unwrap();
        let value = select_section(&report, None).unwrap();

        assert_eq!(value["collections"]["total number"], 2);
        assert_eq!(value["balancer"]["running"], "unknown");
        assert_eq!(
            value["balancer"]["failed attempts in last 5 rounds"]["count"],
            2
        );
        // no change-log records: key absent, not null
        assert!(value["coverage"].as_object().unwrap().get("changelog").is_none());
        assert!(value["coverage"].get("actionlog").is_some());
    }

    #[test]
    fn test_every_section_selectable() {
        let store = cluster();
        let report = StatusReportBuilder::new(&store).build().unwrap();
        let whole = select_section(&report, None).unwrap();
        let keys: Vec<&String> = whole.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), StatusSection::all().len());

        for section in StatusSection::all() {
            let value = select_section(&report, Some(*section)).unwrap();
            assert_eq!(value, whole[section.key()]);
        }
    }

    #[test]
    fn test_empty_config_database() {
        let store = MemoryStore::new();
        let report = StatusReportBuilder::new(&store).build().unwrap();
        assert_eq!(report.version, Value::Null);
        assert!(report.shards.is_empty());
        assert_eq!(report.collections.total, 0);
        assert!(report.mongos.is_empty());
        assert_eq!(report.autosplit, serde_json::json!({ "enabled": true }));
        assert!(report.balancer.enabled);
        assert_eq!(report.balancer.failed_attempts.count, 0);
        assert_eq!(report.coverage, Coverage::default());
    }

    #[test]
    fn test_build_is_idempotent() {
        let store = cluster();
        let builder = StatusReportBuilder::new(&store);
        let first = serde_json::to_string(&builder.build().unwrap()).unwrap();
        let second = serde_json::to_string(&builder.build().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_router_without_version() {
        let routers = vec![router("r1", None, 0), router("r2", Some("7.0.2"), -10)];
        let histogram = active_router_histogram(&routers);
        assert_eq!(histogram.get("unknown"), Some(&1));
        assert_eq!(histogram.get("7.0.2"), Some(&1));
    }

    #[test]
    fn test_active_routers_property() {
        let mut rng = fastrand::Rng::with_seed(7);
        let versions = ["5.0.1", "6.0.9", "7.0.2"];

        for _ in 0..200 {
            let count = rng.usize(0..20);
            let routers: Vec<RouterInstance> = (0..count)
                .map(|i| {
                    router(
                        &format!("r{}", i),
                        Some(versions[rng.usize(0..versions.len())]),
                        -rng.i64(0..180_000),
                    )
                })
                .collect();

            let histogram = active_router_histogram(&routers);
            let expected = match routers.iter().map(|r| r.ping.timestamp_millis()).max() {
                Some(newest) => routers
                    .iter()
                    .filter(|r| r.ping.timestamp_millis() >= newest - ACTIVE_ROUTER_WINDOW_MS)
                    .count() as u64,
                None => 0,
            };
            assert_eq!(histogram.values().sum::<u64>(), expected);
        }
    }

    #[test]
    fn test_failed_attempts_property() {
        let mut rng = fastrand::Rng::with_seed(11);

        for _ in 0..200 {
            let available = rng.usize(0..5);
            let mut rounds = Vec::new();
            let mut errors = 0;
            for i in 0..available {
                let failed = rng.bool();
                if failed {
                    errors += 1;
                }
                rounds.push(round(i as i64 * 1_000, failed.then_some("failed")));
            }
            let store = MemoryStore::new().with_collection(ACTIONLOG, rounds);

            let report = StatusReportBuilder::new(&store).build().unwrap();
            let failed = &report.balancer.failed_attempts;
            assert!(failed.count <= available);
            assert_eq!(failed.count, errors);
            assert!(failed.attempts.iter().all(|a| a.error.as_deref() == Some("failed")));
        }
    }

    #[test]
    fn test_failed_attempt_offset() {
        let rounds = vec![ActivityEvent::from_document(ACTIONLOG, &round(0, Some("x"))).unwrap()];
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let failed = failed_attempts(&rounds, offset);
        assert_eq!(failed.attempts[0].time, "2024-03-01T06:00:00-05:00");
    }
}
