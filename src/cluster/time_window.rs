//! Reference time for a metadata snapshot
//!
//! Windowed reports are anchored on the most recent activity recorded in
//! the snapshot rather than on the wall clock, so the same snapshot always
//! yields the same report.

use mongodb::bson;
use tracing::debug;

use super::records::{ACTIONLOG, CHANGELOG, MONGOS};
use crate::client::MetadataStoreExt;
use crate::utils::Result;

/// Activity sources and the datetime field each is ordered by
const ACTIVITY_SOURCES: &[(&str, &str)] = &[(CHANGELOG, "time"), (ACTIONLOG, "time"), (MONGOS, "ping")];

/// Latest activity timestamp across change-log, action-log and router pings.
///
/// Empty or missing sources contribute nothing; with no activity at all the
/// epoch is returned.
pub fn resolve_reference_time<S: MetadataStoreExt + ?Sized>(store: &S) -> Result<bson::DateTime> {
    let mut latest = bson::DateTime::from_millis(0);

    for (collection, field) in ACTIVITY_SOURCES {
        if let Some(time) = store.latest_time(collection, field)? {
            debug!("latest {}.{} = {}", collection, field, time);
            latest = latest.max(time);
        }
    }

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryStore;
    use mongodb::bson::doc;

    #[test]
    fn test_empty_store_is_epoch() {
        let store = MemoryStore::new();
        assert_eq!(
            resolve_reference_time(&store).unwrap(),
            bson::DateTime::from_millis(0)
        );
    }

    #[test]
    fn test_max_across_sources() {
        let store = MemoryStore::new()
            .with_collection(
                CHANGELOG,
                vec![doc! { "time": bson::DateTime::from_millis(5_000), "what": "split" }],
            )
            .with_collection(
                ACTIONLOG,
                vec![doc! { "time": bson::DateTime::from_millis(7_000), "what": "balancer.round" }],
            )
            .with_collection(
                MONGOS,
                vec![
                    doc! { "_id": "r1:27017", "ping": bson::DateTime::from_millis(6_000) },
                    doc! { "_id": "r2:27017", "ping": bson::DateTime::from_millis(9_000) },
                ],
            );
        assert_eq!(
            resolve_reference_time(&store).unwrap(),
            bson::DateTime::from_millis(9_000)
        );
    }

    #[test]
    fn test_single_source_present() {
        let store = MemoryStore::new().with_collection(
            CHANGELOG,
            vec![doc! { "time": bson::DateTime::from_millis(1_234), "what": "split" }],
        );
        assert_eq!(
            resolve_reference_time(&store).unwrap(),
            bson::DateTime::from_millis(1_234)
        );
    }
}
