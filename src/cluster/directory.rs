//! Collection directory: unique id to namespace resolution

use std::collections::{HashMap, HashSet};

use mongodb::bson::{spec::BinarySubtype, Bson, Uuid};
use tracing::debug;

use super::records::{CollectionMeta, COLLECTIONS};
use crate::client::MetadataStoreExt;
use crate::utils::{ReportError, Result};

/// Sharded collections known to the cluster.
///
/// Soft-deleted entries are excluded from `live()`, but their ids are
/// remembered so that leftover chunks can be recognised and skipped.
#[derive(Debug, Clone, Default)]
pub struct CollectionDirectory {
    live: Vec<CollectionMeta>,
    by_uuid: HashMap<Vec<u8>, usize>,
    dropped: HashSet<Vec<u8>>,
}

impl CollectionDirectory {
    pub fn from_records(records: Vec<CollectionMeta>) -> Self {
        let mut directory = Self::default();

        for record in records {
            let key = record.uuid.as_ref().and_then(uuid_bytes);
            if record.dropped {
                if let Some(key) = key {
                    directory.dropped.insert(key);
                }
                continue;
            }
            if let Some(key) = key {
                directory.by_uuid.insert(key, directory.live.len());
            }
            directory.live.push(record);
        }

        directory
    }

    /// Read the collection directory from the store
    pub fn load<S: MetadataStoreExt + ?Sized>(store: &S) -> Result<Self> {
        let records = store
            .find_all(COLLECTIONS)?
            .iter()
            .map(CollectionMeta::from_document)
            .collect::<Result<Vec<_>>>()?;
        let directory = Self::from_records(records);
        debug!(
            "collection directory: {} live, {} dropped",
            directory.live.len(),
            directory.dropped.len()
        );
        Ok(directory)
    }

    /// Collections that have not been soft-deleted, in store order
    pub fn live(&self) -> &[CollectionMeta] {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Resolve a collection unique id to its namespace.
    ///
    /// Returns `Ok(None)` for a soft-deleted collection. An id that is not
    /// a UUID, or a UUID unknown to the directory, is a data-shape error.
    pub fn resolve(&self, id: &Bson) -> Result<Option<&str>> {
        let key = uuid_bytes(id).ok_or_else(|| {
            ReportError::DataShape(format!("expected a collection UUID, got {}", id))
        })?;

        if let Some(&idx) = self.by_uuid.get(&key) {
            return Ok(Some(self.live[idx].namespace.as_str()));
        }
        if self.dropped.contains(&key) {
            return Ok(None);
        }

        Err(ReportError::DataShape(format!(
            "collection UUID {} has no entry in the collection directory",
            display_uuid(&key)
        )))
    }
}

/// Raw bytes of a binary UUID value
fn uuid_bytes(value: &Bson) -> Option<Vec<u8>> {
    match value {
        Bson::Binary(binary)
            if matches!(binary.subtype, BinarySubtype::Uuid | BinarySubtype::UuidOld) =>
        {
            Some(binary.bytes.clone())
        }
        _ => None,
    }
}

fn display_uuid(bytes: &[u8]) -> String {
    match <[u8; 16]>::try_from(bytes) {
        Ok(array) => Uuid::from_bytes(array).to_string(),
        Err(_) => format!("{:02x?}", bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryStore;
    use mongodb::bson::doc;

    fn uuid(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    fn directory() -> CollectionDirectory {
        let store = MemoryStore::new().with_collection(
            COLLECTIONS,
            vec![
                doc! { "_id": "db.live", "uuid": uuid(1), "key": { "a": 1 } },
                doc! { "_id": "db.gone", "uuid": uuid(2), "key": { "a": 1 }, "dropped": true },
            ],
        );
        CollectionDirectory::load(&store).unwrap()
    }

    #[test]
    fn test_live_excludes_dropped() {
        let directory = directory();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.live()[0].namespace, "db.live");
    }

    #[test]
    fn test_resolve() {
        let directory = directory();
        assert_eq!(directory.resolve(&Bson::from(uuid(1))).unwrap(), Some("db.live"));
        assert_eq!(directory.resolve(&Bson::from(uuid(2))).unwrap(), None);
    }

    #[test]
    fn test_resolve_unknown_uuid_is_data_shape() {
        let err = directory().resolve(&Bson::from(uuid(9))).unwrap_err();
        assert!(matches!(err, ReportError::DataShape(_)));
    }

    #[test]
    fn test_resolve_rejects_non_uuid() {
        let directory = directory();
        for id in [Bson::from("db.live"), Bson::Null, Bson::Int32(1)] {
            let err = directory.resolve(&id).unwrap_err();
            assert!(matches!(err, ReportError::DataShape(_)));
        }
    }
}
