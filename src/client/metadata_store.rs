//! Metadata store trait for config database access
//!
//! This trait abstracts the read-only operations the report builders need
//! from the cluster's metadata ("config") database. Implementations:
//! - `MongoStore`: live cluster through the MongoDB driver
//! - `MemoryStore`: in-process documents, used for tests and offline snapshots
//!
//! Grouping and aggregation are always done client-side by the report
//! builders, so a store only has to filter, sort, limit and count.

use std::cmp::Ordering;

use mongodb::bson::{self, doc, Bson, Document};

use crate::utils::Result;

/// Collections whose presence identifies a sharded-cluster metadata database
pub const SIGNATURE_COLLECTIONS: &[&str] = &["chunks", "collections", "mongos", "shards", "version"];

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Record predicate
///
/// Field names are dotted paths (`details.errorOccured`). Semantics follow
/// the server's query language: `Ne` also matches records where the field
/// is missing, comparisons between numbers ignore the numeric type.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Bson),
    Ne(String, Bson),
    Gte(String, Bson),
    /// Field is a string containing the given literal text
    Contains(String, String),
    /// Field holds a BSON datetime
    IsDate(String),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn ne(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Ne(field.to_string(), value.into())
    }

    pub fn gte(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn contains(field: &str, text: &str) -> Self {
        Filter::Contains(field.to_string(), text.to_string())
    }

    pub fn is_date(field: &str) -> Self {
        Filter::IsDate(field.to_string())
    }

    /// Render as a server-side query document
    pub fn to_document(&self) -> Document {
        fn single(field: &str, value: Bson) -> Document {
            let mut document = Document::new();
            document.insert(field, value);
            document
        }

        match self {
            Filter::All => Document::new(),
            Filter::Eq(field, value) => single(field, value.clone()),
            Filter::Ne(field, value) => single(field, doc! { "$ne": value.clone() }.into()),
            Filter::Gte(field, value) => single(field, doc! { "$gte": value.clone() }.into()),
            Filter::Contains(field, text) => {
                single(field, doc! { "$regex": escape_regex(text) }.into())
            }
            Filter::IsDate(field) => single(field, doc! { "$type": "date" }.into()),
            Filter::And(filters) => {
                let clauses: Vec<Bson> = filters
                    .iter()
                    .map(|f| Bson::Document(f.to_document()))
                    .collect();
                doc! { "$and": clauses }
            }
        }
    }

    /// Evaluate against a document held in memory
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => lookup(document, field)
                .map(|v| compare_bson(v, value) == Some(Ordering::Equal))
                .unwrap_or(false),
            Filter::Ne(field, value) => lookup(document, field)
                .map(|v| compare_bson(v, value) != Some(Ordering::Equal))
                .unwrap_or(true),
            Filter::Gte(field, value) => lookup(document, field)
                .and_then(|v| compare_bson(v, value))
                .map(|o| o != Ordering::Less)
                .unwrap_or(false),
            Filter::Contains(field, text) => match lookup(document, field) {
                Some(Bson::String(s)) => s.contains(text.as_str()),
                _ => false,
            },
            Filter::IsDate(field) => matches!(lookup(document, field), Some(Bson::DateTime(_))),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

/// A collection-scoped read request
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Vec<(String, SortOrder)>,
    pub limit: Option<i64>,
    /// Top-level fields to return; empty returns whole records
    pub projection: Vec<String>,
}

impl Query {
    /// Match every record, store order, no limit
    pub fn all() -> Self {
        Self {
            filter: Filter::All,
            sort: Vec::new(),
            limit: None,
            projection: Vec::new(),
        }
    }

    pub fn filter(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::all()
        }
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort.push((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn project(mut self, fields: &[&str]) -> Self {
        self.projection = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Projection as a server-side document
    pub fn projection_document(&self) -> Option<Document> {
        if self.projection.is_empty() {
            return None;
        }
        let mut projection = Document::new();
        for field in &self.projection {
            projection.insert(field.clone(), 1);
        }
        Some(projection)
    }

    /// Sort specification as a server-side document
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }
        let mut sort = Document::new();
        for (field, order) in &self.sort {
            sort.insert(field.clone(), order.as_i32());
        }
        Some(sort)
    }
}

/// Read-only metadata store operations
///
/// Implementations own connection handling, timeouts and retries; any
/// failure surfaces as `ReportError::StoreAccess`.
pub trait MetadataStore {
    /// Names of the collections present in the metadata database
    fn collection_names(&self) -> Result<Vec<String>>;

    /// Run a query against one collection.
    ///
    /// A missing collection yields an empty result, not an error.
    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    /// Approximate record count (metadata based, may lag the real count)
    fn estimated_count(&self, collection: &str) -> Result<u64>;
}

/// Convenience operations built on `MetadataStore`
pub trait MetadataStoreExt: MetadataStore {
    /// All records of a collection in store order
    fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.find(collection, &Query::all())
    }

    /// First record matching `filter` when sorted by `field` in `order`
    fn first_by(
        &self,
        collection: &str,
        filter: Filter,
        field: &str,
        order: SortOrder,
    ) -> Result<Option<Document>> {
        let query = Query::filter(filter).sort_by(field, order).limit(1);
        Ok(self.find(collection, &query)?.into_iter().next())
    }

    /// Latest value of a datetime field.
    ///
    /// Records whose field holds any other type are ignored; `None` when no
    /// record has a datetime there.
    fn latest_time(&self, collection: &str, field: &str) -> Result<Option<bson::DateTime>> {
        self.extreme_time(collection, field, SortOrder::Descending)
    }

    /// Earliest value of a datetime field, see `latest_time`
    fn earliest_time(&self, collection: &str, field: &str) -> Result<Option<bson::DateTime>> {
        self.extreme_time(collection, field, SortOrder::Ascending)
    }

    fn extreme_time(
        &self,
        collection: &str,
        field: &str,
        order: SortOrder,
    ) -> Result<Option<bson::DateTime>> {
        Ok(self
            .first_by(collection, Filter::is_date(field), field, order)?
            .and_then(|d| lookup(&d, field).and_then(Bson::as_datetime).copied()))
    }

    /// Check whether any signature collection is present
    fn is_metadata_database(&self) -> Result<bool> {
        let names = self.collection_names()?;
        Ok(names
            .iter()
            .any(|n| SIGNATURE_COLLECTIONS.contains(&n.as_str())))
    }
}

impl<T: MetadataStore + ?Sized> MetadataStoreExt for T {}

/// Resolve a dotted path inside a document
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Rank of a value's type in the server's cross-type sort order.
///
/// A missing field sorts as null.
fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        Some(Bson::MinKey) => 0,
        None | Some(Bson::Null) | Some(Bson::Undefined) => 1,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_)) => 2,
        Some(Bson::String(_) | Bson::Symbol(_)) => 3,
        Some(Bson::Document(_)) => 4,
        Some(Bson::Array(_)) => 5,
        Some(Bson::Binary(_)) => 6,
        Some(Bson::ObjectId(_)) => 7,
        Some(Bson::Boolean(_)) => 8,
        Some(Bson::DateTime(_)) => 9,
        Some(Bson::Timestamp(_)) => 10,
        Some(Bson::RegularExpression(_)) => 11,
        Some(Bson::MaxKey) => 13,
        Some(_) => 12,
    }
}

/// Total order used for sorting, matching the server's cross-type order.
///
/// Values of different types order by type rank; doubles use IEEE total
/// ordering so NaN has a fixed place.
pub fn sort_cmp(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }

    match (a, b) {
        (Some(Bson::Int32(x)), Some(Bson::Int32(y))) => x.cmp(y),
        (Some(Bson::Int64(x)), Some(Bson::Int64(y))) => x.cmp(y),
        (Some(Bson::Int32(x)), Some(Bson::Int64(y))) => i64::from(*x).cmp(y),
        (Some(Bson::Int64(x)), Some(Bson::Int32(y))) => x.cmp(&i64::from(*y)),
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::Boolean(x)), Some(Bson::Boolean(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => x.cmp(y),
        (Some(Bson::Timestamp(x)), Some(Bson::Timestamp(y))) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        (Some(Bson::ObjectId(x)), Some(Bson::ObjectId(y))) => x.bytes().cmp(&y.bytes()),
        (Some(Bson::Binary(x)), Some(Bson::Binary(y))) => (x.bytes.len(), &x.bytes)
            .cmp(&(y.bytes.len(), &y.bytes)),
        (Some(x), Some(y)) => match (as_f64(x), as_f64(y)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

fn as_f64(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

/// Order two BSON values of comparable types.
///
/// Numbers compare across int32/int64/double; `None` for mixed kinds.
pub fn compare_bson(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => (a == b).then_some(Ordering::Equal),
        },
    }
}

fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
