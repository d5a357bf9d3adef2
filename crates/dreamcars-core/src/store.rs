//! # Document Store
//!
//! The storage contract every marketplace flow is written against.
//!
//! Records are JSON objects kept in named collections. Reads and writes are
//! filtered by field equality only; an empty filter matches every document.
//! Each call is a single independent operation. There are no transactions,
//! so multi-document flows may complete partially.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   DocumentStore (trait)                     │
//! │  ├── find() / find_one()                                    │
//! │  ├── insert_one()                                           │
//! │  ├── update_one() / update_many()                           │
//! │  └── delete_one() / delete_many()                           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!          ┌───────┴───────┐   ┌───────┴───────┐
//!          │  MemoryStore  │   │  SqliteStore  │
//!          │ (this crate)  │   │ (dreamcars-db)│
//!          └───────────────┘   └───────────────┘
//! ```

use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A stored record: a JSON object with a string `id` field
pub type Document = Map<String, Value>;

/// Field holding every document's identifier
pub const ID_FIELD: &str = "id";

/// Named collections of the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Categories,
    Products,
    Users,
    Bookings,
    Payments,
    Reports,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Categories,
        Collection::Products,
        Collection::Users,
        Collection::Bookings,
        Collection::Payments,
        Collection::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Categories => "categories",
            Collection::Products => "products",
            Collection::Users => "users",
            Collection::Bookings => "bookings",
            Collection::Payments => "payments",
            Collection::Reports => "reports",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunction of field-equality clauses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the document with the given id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::all().eq(ID_FIELD, id.into())
    }

    /// Builder: require `field == value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Check a document against every clause
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| document.get(field) == Some(value))
    }
}

/// Result of an insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InsertOutcome {
    pub fn inserted(id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            inserted_id: Some(id.into()),
            message: None,
        }
    }

    /// The write was deliberately not performed (duplicate by policy)
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            acknowledged: false,
            inserted_id: None,
            message: Some(message.into()),
        }
    }
}

/// Result of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateOutcome {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
        }
    }

    /// Nothing matched the filter
    pub fn is_noop(&self) -> bool {
        self.matched_count == 0
    }
}

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteOutcome {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }

    pub fn found(&self) -> bool {
        self.deleted_count > 0
    }
}

/// Storage backend for marketplace documents.
///
/// Implementations must treat every call as one self-contained operation and
/// must not hold locks across calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents matching the filter, in insertion order.
    async fn find(&self, collection: Collection, filter: &Filter) -> MarketResult<Vec<Document>>;

    /// First document matching the filter.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> MarketResult<Option<Document>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// Append a document. It must carry a string `id`.
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> MarketResult<InsertOutcome>;

    /// Merge `set` into the first matching document.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> MarketResult<UpdateOutcome>;

    /// Merge `set` into every matching document.
    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> MarketResult<UpdateOutcome>;

    /// Remove the first matching document.
    async fn delete_one(&self, collection: Collection, filter: &Filter)
        -> MarketResult<DeleteOutcome>;

    /// Remove every matching document.
    async fn delete_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> MarketResult<DeleteOutcome>;

    /// Number of matching documents.
    async fn count(&self, collection: Collection, filter: &Filter) -> MarketResult<u64> {
        Ok(self.find(collection, filter).await?.len() as u64)
    }

    /// Backend name (for logging)
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a shared store (dynamic dispatch)
pub type SharedStore = Arc<dyn DocumentStore>;

/// Serialize a record into a document
pub fn to_document<T: Serialize>(value: &T) -> MarketResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(MarketError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Deserialize a document into a record
pub fn from_document<T: DeserializeOwned>(document: Document) -> MarketResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Build a `set` document from a `json!` object literal
pub fn fields(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Read the `id` of a document
pub fn document_id(document: &Document) -> MarketResult<String> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| MarketError::Store("document has no string id".to_string()))
}

/// Merge `set` into `document`, returning true if any field changed
pub fn apply_set(document: &mut Document, set: &Document) -> bool {
    let mut changed = false;
    for (key, value) in set {
        if document.get(key) != Some(value) {
            document.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Typed `find`
pub async fn find_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    filter: &Filter,
) -> MarketResult<Vec<T>> {
    store
        .find(collection, filter)
        .await?
        .into_iter()
        .map(from_document)
        .collect()
}

/// Typed `find_one`
pub async fn find_one_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    filter: &Filter,
) -> MarketResult<Option<T>> {
    store
        .find_one(collection, filter)
        .await?
        .map(from_document)
        .transpose()
}
