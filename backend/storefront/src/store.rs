//! Record store: the generic document API both workflows persist through.
//!
//! Documents are schemaless JSON objects grouped into collections. The store
//! never validates shape; callers do.
//!
//! ## Idempotency
//!
//! `append` takes an optional idempotency key. A second append with the same
//! key in the same collection returns the first document's id and writes
//! nothing, so a client retrying after a lost response cannot create a
//! duplicate registration or order.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::errors::{Result, StorefrontError};

pub type DocumentId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Registrations,
    Orders,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registrations => "registrations",
            Self::Orders => "orders",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort a collection by a top-level field of the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub descending: bool,
}

impl OrderBy {
    pub fn newest(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    pub fn oldest(field: &'static str) -> Self {
        Self {
            field,
            descending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub body: Value,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append `record` and return its generated id.
    async fn append(
        &self,
        collection: Collection,
        record: Value,
        idempotency_key: Option<&str>,
    ) -> Result<DocumentId>;

    async fn read_all(&self, collection: Collection, order_by: OrderBy)
        -> Result<Vec<StoredDocument>>;

    /// Merge `partial` into the document (JSON merge-patch semantics).
    async fn update(&self, collection: Collection, id: &str, partial: Map<String, Value>)
        -> Result<()>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
}

/// Append under a deadline. An elapsed deadline is reported as
/// [`StorefrontError::OutcomeUnknown`]: the write may still land.
pub async fn append_within(
    store: &dyn RecordStore,
    collection: Collection,
    record: Value,
    idempotency_key: Option<&str>,
    deadline: Duration,
) -> Result<DocumentId> {
    match tokio::time::timeout(deadline, store.append(collection, record, idempotency_key)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                "Append to {collection} exceeded {}ms (idempotency key: {:?})",
                deadline.as_millis(),
                idempotency_key
            );
            Err(StorefrontError::OutcomeUnknown {
                collection,
                deadline,
            })
        }
    }
}

pub fn new_document_id() -> DocumentId {
    Uuid::new_v4().to_string()
}

/// RFC 7396 merge: objects merge recursively, `null` removes a key, anything
/// else replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(fields) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(existing) = target {
                for (key, value) in fields {
                    if value.is_null() {
                        existing.remove(key);
                    } else {
                        merge_patch(existing.entry(key.clone()).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other.clone(),
    }
}

// ─────────────────────────────────────────────────────────
// In-process store
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct MemoryEntry {
    collection: Collection,
    id: DocumentId,
    idempotency_key: Option<String>,
    seq: u64,
    body: Value,
}

/// Process-local store. Used by tests and by `DATABASE_URL=memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<MemoryEntry>>,
    /// Never reused, so deletes cannot disturb insertion order.
    next_seq: AtomicU64,
    fail_writes: AtomicBool,
    stall_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with [`StorefrontError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every append hang until cancelled.
    pub fn set_stall_writes(&self, stall: bool) {
        self.stall_writes.store(stall, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorefrontError::Unavailable(
                "memory store is rejecting writes".to_string(),
            ));
        }
        Ok(())
    }
}

fn sort_key(body: &Value, field: &str) -> Value {
    body.get(field).cloned().unwrap_or(Value::Null)
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering as O;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(O::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => O::Equal,
        (Value::Null, _) => O::Less,
        (_, Value::Null) => O::Greater,
        _ => O::Equal,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(
        &self,
        collection: Collection,
        record: Value,
        idempotency_key: Option<&str>,
    ) -> Result<DocumentId> {
        if self.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check_writable()?;

        let mut entries = self.entries.write().await;
        if let Some(key) = idempotency_key {
            if let Some(existing) = entries
                .iter()
                .find(|e| e.collection == collection && e.idempotency_key.as_deref() == Some(key))
            {
                return Ok(existing.id.clone());
            }
        }
        let id = new_document_id();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        entries.push(MemoryEntry {
            collection,
            id: id.clone(),
            idempotency_key: idempotency_key.map(str::to_string),
            seq,
            body: record,
        });
        Ok(id)
    }

    async fn read_all(
        &self,
        collection: Collection,
        order_by: OrderBy,
    ) -> Result<Vec<StoredDocument>> {
        let entries = self.entries.read().await;
        let mut docs: Vec<&MemoryEntry> = entries
            .iter()
            .filter(|e| e.collection == collection)
            .collect();
        docs.sort_by(|a, b| {
            let ord = compare_values(
                &sort_key(&a.body, order_by.field),
                &sort_key(&b.body, order_by.field),
            )
            .then(a.seq.cmp(&b.seq));
            if order_by.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(docs
            .into_iter()
            .map(|e| StoredDocument {
                id: e.id.clone(),
                body: e.body.clone(),
            })
            .collect())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.collection == collection && e.id == id)
            .ok_or_else(|| StorefrontError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        merge_patch(&mut entry.body, &Value::Object(partial));
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.check_writable()?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !(e.collection == collection && e.id == id));
        if entries.len() == before {
            return Err(StorefrontError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
