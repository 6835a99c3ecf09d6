//! Database layer: migrations and the SQLite-backed [`RecordStore`].

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::errors::{Result, StorefrontError};
use crate::store::{new_document_id, Collection, DocumentId, OrderBy, RecordStore, StoredDocument};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // An in-memory database lives and dies with its connection.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn not_found(collection: Collection, id: &str) -> StorefrontError {
    StorefrontError::NotFound {
        collection,
        id: id.to_string(),
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    /// Rows that share a `(collection, idempotency_key)` pair are ignored,
    /// and the id of the original row is returned instead.
    async fn append(
        &self,
        collection: Collection,
        record: Value,
        idempotency_key: Option<&str>,
    ) -> Result<DocumentId> {
        let id = new_document_id();
        let body = serde_json::to_string(&record)?;

        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO documents (id, collection, body, idempotency_key)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&id)
        .bind(collection.as_str())
        .bind(&body)
        .bind(idempotency_key)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 1 {
            return Ok(id);
        }

        let (existing,): (String,) = sqlx::query_as(
            "SELECT id FROM documents WHERE collection = ?1 AND idempotency_key = ?2",
        )
        .bind(collection.as_str())
        .bind(idempotency_key)
        .fetch_one(&self.pool)
        .await?;
        debug!("Duplicate append to {collection} resolved to {existing}");
        Ok(existing)
    }

    async fn read_all(
        &self,
        collection: Collection,
        order_by: OrderBy,
    ) -> Result<Vec<StoredDocument>> {
        let direction = if order_by.descending { "DESC" } else { "ASC" };
        let sql = format!(
            r#"
            SELECT id, body
            FROM   documents
            WHERE  collection = ?1
            ORDER  BY json_extract(body, ?2) {direction}, seq {direction}
            "#
        );
        let rows: Vec<(String, String)> = sqlx::query_as(&sql)
            .bind(collection.as_str())
            .bind(format!("$.{}", order_by.field))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(id, body)| {
                Ok(StoredDocument {
                    id,
                    body: serde_json::from_str(&body)?,
                })
            })
            .collect()
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<()> {
        let patch = serde_json::to_string(&Value::Object(partial))?;
        let rows_affected = sqlx::query(
            "UPDATE documents SET body = json_patch(body, ?3) WHERE collection = ?1 AND id = ?2",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&patch)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let rows_affected = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_store() -> SqliteStore {
        SqliteStore::new(init_pool("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn append_then_read_newest_first() {
        let store = memory_store().await;
        for (name, at) in [("early", "2025-07-01T10:00:00Z"), ("late", "2025-07-02T10:00:00Z")] {
            store
                .append(
                    Collection::Registrations,
                    json!({"studentName": name, "submittedAt": at}),
                    None,
                )
                .await
                .unwrap();
        }

        let docs = store
            .read_all(Collection::Registrations, OrderBy::newest("submittedAt"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].body["studentName"], "late");

        let docs = store
            .read_all(Collection::Registrations, OrderBy::oldest("submittedAt"))
            .await
            .unwrap();
        assert_eq!(docs[0].body["studentName"], "early");

        assert!(store
            .read_all(Collection::Orders, OrderBy::newest("createdAt"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn repeated_idempotency_key_returns_original_id() {
        let store = memory_store().await;
        let first = store
            .append(Collection::Orders, json!({"total": 599}), Some("retry-1"))
            .await
            .unwrap();
        let again = store
            .append(Collection::Orders, json!({"total": 599}), Some("retry-1"))
            .await
            .unwrap();
        assert_eq!(first, again);

        // Unkeyed appends never collide.
        store
            .append(Collection::Orders, json!({"total": 599}), None)
            .await
            .unwrap();
        store
            .append(Collection::Orders, json!({"total": 599}), None)
            .await
            .unwrap();

        let docs = store
            .read_all(Collection::Orders, OrderBy::newest("total"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[tokio::test]
    async fn update_patches_document() {
        let store = memory_store().await;
        let id = store
            .append(
                Collection::Orders,
                json!({"status": "pending", "total": 4199}),
                None,
            )
            .await
            .unwrap();

        let mut patch = Map::new();
        patch.insert("status".into(), json!("delivered"));
        store.update(Collection::Orders, &id, patch).await.unwrap();

        let docs = store
            .read_all(Collection::Orders, OrderBy::newest("createdAt"))
            .await
            .unwrap();
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[0].body, json!({"status": "delivered", "total": 4199}));
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let store = memory_store().await;
        assert!(matches!(
            store.delete(Collection::Registrations, "nope").await,
            Err(StorefrontError::NotFound { .. })
        ));
        assert!(matches!(
            store
                .update(Collection::Registrations, "nope", Map::new())
                .await,
            Err(StorefrontError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("storefront.db").display());

        let id = {
            let store = SqliteStore::new(init_pool(&url).await.unwrap());
            store
                .append(Collection::Registrations, json!({"campType": "online"}), None)
                .await
                .unwrap()
        };

        let store = SqliteStore::new(init_pool(&url).await.unwrap());
        let docs = store
            .read_all(Collection::Registrations, OrderBy::newest("submittedAt"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
    }
}
