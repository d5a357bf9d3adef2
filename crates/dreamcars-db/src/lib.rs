//! # dreamcars-db
//!
//! SQLite-backed `DocumentStore`. Every collection lives in one `documents`
//! table; bodies are stored as JSON text and filtered with `json_extract`.

pub mod migrations;
pub mod queries;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dreamcars_core::store::{
    Collection, DeleteOutcome, Document, DocumentStore, Filter, InsertOutcome, UpdateOutcome,
};
use dreamcars_core::{MarketError, MarketResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a blocking closure against the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> MarketResult<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| MarketError::Store(format!("storage task failed: {}", e)))?
        .map_err(|e| MarketError::Store(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> MarketResult<Vec<Document>> {
        let filter = filter.clone();
        self.with_conn(move |conn| queries::find(conn, collection, &filter))
            .await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> MarketResult<Option<Document>> {
        let filter = filter.clone();
        self.with_conn(move |conn| queries::find_one(conn, collection, &filter))
            .await
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> MarketResult<InsertOutcome> {
        let id = self
            .with_conn(move |conn| queries::insert(conn, collection, &document))
            .await?;
        debug!(%collection, %id, "inserted");
        Ok(InsertOutcome::inserted(id))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> MarketResult<UpdateOutcome> {
        let filter = filter.clone();
        let (matched, modified) = self
            .with_conn(move |conn| queries::update(conn, collection, &filter, &set, Some(1)))
            .await?;
        Ok(UpdateOutcome::new(matched, modified))
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> MarketResult<UpdateOutcome> {
        let filter = filter.clone();
        let (matched, modified) = self
            .with_conn(move |conn| queries::update(conn, collection, &filter, &set, None))
            .await?;
        Ok(UpdateOutcome::new(matched, modified))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> MarketResult<DeleteOutcome> {
        let filter = filter.clone();
        let deleted = self
            .with_conn(move |conn| queries::delete(conn, collection, &filter, Some(1)))
            .await?;
        Ok(DeleteOutcome::new(deleted))
    }

    async fn delete_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> MarketResult<DeleteOutcome> {
        let filter = filter.clone();
        let deleted = self
            .with_conn(move |conn| queries::delete(conn, collection, &filter, None))
            .await?;
        Ok(DeleteOutcome::new(deleted))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> MarketResult<u64> {
        let filter = filter.clone();
        self.with_conn(move |conn| queries::count(conn, collection, &filter))
            .await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
