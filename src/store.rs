//! Persisted tag-reactable records: message id → (handler name, argument).
//! Records never expire on their own; a row whose message or handler is gone
//! is simply never resolved.

use std::collections::HashMap;

use serenity::async_trait;
use serenity::model::id::MessageId;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::errors::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ReactableRecord {
    pub message_id: i64,
    pub function_name: String,
    pub function_args: String,
}

#[async_trait]
pub trait ReactableStore: Send + Sync {
    async fn get(&self, message: MessageId) -> Result<Option<ReactableRecord>, StoreError>;
    /// Insert or overwrite the record for `message`. Keyed by message id, so
    /// concurrent upserts for different messages never conflict.
    async fn upsert(
        &self,
        message: MessageId,
        function_name: &str,
        function_args: &str,
    ) -> Result<(), StoreError>;
    async fn delete(&self, message: MessageId) -> Result<(), StoreError>;
}

pub struct PgReactableStore {
    pool: PgPool,
}

impl PgReactableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tag_reactables (
                message_id BIGINT PRIMARY KEY,
                function_name TEXT NOT NULL,
                function_args TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ReactableStore for PgReactableStore {
    async fn get(&self, message: MessageId) -> Result<Option<ReactableRecord>, StoreError> {
        let record = sqlx::query_as::<_, ReactableRecord>(
            "SELECT message_id, function_name, function_args
             FROM tag_reactables WHERE message_id = $1",
        )
        .bind(message.get() as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn upsert(
        &self,
        message: MessageId,
        function_name: &str,
        function_args: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO tag_reactables (message_id, function_name, function_args)
             VALUES ($1, $2, $3)
             ON CONFLICT (message_id) DO UPDATE
             SET function_name = EXCLUDED.function_name,
                 function_args = EXCLUDED.function_args",
        )
        .bind(message.get() as i64)
        .bind(function_name)
        .bind(function_args)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, message: MessageId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM tag_reactables WHERE message_id = $1")
            .bind(message.get() as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-memory store for tests and local runs without Postgres.
#[derive(Default)]
pub struct MemoryReactableStore {
    records: RwLock<HashMap<i64, ReactableRecord>>,
}

impl MemoryReactableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReactableStore for MemoryReactableStore {
    async fn get(&self, message: MessageId) -> Result<Option<ReactableRecord>, StoreError> {
        Ok(self.records.read().await.get(&(message.get() as i64)).cloned())
    }

    async fn upsert(
        &self,
        message: MessageId,
        function_name: &str,
        function_args: &str,
    ) -> Result<(), StoreError> {
        let key = message.get() as i64;
        self.records.write().await.insert(
            key,
            ReactableRecord {
                message_id: key,
                function_name: function_name.to_string(),
                function_args: function_args.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, message: MessageId) -> Result<(), StoreError> {
        self.records.write().await.remove(&(message.get() as i64));
        Ok(())
    }
}
