//! PostgreSQL-backed counter store.
//!
//! Counters live in the `pattern_counters` table (see `migrations/`). Each
//! primitive is a single statement, so atomicity per key comes from the
//! database row lock rather than from the caller.

use super::{CounterStore, StoreError};
use crate::events::PatternKey;
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;

#[derive(Debug, Clone)]
/// Add one to a counter, creating it on first use. Returns the new value.
pub struct IncrementCounter {
    pub key: PatternKey,
}

impl Processor<IncrementCounter> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:IncrementCounter")]
    async fn process(&self, cmd: IncrementCounter) -> Result<i64, sqlx::Error> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO pattern_counters (pattern_key, value)
            VALUES ($1, 1)
            ON CONFLICT (pattern_key)
            DO UPDATE SET value = pattern_counters.value + 1, updated_at = now()
            RETURNING value
            "#,
        )
        .bind(cmd.key.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }
}

#[derive(Debug, Clone)]
/// Read a counter. A key that was never incremented reads as zero.
pub struct GetCounter {
    pub key: PatternKey,
}

impl Processor<GetCounter> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCounter")]
    async fn process(&self, query: GetCounter) -> Result<i64, sqlx::Error> {
        let value = sqlx::query_scalar::<_, i64>(
            "SELECT value FROM pattern_counters WHERE pattern_key = $1",
        )
        .bind(query.key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value.unwrap_or(0))
    }
}

#[derive(Debug, Clone)]
/// Set a counter back to zero.
pub struct ResetCounter {
    pub key: PatternKey,
}

impl Processor<ResetCounter> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ResetCounter")]
    async fn process(&self, cmd: ResetCounter) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE pattern_counters SET value = 0, updated_at = now() WHERE pattern_key = $1",
        )
        .bind(cmd.key.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// [`CounterStore`] over a PostgreSQL connection pool.
pub struct PgCounterStore {
    processor: DatabaseProcessor,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn increment(&self, key: &PatternKey) -> Result<i64, StoreError> {
        let value = self
            .processor
            .process(IncrementCounter { key: key.clone() })
            .await?;
        Ok(value)
    }

    async fn get(&self, key: &PatternKey) -> Result<i64, StoreError> {
        let value = self.processor.process(GetCounter { key: key.clone() }).await?;
        Ok(value)
    }

    async fn reset(&self, key: &PatternKey) -> Result<(), StoreError> {
        self.processor
            .process(ResetCounter { key: key.clone() })
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.processor.pool.close().await;
    }
}
