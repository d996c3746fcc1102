//! PostgreSQL implementation of NotificationLedger.
//!
//! The `payment_notifications` table carries a PRIMARY KEY on `event_id`;
//! `record_or_detect` inserts with `ON CONFLICT DO NOTHING` so concurrent
//! deliveries of the same event serialize on the constraint - the second
//! writer observes zero affected rows and reads the existing record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{NotificationLedger, NotificationRecord, RecordOutcome};

/// PostgreSQL implementation of the NotificationLedger port.
pub struct PostgresNotificationLedger {
    pool: PgPool,
}

impl PostgresNotificationLedger {
    /// Creates a new ledger backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a notification record.
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    event_id: String,
    provider: String,
    order_id: String,
    payload: serde_json::Value,
    received_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl From<NotificationRow> for NotificationRecord {
    fn from(row: NotificationRow) -> Self {
        NotificationRecord {
            event_id: row.event_id,
            provider: row.provider,
            order_id: row.order_id,
            payload: row.payload,
            received_at: Timestamp::from_datetime(row.received_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            failed_at: row.failed_at.map(Timestamp::from_datetime),
            last_error: row.last_error,
        }
    }
}

#[async_trait]
impl NotificationLedger for PostgresNotificationLedger {
    async fn record_or_detect(
        &self,
        record: NotificationRecord,
    ) -> Result<RecordOutcome, DomainError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO payment_notifications (
                event_id, provider, order_id, payload, received_at
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.provider)
        .bind(&record.order_id)
        .bind(&record.payload)
        .bind(record.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record notification: {}", e),
            )
        })?;

        if inserted.rows_affected() == 1 {
            return Ok(RecordOutcome::Inserted);
        }

        // Lost the race or genuine redelivery - fetch the winner's record
        let existing = self.find_by_event_id(&record.event_id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                "Conflicting notification row vanished mid-read",
            )
        })?;
        Ok(RecordOutcome::Duplicate(existing))
    }

    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<NotificationRecord>, DomainError> {
        let row: Option<NotificationRow> = sqlx::query_as(
            r#"
            SELECT event_id, provider, order_id, payload, received_at,
                   processed_at, failed_at, last_error
            FROM payment_notifications
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load notification: {}", e),
            )
        })?;

        Ok(row.map(NotificationRecord::from))
    }

    async fn find_unsettled(&self, limit: u32) -> Result<Vec<NotificationRecord>, DomainError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT event_id, provider, order_id, payload, received_at,
                   processed_at, failed_at, last_error
            FROM payment_notifications
            WHERE processed_at IS NULL AND failed_at IS NULL
            ORDER BY received_at
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load unsettled notifications: {}", e),
            )
        })?;

        Ok(rows.into_iter().map(NotificationRecord::from).collect())
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_notifications
            SET processed_at = NOW()
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark notification processed: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::NotificationNotFound,
                format!("No notification recorded for event {}", event_id),
            ));
        }
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_notifications
            SET failed_at = NOW(), last_error = $2
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark notification failed: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::NotificationNotFound,
                format!("No notification recorded for event {}", event_id),
            ));
        }
        Ok(())
    }
}
