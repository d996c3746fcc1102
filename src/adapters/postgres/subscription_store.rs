//! PostgreSQL implementation of SubscriptionStore.
//!
//! Provides persistent storage for Subscription aggregates using sqlx.
//! `commit_transition` opens one transaction spanning the subscription
//! update and the ledger's processed mark, so the financial transition and
//! its idempotency record commit or roll back together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::billing::{BillingInterval, Subscription, SubscriptionStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PackageId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::SubscriptionStore;

/// PostgreSQL implementation of the SubscriptionStore port.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update_in_txn(
        txn: &mut Transaction<'_, Postgres>,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                transaction_id = $3,
                payment_type = $4,
                starts_at = $5,
                ends_at = $6,
                cancelled_at = $7,
                failure_reason = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(&subscription.transaction_id)
        .bind(&subscription.payment_type)
        .bind(subscription.starts_at.map(|t| *t.as_datetime()))
        .bind(subscription.ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .bind(&subscription.failure_reason)
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut **txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription {} not found", subscription.order_id),
            ));
        }
        Ok(())
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    package_id: i64,
    billing_interval: String,
    order_id: String,
    transaction_id: Option<String>,
    payment_type: Option<String>,
    status: String,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            package_id: PackageId::new(row.package_id),
            interval: parse_interval(&row.billing_interval)?,
            order_id: OrderId::new(row.order_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid order_id: {}", e))
            })?,
            transaction_id: row.transaction_id,
            payment_type: row.payment_type,
            status: parse_status(&row.status)?,
            starts_at: row.starts_at.map(Timestamp::from_datetime),
            ends_at: row.ends_at.map(Timestamp::from_datetime),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_interval(s: &str) -> Result<BillingInterval, DomainError> {
    match s {
        "monthly" => Ok(BillingInterval::Monthly),
        "quarterly" => Ok(BillingInterval::Quarterly),
        "yearly" => Ok(BillingInterval::Yearly),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid interval value: {}", s),
        )),
    }
}

fn interval_to_string(interval: &BillingInterval) -> &'static str {
    match interval {
        BillingInterval::Monthly => "monthly",
        BillingInterval::Quarterly => "quarterly",
        BillingInterval::Yearly => "yearly",
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s {
        "pending" => Ok(SubscriptionStatus::Pending),
        "active" => Ok(SubscriptionStatus::Active),
        "failed" => Ok(SubscriptionStatus::Failed),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        "expired" => Ok(SubscriptionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, package_id, billing_interval, order_id, transaction_id,
           payment_type, status, starts_at, ends_at, cancelled_at,
           failure_reason, created_at, updated_at
    FROM subscriptions
"#;

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, package_id, billing_interval, order_id, transaction_id,
                payment_type, status, starts_at, ends_at, cancelled_at,
                failure_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.package_id.as_i64())
        .bind(interval_to_string(&subscription.interval))
        .bind(subscription.order_id.as_str())
        .bind(&subscription.transaction_id)
        .bind(&subscription.payment_type)
        .bind(subscription.status.as_str())
        .bind(subscription.starts_at.map(|t| *t.as_datetime()))
        .bind(subscription.ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .bind(&subscription.failure_reason)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_order_id_key") {
                    return DomainError::new(
                        ErrorCode::DuplicateOrder,
                        format!("Order {} already exists", subscription.order_id),
                    );
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert subscription: {}", e),
            )
        })?;

        Ok(())
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE order_id = $1", SELECT_COLUMNS))
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to load subscription: {}", e),
                    )
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut txn = self.pool.begin().await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to begin txn: {}", e))
        })?;
        Self::update_in_txn(&mut txn, subscription).await?;
        txn.commit().await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to commit: {}", e))
        })
    }

    async fn commit_transition(
        &self,
        subscription: &Subscription,
        event_id: &str,
    ) -> Result<(), DomainError> {
        let mut txn = self.pool.begin().await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to begin txn: {}", e))
        })?;

        Self::update_in_txn(&mut txn, subscription).await?;

        let marked = sqlx::query(
            r#"
            UPDATE payment_notifications
            SET processed_at = NOW()
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .execute(&mut *txn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark notification processed: {}", e),
            )
        })?;

        if marked.rows_affected() == 0 {
            // The ledger row must exist by this point; rolling back keeps
            // the subscription untouched
            return Err(DomainError::new(
                ErrorCode::NotificationNotFound,
                format!("No notification recorded for event {}", event_id),
            ));
        }

        txn.commit().await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to commit: {}", e))
        })
    }

    async fn find_stale_pending(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE status = 'pending' AND created_at < $1",
            SELECT_COLUMNS
        ))
        .bind(cutoff.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to query stale checkouts: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_active_past_end(
        &self,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE status = 'active' AND ends_at < $1",
            SELECT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to query lapsed subscriptions: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}
