//! Database store for the cashbook API.
//!
//! ## Design Decisions
//!
//! ### Derived balance state
//! - **Server-owned invariants**: `remaining_amount` and `status` on debts
//!   are never accepted from clients. Every mutation recomputes them inside
//!   a transaction that holds a `FOR UPDATE` lock on the debt row, so
//!   concurrent payments cannot lose updates.
//! - **Database backstop**: the debts table carries a check constraint
//!   (`0 <= remaining_amount <= amount`) so a bug in the application can't
//!   persist a negative balance.
//!
//! ### Time handling
//! - **Explicit dates**: operations that depend on "today" take a
//!   `jiff::civil::Date` computed by the caller from the `TimeSource` and
//!   the configured business timezone. Nothing in this module calls the
//!   system clock, which keeps the sweep and the tests deterministic.
//!
//! ### Role scoping
//! - **Actor, not user id**: store operations take an [`Actor`] carrying
//!   the caller's id and role. Admins operate on all rows, cashiers only on
//!   their own. The check lives here rather than in the routes so no query
//!   can forget it.

use derive_more::Display;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTs;
use sqlx::{FromRow, PgPool};

use payloads::{Role, UserId, responses};

pub mod debt;
pub mod notification;
pub mod transaction;

/// A complete user row that stays in the backend.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl From<User> for responses::UserProfile {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

/// The authenticated caller of a store operation.
#[derive(Debug, Clone, Copy, Display)]
#[display("{user_id}")]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    /// Whether this actor may read or mutate a row owned by `owner`.
    pub fn can_access(&self, owner: &UserId) -> bool {
        self.role.is_admin() || self.user_id == *owner
    }

    pub fn require_admin(&self) -> Result<(), StoreError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(StoreError::RequiresAdmin)
        }
    }

    /// For list queries: `None` means no owner filter (admin sees all).
    pub fn owner_filter(&self) -> Option<UserId> {
        if self.role.is_admin() {
            None
        } else {
            Some(self.user_id)
        }
    }
}

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    full_name: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, StoreError> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, full_name, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING *",
    )
    .bind(username)
    .bind(full_name)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn read_user(
    pool: &PgPool,
    user_id: &UserId,
) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::UserNotFound)
}

pub async fn user_count(pool: &PgPool) -> Result<i64, StoreError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Users who should receive sweep-generated notifications.
pub async fn active_user_ids(
    pool: &PgPool,
) -> Result<Vec<UserId>, StoreError> {
    let ids = sqlx::query_scalar::<_, UserId>(
        "SELECT id FROM users WHERE is_active = true ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

// Settings

pub async fn get_settings(
    pool: &PgPool,
) -> Result<Vec<responses::Setting>, StoreError> {
    #[derive(FromRow)]
    struct Row {
        key: String,
        value: String,
    }
    let rows = sqlx::query_as::<_, Row>(
        "SELECT key, value FROM app_settings ORDER BY key",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| responses::Setting {
            key: r.key,
            value: r.value,
        })
        .collect())
}

pub async fn get_setting(
    pool: &PgPool,
    key: &str,
) -> Result<Option<String>, StoreError> {
    let value = sqlx::query_scalar::<_, String>(
        "SELECT value FROM app_settings WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(value)
}

pub async fn update_setting(
    pool: &PgPool,
    key: &str,
    value: &str,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE app_settings SET value = $2 WHERE key = $1",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::SettingNotFound);
    }
    Ok(())
}

/// Days before a due date at which a scheduled reminder is created.
/// Read from settings; falls back to 3 when unset or malformed.
pub async fn reminder_lead_days(pool: &PgPool) -> Result<i64, StoreError> {
    let value = get_setting(pool, "reminder_lead_days").await?;
    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(3))
}

// Activity log

/// Record an action in the activity log. Failures are logged and swallowed
/// so an audit write can never fail the operation it describes.
pub async fn log_activity(
    pool: &PgPool,
    user_id: Option<UserId>,
    action: &str,
    description: &str,
) {
    let result = sqlx::query(
        "INSERT INTO activity_logs (user_id, action, description)
        VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(action)
    .bind(description)
    .execute(pool)
    .await;
    if let Err(e) = result {
        tracing::error!("failed to write activity log entry: {e:#}");
    }
}

pub async fn list_activity(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<responses::ActivityLogEntry>, StoreError> {
    #[derive(FromRow)]
    struct Row {
        user_id: Option<UserId>,
        action: String,
        description: String,
        #[sqlx(try_from = "SqlxTs")]
        created_at: Timestamp,
    }
    let rows = sqlx::query_as::<_, Row>(
        "SELECT user_id, action, description, created_at
        FROM activity_logs
        ORDER BY created_at DESC
        LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| responses::ActivityLogEntry {
            user_id: r.user_id,
            action: r.action,
            description: r.description,
            created_at: r.created_at,
        })
        .collect())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Admin permissions required")]
    RequiresAdmin,
    #[error("Not allowed to access this record")]
    Forbidden,
    #[error("Field too long")]
    FieldTooLong,
    #[error("Amount must be positive")]
    InvalidAmount,
    #[error("Payment of {payment} exceeds remaining balance of {remaining}")]
    ExceedsRemaining {
        payment: rust_decimal::Decimal,
        remaining: rust_decimal::Decimal,
    },
    #[error("Kind and principal cannot change once a payment exists")]
    InvalidTransition,
    #[error("Date cannot be in the future")]
    DateInFuture,
    #[error("Due date cannot be in the past")]
    DueDateInPast,
    #[error("Invalid date")]
    InvalidDate,
    #[error("Invalid phone number")]
    InvalidPhone,
    #[error("Contact name must not be empty")]
    MissingContactName,
    #[error("Entry is already fully settled")]
    AlreadySettled,
    #[error("Cannot delete an entry that has recorded payments")]
    HasPayments,
    #[error("Category kind does not match transaction kind")]
    CategoryKindMismatch,
    #[error("User not found")]
    UserNotFound,
    #[error("Debt not found")]
    DebtNotFound,
    #[error("Transaction not found")]
    TransactionNotFound,
    #[error("Category not found")]
    CategoryNotFound,
    #[error("Notification not found")]
    NotificationNotFound,
    #[error("Setting not found")]
    SettingNotFound,
    #[error("Unique constraint violation")]
    NotUnique(#[source] sqlx::Error),
    #[error("Database error")]
    Database(#[source] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.is_unique_violation()
        {
            return StoreError::NotUnique(e);
        }
        StoreError::Database(e)
    }
}
