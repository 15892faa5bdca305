//! Notifications: the user-facing feed, plus the insert path shared by the
//! debt operations and the sweep.
//!
//! Two shapes of row live in the same table:
//! - immediate notifications (`scheduled_date IS NULL`, `is_sent = true`),
//!   visible as soon as they are created;
//! - scheduled reminders (`scheduled_date` set, `is_sent = false`), hidden
//!   from the feed until the sweep activates them on or after that date.

use jiff::{Timestamp, civil};
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use payloads::{
    DebtId, DebtKind, NotificationId, NotificationKind, OptionalDate, UserId,
    format_currency, responses,
};

use super::{Actor, StoreError};

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: NotificationId,
    /// `None` is a broadcast, visible to every user.
    pub user_id: Option<UserId>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_debt_id: Option<DebtId>,
    #[sqlx(try_from = "OptionalDate")]
    pub scheduled_date: Option<civil::Date>,
    pub dedup_bucket: Option<i32>,
    pub is_read: bool,
    pub is_sent: bool,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
}

impl From<NotificationRow> for responses::Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            title: row.title,
            message: row.message,
            related_debt_id: row.related_debt_id,
            scheduled_date: row.scheduled_date,
            is_read: row.is_read,
            is_sent: row.is_sent,
            created_at: row.created_at,
        }
    }
}

pub struct NewNotification<'a> {
    /// `None` addresses every user (broadcast).
    pub user_id: Option<UserId>,
    pub kind: NotificationKind,
    pub title: &'a str,
    pub message: &'a str,
    pub related_debt_id: Option<DebtId>,
    pub scheduled_date: Option<civil::Date>,
    /// Weekly dedup bucket; set only by the sweep's due reminders.
    pub dedup_bucket: Option<i32>,
}

/// Insert a notification. `created_at` comes from the caller's clock so
/// the sweep's lookback and retention windows stay consistent under mocked
/// time.
///
/// Returns false when a reminder in the same dedup bucket already exists
/// (the partial unique index absorbs the race between two sweep runs).
pub async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    notification: &NewNotification<'_>,
    created_at: Timestamp,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        "INSERT INTO notifications (
            user_id, kind, title, message, related_debt_id,
            scheduled_date, dedup_bucket, is_sent, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (related_debt_id, kind, dedup_bucket)
            WHERE dedup_bucket IS NOT NULL
            DO NOTHING",
    )
    .bind(notification.user_id)
    .bind(notification.kind)
    .bind(notification.title)
    .bind(notification.message)
    .bind(notification.related_debt_id)
    .bind(notification.scheduled_date.map(|d| d.to_sqlx()))
    .bind(notification.dedup_bucket)
    .bind(notification.scheduled_date.is_none())
    .bind(created_at.to_sqlx())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// The actor's notification feed (own rows plus broadcasts), most recent
/// first. Scheduled reminders that have not fired yet are excluded.
pub async fn list_notifications(
    pool: &PgPool,
    actor: &Actor,
) -> Result<Vec<responses::Notification>, StoreError> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT * FROM notifications
        WHERE (user_id = $1 OR user_id IS NULL) AND is_sent = true
        ORDER BY created_at DESC
        LIMIT 200",
    )
    .bind(actor.user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn unread_count(
    pool: &PgPool,
    actor: &Actor,
) -> Result<i64, StoreError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications
        WHERE (user_id = $1 OR user_id IS NULL)
            AND is_sent = true AND is_read = false",
    )
    .bind(actor.user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn mark_read(
    pool: &PgPool,
    actor: &Actor,
    notification_id: &NotificationId,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = true
        WHERE id = $1 AND user_id = $2",
    )
    .bind(notification_id)
    .bind(actor.user_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotificationNotFound);
    }
    Ok(())
}

pub async fn mark_all_read(
    pool: &PgPool,
    actor: &Actor,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE notifications SET is_read = true
        WHERE user_id = $1 AND is_sent = true AND is_read = false",
    )
    .bind(actor.user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_notification(
    pool: &PgPool,
    actor: &Actor,
    notification_id: &NotificationId,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "DELETE FROM notifications WHERE id = $1 AND user_id = $2",
    )
    .bind(notification_id)
    .bind(actor.user_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotificationNotFound);
    }
    Ok(())
}

/// Delete the actor's read notifications; returns the number removed.
pub async fn clear_read(
    pool: &PgPool,
    actor: &Actor,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "DELETE FROM notifications WHERE user_id = $1 AND is_read = true",
    )
    .bind(actor.user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

// Message builders. Pure so they can be unit tested without a database.

const DEDUP_EPOCH: civil::Date = civil::date(2000, 1, 1);

/// Epoch-aligned week number for the reminder dedup index: reminders for
/// the same debt created in the same epoch week (weeks counted from
/// 2000-01-01) share a bucket. Two sweep days can fall in adjacent buckets
/// even when fewer than seven days apart; the sweep's look-back query is
/// the real seven-day guard, the bucket only absorbs concurrent runs.
pub fn dedup_bucket(date: civil::Date) -> i32 {
    let days = (date - DEDUP_EPOCH).get_days() as i64;
    days.div_euclid(7) as i32
}

fn subject(kind: DebtKind, contact_name: &str) -> String {
    match kind {
        DebtKind::Debt => format!("Debt to {contact_name}"),
        DebtKind::Receivable => format!("Receivable from {contact_name}"),
    }
}

fn days_phrase(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

pub fn reminder_title(kind: DebtKind) -> String {
    format!("{} due reminder", kind.label())
}

/// Due reminder body, phrased relative to `today`.
pub fn reminder_message(
    kind: DebtKind,
    contact_name: &str,
    remaining: Decimal,
    due_date: civil::Date,
    today: civil::Date,
) -> String {
    let subject = subject(kind, contact_name);
    let amount = format_currency(remaining);
    let days = (due_date - today).get_days() as i64;
    if days < 0 {
        format!(
            "{subject} of {amount} is overdue by {}.",
            days_phrase(-days)
        )
    } else if days == 0 {
        format!("{subject} of {amount} is due today.")
    } else if days == 1 {
        format!("{subject} of {amount} is due tomorrow.")
    } else {
        format!("{subject} of {amount} is due in {days} days.")
    }
}

pub fn scheduled_reminder_message(
    kind: DebtKind,
    contact_name: &str,
    amount: Decimal,
    due_date: civil::Date,
) -> String {
    format!(
        "{} of {} is due on {due_date}.",
        subject(kind, contact_name),
        format_currency(amount)
    )
}

pub fn settlement_message(
    kind: DebtKind,
    contact_name: &str,
    amount: Decimal,
) -> String {
    format!(
        "{} of {} has been fully settled.",
        subject(kind, contact_name),
        format_currency(amount)
    )
}

pub fn month_name(month: i8) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "?",
    }
}

pub fn summary_title(year: i16, month: i8) -> String {
    format!("Monthly summary: {} {year}", month_name(month))
}

pub fn summary_message(
    income: Decimal,
    expense: Decimal,
    transaction_count: i64,
) -> String {
    let net = income - expense;
    let label = if net < Decimal::ZERO { "Loss" } else { "Profit" };
    format!(
        "Recorded {transaction_count} transactions. Income {}, expense {}. {label}: {}.",
        format_currency(income),
        format_currency(expense),
        format_currency(net.abs())
    )
}
