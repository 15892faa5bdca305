//! Debts and receivables: the balance state machine.
//!
//! `remaining_amount` and `status` are derived state. Every mutation locks
//! the debt row with `SELECT ... FOR UPDATE` and recomputes both inside the
//! same transaction, so two concurrent payments serialize instead of both
//! reading the same starting balance.

use jiff::{Span, Timestamp, civil};
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use payloads::{
    DebtId, DebtKind, DebtStatus, OptionalDate, UserId, format_currency,
    requests, responses,
};

use super::{Actor, StoreError, log_activity};
use crate::store::notification::{self, NewNotification};
use crate::time::TimeSource;

#[derive(Debug, Clone, FromRow)]
pub struct DebtRow {
    pub id: DebtId,
    pub user_id: UserId,
    pub kind: DebtKind,
    pub contact_name: String,
    pub contact_phone: Option<String>,
    pub amount: Decimal,
    pub remaining_amount: Decimal,
    pub description: String,
    #[sqlx(try_from = "OptionalDate")]
    pub due_date: Option<civil::Date>,
    pub status: DebtStatus,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl From<DebtRow> for responses::Debt {
    fn from(row: DebtRow) -> Self {
        Self {
            debt_id: row.id,
            owner_id: row.user_id,
            debt_details: payloads::Debt {
                kind: row.kind,
                contact_name: row.contact_name,
                contact_phone: row.contact_phone,
                amount: row.amount,
                description: row.description,
                due_date: row.due_date,
            },
            remaining_amount: row.remaining_amount,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Normalize and validate user-supplied details. The amount is rounded to
/// two decimal places before any comparison so stored balances never carry
/// sub-cent precision.
fn validate_details(
    details: &payloads::Debt,
) -> Result<payloads::Debt, StoreError> {
    let mut details = details.clone();
    if details.contact_name.trim().is_empty() {
        return Err(StoreError::MissingContactName);
    }
    if details.contact_name.len() > payloads::CONTACT_NAME_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    if details.description.len() > payloads::DESCRIPTION_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    if let Some(phone) = &details.contact_phone
        && !payloads::validate_phone(phone).is_valid()
    {
        return Err(StoreError::InvalidPhone);
    }
    details.amount = details.amount.round_dp(2);
    if details.amount <= Decimal::ZERO {
        return Err(StoreError::InvalidAmount);
    }
    Ok(details)
}

/// Lock a debt row for the remainder of the transaction.
pub async fn get_debt_for_update_tx(
    debt_id: &DebtId,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<DebtRow, StoreError> {
    sqlx::query_as::<_, DebtRow>(
        "SELECT * FROM debts WHERE id = $1 FOR UPDATE",
    )
    .bind(debt_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::DebtNotFound)
}

/// Create a debt/receivable owned by the actor. If a due date is set and
/// the reminder date (due date minus the configured lead days) has not
/// already passed, a scheduled reminder notification is created alongside.
pub async fn create_debt(
    pool: &PgPool,
    actor: &Actor,
    details: &payloads::Debt,
    today: civil::Date,
    lead_days: i64,
    time_source: &TimeSource,
) -> Result<responses::Debt, StoreError> {
    let details = validate_details(details)?;
    if let Some(due_date) = details.due_date
        && due_date < today
    {
        return Err(StoreError::DueDateInPast);
    }
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, DebtRow>(
        "INSERT INTO debts (
            user_id, kind, contact_name, contact_phone, amount,
            remaining_amount, description, due_date
        ) VALUES ($1, $2, $3, $4, $5, $5, $6, $7)
        RETURNING *",
    )
    .bind(actor.user_id)
    .bind(details.kind)
    .bind(&details.contact_name)
    .bind(&details.contact_phone)
    .bind(details.amount)
    .bind(&details.description)
    .bind(details.due_date.map(|d| d.to_sqlx()))
    .fetch_one(&mut *tx)
    .await?;

    if let Some(due_date) = details.due_date {
        let reminder_date = due_date
            .checked_sub(Span::new().days(lead_days))
            .map_err(anyhow::Error::from)?;
        if reminder_date >= today {
            let title = notification::reminder_title(details.kind);
            let message = notification::scheduled_reminder_message(
                details.kind,
                &details.contact_name,
                details.amount,
                due_date,
            );
            notification::insert(
                &mut *tx,
                &NewNotification {
                    user_id: Some(actor.user_id),
                    kind: details.kind.reminder_kind(),
                    title: &title,
                    message: &message,
                    related_debt_id: Some(row.id),
                    scheduled_date: Some(reminder_date),
                    dedup_bucket: None,
                },
                time_source.now(),
            )
            .await?;
        }
    }

    tx.commit().await?;

    log_activity(
        pool,
        Some(actor.user_id),
        "debt_created",
        &format!(
            "{} for {}, {}",
            details.kind.label(),
            details.contact_name,
            format_currency(details.amount)
        ),
    )
    .await;

    Ok(row.into())
}

/// Record a payment against a debt and derive the new balance state.
///
/// The payment must be positive, dated no later than today, and no larger
/// than the remaining balance. A payment that brings the balance to zero
/// settles the entry and emits a settlement notification.
pub async fn apply_payment(
    pool: &PgPool,
    actor: &Actor,
    request: &requests::AddPayment,
    today: civil::Date,
    time_source: &TimeSource,
) -> Result<responses::Debt, StoreError> {
    let amount = request.amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(StoreError::InvalidAmount);
    }
    if request.payment_date > today {
        return Err(StoreError::DateInFuture);
    }

    let mut tx = pool.begin().await?;
    let debt = get_debt_for_update_tx(&request.debt_id, &mut tx).await?;
    if !actor.can_access(&debt.user_id) {
        return Err(StoreError::Forbidden);
    }
    if debt.status == DebtStatus::Paid {
        return Err(StoreError::AlreadySettled);
    }
    if amount > debt.remaining_amount {
        return Err(StoreError::ExceedsRemaining {
            payment: amount,
            remaining: debt.remaining_amount,
        });
    }

    sqlx::query(
        "INSERT INTO debt_payments (debt_id, user_id, amount, payment_date, notes)
        VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(debt.id)
    .bind(actor.user_id)
    .bind(amount)
    .bind(request.payment_date.to_sqlx())
    .bind(&request.notes)
    .execute(&mut *tx)
    .await?;

    let new_remaining = debt.remaining_amount - amount;
    let new_status = if new_remaining.is_zero() {
        DebtStatus::Paid
    } else {
        DebtStatus::Partial
    };

    let updated = sqlx::query_as::<_, DebtRow>(
        "UPDATE debts SET remaining_amount = $1, status = $2
        WHERE id = $3
        RETURNING *",
    )
    .bind(new_remaining)
    .bind(new_status)
    .bind(debt.id)
    .fetch_one(&mut *tx)
    .await?;

    if new_status == DebtStatus::Paid {
        // The entry is settled: any reminder still waiting to fire is moot.
        sqlx::query(
            "DELETE FROM notifications
            WHERE related_debt_id = $1
                AND scheduled_date IS NOT NULL
                AND is_sent = false",
        )
        .bind(debt.id)
        .execute(&mut *tx)
        .await?;

        let message = notification::settlement_message(
            debt.kind,
            &debt.contact_name,
            debt.amount,
        );
        notification::insert(
            &mut *tx,
            &NewNotification {
                user_id: Some(debt.user_id),
                kind: payloads::NotificationKind::General,
                title: "Entry settled",
                message: &message,
                related_debt_id: Some(debt.id),
                scheduled_date: None,
                dedup_bucket: None,
            },
            time_source.now(),
        )
        .await?;
    }

    tx.commit().await?;

    log_activity(
        pool,
        Some(actor.user_id),
        "payment_added",
        &format!(
            "{} paid on {} for {}",
            format_currency(amount),
            debt.kind.label(),
            debt.contact_name
        ),
    )
    .await;

    Ok(updated.into())
}

/// Edit a debt's details. Once the entry has left `pending`, its kind and
/// principal are frozen (payments have been recorded against them); the
/// other fields stay editable until the entry is settled. Any unfired
/// scheduled reminder is replaced to match the new details.
pub async fn update_debt(
    pool: &PgPool,
    actor: &Actor,
    request: &requests::UpdateDebt,
    today: civil::Date,
    lead_days: i64,
    time_source: &TimeSource,
) -> Result<responses::Debt, StoreError> {
    let details = validate_details(&request.debt_details)?;

    let mut tx = pool.begin().await?;
    let debt = get_debt_for_update_tx(&request.debt_id, &mut tx).await?;
    if !actor.can_access(&debt.user_id) {
        return Err(StoreError::Forbidden);
    }
    if debt.status == DebtStatus::Paid {
        return Err(StoreError::AlreadySettled);
    }

    let shape_changed =
        details.kind != debt.kind || details.amount != debt.amount;
    if shape_changed && debt.status != DebtStatus::Pending {
        return Err(StoreError::InvalidTransition);
    }

    // While pending nothing has been paid, so the balance tracks the
    // principal; afterwards both are left untouched.
    let (new_remaining, new_status) = if debt.status == DebtStatus::Pending {
        (details.amount, DebtStatus::Pending)
    } else {
        (debt.remaining_amount, debt.status)
    };

    let updated = sqlx::query_as::<_, DebtRow>(
        "UPDATE debts SET
            kind = $1,
            contact_name = $2,
            contact_phone = $3,
            amount = $4,
            remaining_amount = $5,
            description = $6,
            due_date = $7,
            status = $8
        WHERE id = $9
        RETURNING *",
    )
    .bind(details.kind)
    .bind(&details.contact_name)
    .bind(&details.contact_phone)
    .bind(details.amount)
    .bind(new_remaining)
    .bind(&details.description)
    .bind(details.due_date.map(|d| d.to_sqlx()))
    .bind(new_status)
    .bind(debt.id)
    .fetch_one(&mut *tx)
    .await?;

    // Replace any unfired scheduled reminder with one matching the new
    // details.
    sqlx::query(
        "DELETE FROM notifications
        WHERE related_debt_id = $1
            AND scheduled_date IS NOT NULL
            AND is_sent = false",
    )
    .bind(debt.id)
    .execute(&mut *tx)
    .await?;

    if let Some(due_date) = details.due_date {
        let reminder_date = due_date
            .checked_sub(Span::new().days(lead_days))
            .map_err(anyhow::Error::from)?;
        if reminder_date >= today {
            let title = notification::reminder_title(details.kind);
            let message = notification::scheduled_reminder_message(
                details.kind,
                &details.contact_name,
                details.amount,
                due_date,
            );
            notification::insert(
                &mut *tx,
                &NewNotification {
                    user_id: Some(debt.user_id),
                    kind: details.kind.reminder_kind(),
                    title: &title,
                    message: &message,
                    related_debt_id: Some(debt.id),
                    scheduled_date: Some(reminder_date),
                    dedup_bucket: None,
                },
                time_source.now(),
            )
            .await?;
        }
    }

    tx.commit().await?;

    log_activity(
        pool,
        Some(actor.user_id),
        "debt_updated",
        &format!(
            "{} for {}, {}",
            details.kind.label(),
            details.contact_name,
            format_currency(details.amount)
        ),
    )
    .await;

    Ok(updated.into())
}

/// Delete a debt that has no recorded payments. Related notifications go
/// with it via the foreign key cascade.
pub async fn delete_debt(
    pool: &PgPool,
    actor: &Actor,
    debt_id: &DebtId,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    let debt = get_debt_for_update_tx(debt_id, &mut tx).await?;
    if !actor.can_access(&debt.user_id) {
        return Err(StoreError::Forbidden);
    }

    let payment_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM debt_payments WHERE debt_id = $1",
    )
    .bind(debt.id)
    .fetch_one(&mut *tx)
    .await?;
    if payment_count > 0 {
        return Err(StoreError::HasPayments);
    }

    sqlx::query("DELETE FROM debts WHERE id = $1")
        .bind(debt.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log_activity(
        pool,
        Some(actor.user_id),
        "debt_deleted",
        &format!(
            "{} for {}, {}",
            debt.kind.label(),
            debt.contact_name,
            format_currency(debt.amount)
        ),
    )
    .await;

    Ok(())
}

pub async fn get_debt(
    pool: &PgPool,
    actor: &Actor,
    debt_id: &DebtId,
) -> Result<responses::Debt, StoreError> {
    let row = sqlx::query_as::<_, DebtRow>("SELECT * FROM debts WHERE id = $1")
        .bind(debt_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::DebtNotFound)?;
    if !actor.can_access(&row.user_id) {
        return Err(StoreError::Forbidden);
    }
    Ok(row.into())
}

/// List debts with the actor's scope and the request's filters. Entries
/// whose due date has passed are reclassified first, so the list shows
/// `overdue` without waiting for the next sweep.
pub async fn list_debts(
    pool: &PgPool,
    actor: &Actor,
    filter: &requests::ListDebts,
    today: civil::Date,
) -> Result<Vec<responses::Debt>, StoreError> {
    mark_overdue(pool, today).await?;
    let rows = sqlx::query_as::<_, DebtRow>(
        "SELECT * FROM debts
        WHERE ($1::uuid IS NULL OR user_id = $1)
            AND ($2::debt_kind IS NULL OR kind = $2)
            AND ($3::debt_status IS NULL OR status = $3)
        ORDER BY due_date ASC NULLS LAST, created_at DESC",
    )
    .bind(actor.owner_filter())
    .bind(filter.kind)
    .bind(filter.status)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn list_payments(
    pool: &PgPool,
    actor: &Actor,
    debt_id: &DebtId,
) -> Result<Vec<responses::Payment>, StoreError> {
    // Ownership check rides on the debt lookup.
    let _ = get_debt(pool, actor, debt_id).await?;
    let payments = sqlx::query_as::<_, responses::Payment>(
        "SELECT id, debt_id, amount, payment_date, notes, created_at
        FROM debt_payments
        WHERE debt_id = $1
        ORDER BY payment_date, created_at",
    )
    .bind(debt_id)
    .fetch_all(pool)
    .await?;
    Ok(payments)
}

/// Reclassify entries whose due date has passed. Paid entries are never
/// touched. Runs as the sweep's first step and before every list read.
pub async fn mark_overdue(
    pool: &PgPool,
    today: civil::Date,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "UPDATE debts SET status = 'overdue'
        WHERE due_date IS NOT NULL
            AND due_date < $1
            AND status IN ('pending', 'partial')",
    )
    .bind(today.to_sqlx())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
