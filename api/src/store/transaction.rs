//! Income/expense ledger entries, their categories, and the aggregate
//! queries behind the monthly report and dashboard.

use jiff::{Span, Timestamp, civil};
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use payloads::{
    CategoryId, TransactionId, TransactionKind, UserId, requests, responses,
};

use super::{Actor, StoreError, log_activity};

/// A transaction row joined with its category name.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: TransactionId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    #[sqlx(try_from = "jiff_sqlx::Date")]
    pub transaction_date: civil::Date,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
    pub category_name: String,
}

impl From<TransactionRow> for responses::Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            transaction_id: row.id,
            owner_id: row.user_id,
            transaction_details: payloads::Transaction {
                kind: row.kind,
                category_id: row.category_id,
                amount: row.amount,
                description: row.description,
                transaction_date: row.transaction_date,
            },
            category_name: row.category_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const TRANSACTION_COLUMNS: &str = "t.id, t.user_id, t.category_id, t.kind,
    t.amount, t.description, t.transaction_date, t.created_at, t.updated_at,
    c.name AS category_name";

/// Validate details and check that the category exists and matches the
/// transaction kind. Returns the normalized amount.
async fn validate_details(
    pool: &PgPool,
    details: &payloads::Transaction,
) -> Result<Decimal, StoreError> {
    if details.description.len() > payloads::DESCRIPTION_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    let amount = details.amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(StoreError::InvalidAmount);
    }
    let category_kind = sqlx::query_scalar::<_, TransactionKind>(
        "SELECT kind FROM categories WHERE id = $1",
    )
    .bind(details.category_id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::CategoryNotFound)?;
    if category_kind != details.kind {
        return Err(StoreError::CategoryKindMismatch);
    }
    Ok(amount)
}

async fn fetch_row(
    pool: &PgPool,
    transaction_id: &TransactionId,
) -> Result<TransactionRow, StoreError> {
    sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS}
        FROM transactions t JOIN categories c ON t.category_id = c.id
        WHERE t.id = $1",
    ))
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::TransactionNotFound)
}

pub async fn create_transaction(
    pool: &PgPool,
    actor: &Actor,
    details: &payloads::Transaction,
) -> Result<responses::Transaction, StoreError> {
    let amount = validate_details(pool, details).await?;
    let id = sqlx::query_scalar::<_, TransactionId>(
        "INSERT INTO transactions (
            user_id, category_id, kind, amount, description, transaction_date
        ) VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id",
    )
    .bind(actor.user_id)
    .bind(details.category_id)
    .bind(details.kind)
    .bind(amount)
    .bind(&details.description)
    .bind(details.transaction_date.to_sqlx())
    .fetch_one(pool)
    .await?;

    let row = fetch_row(pool, &id).await?;
    log_activity(
        pool,
        Some(actor.user_id),
        "transaction_created",
        &format!(
            "{:?} of {} in {}",
            details.kind,
            payloads::format_currency(amount),
            row.category_name
        ),
    )
    .await;
    Ok(row.into())
}

pub async fn get_transaction(
    pool: &PgPool,
    actor: &Actor,
    transaction_id: &TransactionId,
) -> Result<responses::Transaction, StoreError> {
    let row = fetch_row(pool, transaction_id).await?;
    if !actor.can_access(&row.user_id) {
        return Err(StoreError::Forbidden);
    }
    Ok(row.into())
}

pub async fn list_transactions(
    pool: &PgPool,
    actor: &Actor,
    filter: &requests::ListTransactions,
) -> Result<Vec<responses::Transaction>, StoreError> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS}
        FROM transactions t JOIN categories c ON t.category_id = c.id
        WHERE ($1::uuid IS NULL OR t.user_id = $1)
            AND ($2::date IS NULL OR t.transaction_date >= $2)
            AND ($3::date IS NULL OR t.transaction_date <= $3)
            AND ($4::transaction_kind IS NULL OR t.kind = $4)
            AND ($5::uuid IS NULL OR t.category_id = $5)
        ORDER BY t.transaction_date DESC, t.created_at DESC",
    ))
    .bind(actor.owner_filter())
    .bind(filter.from.map(|d| d.to_sqlx()))
    .bind(filter.to.map(|d| d.to_sqlx()))
    .bind(filter.kind)
    .bind(filter.category_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn update_transaction(
    pool: &PgPool,
    actor: &Actor,
    request: &requests::UpdateTransaction,
) -> Result<responses::Transaction, StoreError> {
    let existing = fetch_row(pool, &request.transaction_id).await?;
    if !actor.can_access(&existing.user_id) {
        return Err(StoreError::Forbidden);
    }
    let details = &request.transaction_details;
    let amount = validate_details(pool, details).await?;

    sqlx::query(
        "UPDATE transactions SET
            category_id = $1, kind = $2, amount = $3,
            description = $4, transaction_date = $5
        WHERE id = $6",
    )
    .bind(details.category_id)
    .bind(details.kind)
    .bind(amount)
    .bind(&details.description)
    .bind(details.transaction_date.to_sqlx())
    .bind(existing.id)
    .execute(pool)
    .await?;

    let row = fetch_row(pool, &existing.id).await?;
    log_activity(
        pool,
        Some(actor.user_id),
        "transaction_updated",
        &format!(
            "{:?} of {} in {}",
            details.kind,
            payloads::format_currency(amount),
            row.category_name
        ),
    )
    .await;
    Ok(row.into())
}

pub async fn delete_transaction(
    pool: &PgPool,
    actor: &Actor,
    transaction_id: &TransactionId,
) -> Result<(), StoreError> {
    let existing = fetch_row(pool, transaction_id).await?;
    if !actor.can_access(&existing.user_id) {
        return Err(StoreError::Forbidden);
    }
    sqlx::query("DELETE FROM transactions WHERE id = $1")
        .bind(existing.id)
        .execute(pool)
        .await?;
    log_activity(
        pool,
        Some(actor.user_id),
        "transaction_deleted",
        &format!(
            "{:?} of {} in {}",
            existing.kind,
            payloads::format_currency(existing.amount),
            existing.category_name
        ),
    )
    .await;
    Ok(())
}

// Categories

pub async fn list_categories(
    pool: &PgPool,
) -> Result<Vec<responses::Category>, StoreError> {
    let categories = sqlx::query_as::<_, responses::Category>(
        "SELECT id, name, kind FROM categories ORDER BY kind, name",
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn create_category(
    pool: &PgPool,
    name: &str,
    kind: TransactionKind,
) -> Result<CategoryId, StoreError> {
    if name.trim().is_empty() || name.len() > 100 {
        return Err(StoreError::FieldTooLong);
    }
    let id = sqlx::query_scalar::<_, CategoryId>(
        "INSERT INTO categories (name, kind) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(kind)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

// Aggregates

/// Income total, expense total, and transaction count over an inclusive
/// date range. `owner` of `None` aggregates the whole business.
pub async fn period_totals(
    pool: &PgPool,
    from: civil::Date,
    to: civil::Date,
    owner: Option<UserId>,
) -> Result<(Decimal, Decimal, i64), StoreError> {
    let totals = sqlx::query_as::<_, (Decimal, Decimal, i64)>(
        "SELECT
            COALESCE(SUM(amount) FILTER (WHERE kind = 'income'), 0),
            COALESCE(SUM(amount) FILTER (WHERE kind = 'expense'), 0),
            COUNT(*)
        FROM transactions
        WHERE transaction_date >= $1 AND transaction_date <= $2
            AND ($3::uuid IS NULL OR user_id = $3)",
    )
    .bind(from.to_sqlx())
    .bind(to.to_sqlx())
    .bind(owner)
    .fetch_one(pool)
    .await?;
    Ok(totals)
}

pub async fn monthly_report(
    pool: &PgPool,
    actor: &Actor,
    year: i16,
    month: i8,
) -> Result<responses::MonthlyReport, StoreError> {
    let first = civil::Date::new(year, month, 1)
        .map_err(|_| StoreError::InvalidDate)?;
    let last = first.last_of_month();

    let (total_income, total_expense, transaction_count) =
        period_totals(pool, first, last, actor.owner_filter()).await?;

    let by_category = sqlx::query_as::<_, responses::CategoryTotal>(
        "SELECT c.name AS category_name, t.kind, SUM(t.amount) AS total
        FROM transactions t JOIN categories c ON t.category_id = c.id
        WHERE t.transaction_date >= $1 AND t.transaction_date <= $2
            AND ($3::uuid IS NULL OR t.user_id = $3)
        GROUP BY c.name, t.kind
        ORDER BY total DESC",
    )
    .bind(first.to_sqlx())
    .bind(last.to_sqlx())
    .bind(actor.owner_filter())
    .fetch_all(pool)
    .await?;

    Ok(responses::MonthlyReport {
        year,
        month,
        total_income,
        total_expense,
        profit_loss: total_income - total_expense,
        transaction_count,
        by_category,
    })
}

pub async fn dashboard_summary(
    pool: &PgPool,
    actor: &Actor,
    today: civil::Date,
) -> Result<responses::DashboardSummary, StoreError> {
    let (month_income, month_expense, _) = period_totals(
        pool,
        today.first_of_month(),
        today.last_of_month(),
        actor.owner_filter(),
    )
    .await?;

    let due_soon_end = today
        .checked_add(Span::new().days(3))
        .map_err(anyhow::Error::from)?;

    let (outstanding_debt, outstanding_receivable, due_soon_count, overdue_count) =
        sqlx::query_as::<_, (Decimal, Decimal, i64, i64)>(
            "SELECT
                COALESCE(SUM(remaining_amount)
                    FILTER (WHERE kind = 'debt' AND status <> 'paid'), 0),
                COALESCE(SUM(remaining_amount)
                    FILTER (WHERE kind = 'receivable' AND status <> 'paid'), 0),
                COUNT(*) FILTER (WHERE status IN ('pending', 'partial')
                    AND due_date >= $2 AND due_date <= $3),
                COUNT(*) FILTER (WHERE status = 'overdue'
                    OR (due_date < $2 AND status IN ('pending', 'partial')))
            FROM debts
            WHERE ($1::uuid IS NULL OR user_id = $1)",
        )
        .bind(actor.owner_filter())
        .bind(today.to_sqlx())
        .bind(due_soon_end.to_sqlx())
        .fetch_one(pool)
        .await?;

    let unread_notifications =
        super::notification::unread_count(pool, actor).await?;

    Ok(responses::DashboardSummary {
        month_income,
        month_expense,
        outstanding_debt,
        outstanding_receivable,
        due_soon_count,
        overdue_count,
        unread_notifications,
    })
}
