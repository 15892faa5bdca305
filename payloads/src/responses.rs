use jiff::{Timestamp, civil};
#[cfg(feature = "use-sqlx")]
use jiff_sqlx::Timestamp as SqlxTs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    CategoryId, DebtId, DebtStatus, NotificationId, NotificationKind,
    PaymentId, Role, TransactionId, TransactionKind, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessMessage {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

/// A debt/receivable with its server-derived balance state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub debt_id: DebtId,
    pub owner_id: UserId,
    pub debt_details: crate::Debt,
    pub remaining_amount: Decimal,
    pub status: DebtStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: PaymentId,
    pub debt_id: DebtId,
    pub amount: Decimal,
    #[cfg_attr(feature = "use-sqlx", sqlx(try_from = "jiff_sqlx::Date"))]
    pub payment_date: civil::Date,
    pub notes: Option<String>,
    #[cfg_attr(feature = "use-sqlx", sqlx(try_from = "SqlxTs"))]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_debt_id: Option<DebtId>,
    pub scheduled_date: Option<civil::Date>,
    pub is_read: bool,
    pub is_sent: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub owner_id: UserId,
    pub transaction_details: crate::Transaction,
    pub category_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub kind: TransactionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct CategoryTotal {
    pub category_name: String,
    pub kind: TransactionKind,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i16,
    pub month: i8,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub profit_loss: Decimal,
    pub transaction_count: i64,
    pub by_category: Vec<CategoryTotal>,
}

/// The dashboard's at-a-glance numbers for the current month and the
/// outstanding debt book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub month_income: Decimal,
    pub month_expense: Decimal,
    pub outstanding_debt: Decimal,
    pub outstanding_receivable: Decimal,
    pub due_soon_count: i64,
    pub overdue_count: i64,
    pub unread_notifications: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub user_id: Option<UserId>,
    pub action: String,
    pub description: String,
    pub created_at: Timestamp,
}

/// Outcome of one notification sweep run, returned by the admin trigger
/// endpoint and logged by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub marked_overdue: u64,
    pub reminders_created: u64,
    pub activated: u64,
    pub summaries_created: u64,
    pub deleted: u64,
    pub errors: Vec<String>,
}
