//! Shared domain types for the cashbook API and its clients.
//!
//! Everything here is serde-serializable so the same definitions serve the
//! HTTP payloads, the API client, and (behind the `use-sqlx` feature) the
//! backend's database rows.

use derive_more::Display;
use jiff::{Timestamp, civil};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod api_client;
pub mod requests;
pub mod responses;

pub use api_client::{APIClient, ClientError};

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Display,
            Serialize,
            Deserialize,
        )]
        #[cfg_attr(
            feature = "use-sqlx",
            derive(sqlx::Type),
            sqlx(transparent)
        )]
        pub struct $name(pub Uuid);
    };
}

uuid_id!(UserId);
uuid_id!(DebtId);
uuid_id!(PaymentId);
uuid_id!(NotificationId);
uuid_id!(TransactionId);
uuid_id!(CategoryId);

/// Application roles. Admins see and mutate everything; cashiers only their
/// own records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Cashier,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Whether an entry is money the business owes (debt) or money owed to the
/// business (receivable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "debt_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DebtKind {
    Debt,
    Receivable,
}

impl DebtKind {
    /// Display label used in notification messages.
    pub fn label(&self) -> &'static str {
        match self {
            DebtKind::Debt => "Debt",
            DebtKind::Receivable => "Receivable",
        }
    }

    /// The reminder notification kind that corresponds to this entry kind.
    pub fn reminder_kind(&self) -> NotificationKind {
        match self {
            DebtKind::Debt => NotificationKind::DebtReminder,
            DebtKind::Receivable => NotificationKind::ReceivableReminder,
        }
    }
}

/// Persisted payment state of a debt/receivable.
///
/// `Overdue` is a due-date overlay on pending/partial: payments still apply
/// to an overdue entry, and a full payment moves it to `Paid` like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "debt_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "notification_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DebtReminder,
    ReceivableReminder,
    MonthlySummary,
    General,
}

impl NotificationKind {
    pub fn is_reminder(&self) -> bool {
        matches!(
            self,
            NotificationKind::DebtReminder
                | NotificationKind::ReceivableReminder
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "transaction_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// User-supplied details of a debt/receivable; the remaining amount and
/// status are derived server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub kind: DebtKind,
    pub contact_name: String,
    pub contact_phone: Option<String>,
    /// Principal amount, fixed-point currency. Must be positive.
    pub amount: Decimal,
    pub description: String,
    pub due_date: Option<civil::Date>,
}

/// User-supplied details of an income/expense ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub category_id: CategoryId,
    pub amount: Decimal,
    pub description: String,
    pub transaction_date: civil::Date,
}

pub const CONTACT_NAME_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 1000;

/// Format an amount in the Indonesian bookkeeping style:
/// `Rp 1.234.567`, with a `,dd` minor-unit suffix only when nonzero.
pub fn format_currency(amount: Decimal) -> String {
    use rust_decimal::prelude::ToPrimitive;

    let negative = amount.is_sign_negative();
    let amount = amount.abs().round_dp(2);
    let units = amount.trunc().to_i128().unwrap_or(0);
    let cents = (amount.fract() * Decimal::from(100))
        .trunc()
        .to_i64()
        .unwrap_or(0);

    let digits = units.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    if cents == 0 {
        format!("{sign}Rp {grouped}")
    } else {
        format!("{sign}Rp {grouped},{cents:02}")
    }
}

/// Parse a currency string as entered in a form, tolerating the `Rp` prefix
/// and thousands separators. Returns None for inputs with no digits.
pub fn parse_currency(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("Rp")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '-')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.chars().any(|c| c.is_ascii_digit()) {
        cleaned.parse().ok()
    } else {
        None
    }
}

/// Validation result for contact phone numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneValidation {
    Valid,
    BadPrefix,
    BadLength,
    InvalidCharacters,
}

impl PhoneValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Validate an Indonesian mobile number.
///
/// Accepted forms: `+628…`, `628…`, or `08…`, followed by a nonzero digit
/// and six to nine more digits.
pub fn validate_phone(phone: &str) -> PhoneValidation {
    let rest = if let Some(rest) = phone.strip_prefix("+62") {
        rest
    } else if let Some(rest) = phone.strip_prefix("62") {
        rest
    } else if let Some(rest) = phone.strip_prefix('0') {
        rest
    } else {
        return PhoneValidation::BadPrefix;
    };

    let mut chars = rest.chars();
    if chars.next() != Some('8') {
        return PhoneValidation::BadPrefix;
    }
    match chars.next() {
        Some(c) if c.is_ascii_digit() && c != '0' => {}
        Some(_) => return PhoneValidation::BadPrefix,
        None => return PhoneValidation::BadLength,
    }

    let tail: Vec<char> = chars.collect();
    if tail.iter().any(|c| !c.is_ascii_digit()) {
        return PhoneValidation::InvalidCharacters;
    }
    if !(6..=9).contains(&tail.len()) {
        return PhoneValidation::BadLength;
    }
    PhoneValidation::Valid
}

/// Nullable timestamp column helper for sqlx row derives.
#[cfg(feature = "use-sqlx")]
#[derive(sqlx::Type)]
#[sqlx(transparent)]
pub struct OptionalTimestamp(Option<jiff_sqlx::Timestamp>);

#[cfg(feature = "use-sqlx")]
impl From<OptionalTimestamp> for Option<Timestamp> {
    fn from(x: OptionalTimestamp) -> Option<Timestamp> {
        x.0.map(|x| x.to_jiff())
    }
}

/// Nullable date column helper for sqlx row derives.
#[cfg(feature = "use-sqlx")]
#[derive(sqlx::Type)]
#[sqlx(transparent)]
pub struct OptionalDate(Option<jiff_sqlx::Date>);

#[cfg(feature = "use-sqlx")]
impl From<OptionalDate> for Option<civil::Date> {
    fn from(x: OptionalDate) -> Option<civil::Date> {
        x.0.map(|x| x.to_jiff())
    }
}
