use jiff::civil;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    CategoryId, DebtId, NotificationId, Role, TransactionId, TransactionKind,
};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const FULL_NAME_MAX_LEN: usize = 255;

/// Validation result for usernames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameValidation {
    Valid,
    TooShort,
    TooLong,
    InvalidCharacters,
    MustStartWithLetter,
}

impl UsernameValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::TooShort => Some("Username must be at least 3 characters"),
            Self::TooLong => Some("Username must be at most 30 characters"),
            Self::InvalidCharacters => Some(
                "Username can only contain letters, numbers, and underscores",
            ),
            Self::MustStartWithLetter => {
                Some("Username must start with a letter")
            }
        }
    }
}

/// Validate a username.
///
/// Rules:
/// - 3-30 characters
/// - ASCII letters, numbers, and underscores only
/// - Must start with a letter
pub fn validate_username(username: &str) -> UsernameValidation {
    if username.len() < USERNAME_MIN_LEN {
        return UsernameValidation::TooShort;
    }
    if username.len() > USERNAME_MAX_LEN {
        return UsernameValidation::TooLong;
    }

    let mut chars = username.chars();

    if let Some(first) = chars.next()
        && !first.is_ascii_alphabetic()
    {
        return UsernameValidation::MustStartWithLetter;
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return UsernameValidation::InvalidCharacters;
        }
    }

    UsernameValidation::Valid
}

#[derive(Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Account creation. The first account ever created becomes the admin;
/// afterwards only admins may create accounts and choose the role.
#[derive(Serialize, Deserialize)]
pub struct CreateAccount {
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Serialize, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateDebt {
    pub debt_id: DebtId,
    pub debt_details: crate::Debt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddPayment {
    pub debt_id: DebtId,
    pub amount: Decimal,
    pub payment_date: civil::Date,
    pub notes: Option<String>,
}

/// Filters for the debt list; all fields optional.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListDebts {
    pub kind: Option<crate::DebtKind>,
    pub status: Option<crate::DebtStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTransaction {
    pub transaction_id: TransactionId,
    pub transaction_details: crate::Transaction,
}

/// Date-range and kind filters for the transaction list.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListTransactions {
    pub from: Option<civil::Date>,
    pub to: Option<civil::Date>,
    pub kind: Option<TransactionKind>,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub kind: TransactionKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i16,
    pub month: i8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkNotificationRead {
    pub notification_id: NotificationId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSetting {
    pub key: String,
    pub value: String,
}
