pub mod debt;
pub mod login;
pub mod notification;
pub mod report;
pub mod settings;
pub mod transaction;

use actix_identity::Identity;
use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{self, StoreError};

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api")
        .service(health_check)
        .service(login::login)
        .service(login::login_check)
        .service(login::logout)
        .service(login::create_account)
        .service(login::change_password)
        .service(login::user_profile)
        .service(debt::create_debt)
        .service(debt::get_debt)
        .service(debt::list_debts)
        .service(debt::update_debt)
        .service(debt::delete_debt)
        .service(debt::add_payment)
        .service(debt::list_payments)
        .service(transaction::create_transaction)
        .service(transaction::get_transaction)
        .service(transaction::list_transactions)
        .service(transaction::update_transaction)
        .service(transaction::delete_transaction)
        .service(transaction::list_categories)
        .service(transaction::create_category)
        .service(notification::list_notifications)
        .service(notification::unread_count)
        .service(notification::mark_notification_read)
        .service(notification::mark_all_read)
        .service(notification::delete_notification)
        .service(notification::clear_read_notifications)
        .service(report::monthly_report)
        .service(report::dashboard_summary)
        .service(settings::get_settings)
        .service(settings::update_setting)
        .service(settings::list_activity)
        .service(settings::run_sweep)
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Insufficient permissions")]
    Forbidden(#[source] anyhow::Error),
    #[error("Bad request")]
    BadRequest(#[source] anyhow::Error),
    #[error("Not found")]
    NotFound(#[source] anyhow::Error),
    #[error("Conflict")]
    Conflict(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::AuthError(e) => {
                HttpResponse::Unauthorized().body(format!("{self}: {e}"))
            }
            Self::Forbidden(e) => {
                HttpResponse::Forbidden().body(format!("{self}: {e}"))
            }
            Self::BadRequest(e) => {
                HttpResponse::BadRequest().body(format!("{self}: {e}"))
            }
            Self::NotFound(e) => {
                HttpResponse::NotFound().body(format!("{self}: {e}"))
            }
            Self::Conflict(e) => {
                HttpResponse::Conflict().body(format!("{self}: {e}"))
            }
            Self::UnexpectedError(_) => {
                HttpResponse::InternalServerError().body(self.to_string())
            }
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(_) => APIError::UnexpectedError(e.into()),
            StoreError::UnexpectedError(_) => {
                APIError::UnexpectedError(e.into())
            }
            StoreError::RequiresAdmin => APIError::Forbidden(e.into()),
            StoreError::Forbidden => APIError::Forbidden(e.into()),
            StoreError::UserNotFound => APIError::NotFound(e.into()),
            StoreError::DebtNotFound => APIError::NotFound(e.into()),
            StoreError::TransactionNotFound => APIError::NotFound(e.into()),
            StoreError::CategoryNotFound => APIError::NotFound(e.into()),
            StoreError::NotificationNotFound => APIError::NotFound(e.into()),
            StoreError::SettingNotFound => APIError::NotFound(e.into()),
            StoreError::AlreadySettled => APIError::Conflict(e.into()),
            StoreError::InvalidTransition => APIError::Conflict(e.into()),
            StoreError::HasPayments => APIError::Conflict(e.into()),
            StoreError::NotUnique(_) => APIError::Conflict(e.into()),
            _ => APIError::BadRequest(e.into()),
        }
    }
}

/// Today's date in the configured business timezone.
fn business_today(
    time_source: &crate::time::TimeSource,
    config: &crate::Config,
) -> jiff::civil::Date {
    crate::time::local_date(time_source.now(), &config.timezone)
}

fn get_user_id(user: &Identity) -> Result<payloads::UserId, APIError> {
    let id_str = user.id().map_err(|e| {
        APIError::AuthError(
            anyhow::Error::from(e).context("Invalid login session"),
        )
    })?;
    // special case: since this is used in so many routes, the user_id is
    // recorded here, but attaches to the span for the api route itself
    tracing::Span::current()
        .record("user_id", tracing::field::display(&id_str));
    Ok(payloads::UserId(
        Uuid::parse_str(&id_str).map_err(anyhow::Error::from)?,
    ))
}

/// Resolve the session to an [`Actor`](store::Actor), verifying that the
/// account still exists and is active.
async fn get_actor(
    user: &Identity,
    pool: &PgPool,
) -> Result<store::Actor, APIError> {
    let user_id = get_user_id(user)?;
    let user_row = store::read_user(pool, &user_id).await.map_err(|e| {
        match e {
            StoreError::UserNotFound => APIError::AuthError(
                anyhow::Error::from(e).context("Unknown session user"),
            ),
            _ => APIError::UnexpectedError(e.into()),
        }
    })?;
    if !user_row.is_active {
        return Err(APIError::AuthError(anyhow::anyhow!(
            "Account is deactivated"
        )));
    }
    Ok(store::Actor {
        user_id: user_row.id,
        role: user_row.role,
    })
}
