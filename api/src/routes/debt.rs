use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use sqlx::PgPool;

use crate::Config;
use crate::store;
use crate::time::TimeSource;

use super::{APIError, business_today, get_actor};

#[tracing::instrument(
    skip(user, details, pool, time_source, config),
    fields(user_id=tracing::field::Empty),
    ret
)]
#[post("/create_debt")]
pub async fn create_debt(
    user: Identity,
    details: web::Json<payloads::Debt>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let today = business_today(&time_source, &config);
    let lead_days = store::reminder_lead_days(&pool).await?;
    let debt = store::debt::create_debt(
        &pool,
        &actor,
        &details.0,
        today,
        lead_days,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(debt.debt_id))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/get_debt")]
pub async fn get_debt(
    user: Identity,
    debt_id: web::Json<payloads::DebtId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let debt = store::debt::get_debt(&pool, &actor, &debt_id.0).await?;
    Ok(HttpResponse::Ok().json(debt))
}

#[tracing::instrument(
    skip(user, filter, pool, time_source, config),
    fields(user_id=tracing::field::Empty)
)]
#[post("/debts")]
pub async fn list_debts(
    user: Identity,
    filter: web::Json<payloads::requests::ListDebts>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let today = business_today(&time_source, &config);
    let debts =
        store::debt::list_debts(&pool, &actor, &filter.0, today).await?;
    Ok(HttpResponse::Ok().json(debts))
}

#[tracing::instrument(
    skip(user, request, pool, time_source, config),
    fields(user_id=tracing::field::Empty)
)]
#[post("/debt")]
pub async fn update_debt(
    user: Identity,
    request: web::Json<payloads::requests::UpdateDebt>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let today = business_today(&time_source, &config);
    let lead_days = store::reminder_lead_days(&pool).await?;
    let debt = store::debt::update_debt(
        &pool,
        &actor,
        &request.0,
        today,
        lead_days,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(debt))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/delete_debt")]
pub async fn delete_debt(
    user: Identity,
    debt_id: web::Json<payloads::DebtId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    store::debt::delete_debt(&pool, &actor, &debt_id.0).await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(
    skip(user, request, pool, time_source, config),
    fields(user_id=tracing::field::Empty)
)]
#[post("/add_payment")]
pub async fn add_payment(
    user: Identity,
    request: web::Json<payloads::requests::AddPayment>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let today = business_today(&time_source, &config);
    let debt = store::debt::apply_payment(
        &pool,
        &actor,
        &request.0,
        today,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(debt))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/payments")]
pub async fn list_payments(
    user: Identity,
    debt_id: web::Json<payloads::DebtId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let payments =
        store::debt::list_payments(&pool, &actor, &debt_id.0).await?;
    Ok(HttpResponse::Ok().json(payments))
}
