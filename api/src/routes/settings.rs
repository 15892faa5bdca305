use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use sqlx::PgPool;

use crate::Config;
use crate::scheduler;
use crate::store;
use crate::time::TimeSource;

use super::{APIError, business_today, get_actor};

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[get("/settings")]
pub async fn get_settings(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let _ = get_actor(&user, &pool).await?;
    let settings = store::get_settings(&pool).await?;
    Ok(HttpResponse::Ok().json(settings))
}

#[tracing::instrument(
    skip(user, request, pool),
    fields(user_id=tracing::field::Empty)
)]
#[post("/setting")]
pub async fn update_setting(
    user: Identity,
    request: web::Json<payloads::requests::UpdateSetting>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    actor.require_admin()?;
    store::update_setting(&pool, &request.key, &request.value).await?;
    store::log_activity(
        &pool,
        Some(actor.user_id),
        "setting_updated",
        &format!("{} = {}", request.key, request.value),
    )
    .await;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[get("/activity")]
pub async fn list_activity(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    actor.require_admin()?;
    let entries = store::list_activity(&pool, 200).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Admin only: run the notification sweep immediately instead of waiting
/// for the scheduler. Returns what the sweep did.
#[tracing::instrument(
    skip(user, pool, time_source, config),
    fields(user_id=tracing::field::Empty),
    ret
)]
#[post("/run_sweep")]
pub async fn run_sweep(
    user: Identity,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    actor.require_admin()?;
    let today = business_today(&time_source, &config);
    let outcome = scheduler::run_notification_sweep(&pool, today)
        .await
        .map_err(APIError::UnexpectedError)?;
    Ok(HttpResponse::Ok().json(outcome))
}
