use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use sqlx::PgPool;

use crate::Config;
use crate::store;
use crate::time::TimeSource;

use super::{APIError, business_today, get_actor};

#[tracing::instrument(
    skip(user, request, pool),
    fields(user_id=tracing::field::Empty)
)]
#[post("/monthly_report")]
pub async fn monthly_report(
    user: Identity,
    request: web::Json<payloads::requests::MonthlyReport>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let report = store::transaction::monthly_report(
        &pool,
        &actor,
        request.year,
        request.month,
    )
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[tracing::instrument(
    skip(user, pool, time_source, config),
    fields(user_id=tracing::field::Empty)
)]
#[get("/dashboard_summary")]
pub async fn dashboard_summary(
    user: Identity,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    config: web::Data<Config>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let today = business_today(&time_source, &config);
    let summary =
        store::transaction::dashboard_summary(&pool, &actor, today).await?;
    Ok(HttpResponse::Ok().json(summary))
}
