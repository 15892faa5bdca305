use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use sqlx::PgPool;

use crate::store;

use super::{APIError, get_actor};

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[get("/notifications")]
pub async fn list_notifications(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let notifications =
        store::notification::list_notifications(&pool, &actor).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[get("/unread_count")]
pub async fn unread_count(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let count = store::notification::unread_count(&pool, &actor).await?;
    Ok(HttpResponse::Ok().json(count))
}

#[tracing::instrument(
    skip(user, request, pool),
    fields(user_id=tracing::field::Empty)
)]
#[post("/mark_notification_read")]
pub async fn mark_notification_read(
    user: Identity,
    request: web::Json<payloads::requests::MarkNotificationRead>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    store::notification::mark_read(&pool, &actor, &request.notification_id)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/mark_all_read")]
pub async fn mark_all_read(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    store::notification::mark_all_read(&pool, &actor).await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/delete_notification")]
pub async fn delete_notification(
    user: Identity,
    notification_id: web::Json<payloads::NotificationId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    store::notification::delete_notification(
        &pool,
        &actor,
        &notification_id.0,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/clear_read_notifications")]
pub async fn clear_read_notifications(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let deleted = store::notification::clear_read(&pool, &actor).await?;
    Ok(HttpResponse::Ok().json(deleted))
}
