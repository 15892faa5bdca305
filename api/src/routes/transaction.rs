use actix_identity::Identity;
use actix_web::{HttpResponse, get, post, web};
use sqlx::PgPool;

use crate::store;

use super::{APIError, get_actor};

#[tracing::instrument(
    skip(user, details, pool),
    fields(user_id=tracing::field::Empty),
    ret
)]
#[post("/create_transaction")]
pub async fn create_transaction(
    user: Identity,
    details: web::Json<payloads::Transaction>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let transaction =
        store::transaction::create_transaction(&pool, &actor, &details.0)
            .await?;
    Ok(HttpResponse::Ok().json(transaction.transaction_id))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/get_transaction")]
pub async fn get_transaction(
    user: Identity,
    transaction_id: web::Json<payloads::TransactionId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let transaction =
        store::transaction::get_transaction(&pool, &actor, &transaction_id.0)
            .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[tracing::instrument(
    skip(user, filter, pool),
    fields(user_id=tracing::field::Empty)
)]
#[post("/transactions")]
pub async fn list_transactions(
    user: Identity,
    filter: web::Json<payloads::requests::ListTransactions>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let transactions =
        store::transaction::list_transactions(&pool, &actor, &filter.0)
            .await?;
    Ok(HttpResponse::Ok().json(transactions))
}

#[tracing::instrument(
    skip(user, request, pool),
    fields(user_id=tracing::field::Empty)
)]
#[post("/transaction")]
pub async fn update_transaction(
    user: Identity,
    request: web::Json<payloads::requests::UpdateTransaction>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let transaction =
        store::transaction::update_transaction(&pool, &actor, &request.0)
            .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[post("/delete_transaction")]
pub async fn delete_transaction(
    user: Identity,
    transaction_id: web::Json<payloads::TransactionId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    store::transaction::delete_transaction(&pool, &actor, &transaction_id.0)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool), fields(user_id=tracing::field::Empty))]
#[get("/categories")]
pub async fn list_categories(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let _ = get_actor(&user, &pool).await?;
    let categories = store::transaction::list_categories(&pool).await?;
    Ok(HttpResponse::Ok().json(categories))
}

/// Admin only: categories are shared across the whole business.
#[tracing::instrument(
    skip(user, request, pool),
    fields(user_id=tracing::field::Empty)
)]
#[post("/create_category")]
pub async fn create_category(
    user: Identity,
    request: web::Json<payloads::requests::CreateCategory>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    actor.require_admin()?;
    let category_id = store::transaction::create_category(
        &pool,
        &request.name,
        request.kind,
    )
    .await
    .map_err(|e| match e {
        store::StoreError::NotUnique(_) => APIError::Conflict(
            anyhow::Error::from(e)
                .context("A category with this name already exists"),
        ),
        _ => e.into(),
    })?;
    Ok(HttpResponse::Ok().json(category_id))
}
