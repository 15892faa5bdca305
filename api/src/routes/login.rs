use actix_identity::Identity;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, get, post, web};
use payloads::Role;
use secrecy::SecretBox;
use sqlx::PgPool;

use crate::password::{
    self, AuthError, Credentials, PASSWORD_MIN_LEN, validate_credentials,
};
use crate::store;

use super::{APIError, get_actor, get_user_id};

#[tracing::instrument(
    skip(credentials, pool),
    fields(username=tracing::field::Empty, user_id=tracing::field::Empty),
    ret,
)]
#[post("/login")]
pub async fn login(
    request: HttpRequest,
    credentials: web::Json<Credentials>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    tracing::Span::current()
        .record("username", tracing::field::display(&credentials.username));
    match validate_credentials(credentials.0, &pool).await {
        Ok(user_id) => {
            tracing::Span::current()
                .record("user_id", tracing::field::display(&user_id));
            Identity::login(&request.extensions(), user_id.to_string())
                .map_err(|e| APIError::UnexpectedError(e.into()))?;
            Ok(HttpResponse::Ok().finish())
        }
        Err(e) => {
            let e = match e {
                AuthError::InvalidCredentials(_) => {
                    APIError::AuthError(e.into())
                }
                AuthError::UnexpectedError(_) => {
                    APIError::UnexpectedError(e.into())
                }
            };
            Err(e)
        }
    }
}

#[tracing::instrument(skip(user))]
#[post("/login_check")]
pub async fn login_check(user: Identity) -> Result<HttpResponse, APIError> {
    get_user_id(&user)?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user))]
#[post("/logout")]
pub async fn logout(user: Identity) -> Result<HttpResponse, APIError> {
    let _ = get_user_id(&user); // to instrument the user_id, if exists
    user.logout();
    Ok(HttpResponse::Ok().finish())
}

/// Create an account. The very first account bootstraps the installation
/// and is always an admin; after that, only admins may create accounts and
/// pick the role.
#[tracing::instrument(skip(user, details, pool))]
#[post("/create_account")]
pub async fn create_account(
    user: Option<Identity>,
    details: web::Json<payloads::requests::CreateAccount>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let details = details.0;

    let validation = payloads::requests::validate_username(&details.username);
    if let Some(message) = validation.error_message() {
        return Err(APIError::BadRequest(anyhow::anyhow!("{message}")));
    }
    if details.full_name.trim().is_empty()
        || details.full_name.len() > payloads::requests::FULL_NAME_MAX_LEN
    {
        return Err(APIError::BadRequest(anyhow::anyhow!(
            "Full name must be 1-{} characters",
            payloads::requests::FULL_NAME_MAX_LEN
        )));
    }
    if details.password.len() < PASSWORD_MIN_LEN {
        return Err(APIError::BadRequest(anyhow::anyhow!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }

    let role = if store::user_count(&pool).await? == 0 {
        // bootstrap: whoever sets up the install becomes the admin
        Role::Admin
    } else {
        let user = user.ok_or_else(|| {
            APIError::AuthError(anyhow::anyhow!(
                "Only admins may create accounts"
            ))
        })?;
        let actor = get_actor(&user, &pool).await?;
        actor.require_admin()?;
        details.role
    };

    let user_id = password::create_user(
        &details.username,
        &details.full_name,
        SecretBox::new(Box::new(details.password)),
        role,
        &pool,
    )
    .await
    .map_err(|e| match e {
        store::StoreError::NotUnique(_) => APIError::Conflict(
            anyhow::Error::from(e).context("Username is already taken"),
        ),
        _ => e.into(),
    })?;

    store::log_activity(
        &pool,
        Some(user_id),
        "account_created",
        &format!("{} ({:?})", details.username, role),
    )
    .await;

    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/change_password")]
pub async fn change_password(
    user: Identity,
    request: web::Json<payloads::requests::ChangePassword>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let actor = get_actor(&user, &pool).await?;
    let user_row = store::read_user(&pool, &actor.user_id).await?;

    if request.new_password.len() < PASSWORD_MIN_LEN {
        return Err(APIError::BadRequest(anyhow::anyhow!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }

    // Re-verify the current password before accepting the change.
    let request = request.0;
    validate_credentials(
        Credentials {
            username: user_row.username,
            password: SecretBox::new(Box::new(request.current_password)),
        },
        &pool,
    )
    .await
    .map_err(|e| match e {
        AuthError::InvalidCredentials(_) => APIError::AuthError(e.into()),
        AuthError::UnexpectedError(_) => APIError::UnexpectedError(e.into()),
    })?;

    password::change_password(
        actor.user_id,
        SecretBox::new(Box::new(request.new_password)),
        &pool,
    )
    .await
    .map_err(APIError::UnexpectedError)?;

    let response = payloads::responses::SuccessMessage {
        message: "Password has been changed successfully.".to_string(),
    };
    Ok(HttpResponse::Ok().json(response))
}

#[tracing::instrument(skip(user, pool))]
#[get("/user_profile")]
pub async fn user_profile(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user_id = get_user_id(&user)?;
    let user_data = store::read_user(&pool, &user_id).await?;
    let profile: payloads::responses::UserProfile = user_data.into();
    Ok(HttpResponse::Ok().json(profile))
}
