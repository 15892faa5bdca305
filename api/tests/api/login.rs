use payloads::{Role, requests};
use reqwest::StatusCode;

use test_helpers::{
    alice_credentials, assert_status_code, bob_account, bob_credentials,
    spawn_app,
};

#[tokio::test]
async fn login_refused() -> anyhow::Result<()> {
    let app = spawn_app().await;

    // test a login with an invalid user
    let body = requests::LoginCredentials {
        username: "random".into(),
        password: "random".into(),
    };
    let result = app.client.login(&body).await;

    match result {
        Err(payloads::ClientError::APIError(code, text)) => {
            assert_eq!(code, StatusCode::UNAUTHORIZED);
            assert_eq!(text, "Authentication failed: Invalid credentials");
        }
        _ => {
            panic!("Expected APIError");
        }
    }

    // login check should fail
    let is_logged_in = app.client.login_check().await?;
    assert!(!is_logged_in);

    Ok(())
}

#[tokio::test]
async fn first_account_becomes_admin() -> anyhow::Result<()> {
    let app = spawn_app().await;

    // The account is created without any session and still succeeds,
    // because the installation has no users yet.
    app.create_alice_admin().await?;

    let is_logged_in = app.client.login_check().await?;
    assert!(is_logged_in);

    let profile = app.client.user_profile().await?;
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.role, Role::Admin);

    Ok(())
}

#[tokio::test]
async fn only_admins_create_further_accounts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    // admin can create a cashier
    app.create_bob_cashier().await?;
    app.login_bob().await?;
    let profile = app.client.user_profile().await?;
    assert_eq!(profile.role, Role::Cashier);

    // the cashier may not create accounts
    let charlie = requests::CreateAccount {
        username: "charlie".into(),
        full_name: "Charlie".into(),
        password: "password789".into(),
        role: Role::Cashier,
    };
    let result = app.client.create_account(&charlie).await;
    assert_status_code(result, StatusCode::FORBIDDEN);

    // neither may an anonymous caller, once the first account exists
    app.client.logout().await?;
    let result = app.client.create_account(&charlie).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn duplicate_username_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    let mut duplicate = bob_account();
    duplicate.username = "alice".into();
    let result = app.client.create_account(&duplicate).await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn invalid_signup_details_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    // username must start with a letter
    let mut body = bob_account();
    body.username = "1bob".into();
    let result = app.client.create_account(&body).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // username too long
    let mut body = bob_account();
    body.username = (0..52).map(|_| "X").collect::<String>();
    let result = app.client.create_account(&body).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // password too short
    let mut body = bob_account();
    body.password = "short".into();
    let result = app.client.create_account(&body).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // full name required
    let mut body = bob_account();
    body.full_name = "  ".into();
    let result = app.client.create_account(&body).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn change_password_requires_current() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    let result = app
        .client
        .change_password(&requests::ChangePassword {
            current_password: "not-the-password".into(),
            new_password: "new-password-1".into(),
        })
        .await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .change_password(&requests::ChangePassword {
            current_password: alice_credentials().password,
            new_password: "new-password-1".into(),
        })
        .await?;
    assert_eq!(response.message, "Password has been changed successfully.");

    // old password no longer works, new one does
    app.client.logout().await?;
    let result = app.client.login(&alice_credentials()).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    app.client
        .login(&requests::LoginCredentials {
            username: "alice".into(),
            password: "new-password-1".into(),
        })
        .await?;

    Ok(())
}

#[tokio::test]
async fn deactivated_account_cannot_login() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.create_bob_cashier().await?;

    sqlx::query("UPDATE users SET is_active = false WHERE username = 'bob'")
        .execute(&app.db_pool)
        .await?;

    let result = app.client.login(&bob_credentials()).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}
