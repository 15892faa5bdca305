use jiff::Span;
use payloads::{NotificationKind, requests};
use reqwest::StatusCode;
use rust_decimal::dec;

use test_helpers::{
    assert_status_code, payment, receivable_details, spawn_app,
};

/// Settle a receivable to produce one notification in the feed.
async fn settle_one(app: &test_helpers::TestApp) -> anyhow::Result<()> {
    let debt_id = app.client.create_debt(&receivable_details(None)).await?;
    app.client
        .add_payment(&payment(debt_id, dec!(150000), app.today()))
        .await?;
    Ok(())
}

#[tokio::test]
async fn feed_lifecycle() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    settle_one(&app).await?;

    let notifications = app.client.list_notifications().await?;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::General);
    assert!(!notifications[0].is_read);
    assert_eq!(app.client.unread_count().await?, 1);

    app.client
        .mark_notification_read(&requests::MarkNotificationRead {
            notification_id: notifications[0].id,
        })
        .await?;
    assert_eq!(app.client.unread_count().await?, 0);

    let deleted = app.client.clear_read_notifications().await?;
    assert_eq!(deleted, 1);
    assert!(app.client.list_notifications().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn mark_all_and_delete() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    settle_one(&app).await?;
    settle_one(&app).await?;

    assert_eq!(app.client.unread_count().await?, 2);
    app.client.mark_all_read().await?;
    assert_eq!(app.client.unread_count().await?, 0);

    let notifications = app.client.list_notifications().await?;
    app.client.delete_notification(&notifications[0].id).await?;
    assert_eq!(app.client.list_notifications().await?.len(), 1);

    // deleting it again is a 404
    let result = app.client.delete_notification(&notifications[0].id).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn notifications_are_private() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.create_bob_cashier().await?;
    settle_one(&app).await?;

    let notifications = app.client.list_notifications().await?;
    let alices = notifications[0].id;

    // bob can't see, read, or delete alice's notification
    app.login_bob().await?;
    assert!(app.client.list_notifications().await?.is_empty());
    let result = app
        .client
        .mark_notification_read(&requests::MarkNotificationRead {
            notification_id: alices,
        })
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);
    let result = app.client.delete_notification(&alices).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn scheduled_reminders_stay_out_of_the_feed() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    // Due in 10 days with a 3-day lead: the reminder is created now but
    // scheduled for later, so the feed stays empty until the sweep fires it.
    let due = app.today() + Span::new().days(10);
    app.client.create_debt(&receivable_details(Some(due))).await?;

    assert!(app.client.list_notifications().await?.is_empty());
    assert_eq!(app.client.unread_count().await?, 0);

    Ok(())
}
