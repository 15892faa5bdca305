use jiff::Span;
use payloads::{DebtStatus, NotificationKind, TransactionKind};
use reqwest::StatusCode;
use rust_decimal::dec;

use test_helpers::{
    assert_status_code, payment, receivable_details, spawn_app,
    transaction_details,
};

#[tokio::test]
async fn due_reminders_fire_once_per_week() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.time_source.set("2025-03-10T00:00:00Z".parse().unwrap());

    // due in two days, inside the three-day window
    let due = app.today() + Span::new().days(2);
    let debt_id = app
        .client
        .create_debt(&receivable_details(Some(due)))
        .await?;

    let outcome = app.sweep().await?;
    assert_eq!(outcome.reminders_created, 1);

    let notifications = app.client.list_notifications().await?;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::ReceivableReminder);
    assert_eq!(
        notifications[0].message,
        "Receivable from Budi of Rp 150.000 is due in 2 days."
    );

    // rerunning the same day creates nothing
    let outcome = app.sweep().await?;
    assert_eq!(outcome.reminders_created, 0);

    // eight days later the lookback has lapsed; the entry is now overdue,
    // gets reclassified, and is reminded again with the overdue phrasing
    app.time_source.advance(Span::new().days(8));
    let outcome = app.sweep().await?;
    assert_eq!(outcome.marked_overdue, 1);
    assert_eq!(outcome.reminders_created, 1);

    let debt = app.client.get_debt(&debt_id).await?;
    assert_eq!(debt.status, DebtStatus::Overdue);

    let notifications = app.client.list_notifications().await?;
    assert_eq!(notifications.len(), 2);
    assert_eq!(
        notifications[0].message,
        "Receivable from Budi of Rp 150.000 is overdue by 6 days."
    );

    Ok(())
}

#[tokio::test]
async fn scheduled_reminders_activate_on_their_date() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.time_source.set("2025-03-10T00:00:00Z".parse().unwrap());

    // due on the 20th; the default 3-day lead schedules a reminder for the
    // 17th
    let due = app.today() + Span::new().days(10);
    app.client.create_debt(&receivable_details(Some(due))).await?;

    // nothing due, nothing to activate yet
    let outcome = app.sweep().await?;
    assert_eq!(outcome.reminders_created, 0);
    assert_eq!(outcome.activated, 0);

    // a day past the scheduled date still catches up
    app.time_source.set("2025-03-18T00:00:00Z".parse().unwrap());
    let outcome = app.sweep().await?;
    assert_eq!(outcome.activated, 1);

    let notifications = app.client.list_notifications().await?;
    assert!(notifications.iter().any(|n| {
        n.message == "Receivable from Budi of Rp 150.000 is due on 2025-03-20."
    }));

    Ok(())
}

#[tokio::test]
async fn activation_day_does_not_double_remind() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.time_source.set("2025-03-01T00:00:00Z".parse().unwrap());

    // due on the 20th; the reminder is scheduled for the 17th, long after
    // its creation date has left the sweep's look-back
    let due = app.today() + Span::new().days(19);
    app.client.create_debt(&receivable_details(Some(due))).await?;

    // on the 17th the entry is also inside the three-day due window; the
    // activated reminder must count against the look-back so the sweep
    // does not deliver a second one
    app.time_source.set("2025-03-17T00:00:00Z".parse().unwrap());
    let outcome = app.sweep().await?;
    assert_eq!(outcome.activated, 1);
    assert_eq!(outcome.reminders_created, 0);

    let notifications = app.client.list_notifications().await?;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::ReceivableReminder);

    Ok(())
}

#[tokio::test]
async fn settling_cancels_the_scheduled_reminder() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.time_source.set("2025-03-10T00:00:00Z".parse().unwrap());

    let due = app.today() + Span::new().days(15);
    let debt_id = app
        .client
        .create_debt(&receivable_details(Some(due)))
        .await?;
    app.client
        .add_payment(&payment(debt_id, dec!(150000), app.today()))
        .await?;

    // past the would-be reminder date: nothing left to activate
    app.time_source.set("2025-03-23T00:00:00Z".parse().unwrap());
    let outcome = app.sweep().await?;
    assert_eq!(outcome.activated, 0);
    assert_eq!(outcome.reminders_created, 0);

    let notifications = app.client.list_notifications().await?;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::General);

    Ok(())
}

#[tokio::test]
async fn monthly_summary_on_the_first() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.create_bob_cashier().await?;
    app.time_source.set("2025-02-15T00:00:00Z".parse().unwrap());

    let sales = app.sales_category_id().await?;
    let operational = app.operational_category_id().await?;
    app.client
        .create_transaction(&transaction_details(
            TransactionKind::Income,
            sales,
            dec!(400000),
            app.today() - Span::new().days(5),
        ))
        .await?;
    app.client
        .create_transaction(&transaction_details(
            TransactionKind::Expense,
            operational,
            dec!(150000),
            app.today() - Span::new().days(3),
        ))
        .await?;

    // not the first of the month: no summary
    let outcome = app.sweep().await?;
    assert_eq!(outcome.summaries_created, 0);

    // on the first, only the user with February activity gets a summary
    app.time_source.set("2025-03-01T00:00:00Z".parse().unwrap());
    let outcome = app.sweep().await?;
    assert_eq!(outcome.summaries_created, 1);

    let notifications = app.client.list_notifications().await?;
    let summary = notifications
        .iter()
        .find(|n| n.kind == NotificationKind::MonthlySummary)
        .expect("no summary in the feed");
    assert_eq!(summary.title, "Monthly summary: February 2025");
    assert_eq!(
        summary.message,
        "Recorded 2 transactions. Income Rp 400.000, expense Rp 150.000. \
         Profit: Rp 250.000."
    );

    // the cashier recorded nothing in February and is skipped
    app.login_bob().await?;
    assert!(app.client.list_notifications().await?.is_empty());
    app.login_alice().await?;

    // rerunning the same day sends nothing new
    let outcome = app.sweep().await?;
    assert_eq!(outcome.summaries_created, 0);

    Ok(())
}

#[tokio::test]
async fn no_summary_for_an_empty_month() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.time_source.set("2025-03-01T00:00:00Z".parse().unwrap());

    let outcome = app.sweep().await?;
    assert_eq!(outcome.summaries_created, 0);
    assert!(app.client.list_notifications().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn retention_deletes_old_read_notifications() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.time_source.set("2025-03-10T00:00:00Z".parse().unwrap());

    let debt_id = app
        .client
        .create_debt(&receivable_details(None))
        .await?;
    app.client
        .add_payment(&payment(debt_id, dec!(150000), app.today()))
        .await?;
    app.client.mark_all_read().await?;

    // young enough to survive
    let outcome = app.sweep().await?;
    assert_eq!(outcome.deleted, 0);

    app.age_notifications(31).await?;
    let outcome = app.sweep().await?;
    assert_eq!(outcome.deleted, 1);
    assert!(app.client.list_notifications().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn unread_notifications_survive_retention() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.time_source.set("2025-03-10T00:00:00Z".parse().unwrap());

    let debt_id = app
        .client
        .create_debt(&receivable_details(None))
        .await?;
    app.client
        .add_payment(&payment(debt_id, dec!(150000), app.today()))
        .await?;

    app.age_notifications(60).await?;
    let outcome = app.sweep().await?;
    assert_eq!(outcome.deleted, 0);
    assert_eq!(app.client.list_notifications().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn sweep_endpoint_is_admin_only() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.create_bob_cashier().await?;

    let outcome = app.client.run_sweep().await?;
    assert!(outcome.errors.is_empty());

    app.login_bob().await?;
    let result = app.client.run_sweep().await;
    assert_status_code(result, StatusCode::FORBIDDEN);

    Ok(())
}
