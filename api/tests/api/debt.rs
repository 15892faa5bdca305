use jiff::Span;
use payloads::{DebtKind, DebtStatus, NotificationKind, requests};
use reqwest::StatusCode;
use rust_decimal::dec;

use test_helpers::{
    assert_status_code, debt_details, payment, receivable_details, spawn_app,
};

#[tokio::test]
async fn create_and_get_debt() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    let details = receivable_details(Some(app.today() + Span::new().days(14)));
    let debt_id = app.client.create_debt(&details).await?;

    let debt = app.client.get_debt(&debt_id).await?;
    assert_eq!(debt.debt_details, details);
    assert_eq!(debt.remaining_amount, details.amount);
    assert_eq!(debt.status, DebtStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn invalid_debt_details_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    let mut details = receivable_details(None);
    details.contact_name = "   ".into();
    let result = app.client.create_debt(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    let mut details = receivable_details(None);
    details.amount = dec!(0);
    let result = app.client.create_debt(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    let mut details = receivable_details(None);
    details.contact_phone = Some("12345".into());
    let result = app.client.create_debt(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // a due date already in the past
    let details =
        receivable_details(Some(app.today() - Span::new().days(1)));
    let result = app.client.create_debt(&details).await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn payments_walk_the_balance_to_settled() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    // Rp 150.000 receivable
    let debt_id = app.client.create_debt(&receivable_details(None)).await?;

    let debt = app
        .client
        .add_payment(&payment(debt_id, dec!(50000), app.today()))
        .await?;
    assert_eq!(debt.status, DebtStatus::Partial);
    assert_eq!(debt.remaining_amount, dec!(100000));

    let debt = app
        .client
        .add_payment(&payment(debt_id, dec!(100000), app.today()))
        .await?;
    assert_eq!(debt.status, DebtStatus::Paid);
    assert_eq!(debt.remaining_amount, dec!(0));

    // settling emits a notification
    let notifications = app.client.list_notifications().await?;
    let settled: Vec<_> = notifications
        .iter()
        .filter(|n| n.kind == NotificationKind::General)
        .collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].title, "Entry settled");
    assert_eq!(settled[0].related_debt_id, Some(debt_id));

    // a settled entry takes no further payments
    let result = app
        .client
        .add_payment(&payment(debt_id, dec!(1000), app.today()))
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    // both payments on record
    let payments = app.client.list_payments(&debt_id).await?;
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0].amount + payments[1].amount, dec!(150000));

    Ok(())
}

#[tokio::test]
async fn invalid_payments_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    let debt_id = app.client.create_debt(&receivable_details(None)).await?;

    // more than the remaining balance
    let result = app
        .client
        .add_payment(&payment(debt_id, dec!(150001), app.today()))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // zero and negative amounts
    let result = app
        .client
        .add_payment(&payment(debt_id, dec!(0), app.today()))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);
    let result = app
        .client
        .add_payment(&payment(debt_id, dec!(-5000), app.today()))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // future-dated payment
    let result = app
        .client
        .add_payment(&payment(
            debt_id,
            dec!(1000),
            app.today() + Span::new().days(1),
        ))
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    // nothing was recorded
    let debt = app.client.get_debt(&debt_id).await?;
    assert_eq!(debt.status, DebtStatus::Pending);
    assert_eq!(debt.remaining_amount, dec!(150000));

    Ok(())
}

#[tokio::test]
async fn concurrent_payments_serialize() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    // Rp 150.000 receivable; two Rp 100.000 payments race. Each is valid
    // alone but together they exceed the balance, so exactly one must win.
    let debt_id = app.client.create_debt(&receivable_details(None)).await?;

    let pay_a = payment(debt_id, dec!(100000), app.today());
    let pay_b = payment(debt_id, dec!(100000), app.today());
    let (a, b) = tokio::join!(
        app.client.add_payment(&pay_a),
        app.client.add_payment(&pay_b),
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "{a:?} {b:?}");

    let debt = app.client.get_debt(&debt_id).await?;
    assert_eq!(debt.remaining_amount, dec!(50000));
    assert_eq!(debt.status, DebtStatus::Partial);

    Ok(())
}

#[tokio::test]
async fn update_rules_follow_the_entry_status() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    let mut details = receivable_details(None);
    let debt_id = app.client.create_debt(&details).await?;

    // while pending the principal is editable and the balance tracks it
    details.amount = dec!(200000);
    details.description = "Catering order, revised".into();
    let debt = app
        .client
        .update_debt(&requests::UpdateDebt {
            debt_id,
            debt_details: details.clone(),
        })
        .await?;
    assert_eq!(debt.remaining_amount, dec!(200000));
    assert_eq!(debt.status, DebtStatus::Pending);

    app.client
        .add_payment(&payment(debt_id, dec!(50000), app.today()))
        .await?;

    // once a payment exists the principal is frozen
    let mut changed = details.clone();
    changed.amount = dec!(300000);
    let result = app
        .client
        .update_debt(&requests::UpdateDebt {
            debt_id,
            debt_details: changed,
        })
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    // and so is the kind
    let mut changed = details.clone();
    changed.kind = DebtKind::Debt;
    let result = app
        .client
        .update_debt(&requests::UpdateDebt {
            debt_id,
            debt_details: changed,
        })
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    // the other fields stay editable and the balance is untouched
    details.contact_phone = Some("081298765432".into());
    let debt = app
        .client
        .update_debt(&requests::UpdateDebt {
            debt_id,
            debt_details: details.clone(),
        })
        .await?;
    assert_eq!(debt.debt_details.contact_phone, details.contact_phone);
    assert_eq!(debt.remaining_amount, dec!(150000));
    assert_eq!(debt.status, DebtStatus::Partial);

    // a settled entry can no longer be edited at all
    app.client
        .add_payment(&payment(debt_id, dec!(150000), app.today()))
        .await?;
    let result = app
        .client
        .update_debt(&requests::UpdateDebt {
            debt_id,
            debt_details: details,
        })
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn delete_refused_once_payments_exist() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    let debt_id = app.client.create_debt(&receivable_details(None)).await?;
    app.client
        .add_payment(&payment(debt_id, dec!(1000), app.today()))
        .await?;

    let result = app.client.delete_debt(&debt_id).await;
    assert_status_code(result, StatusCode::CONFLICT);

    // an untouched entry deletes fine
    let other_id = app.client.create_debt(&debt_details(None)).await?;
    app.client.delete_debt(&other_id).await?;
    let result = app.client.get_debt(&other_id).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn cashiers_see_only_their_own_entries() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.create_bob_cashier().await?;

    let alice_debt = app.client.create_debt(&receivable_details(None)).await?;

    app.login_bob().await?;
    let bob_debt = app.client.create_debt(&debt_details(None)).await?;

    // bob cannot read or pay alice's entry
    let result = app.client.get_debt(&alice_debt).await;
    assert_status_code(result, StatusCode::FORBIDDEN);
    let result = app
        .client
        .add_payment(&payment(alice_debt, dec!(1000), app.today()))
        .await;
    assert_status_code(result, StatusCode::FORBIDDEN);

    // bob's list contains only his entry
    let debts = app.client.list_debts(&requests::ListDebts::default()).await?;
    assert_eq!(debts.len(), 1);
    assert_eq!(debts[0].debt_id, bob_debt);

    // the admin sees both
    app.login_alice().await?;
    let debts = app.client.list_debts(&requests::ListDebts::default()).await?;
    assert_eq!(debts.len(), 2);

    Ok(())
}

#[tokio::test]
async fn list_reclassifies_overdue_entries() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;
    app.time_source.set("2025-03-10T00:00:00Z".parse().unwrap());

    let debt_id = app
        .client
        .create_debt(&receivable_details(Some(
            app.today() + Span::new().days(1),
        )))
        .await?;

    // two days later the listing reflects the lapsed due date without
    // waiting for a sweep
    app.time_source.set("2025-03-12T00:00:00Z".parse().unwrap());
    let debts = app.client.list_debts(&requests::ListDebts::default()).await?;
    assert_eq!(debts.len(), 1);
    assert_eq!(debts[0].debt_id, debt_id);
    assert_eq!(debts[0].status, DebtStatus::Overdue);

    Ok(())
}

#[tokio::test]
async fn list_filters_by_kind_and_status() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_admin().await?;

    let receivable_id =
        app.client.create_debt(&receivable_details(None)).await?;
    app.client.create_debt(&debt_details(None)).await?;
    app.client
        .add_payment(&payment(receivable_id, dec!(50000), app.today()))
        .await?;

    let receivables = app
        .client
        .list_debts(&requests::ListDebts {
            kind: Some(DebtKind::Receivable),
            status: None,
        })
        .await?;
    assert_eq!(receivables.len(), 1);
    assert_eq!(receivables[0].debt_id, receivable_id);

    let partial = app
        .client
        .list_debts(&requests::ListDebts {
            kind: None,
            status: Some(DebtStatus::Partial),
        })
        .await?;
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].debt_id, receivable_id);

    let paid = app
        .client
        .list_debts(&requests::ListDebts {
            kind: None,
            status: Some(DebtStatus::Paid),
        })
        .await?;
    assert!(paid.is_empty());

    Ok(())
}
