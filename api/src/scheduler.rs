//! Time-based triggers: the notification sweep.
//!
//! The sweep runs on a timer and is idempotent per calendar day, so a tick
//! can fire as often as it likes without duplicating anything:
//!
//! ```text
//! reclassify overdue entries
//!     v
//! activate scheduled   (scheduled_date <= today, is_sent = false)
//!     v
//! due reminders        (window: due_date <= today + 3, deduped per week)
//!     v
//! monthly summaries    (1st of the month, per user with activity)
//!     v
//! retention            (read notifications older than 30 days)
//! ```
//!
//! Activation runs before the due reminders: an activated reminder is
//! restamped to today, so the due step's look-back sees it and does not
//! deliver a second reminder for the same debt on the same day.
//!
//! Each step runs independently; a failure in one is recorded in the
//! outcome and the remaining steps still run. An advisory lock keeps
//! concurrent server instances from sweeping at the same time.

use jiff::{Span, civil};
use jiff_sqlx::ToSqlx;
use payloads::responses::SweepOutcome;
use sqlx::PgPool;
use std::time::Duration;
use tokio::time;

use crate::{
    store::{self, debt::DebtRow, notification},
    telemetry::log_error,
    time::{TimeSource, local_date, start_of_day_utc},
};

/// How many days ahead of the due date the sweep starts reminding.
const DUE_WINDOW_DAYS: i64 = 3;
/// A debt gets at most one sweep reminder per this many days.
const REMINDER_LOOKBACK_DAYS: i64 = 7;
/// Read notifications older than this are deleted.
const RETENTION_DAYS: i64 = 30;

pub struct Scheduler {
    pool: PgPool,
    time_source: TimeSource,
    tick_interval: Duration,
    timezone: String,
}

impl Scheduler {
    pub fn new(
        pool: PgPool,
        time_source: TimeSource,
        tick_interval: Duration,
        timezone: String,
    ) -> Self {
        Self {
            pool,
            time_source,
            tick_interval,
            timezone,
        }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.tick_interval);
        loop {
            interval.tick().await;
            let _ = schedule_tick(&self.pool, &self.time_source, &self.timezone)
                .await
                .map_err(log_error);
        }
    }
}

/// Run the sweep once right now.
#[tracing::instrument(skip(pool, time_source))]
pub async fn schedule_tick(
    pool: &PgPool,
    time_source: &TimeSource,
    timezone: &str,
) -> anyhow::Result<()> {
    let today = local_date(time_source.now(), timezone);
    let outcome = run_notification_sweep(pool, today).await?;
    if outcome != SweepOutcome::default() {
        tracing::info!(?outcome, "notification sweep made changes");
    }
    Ok(())
}

/// Run all sweep steps for the given reference date.
///
/// Callers compute `today` from their clock and timezone; nothing in here
/// reads the system time, which keeps reruns and tests deterministic.
#[tracing::instrument(skip(pool), ret)]
pub async fn run_notification_sweep(
    pool: &PgPool,
    today: civil::Date,
) -> anyhow::Result<SweepOutcome> {
    let mut outcome = SweepOutcome::default();

    // Advisory lock so overlapping ticks (or a second server instance)
    // skip instead of racing. The dedup index would absorb the race for
    // reminders, but the other steps have no such backstop.
    let mut coordination_tx = pool.begin().await?;
    let got_lock = sqlx::query_scalar::<_, bool>(
        "SELECT pg_try_advisory_xact_lock(
            hashtextextended('notification_sweep', 0)
        )",
    )
    .fetch_one(&mut *coordination_tx)
    .await?;
    if !got_lock {
        return Ok(outcome);
    }

    match store::debt::mark_overdue(pool, today).await {
        Ok(n) => outcome.marked_overdue = n,
        Err(e) => record_step_error(&mut outcome, "mark_overdue", e.into()),
    }
    match sweep_activate_scheduled(pool, today).await {
        Ok(n) => outcome.activated = n,
        Err(e) => record_step_error(&mut outcome, "activate_scheduled", e),
    }
    match sweep_due_reminders(pool, today).await {
        Ok(n) => outcome.reminders_created = n,
        Err(e) => record_step_error(&mut outcome, "due_reminders", e),
    }
    match sweep_monthly_summaries(pool, today).await {
        Ok(n) => outcome.summaries_created = n,
        Err(e) => record_step_error(&mut outcome, "monthly_summaries", e),
    }
    match sweep_retention(pool, today).await {
        Ok(n) => outcome.deleted = n,
        Err(e) => record_step_error(&mut outcome, "retention", e),
    }

    coordination_tx.commit().await?;
    Ok(outcome)
}

fn record_step_error(
    outcome: &mut SweepOutcome,
    step: &str,
    e: anyhow::Error,
) {
    log_error(anyhow::anyhow!("sweep step {step} failed: {e:#}"));
    outcome.errors.push(format!("{step}: {e:#}"));
}

/// Create due reminders for unsettled entries whose due date falls within
/// the window (including entries already overdue). An entry that received
/// a reminder in the last seven days is skipped; the weekly dedup bucket on
/// the insert backstops concurrent runs.
#[tracing::instrument(skip(pool))]
async fn sweep_due_reminders(
    pool: &PgPool,
    today: civil::Date,
) -> anyhow::Result<u64> {
    let window_end = today.checked_add(Span::new().days(DUE_WINDOW_DAYS))?;
    let lookback_start = start_of_day_utc(
        today.checked_sub(Span::new().days(REMINDER_LOOKBACK_DAYS))?,
    )?;

    let candidates = sqlx::query_as::<_, DebtRow>(
        "SELECT d.* FROM debts d
        WHERE d.due_date IS NOT NULL
            AND d.due_date <= $1
            AND d.status IN ('pending', 'partial', 'overdue')
            AND NOT EXISTS (
                SELECT 1 FROM notifications n
                WHERE n.related_debt_id = d.id
                    AND n.kind IN ('debt_reminder', 'receivable_reminder')
                    AND n.created_at >= $2
            )
        ORDER BY d.due_date",
    )
    .bind(window_end.to_sqlx())
    .bind(lookback_start.to_sqlx())
    .fetch_all(pool)
    .await?;

    let created_at = start_of_day_utc(today)?;
    let bucket = notification::dedup_bucket(today);
    let mut created = 0;
    for debt in candidates {
        let Some(due_date) = debt.due_date else {
            continue;
        };
        let title = notification::reminder_title(debt.kind);
        let message = notification::reminder_message(
            debt.kind,
            &debt.contact_name,
            debt.remaining_amount,
            due_date,
            today,
        );
        let inserted = notification::insert(
            pool,
            &notification::NewNotification {
                user_id: Some(debt.user_id),
                kind: debt.kind.reminder_kind(),
                title: &title,
                message: &message,
                related_debt_id: Some(debt.id),
                scheduled_date: None,
                dedup_bucket: Some(bucket),
            },
            created_at,
        )
        .await?;
        if inserted {
            created += 1;
        }
    }
    Ok(created)
}

/// Activate scheduled reminders whose date has arrived. `<=` rather than
/// `=` so a missed day is caught up on the next run. `created_at` is
/// restamped to the activation day: the feed sorts the reminder as new and
/// the due step's look-back counts the delivery, not the scheduling.
#[tracing::instrument(skip(pool))]
async fn sweep_activate_scheduled(
    pool: &PgPool,
    today: civil::Date,
) -> anyhow::Result<u64> {
    let activated_at = start_of_day_utc(today)?;
    let result = sqlx::query(
        "UPDATE notifications SET is_sent = true, created_at = $2
        WHERE scheduled_date IS NOT NULL
            AND scheduled_date <= $1
            AND is_sent = false",
    )
    .bind(today.to_sqlx())
    .bind(activated_at.to_sqlx())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// On the first of the month, send each active user a summary of their own
/// transactions from the prior calendar month. Users with no transactions
/// that month get nothing; users who already have a summary this month are
/// skipped, so reruns are no-ops.
#[tracing::instrument(skip(pool))]
async fn sweep_monthly_summaries(
    pool: &PgPool,
    today: civil::Date,
) -> anyhow::Result<u64> {
    if today.day() != 1 {
        return Ok(0);
    }

    let prev_last = today.yesterday()?;
    let prev_first = prev_last.first_of_month();
    let title =
        notification::summary_title(prev_first.year(), prev_first.month());
    let month_start = start_of_day_utc(today)?;

    let mut created = 0;
    for user_id in store::active_user_ids(pool).await? {
        let (income, expense, count) = store::transaction::period_totals(
            pool,
            prev_first,
            prev_last,
            Some(user_id),
        )
        .await?;
        if count == 0 {
            continue;
        }

        let already_sent = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM notifications
                WHERE user_id = $1
                    AND kind = 'monthly_summary'
                    AND created_at >= $2
            )",
        )
        .bind(user_id)
        .bind(month_start.to_sqlx())
        .fetch_one(pool)
        .await?;
        if already_sent {
            continue;
        }

        let message = notification::summary_message(income, expense, count);
        notification::insert(
            pool,
            &notification::NewNotification {
                user_id: Some(user_id),
                kind: payloads::NotificationKind::MonthlySummary,
                title: &title,
                message: &message,
                related_debt_id: None,
                scheduled_date: None,
                dedup_bucket: None,
            },
            month_start,
        )
        .await?;
        created += 1;
    }
    Ok(created)
}

/// Delete read notifications past the retention window.
#[tracing::instrument(skip(pool))]
async fn sweep_retention(
    pool: &PgPool,
    today: civil::Date,
) -> anyhow::Result<u64> {
    let cutoff = start_of_day_utc(
        today.checked_sub(Span::new().days(RETENTION_DAYS))?,
    )?;
    let result = sqlx::query(
        "DELETE FROM notifications
        WHERE is_read = true AND created_at < $1",
    )
    .bind(cutoff.to_sqlx())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
