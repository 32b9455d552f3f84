//! Campaign dispatch loop.
//!
//! One lead at a time, in import order, with the campaign delay between any
//! two send attempts. A lead is marked sent only after the transport accepts
//! the message; failures leave it untouched so the next run retries it. Runs
//! for the same campaign must not overlap.
//!
//! A shutdown request stops the run between leads. A send that has started
//! always finishes and is recorded first.

pub mod report;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};

use crate::campaign::{Campaign, TrackingBase};
use crate::error::DispatchError;
use crate::mail::{MailBody, Mailer, OutboundEmail};
use crate::template::render_email;

pub use report::{RunOutcome, SendFailure, SendReport};

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Wall-clock budget; no send starts after it runs out
    pub budget: Option<Duration>,
    /// Consecutive connection failures that abandon the run
    pub max_consecutive_connection_failures: u32,
    /// Turns `true` when the run should stop before its next send
    pub shutdown: Option<watch::Receiver<bool>>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            budget: None,
            max_consecutive_connection_failures: 3,
            shutdown: None,
        }
    }
}

fn shutdown_requested(shutdown: &Option<watch::Receiver<bool>>) -> bool {
    shutdown.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Resolves once shutdown is requested; never when there is no channel or
/// its sender is gone.
async fn shutdown_requested_later(shutdown: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = shutdown {
        if rx.wait_for(|stop| *stop).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Send the campaign email to every lead still waiting for it.
///
/// Store failures abort the run. Per-lead transport failures are collected
/// into the report.
pub async fn send_campaign(
    campaign: &Arc<Campaign>,
    base: &TrackingBase,
    mailer: &dyn Mailer,
    options: &DispatchOptions,
) -> Result<SendReport, DispatchError> {
    let deadline = options.budget.map(|budget| Instant::now() + budget);
    let store = Arc::clone(&campaign.store);

    let candidates = store.call(|s| s.pending_dispatch()).await?;
    let mut report = SendReport::new(&campaign.name, candidates.len());

    info!(
        campaign = %campaign.name,
        candidates = candidates.len(),
        delay_secs = campaign.delay.as_secs(),
        "dispatch_started"
    );

    let mut shutdown = options.shutdown.clone();
    let mut last_attempt: Option<Instant> = None;
    let mut consecutive_failures: u32 = 0;

    for (index, lead) in candidates.iter().enumerate() {
        let remaining = candidates.len() - index;

        if shutdown_requested(&shutdown) {
            report.outcome = RunOutcome::Interrupted;
            report.not_attempted = remaining;
            break;
        }
        if let Some(last) = last_attempt {
            let wake = last + campaign.delay;
            if deadline.is_some_and(|d| wake >= d) {
                report.outcome = RunOutcome::BudgetExhausted;
                report.not_attempted = remaining;
                break;
            }
            let interrupted = tokio::select! {
                _ = sleep_until(wake) => false,
                _ = shutdown_requested_later(&mut shutdown) => true,
            };
            if interrupted {
                report.outcome = RunOutcome::Interrupted;
                report.not_attempted = remaining;
                break;
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            report.outcome = RunOutcome::BudgetExhausted;
            report.not_attempted = remaining;
            break;
        }

        // The tracker may have moved the lead since the batch was selected.
        let token = lead.tracking_token.clone();
        if !store.call(move |s| s.is_dispatchable(&token)).await? {
            info!(campaign = %campaign.name, email = %lead.email, "dispatch_lead_skipped");
            report.skipped.push(lead.email.clone());
            continue;
        }

        if shutdown_requested(&shutdown) {
            report.outcome = RunOutcome::Interrupted;
            report.not_attempted = remaining;
            break;
        }

        let rendered = render_email(campaign, base, &lead.first_name, &lead.tracking_token);
        let email = OutboundEmail {
            to: lead.email.clone(),
            from: campaign.smtp.from_email.clone(),
            subject: rendered.subject,
            body: MailBody::Html(rendered.html),
            attachment: campaign.attachment.clone(),
        };

        last_attempt = Some(Instant::now());
        match mailer.send(&email).await {
            Ok(()) => {
                consecutive_failures = 0;
                let token = lead.tracking_token.clone();
                let template = campaign.template.name().to_string();
                let marked = store
                    .call(move |s| s.mark_sent(&token, &template, Utc::now()))
                    .await
                    .map_err(|source| DispatchError::Unrecorded {
                        email: lead.email.clone(),
                        source,
                    })?;
                if !marked {
                    warn!(campaign = %campaign.name, email = %lead.email, "dispatch_already_marked_sent");
                }
                info!(campaign = %campaign.name, email = %lead.email, "dispatch_email_sent");
                report.sent.push(lead.email.clone());
            }
            Err(e) => {
                let connection = e.is_connection();
                warn!(
                    campaign = %campaign.name,
                    email = %lead.email,
                    error = %e,
                    connection,
                    "dispatch_send_failed"
                );
                report.failures.push(SendFailure {
                    email: lead.email.clone(),
                    error: e.to_string(),
                    connection,
                });

                if connection {
                    consecutive_failures += 1;
                    if consecutive_failures >= options.max_consecutive_connection_failures {
                        error!(
                            campaign = %campaign.name,
                            consecutive_failures,
                            "dispatch_escalated"
                        );
                        report.outcome = RunOutcome::Escalated {
                            consecutive_failures,
                        };
                        report.not_attempted = remaining - 1;
                        break;
                    }
                } else {
                    consecutive_failures = 0;
                }
            }
        }
    }

    info!(
        campaign = %campaign.name,
        sent = report.sent.len(),
        failed = report.failures.len(),
        skipped = report.skipped.len(),
        not_attempted = report.not_attempted,
        outcome = ?report.outcome,
        "dispatch_finished"
    );

    Ok(report)
}
