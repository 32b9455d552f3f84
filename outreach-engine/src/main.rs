//! Outreach Dispatch - sends one campaign's email to every waiting lead.
//!
//! Runs the paced send loop once and prints the run report as JSON. Exits
//! non-zero when the transport kept failing to connect. SIGINT/SIGTERM stop
//! the run after the send in flight has been recorded.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use outreach::shutdown::shutdown_channel;
use outreach::{send_campaign, CampaignRegistry, Config, DispatchOptions, RunOutcome, SmtpMailer};

#[derive(Debug, Parser)]
#[command(name = "outreach-dispatch", about = "Send a campaign to its waiting leads")]
struct Args {
    /// Campaign to send
    campaign: String,

    /// Wall-clock budget in seconds; overrides DISPATCH_BUDGET_SECS
    #[arg(long)]
    budget_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    let args = Args::parse();
    info!(campaign = %args.campaign, "dispatch_starting");

    // Signals stop the loop between sends instead of killing the process
    let shutdown = shutdown_channel();

    // Load configuration
    let config = Config::from_env();
    let budget = args
        .budget_secs
        .map(Duration::from_secs)
        .or(config.dispatch_budget);
    info!(
        campaigns_path = %config.campaigns_path.display(),
        budget_secs = budget.map(|b| b.as_secs()),
        max_consecutive_connection_failures = config.max_consecutive_connection_failures,
        "config_loaded"
    );

    let password = config
        .smtp_password
        .clone()
        .context("SMTP_PASSWORD environment variable not set")?;

    let registry = CampaignRegistry::load(&config.campaigns_path, config.store_timeout)
        .context("Failed to load campaign file")?;
    let campaign = registry.resolve(&args.campaign)?;
    let mailer =
        SmtpMailer::new(&campaign.smtp, &password).context("Failed to build SMTP transport")?;

    let options = DispatchOptions {
        budget,
        max_consecutive_connection_failures: config.max_consecutive_connection_failures,
        shutdown: Some(shutdown),
    };
    let report = send_campaign(&campaign, registry.base(), &mailer, &options)
        .await
        .context("Dispatch run failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.outcome == RunOutcome::Interrupted {
        warn!(
            campaign = %campaign.name,
            not_attempted = report.not_attempted,
            "dispatch_interrupted"
        );
    }
    if report.is_escalated() {
        error!(campaign = %campaign.name, "dispatch_aborted_transport_unreachable");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
