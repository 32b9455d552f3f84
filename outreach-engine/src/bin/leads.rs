//! Outreach Leads - operator tool for one campaign's lead store.
//!
//! Loads and exports CSV lists, previews the rendered email, and performs the
//! operator-only writes: manual override, notes and deletion. Output is JSON
//! on stdout; logs go to stderr.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use outreach::leads::{export_csv, import_csv};
use outreach::template::render_email;
use outreach::{CampaignRegistry, Config, LeadStatus};

#[derive(Debug, Parser)]
#[command(name = "outreach-leads", about = "Manage campaign leads")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import leads from a CSV file with an `email` column
    Load { campaign: String, csv: PathBuf },

    /// Export every lead with the given status as CSV
    Export {
        campaign: String,
        #[arg(long)]
        status: LeadStatus,
        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show one lead with its submitted details
    Show { campaign: String, email: String },

    /// Take a lead over manually (blue)
    Override { campaign: String, email: String },

    /// Replace a lead's notes
    Notes {
        campaign: String,
        email: String,
        notes: String,
    },

    /// Delete a lead and its details
    Delete { campaign: String, email: String },

    /// Lead counts per status
    Stats {
        /// Every campaign when omitted
        campaign: Option<String>,
    },

    /// Render the campaign email for one lead without sending it
    Preview {
        campaign: String,
        /// First waiting lead when omitted
        #[arg(long)]
        email: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    let registry = CampaignRegistry::load(&config.campaigns_path, config.store_timeout)
        .context("Failed to load campaign file")?;

    match args.command {
        Command::Load { campaign, csv } => {
            let campaign = registry.resolve(&campaign)?;
            let file = File::open(&csv)
                .with_context(|| format!("Failed to open {}", csv.display()))?;
            let report = import_csv(&campaign.store, &campaign.key, BufReader::new(file))?;
            print_json(&report)?;
        }

        Command::Export {
            campaign,
            status,
            output,
        } => {
            let campaign = registry.resolve(&campaign)?;
            let rows = match &output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    export_csv(&campaign.store, status, BufWriter::new(file))?
                }
                None => export_csv(&campaign.store, status, io::stdout().lock())?,
            };
            info!(campaign = %campaign.name, status = %status, rows, "export_finished");
        }

        Command::Show { campaign, email } => {
            let campaign = registry.resolve(&campaign)?;
            let Some(lead) = campaign.store.lead_by_email(&email)? else {
                bail!("No lead {email} in campaign {}", campaign.name);
            };
            let detail = campaign.store.lead_detail(&lead.tracking_token)?;
            print_json(&json!({ "lead": lead, "detail": detail }))?;
        }

        Command::Override { campaign, email } => {
            let campaign = registry.resolve(&campaign)?;
            let lead = campaign.store.manual_override(&email)?;
            print_json(&lead)?;
        }

        Command::Notes {
            campaign,
            email,
            notes,
        } => {
            let campaign = registry.resolve(&campaign)?;
            campaign.store.update_notes(&email, &notes)?;
            info!(campaign = %campaign.name, email = %email, "lead_notes_updated");
        }

        Command::Delete { campaign, email } => {
            let campaign = registry.resolve(&campaign)?;
            if !campaign.store.delete_lead(&email)? {
                bail!("No lead {email} in campaign {}", campaign.name);
            }
            info!(campaign = %campaign.name, email = %email, "lead_deleted");
        }

        Command::Stats { campaign } => {
            let names: Vec<String> = match campaign {
                Some(name) => vec![registry.resolve(&name)?.name.clone()],
                None => registry.names().map(String::from).collect(),
            };
            let mut stats = BTreeMap::new();
            for name in names {
                let campaign = registry.resolve(&name)?;
                stats.insert(name, campaign.store.status_counts()?);
            }
            print_json(&stats)?;
        }

        Command::Preview { campaign, email } => {
            let campaign = registry.resolve(&campaign)?;
            let lead = match email {
                Some(email) => campaign.store.lead_by_email(&email)?,
                None => campaign.store.pending_dispatch()?.into_iter().next(),
            };
            let Some(lead) = lead else {
                bail!("No lead to preview in campaign {}", campaign.name);
            };
            let rendered =
                render_email(&campaign, registry.base(), &lead.first_name, &lead.tracking_token);
            let mut out = io::stdout().lock();
            writeln!(out, "Subject: {}", rendered.subject)?;
            writeln!(out)?;
            writeln!(out, "{}", rendered.html)?;
            info!(campaign = %campaign.name, "preview_rendered");
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
