//! On-disk shape of the campaign file.

use std::path::PathBuf;

use serde::Deserialize;

/// Top level of the campaign file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignFile {
    /// Public base URL of the tracking server, used to build tracking links
    pub tracking_base_url: String,
    /// Where tracking redirects land when the campaign cannot be resolved
    #[serde(default)]
    pub fallback_url: Option<String>,
    pub campaigns: Vec<CampaignConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    pub name: String,
    /// SQLite file holding this campaign's leads
    pub database: PathBuf,
    pub tracking_secret: String,
    pub smtp: SmtpConfig,
    pub email: EmailConfig,
    /// Operator address that receives interested-lead notifications
    pub notify_email: String,
    pub links: LinksConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    pub subject: String,
    pub template: PathBuf,
    /// Pause between two send attempts
    pub delay_secs: u64,
    #[serde(default)]
    pub attachment: Option<PathBuf>,
}

/// Real destinations behind the tracked links.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinksConfig {
    pub generic: String,
    pub interested: String,
    pub unsubscribe: String,
}

fn default_smtp_port() -> u16 {
    465
}
