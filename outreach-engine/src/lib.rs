//! Outreach - self-hosted cold-email dispatch and engagement tracking.
//!
//! This library provides shared modules for the three outreach binaries:
//! - `outreach-tracker`: Web server answering open-pixel and click-redirect requests
//! - `outreach-dispatch`: Paced send loop for one campaign
//! - `outreach-leads`: Operator tool for CSV import/export and lead triage
//!
//! ## Architecture
//!
//! ```text
//! config.yaml → CampaignRegistry ─┬→ dispatch → SMTP
//!                                 └→ tracker  → LeadStore (per campaign) → notify
//! ```

pub mod address;
pub mod campaign;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod leads;
pub mod mail;
pub mod notify;
pub mod shutdown;
pub mod status;
pub mod store;
pub mod template;
pub mod token;
pub mod web;

// Re-export commonly used types
pub use campaign::{Campaign, CampaignRegistry, TrackingBase};
pub use config::Config;
pub use dispatch::{send_campaign, DispatchOptions, RunOutcome, SendReport};
pub use error::{
    DispatchError, ImportError, MailError, RegistryError, StoreError, TrackingError,
    UnknownCampaign,
};
pub use mail::{Mailer, SmtpMailer};
pub use notify::{Notifier, SmtpNotifier};
pub use status::{ClickKind, LeadStatus, TrackingEvent};
pub use store::{Lead, LeadStore};
pub use token::TrackingKey;
pub use web::AppState;
