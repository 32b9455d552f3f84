//! Interested-lead notifications.
//!
//! Sent to the campaign's operator address by whichever tracking request
//! moved the lead into green, after that transition has committed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::campaign::{Campaign, CampaignRegistry};
use crate::error::MailError;
use crate::mail::{MailBody, Mailer, OutboundEmail, SmtpMailer};
use crate::store::EventOutcome;

pub const NOTIFICATION_SUBJECT: &str = "New interested lead";

/// Delivers the green-transition notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn interested(&self, campaign: &Campaign, outcome: &EventOutcome)
        -> Result<(), MailError>;
}

/// Build the operator message for a lead that just became interested.
pub fn notification_email(campaign: &Campaign, outcome: &EventOutcome) -> OutboundEmail {
    let name = if outcome.first_name.is_empty() {
        "-"
    } else {
        outcome.first_name.as_str()
    };
    let body = format!(
        "A lead clicked \"interested\".\n\n\
         Campaign: {}\n\
         Email: {}\n\
         First name: {}\n\
         Previous status: {}\n",
        campaign.name, outcome.email, name, outcome.from
    );

    OutboundEmail {
        to: campaign.notify_email.clone(),
        from: campaign.smtp.from_email.clone(),
        subject: NOTIFICATION_SUBJECT.to_string(),
        body: MailBody::Text(body),
        attachment: None,
    }
}

/// Notifier that mails through each campaign's own SMTP identity.
pub struct SmtpNotifier {
    mailers: HashMap<String, Arc<dyn Mailer>>,
}

impl SmtpNotifier {
    pub fn new(registry: &CampaignRegistry, password: &str) -> Result<Self, MailError> {
        let mut mailers: HashMap<String, Arc<dyn Mailer>> = HashMap::new();
        for campaign in registry.campaigns() {
            let mailer = SmtpMailer::new(&campaign.smtp, password)?;
            mailers.insert(campaign.name.clone(), Arc::new(mailer));
        }
        Ok(Self { mailers })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn interested(
        &self,
        campaign: &Campaign,
        outcome: &EventOutcome,
    ) -> Result<(), MailError> {
        let mailer = self
            .mailers
            .get(&campaign.name)
            .ok_or_else(|| MailError::Build(format!("no mailer for {}", campaign.name)))?;
        mailer.send(&notification_email(campaign, outcome)).await
    }
}

/// Notifier used when the tracker runs without SMTP credentials.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn interested(
        &self,
        campaign: &Campaign,
        _outcome: &EventOutcome,
    ) -> Result<(), MailError> {
        info!(campaign = %campaign.name, "notification_skipped_no_transport");
        Ok(())
    }
}

/// Fire the notification for `outcome` if, and only if, it performed the
/// transition into green. Failures are logged; the transition stands.
pub async fn notify_if_green(
    notifier: &dyn Notifier,
    campaign: &Campaign,
    token: &str,
    outcome: &EventOutcome,
) -> bool {
    if !outcome.became_green {
        return false;
    }
    match notifier.interested(campaign, outcome).await {
        Ok(()) => {
            info!(campaign = %campaign.name, token = %token, "notification_sent");
            true
        }
        Err(e) => {
            error!(
                campaign = %campaign.name,
                token = %token,
                error = %e,
                "notification_failed"
            );
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording notifier for tests.

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub notified: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                notified: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn count(&self) -> usize {
            self.notified.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn interested(
            &self,
            campaign: &Campaign,
            outcome: &EventOutcome,
        ) -> Result<(), MailError> {
            self.notified
                .lock()
                .unwrap()
                .push((campaign.name.clone(), outcome.email.clone()));
            if self.fail {
                return Err(MailError::Connection("smtp down".into()));
            }
            Ok(())
        }
    }
}
