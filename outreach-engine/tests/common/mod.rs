#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use outreach::mail::OutboundEmail;
use outreach::store::EventOutcome;
use outreach::{Campaign, CampaignRegistry, MailError, Mailer, Notifier};
use tempfile::TempDir;

pub const TEMPLATE: &str = "<p>Hi {{ first_name }}</p>\
    <a href=\"{{ interested_url }}\">Interested</a>\
    <a href=\"{{ unsubscribe_url }}\">Unsubscribe</a>\
    <img src=\"{{ pixel_url }}\" width=\"1\" height=\"1\">";

fn campaign_yaml(name: &str, secret: &str) -> String {
    format!(
        r#"
  - name: {name}
    database: {name}.db
    tracking_secret: {secret}
    smtp: {{ server: smtp.example.com, port: 465, username: sender, from_email: sender@example.com }}
    email: {{ subject: "Quick question, {{{{ first_name }}}}", template: email.html, delay_secs: 5 }}
    notify_email: sales@example.com
    links:
      generic: https://shop.example.com/
      interested: https://shop.example.com/thanks
      unsubscribe: https://shop.example.com/unsubscribed
"#
    )
}

/// Write a campaign file with the given `(name, secret)` campaigns into `dir`.
pub fn write_config(dir: &TempDir, campaigns: &[(&str, &str)]) -> std::path::PathBuf {
    std::fs::write(dir.path().join("email.html"), TEMPLATE).expect("write template");
    let mut yaml = String::from("tracking_base_url: https://track.example.com\ncampaigns:\n");
    for (name, secret) in campaigns {
        yaml.push_str(&campaign_yaml(name, secret));
    }
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, yaml).expect("write config");
    path
}

pub fn load(path: &std::path::Path) -> CampaignRegistry {
    CampaignRegistry::load(path, Duration::from_secs(2)).expect("load registry")
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<OutboundEmail>>,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub notified: Mutex<Vec<String>>,
}

impl FakeNotifier {
    pub fn count(&self) -> usize {
        self.notified.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn interested(
        &self,
        _campaign: &Campaign,
        outcome: &EventOutcome,
    ) -> Result<(), MailError> {
        self.notified.lock().unwrap().push(outcome.email.clone());
        Ok(())
    }
}
