//! Campaign registry.
//!
//! Built once at process start from the campaign file and passed explicitly
//! to the tracker and the dispatcher. Every campaign owns its own lead store
//! and tracking key; nothing here changes after [`CampaignRegistry::load`]
//! returns.

pub mod file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use url::Url;

use crate::address::{is_valid_email, normalize_email};
use crate::error::{RegistryError, UnknownCampaign};
use crate::mail::Attachment;
use crate::status::ClickKind;
use crate::store::LeadStore;
use crate::template::Template;
use crate::token::TrackingKey;

pub use file::{CampaignConfig, CampaignFile, EmailConfig, LinksConfig, SmtpConfig};

/// Largest attachment a campaign may carry.
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

/// Sender identity used for campaign mail and notifications.
#[derive(Debug, Clone)]
pub struct SmtpIdentity {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub from_email: String,
}

/// Real destinations of the tracked links. Never taken from a request.
#[derive(Debug, Clone)]
pub struct CampaignLinks {
    pub generic: Url,
    pub interested: Url,
    pub unsubscribe: Url,
}

impl CampaignLinks {
    pub fn destination(&self, kind: ClickKind) -> &Url {
        match kind {
            ClickKind::Generic => &self.generic,
            ClickKind::Interested => &self.interested,
            ClickKind::Unsubscribe => &self.unsubscribe,
        }
    }
}

/// A resolved, validated campaign.
#[derive(Debug)]
pub struct Campaign {
    pub name: String,
    pub store: Arc<LeadStore>,
    pub key: TrackingKey,
    pub smtp: SmtpIdentity,
    pub subject: String,
    pub template: Template,
    pub attachment: Option<Attachment>,
    pub delay: Duration,
    pub notify_email: String,
    pub links: CampaignLinks,
}

/// Public base URL of the tracking server.
#[derive(Debug, Clone)]
pub struct TrackingBase(Url);

impl TrackingBase {
    pub fn parse(raw: &str) -> Option<Self> {
        parse_http_url(raw).map(TrackingBase)
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn open_url(&self, campaign: &str, token: &str) -> Url {
        self.join(&["track", "open", campaign, token])
    }

    pub fn click_url(&self, campaign: &str, token: &str, kind: ClickKind) -> Url {
        self.join(&["track", "click", campaign, token, kind.as_str()])
    }

    pub fn interest_form_url(&self, campaign: &str, token: &str) -> Url {
        self.join(&["track", "interest", campaign, token])
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.0.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Immutable campaign name to campaign mapping.
#[derive(Debug)]
pub struct CampaignRegistry {
    campaigns: BTreeMap<String, Arc<Campaign>>,
    base: TrackingBase,
    fallback_url: Url,
}

impl CampaignRegistry {
    /// Load and validate the campaign file at `path`, opening every store.
    ///
    /// Relative paths inside the file resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>, store_timeout: Duration) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_yaml(&raw, &base_dir, store_timeout)
    }

    pub fn from_yaml(
        yaml: &str,
        base_dir: &Path,
        store_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let file: CampaignFile = serde_yaml::from_str(yaml)?;
        Self::from_file(file, base_dir, store_timeout)
    }

    pub fn from_file(
        file: CampaignFile,
        base_dir: &Path,
        store_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let base = TrackingBase::parse(&file.tracking_base_url).ok_or_else(|| {
            RegistryError::invalid("*", "tracking_base_url must be an absolute http(s) URL")
        })?;
        let fallback_url = match &file.fallback_url {
            Some(raw) => parse_http_url(raw).ok_or_else(|| {
                RegistryError::invalid("*", "fallback_url must be an absolute http(s) URL")
            })?,
            None => base.as_url().clone(),
        };

        // Validate everything before opening any store.
        let mut seen = BTreeMap::new();
        for config in &file.campaigns {
            if seen.insert(config.name.as_str(), ()).is_some() {
                return Err(RegistryError::DuplicateCampaign(config.name.clone()));
            }
        }
        let mut prepared = Vec::with_capacity(file.campaigns.len());
        for config in file.campaigns {
            prepared.push(prepare(config, base_dir)?);
        }

        let mut campaigns = BTreeMap::new();
        for p in prepared {
            let store = LeadStore::open(&p.database, store_timeout).map_err(|source| {
                RegistryError::Store {
                    campaign: p.name.clone(),
                    source,
                }
            })?;
            info!(
                campaign = %p.name,
                database = %p.database.display(),
                delay_secs = p.delay.as_secs(),
                has_attachment = p.attachment.is_some(),
                "campaign_loaded"
            );
            let campaign = Campaign {
                name: p.name.clone(),
                store: Arc::new(store),
                key: p.key,
                smtp: p.smtp,
                subject: p.subject,
                template: p.template,
                attachment: p.attachment,
                delay: p.delay,
                notify_email: p.notify_email,
                links: p.links,
            };
            campaigns.insert(p.name, Arc::new(campaign));
        }

        Ok(Self {
            campaigns,
            base,
            fallback_url,
        })
    }

    /// Look up a campaign by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<Campaign>, UnknownCampaign> {
        self.campaigns
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownCampaign(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.campaigns.keys().map(String::as_str)
    }

    pub fn campaigns(&self) -> impl Iterator<Item = &Arc<Campaign>> {
        self.campaigns.values()
    }

    pub fn base(&self) -> &TrackingBase {
        &self.base
    }

    /// Redirect target when a click names no known campaign.
    pub fn fallback_url(&self) -> &Url {
        &self.fallback_url
    }
}

/// A validated campaign whose store has not been opened yet.
struct Prepared {
    name: String,
    database: PathBuf,
    key: TrackingKey,
    smtp: SmtpIdentity,
    subject: String,
    template: Template,
    attachment: Option<Attachment>,
    delay: Duration,
    notify_email: String,
    links: CampaignLinks,
}

fn prepare(config: CampaignConfig, base_dir: &Path) -> Result<Prepared, RegistryError> {
    let name = config.name;
    if !is_url_safe_name(&name) {
        return Err(RegistryError::invalid(
            &name,
            "name must be non-empty and use only letters, digits, '-' or '_'",
        ));
    }

    let key = TrackingKey::new(&config.tracking_secret)
        .ok_or_else(|| RegistryError::invalid(&name, "tracking_secret must not be empty"))?;

    let database = base_dir.join(&config.database);
    let store_dir = database
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(base_dir);
    if !store_dir.is_dir() {
        return Err(RegistryError::invalid(
            &name,
            format!("store directory {} does not exist", store_dir.display()),
        ));
    }

    let template_path = base_dir.join(&config.email.template);
    let template = Template::load(&template_path).map_err(|e| {
        RegistryError::invalid(
            &name,
            format!("template {}: {e}", template_path.display()),
        )
    })?;

    let attachment = match &config.email.attachment {
        Some(path) => Some(load_attachment(&name, &base_dir.join(path))?),
        None => None,
    };

    let from_email = normalize_email(&config.smtp.from_email);
    if !is_valid_email(&from_email) {
        return Err(RegistryError::invalid(&name, "smtp.from_email is not a valid address"));
    }
    let notify_email = normalize_email(&config.notify_email);
    if !is_valid_email(&notify_email) {
        return Err(RegistryError::invalid(&name, "notify_email is not a valid address"));
    }
    if config.smtp.server.trim().is_empty() {
        return Err(RegistryError::invalid(&name, "smtp.server must not be empty"));
    }

    let link = |field: &str, raw: &str| {
        parse_http_url(raw).ok_or_else(|| {
            RegistryError::invalid(&name, format!("links.{field} must be an absolute http(s) URL"))
        })
    };
    let links = CampaignLinks {
        generic: link("generic", &config.links.generic)?,
        interested: link("interested", &config.links.interested)?,
        unsubscribe: link("unsubscribe", &config.links.unsubscribe)?,
    };

    Ok(Prepared {
        smtp: SmtpIdentity {
            server: config.smtp.server.trim().to_string(),
            port: config.smtp.port,
            username: config.smtp.username,
            from_email,
        },
        subject: config.email.subject,
        delay: Duration::from_secs(config.email.delay_secs),
        database,
        key,
        template,
        attachment,
        notify_email,
        links,
        name,
    })
}

fn load_attachment(campaign: &str, path: &Path) -> Result<Attachment, RegistryError> {
    let invalid = |reason: String| RegistryError::invalid(campaign, reason);

    let size = std::fs::metadata(path)
        .map_err(|e| invalid(format!("attachment {}: {e}", path.display())))?
        .len();
    if size > MAX_ATTACHMENT_BYTES {
        return Err(invalid(format!(
            "attachment {} is {size} bytes, limit is {MAX_ATTACHMENT_BYTES}",
            path.display()
        )));
    }
    let content =
        std::fs::read(path).map_err(|e| invalid(format!("attachment {}: {e}", path.display())))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment.pdf".to_string());

    Ok(Attachment { filename, content })
}

fn parse_http_url(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

fn is_url_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
pub(crate) mod testing {
    //! Registry fixtures backed by a temporary directory.

    use super::*;
    use tempfile::TempDir;

    pub const TEMPLATE: &str = "<p>Hi {{ first_name }}</p>\
        <a href=\"{{ interested_url }}\">Yes</a>\
        <a href=\"{{ unsubscribe_url }}\">No</a>\
        <img src=\"{{ pixel_url }}\">";

    pub fn campaign_yaml(name: &str, secret: &str, delay_secs: u64) -> String {
        format!(
            r#"
  - name: {name}
    database: {name}.db
    tracking_secret: {secret}
    smtp: {{ server: smtp.example.com, username: sender, from_email: sender@example.com }}
    email: {{ subject: "Hello {{{{ first_name }}}}", template: email.html, delay_secs: {delay_secs} }}
    notify_email: sales@example.com
    links:
      generic: https://example.com/
      interested: https://example.com/thanks
      unsubscribe: https://example.com/bye
"#
        )
    }

    /// Registry with the given `(name, secret)` campaigns, all pacing at `delay_secs`.
    pub fn registry(campaigns: &[(&str, &str)], delay_secs: u64) -> (TempDir, CampaignRegistry) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("email.html"), TEMPLATE).unwrap();
        let mut yaml = String::from("tracking_base_url: https://track.example.com\ncampaigns:\n");
        for (name, secret) in campaigns {
            yaml.push_str(&campaign_yaml(name, secret, delay_secs));
        }
        let registry =
            CampaignRegistry::from_yaml(&yaml, dir.path(), Duration::from_secs(1)).unwrap();
        (dir, registry)
    }
}
