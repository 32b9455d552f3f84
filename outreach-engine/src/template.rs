//! Email body and subject rendering.
//!
//! Templates use `{{ name }}` placeholders. The renderer is handed the lead's
//! first name and the tracking token; it never sees the address, so no
//! generated URL can carry one. Unknown placeholders are left untouched.

use std::borrow::Cow;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::campaign::{Campaign, TrackingBase};
use crate::status::ClickKind;

/// A template loaded at startup.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    source: String,
}

impl Template {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, source })
    }

    /// File name recorded as `sent_template`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Subject and HTML body for one lead.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Render `campaign`'s subject and body for the lead behind `token`.
pub fn render_email(
    campaign: &Campaign,
    base: &TrackingBase,
    first_name: &str,
    token: &str,
) -> RenderedEmail {
    let name = campaign.name.as_str();
    let pixel_url = base.open_url(name, token);
    let generic_url = base.click_url(name, token, ClickKind::Generic);
    let interested_url = base.click_url(name, token, ClickKind::Interested);
    let unsubscribe_url = base.click_url(name, token, ClickKind::Unsubscribe);
    let interest_form_url = base.interest_form_url(name, token);

    let html = substitute(campaign.template.source(), |key| match key {
        "first_name" => Some(escape_html(first_name)),
        "campaign" => Some(escape_html(name)),
        "pixel_url" => Some(Cow::Owned(pixel_url.to_string())),
        "generic_url" => Some(Cow::Owned(generic_url.to_string())),
        "interested_url" => Some(Cow::Owned(interested_url.to_string())),
        "unsubscribe_url" => Some(Cow::Owned(unsubscribe_url.to_string())),
        "interest_form_url" => Some(Cow::Owned(interest_form_url.to_string())),
        _ => None,
    });

    // Header text, not markup.
    let subject = substitute(&campaign.subject, |key| match key {
        "first_name" => Some(Cow::Borrowed(first_name)),
        "campaign" => Some(Cow::Borrowed(name)),
        _ => None,
    });

    RenderedEmail { subject, html }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").expect("Invalid placeholder pattern")
    })
}

fn substitute<'a, F>(source: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<Cow<'a, str>>,
{
    placeholder_pattern()
        .replace_all(source, |caps: &Captures<'_>| match lookup(&caps[1]) {
            Some(value) => value.into_owned(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn escape_html(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
