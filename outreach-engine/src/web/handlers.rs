//! Tracking endpoint handlers.
//!
//! The handlers only ever answer with the pixel or a redirect to a configured
//! destination. Unknown campaigns, unknown tokens and store failures are
//! logged with the campaign and token and otherwise swallowed.

use std::sync::Arc;

use axum::{
    extract::{Form, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use url::Url;

use crate::campaign::{Campaign, CampaignRegistry};
use crate::error::{StoreError, TrackingError};
use crate::notify::{notify_if_green, Notifier};
use crate::status::{ClickKind, TrackingEvent};
use crate::store::{EventOutcome, LeadDetailInput};
use crate::token;

/// 1x1 transparent GIF.
pub static TRACKING_PIXEL: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
    0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CampaignRegistry>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(registry: CampaignRegistry, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry: Arc::new(registry),
            notifier,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub campaigns: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        campaigns: state.registry.names().count(),
    })
}

// =============================================================================
// Open Pixel
// =============================================================================

/// `GET /track/open/:campaign/:token`
pub async fn track_open(
    State(state): State<AppState>,
    Path((campaign, token)): Path<(String, String)>,
) -> Response {
    if let Some(campaign) = resolve(&state.registry, &campaign, &token) {
        track(&state, campaign, &token, TrackingEvent::Open, None).await;
    }
    pixel_response()
}

fn pixel_response() -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, NO_STORE),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        &TRACKING_PIXEL[..],
    )
        .into_response()
}

// =============================================================================
// Click Redirect
// =============================================================================

/// `GET /track/click/:campaign/:token/:kind`
///
/// The destination always comes from the campaign configuration.
pub async fn track_click(
    State(state): State<AppState>,
    Path((campaign, token, kind)): Path<(String, String, String)>,
) -> Response {
    let Some(campaign) = resolve(&state.registry, &campaign, &token) else {
        return redirect(StatusCode::FOUND, state.registry.fallback_url());
    };

    let Ok(kind) = kind.parse::<ClickKind>() else {
        warn!(campaign = %campaign.name, token = %token, kind = %kind, "track_unknown_link_kind");
        return redirect(StatusCode::FOUND, &campaign.links.generic);
    };

    let destination = campaign.links.destination(kind).clone();
    track(&state, campaign, &token, kind.event(), None).await;
    redirect(StatusCode::FOUND, &destination)
}

// =============================================================================
// Interest Form
// =============================================================================

/// `POST /track/interest/:campaign/:token`
///
/// Stores the submitted contact details, then counts as an interested click.
pub async fn submit_interest(
    State(state): State<AppState>,
    Path((campaign, token)): Path<(String, String)>,
    Form(input): Form<LeadDetailInput>,
) -> Response {
    let Some(campaign) = resolve(&state.registry, &campaign, &token) else {
        return redirect(StatusCode::SEE_OTHER, state.registry.fallback_url());
    };

    let destination = campaign.links.interested.clone();
    track(&state, campaign, &token, TrackingEvent::Interested, Some(input)).await;
    redirect(StatusCode::SEE_OTHER, &destination)
}

fn redirect(status: StatusCode, location: &Url) -> Response {
    (
        status,
        [
            (header::LOCATION, location.to_string()),
            (header::CACHE_CONTROL, NO_STORE.to_string()),
        ],
    )
        .into_response()
}

// =============================================================================
// Event Application
// =============================================================================

/// Resolve the campaign first; a token means nothing outside its campaign.
fn resolve(registry: &CampaignRegistry, campaign: &str, token: &str) -> Option<Arc<Campaign>> {
    match registry.resolve(campaign) {
        Ok(campaign) => Some(campaign),
        Err(_) => {
            warn!(campaign = %campaign, token = %token, "track_unknown_campaign");
            None
        }
    }
}

/// Apply `event` and log the result. Never fails.
async fn track(
    state: &AppState,
    campaign: Arc<Campaign>,
    token: &str,
    event: TrackingEvent,
    details: Option<LeadDetailInput>,
) {
    if !token::is_well_formed(token) {
        warn!(campaign = %campaign.name, token = %token, "track_malformed_token");
        return;
    }

    // Detached so a client hanging up cannot drop the notification after the
    // transition has committed.
    let task = tokio::spawn(apply_and_notify(
        Arc::clone(&state.notifier),
        Arc::clone(&campaign),
        token.to_string(),
        event,
        details,
    ));
    let result = task
        .await
        .unwrap_or_else(|e| Err(TrackingError::Store(StoreError::Task(e.to_string()))));

    match result {
        Ok(outcome) => info!(
            campaign = %campaign.name,
            token = %token,
            event = event.as_str(),
            from = %outcome.from,
            to = %outcome.to,
            first_occurrence = outcome.first_occurrence,
            "track_event_applied"
        ),
        Err(TrackingError::UnknownToken) => {
            warn!(campaign = %campaign.name, token = %token, "track_unknown_token")
        }
        Err(TrackingError::Timeout) => {
            error!(campaign = %campaign.name, token = %token, "track_store_busy")
        }
        Err(e) => error!(
            campaign = %campaign.name,
            token = %token,
            error = %e,
            "track_event_failed"
        ),
    }
}

async fn apply_and_notify(
    notifier: Arc<dyn Notifier>,
    campaign: Arc<Campaign>,
    token: String,
    event: TrackingEvent,
    details: Option<LeadDetailInput>,
) -> Result<EventOutcome, TrackingError> {
    let t = token.clone();
    let outcome = campaign
        .store
        .call(move |store| {
            if let Some(details) = &details {
                store.submit_details(&t, details, Utc::now())?;
            }
            store.apply_event(&t, event, Utc::now())
        })
        .await?;

    notify_if_green(notifier.as_ref(), &campaign, &token, &outcome).await;
    Ok(outcome)
}
