//! Error types shared across the engine.
//!
//! Lead-level failures (a bad CSV row, a refused recipient) are collected into
//! reports by the batch operations; the variants here are what those reports
//! and the store-level calls carry.

use std::path::PathBuf;

use thiserror::Error;

use crate::status::LeadStatus;

/// A tracking request or operator command named a campaign that is not configured.
#[derive(Debug, Clone, Error)]
#[error("unknown campaign: {0}")]
pub struct UnknownCampaign(pub String);

/// Failures while loading and validating the campaign file.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse campaign file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duplicate campaign name: {0}")]
    DuplicateCampaign(String),

    #[error("campaign {campaign}: {reason}")]
    Invalid { campaign: String, reason: String },

    #[error("campaign {campaign}: store could not be opened: {source}")]
    Store {
        campaign: String,
        source: StoreError,
    },
}

impl RegistryError {
    pub(crate) fn invalid(campaign: &str, reason: impl Into<String>) -> Self {
        RegistryError::Invalid {
            campaign: campaign.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures raised by the per-campaign lead store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("unknown tracking token")]
    UnknownToken,

    #[error("unknown lead: {0}")]
    UnknownLead(String),

    #[error("duplicate email: {0}")]
    DuplicateEmail(String),

    #[error("invalid email format: {0}")]
    InvalidEmailFormat(String),

    /// The address belonged to a lead that was deleted; its token stays retired.
    #[error("email belongs to a deleted lead: {0}")]
    RetiredEmail(String),

    #[error("transition from {from} via {via} is not allowed")]
    InvalidTransition { from: LeadStatus, via: &'static str },

    /// No pooled connection came free within the store timeout.
    #[error("store connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("store task failed: {0}")]
    Task(String),
}

/// Failures from the outbound mail transport.
#[derive(Debug, Error)]
pub enum MailError {
    /// The message could not be assembled (bad address, bad attachment type).
    #[error("failed to build message: {0}")]
    Build(String),

    /// The server answered but refused this message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// No usable connection to the server (DNS, TCP, TLS, timeout).
    #[error("transport connection failed: {0}")]
    Connection(String),
}

impl MailError {
    pub fn is_connection(&self) -> bool {
        matches!(self, MailError::Connection(_))
    }
}

/// Failures while resolving and applying a tracking request.
///
/// None of these reach the network caller; the handlers log them and answer
/// with the normal pixel or redirect.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error(transparent)]
    UnknownCampaign(#[from] UnknownCampaign),

    #[error("unknown tracking token")]
    UnknownToken,

    /// The store stayed locked by another writer past the busy timeout.
    #[error("store busy")]
    Timeout,

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for TrackingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownToken => TrackingError::UnknownToken,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) =>
            {
                TrackingError::Timeout
            }
            StoreError::Pool(_) => TrackingError::Timeout,
            other => TrackingError::Store(other),
        }
    }
}

/// Failures that stop a dispatch run outright.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The message went out but the store refused to record it.
    #[error("sent to {email} but failed to record it: {source}")]
    Unrecorded { email: String, source: StoreError },
}

/// Failures from CSV import/export.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("csv input has no email column")]
    MissingEmailColumn,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to flush output: {0}")]
    Io(#[from] std::io::Error),
}
