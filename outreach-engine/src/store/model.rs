//! Rows held by the lead store.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::status::{LeadStatus, TrackingEvent};

/// One recipient inside one campaign store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lead {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub tracking_token: String,
    pub status: LeadStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub sent_template: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub interested_at: Option<DateTime<Utc>>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub interact_count: i64,
    pub last_interact_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

pub(crate) const LEAD_COLUMNS: &str = "id, email, first_name, tracking_token, status, sent_at, \
     sent_template, opened_at, clicked_at, interested_at, unsubscribed_at, interact_count, \
     last_interact_at, notes, created_at";

impl Lead {
    /// Map a row selected with [`LEAD_COLUMNS`].
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Lead {
            id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            tracking_token: row.get(3)?,
            status: row.get(4)?,
            sent_at: row.get(5)?,
            sent_template: row.get(6)?,
            opened_at: row.get(7)?,
            clicked_at: row.get(8)?,
            interested_at: row.get(9)?,
            unsubscribed_at: row.get(10)?,
            interact_count: row.get(11)?,
            last_interact_at: row.get(12)?,
            notes: row.get(13)?,
            created_at: row.get(14)?,
        })
    }

    /// Whether the dispatcher may still email this lead.
    pub fn is_dispatchable(&self) -> bool {
        self.status == LeadStatus::Gray && self.sent_at.is_none() && self.unsubscribed_at.is_none()
    }
}

/// Contact details captured by the landing-page form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadDetail {
    pub lead_token: String,
    pub name: String,
    pub phone: String,
    pub company: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

/// Form fields as submitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LeadDetailInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub message: String,
}

/// Result of applying one tracking event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    pub event: TrackingEvent,
    pub from: LeadStatus,
    pub to: LeadStatus,
    /// This call recorded the event's timestamp.
    pub first_occurrence: bool,
    /// This call performed the transition into green.
    pub became_green: bool,
    pub email: String,
    pub first_name: String,
}

impl ToSql for LeadStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for LeadStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
