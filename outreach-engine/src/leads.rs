//! CSV lead import and export.
//!
//! Import reads a header row with an `email` column and an optional
//! `first_name` column; other columns are ignored, so an export can be fed
//! back in. Bad rows are collected into the report and never stop the batch.

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ImportError, StoreError};
use crate::status::LeadStatus;
use crate::store::{Lead, LeadStore};
use crate::token::TrackingKey;

/// Why a row was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    InvalidEmailFormat,
    DuplicateEmail,
    /// The address belonged to a deleted lead
    Retired,
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    /// 1-based line in the input
    pub line: u64,
    pub email: String,
    #[serde(flatten)]
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub rejected: Vec<RowRejection>,
}

/// Import leads from CSV into `store`, deriving tokens with `key`.
pub fn import_csv<R: io::Read>(
    store: &LeadStore,
    key: &TrackingKey,
    reader: R,
) -> Result<ImportReport, ImportError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let email_col = column("email").ok_or(ImportError::MissingEmailColumn)?;
    let name_col = column("first_name");

    let mut report = ImportReport::default();
    for record in csv.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                report.rejected.push(RowRejection {
                    line,
                    email: String::new(),
                    reason: RejectReason::Malformed(e.to_string()),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let email = record.get(email_col).unwrap_or_default();
        let first_name = name_col.and_then(|i| record.get(i)).unwrap_or_default();

        let reason = match store.insert_lead(key, email, first_name, Utc::now()) {
            Ok(_) => {
                report.inserted += 1;
                continue;
            }
            Err(StoreError::InvalidEmailFormat(_)) => RejectReason::InvalidEmailFormat,
            Err(StoreError::DuplicateEmail(_)) => RejectReason::DuplicateEmail,
            Err(StoreError::RetiredEmail(_)) => RejectReason::Retired,
            Err(e) => return Err(e.into()),
        };
        warn!(line, email = %email, reason = ?reason, "import_row_rejected");
        report.rejected.push(RowRejection {
            line,
            email: email.to_string(),
            reason,
        });
    }

    info!(
        path = %store.path().display(),
        inserted = report.inserted,
        rejected = report.rejected.len(),
        "import_finished"
    );
    Ok(report)
}

/// Column layout of an export.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    email: &'a str,
    first_name: &'a str,
    status: LeadStatus,
    sent_at: Option<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
    clicked_at: Option<DateTime<Utc>>,
    interested_at: Option<DateTime<Utc>>,
    unsubscribed_at: Option<DateTime<Utc>>,
    interact_count: i64,
    notes: &'a str,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Lead> for ExportRow<'a> {
    fn from(lead: &'a Lead) -> Self {
        Self {
            email: &lead.email,
            first_name: &lead.first_name,
            status: lead.status,
            sent_at: lead.sent_at,
            opened_at: lead.opened_at,
            clicked_at: lead.clicked_at,
            interested_at: lead.interested_at,
            unsubscribed_at: lead.unsubscribed_at,
            interact_count: lead.interact_count,
            notes: &lead.notes,
            created_at: lead.created_at,
        }
    }
}

/// Write every lead with `status` as CSV, in import order. Returns the row count.
///
/// Gray exports only leads that were never sent, so the file can seed another run.
pub fn export_csv<W: io::Write>(
    store: &LeadStore,
    status: LeadStatus,
    writer: W,
) -> Result<usize, ImportError> {
    let leads = store.list_for_export(status)?;
    let mut csv = csv::Writer::from_writer(writer);
    for lead in &leads {
        csv.serialize(ExportRow::from(lead))?;
    }
    if leads.is_empty() {
        // No row means no automatic header.
        csv.write_record(EXPORT_HEADER)?;
    }
    csv.flush()?;
    Ok(leads.len())
}

pub const EXPORT_HEADER: [&str; 11] = [
    "email",
    "first_name",
    "status",
    "sent_at",
    "opened_at",
    "clicked_at",
    "interested_at",
    "unsubscribed_at",
    "interact_count",
    "notes",
    "created_at",
];
