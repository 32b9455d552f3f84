//! Per-campaign lead store backed by SQLite.
//!
//! Each campaign owns one database file. The tracker and the dispatcher open
//! the same file from separate processes, so every read-modify-write runs in
//! a `BEGIN IMMEDIATE` transaction and the connection waits out the other
//! writer with a busy timeout. Nothing is cached between calls.
//!
//! Calls draw connections from a small pool, so concurrent tracker requests
//! each wait on SQLite's own lock rather than queueing behind one handle.
//! Waiting for a free connection is bounded by the same timeout.
//!
//! [`LeadStore::apply_event`] and [`LeadStore::manual_override`] are the only
//! code paths that write `status`.

pub mod model;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::address::{is_valid_email, normalize_email};
use crate::error::StoreError;
use crate::status::{self, LeadStatus, TrackingEvent};
use crate::token::TrackingKey;

pub use model::{EventOutcome, Lead, LeadDetail, LeadDetailInput};

use model::LEAD_COLUMNS;

/// Connections kept per store file.
pub const POOL_SIZE: u32 = 4;

const IN_MEMORY: &str = ":memory:";

/// Handle to one campaign's lead database.
pub struct LeadStore {
    path: PathBuf,
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for LeadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadStore").field("path", &self.path).finish()
    }
}

/// Per-connection settings; returns the journal mode in effect.
fn configure(conn: &Connection, timeout: Duration) -> rusqlite::Result<String> {
    conn.busy_timeout(timeout)?;
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(journal_mode)
}

impl LeadStore {
    /// Open (or create) the store at `path` and apply the schema.
    ///
    /// `timeout` bounds how long a call waits for another writer, and how
    /// long it waits for a pooled connection.
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let in_memory = path.as_os_str() == IN_MEMORY;

        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            // Surface a bad path as an open error before any pooling.
            let conn = Connection::open(&path).map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;
            let journal_mode =
                configure(&conn, timeout).map_err(|source| StoreError::Open {
                    path: path.clone(),
                    source,
                })?;
            schema::migrate(&conn)?;
            debug!(path = %path.display(), journal_mode = %journal_mode, "store_opened");
            SqliteConnectionManager::file(&path)
        };

        // Every in-memory connection is its own database, so keep exactly one.
        let max_size = if in_memory { 1 } else { POOL_SIZE };
        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(1))
            .connection_timeout(timeout)
            .build(manager.with_init(move |conn| configure(conn, timeout).map(|_| ())))?;

        if in_memory {
            schema::migrate(&*pool.get()?)?;
        }

        Ok(Self { path, pool })
    }

    /// Private in-memory store, used by tests and previews.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(IN_MEMORY, Duration::from_secs(1))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }

    /// Run a blocking store call on the blocking thread pool.
    pub async fn call<T, F>(self: &Arc<Self>, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&LeadStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    // =========================================================================
    // Leads
    // =========================================================================

    /// Insert a new gray lead.
    ///
    /// Rejects malformed addresses, addresses already present and addresses
    /// of deleted leads, whose tokens are never handed out again.
    pub fn insert_lead(
        &self,
        key: &TrackingKey,
        email: &str,
        first_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Lead, StoreError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(StoreError::InvalidEmailFormat(email));
        }
        let token = key.token_for(&email);

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let retired = tx
            .query_row(
                "SELECT 1 FROM retired_tokens WHERE tracking_token = ?1",
                params![token],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if retired {
            return Err(StoreError::RetiredEmail(email));
        }

        let inserted = tx.execute(
            "INSERT INTO leads (email, first_name, tracking_token, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![email, first_name.trim(), token, LeadStatus::Gray, now],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(StoreError::DuplicateEmail(email));
            }
            Err(e) => return Err(e.into()),
        }

        let lead = tx.query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE tracking_token = ?1"),
            params![token],
            Lead::from_row,
        )?;
        tx.commit()?;
        Ok(lead)
    }

    pub fn lead_by_token(&self, token: &str) -> Result<Option<Lead>, StoreError> {
        let conn = self.conn()?;
        let lead = conn
            .query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE tracking_token = ?1"),
                params![token],
                Lead::from_row,
            )
            .optional()?;
        Ok(lead)
    }

    pub fn lead_by_email(&self, email: &str) -> Result<Option<Lead>, StoreError> {
        let conn = self.conn()?;
        let lead = conn
            .query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE email = ?1"),
                params![normalize_email(email)],
                Lead::from_row,
            )
            .optional()?;
        Ok(lead)
    }

    /// Leads with `status` as an export reports them, in import order.
    ///
    /// A sent lead stays gray until it engages, but it is no longer untouched:
    /// the gray selection only holds leads that were never emailed.
    pub fn list_for_export(&self, status: LeadStatus) -> Result<Vec<Lead>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE status = ?1 AND (?1 <> 'gray' OR sent_at IS NULL)
             ORDER BY id"
        ))?;
        let leads = stmt
            .query_map(params![status], Lead::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(leads)
    }

    /// Lead count per status; every status is present.
    pub fn status_counts(&self) -> Result<BTreeMap<LeadStatus, u64>, StoreError> {
        let conn = self.conn()?;
        let mut counts: BTreeMap<LeadStatus, u64> =
            LeadStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM leads GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, LeadStatus>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            counts.insert(status, count.max(0) as u64);
        }
        Ok(counts)
    }

    // =========================================================================
    // Dispatch bookkeeping
    // =========================================================================

    /// Leads the dispatcher may email, in import order.
    pub fn pending_dispatch(&self) -> Result<Vec<Lead>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE status = 'gray' AND sent_at IS NULL AND unsubscribed_at IS NULL
             ORDER BY id"
        ))?;
        let leads = stmt
            .query_map([], Lead::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(leads)
    }

    /// Fresh eligibility check taken right before a send.
    pub fn is_dispatchable(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self
            .lead_by_token(token)?
            .map(|lead| lead.is_dispatchable())
            .unwrap_or(false))
    }

    /// Record a successful send. Returns `false` if `sent_at` was already set.
    ///
    /// Status is left alone: sending is not engagement.
    pub fn mark_sent(
        &self,
        token: &str,
        template: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE leads SET sent_at = ?1, sent_template = ?2
             WHERE tracking_token = ?3 AND sent_at IS NULL",
            params![now, template, token],
        )?;
        Ok(updated == 1)
    }

    // =========================================================================
    // Status transitions
    // =========================================================================

    /// Apply a tracking event atomically.
    ///
    /// The status change, the first-occurrence timestamp and the interaction
    /// counter are written in one immediate transaction, so concurrent
    /// duplicates serialize: exactly one of them sees `first_occurrence` and
    /// at most one sees `became_green`.
    pub fn apply_event(
        &self,
        token: &str,
        event: TrackingEvent,
        now: DateTime<Utc>,
    ) -> Result<EventOutcome, StoreError> {
        let column = event.timestamp_column();

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = tx
            .query_row(
                &format!(
                    "SELECT status, {column} IS NULL, email, first_name
                     FROM leads WHERE tracking_token = ?1"
                ),
                params![token],
                |row| {
                    Ok((
                        row.get::<_, LeadStatus>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((from, first_occurrence, email, first_name)) = current else {
            return Err(StoreError::UnknownToken);
        };

        let to = status::next_status(from, event);
        tx.execute(
            &format!(
                "UPDATE leads
                 SET status = ?1,
                     {column} = COALESCE({column}, ?2),
                     interact_count = interact_count + 1,
                     last_interact_at = ?2
                 WHERE tracking_token = ?3"
            ),
            params![to, now, token],
        )?;
        tx.commit()?;

        Ok(EventOutcome {
            event,
            from,
            to,
            first_occurrence,
            became_green: to == LeadStatus::Green && from != LeadStatus::Green,
            email,
            first_name,
        })
    }

    /// Operator takeover: move a lead to blue. Red leads are refused.
    pub fn manual_override(&self, email: &str) -> Result<Lead, StoreError> {
        let email = normalize_email(email);

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let from: LeadStatus = tx
            .query_row(
                "SELECT status FROM leads WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::UnknownLead(email.clone()))?;

        let to = status::manual_override(from).ok_or(StoreError::InvalidTransition {
            from,
            via: "manual override",
        })?;

        tx.execute(
            "UPDATE leads SET status = ?1 WHERE email = ?2",
            params![to, email],
        )?;
        let lead = tx.query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE email = ?1"),
            params![email],
            Lead::from_row,
        )?;
        tx.commit()?;

        info!(from = %from, to = %to, "lead_manual_override");
        Ok(lead)
    }

    pub fn update_notes(&self, email: &str, notes: &str) -> Result<(), StoreError> {
        let email = normalize_email(email);
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE leads SET notes = ?1 WHERE email = ?2",
            params![notes, email],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownLead(email));
        }
        Ok(())
    }

    // =========================================================================
    // Lead details
    // =========================================================================

    /// Store (or replace) the landing-page details of a lead.
    pub fn submit_details(
        &self,
        token: &str,
        input: &LeadDetailInput,
        now: DateTime<Utc>,
    ) -> Result<LeadDetail, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM leads WHERE tracking_token = ?1",
                params![token],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::UnknownToken);
        }

        let detail = LeadDetail {
            lead_token: token.to_string(),
            name: input.name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            company: input.company.trim().to_string(),
            message: input.message.trim().to_string(),
            submitted_at: now,
        };
        tx.execute(
            "INSERT INTO lead_details (lead_token, name, phone, company, message, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(lead_token) DO UPDATE SET
                 name = excluded.name,
                 phone = excluded.phone,
                 company = excluded.company,
                 message = excluded.message,
                 submitted_at = excluded.submitted_at",
            params![
                detail.lead_token,
                detail.name,
                detail.phone,
                detail.company,
                detail.message,
                detail.submitted_at
            ],
        )?;
        tx.commit()?;
        Ok(detail)
    }

    pub fn lead_detail(&self, token: &str) -> Result<Option<LeadDetail>, StoreError> {
        let conn = self.conn()?;
        let detail = conn
            .query_row(
                "SELECT lead_token, name, phone, company, message, submitted_at
                 FROM lead_details WHERE lead_token = ?1",
                params![token],
                |row| {
                    Ok(LeadDetail {
                        lead_token: row.get(0)?,
                        name: row.get(1)?,
                        phone: row.get(2)?,
                        company: row.get(3)?,
                        message: row.get(4)?,
                        submitted_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(detail)
    }

    /// Delete a lead. Its details go with it and its token is retired.
    pub fn delete_lead(&self, email: &str) -> Result<bool, StoreError> {
        let email = normalize_email(email);
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM leads WHERE email = ?1", params![email])?;
        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> TrackingKey {
        TrackingKey::new("test-secret").unwrap()
    }

    fn store_with(emails: &[&str]) -> LeadStore {
        let store = LeadStore::open_in_memory().unwrap();
        for email in emails {
            store.insert_lead(&key(), email, "Ann", Utc::now()).unwrap();
        }
        store
    }

    fn token(email: &str) -> String {
        key().token_for(email)
    }

    #[test]
    fn test_insert_lead_defaults() {
        let store = LeadStore::open_in_memory().unwrap();
        let lead = store
            .insert_lead(&key(), " Alice@Example.com ", " Alice ", Utc::now())
            .unwrap();

        assert_eq!(lead.email, "alice@example.com");
        assert_eq!(lead.first_name, "Alice");
        assert_eq!(lead.status, LeadStatus::Gray);
        assert_eq!(lead.tracking_token, token("alice@example.com"));
        assert_eq!(lead.sent_at, None);
        assert_eq!(lead.interact_count, 0);
        assert!(lead.is_dispatchable());
    }

    #[test]
    fn test_insert_rejects_duplicates_and_bad_syntax() {
        let store = store_with(&["alice@example.com"]);

        let dup = store.insert_lead(&key(), "ALICE@example.com", "", Utc::now());
        assert!(matches!(dup, Err(StoreError::DuplicateEmail(_))));

        let bad = store.insert_lead(&key(), "not-an-email", "", Utc::now());
        assert!(matches!(bad, Err(StoreError::InvalidEmailFormat(_))));
    }

    #[test]
    fn test_open_then_interest_then_unsubscribe() {
        let store = store_with(&["alice@example.com"]);
        let t = token("alice@example.com");

        let open = store.apply_event(&t, TrackingEvent::Open, Utc::now()).unwrap();
        assert_eq!((open.from, open.to), (LeadStatus::Gray, LeadStatus::Yellow));
        assert!(open.first_occurrence);
        assert!(!open.became_green);

        let reopen = store.apply_event(&t, TrackingEvent::Open, Utc::now()).unwrap();
        assert!(!reopen.first_occurrence);

        let interested = store
            .apply_event(&t, TrackingEvent::Interested, Utc::now())
            .unwrap();
        assert!(interested.became_green);
        assert_eq!(interested.email, "alice@example.com");

        let again = store
            .apply_event(&t, TrackingEvent::Interested, Utc::now())
            .unwrap();
        assert!(!again.became_green);

        let unsub = store
            .apply_event(&t, TrackingEvent::Unsubscribe, Utc::now())
            .unwrap();
        assert_eq!(unsub.to, LeadStatus::Red);

        let lead = store.lead_by_token(&t).unwrap().unwrap();
        assert_eq!(lead.status, LeadStatus::Red);
        assert!(lead.opened_at.is_some());
        assert!(lead.interested_at.is_some());
        assert!(lead.unsubscribed_at.is_some());
        assert_eq!(lead.interact_count, 5);
    }

    #[test]
    fn test_first_timestamp_is_kept() {
        let store = store_with(&["alice@example.com"]);
        let t = token("alice@example.com");
        let first = Utc::now() - chrono::Duration::hours(1);

        store.apply_event(&t, TrackingEvent::Open, first).unwrap();
        store.apply_event(&t, TrackingEvent::Open, Utc::now()).unwrap();

        let lead = store.lead_by_token(&t).unwrap().unwrap();
        assert_eq!(lead.opened_at, Some(first));
        assert!(lead.last_interact_at.unwrap() > first);
    }

    #[test]
    fn test_red_absorbs_but_records_timestamps() {
        let store = store_with(&["bob@example.com"]);
        let t = token("bob@example.com");

        store.apply_event(&t, TrackingEvent::Unsubscribe, Utc::now()).unwrap();
        let outcome = store.apply_event(&t, TrackingEvent::Interested, Utc::now()).unwrap();

        assert_eq!(outcome.to, LeadStatus::Red);
        assert!(!outcome.became_green);
        let lead = store.lead_by_token(&t).unwrap().unwrap();
        assert!(lead.interested_at.is_some());
        assert_eq!(lead.status, LeadStatus::Red);
    }

    #[test]
    fn test_unknown_token() {
        let store = store_with(&["alice@example.com"]);
        let result = store.apply_event("0".repeat(32).as_str(), TrackingEvent::Open, Utc::now());
        assert!(matches!(result, Err(StoreError::UnknownToken)));
    }

    #[test]
    fn test_manual_override() {
        let store = store_with(&["alice@example.com", "bob@example.com"]);

        let lead = store.manual_override("Alice@example.com").unwrap();
        assert_eq!(lead.status, LeadStatus::Blue);

        // blue ignores automatic events
        let t = token("alice@example.com");
        let outcome = store.apply_event(&t, TrackingEvent::Interested, Utc::now()).unwrap();
        assert_eq!(outcome.to, LeadStatus::Blue);
        assert!(!outcome.became_green);

        store
            .apply_event(&token("bob@example.com"), TrackingEvent::Unsubscribe, Utc::now())
            .unwrap();
        let refused = store.manual_override("bob@example.com");
        assert!(matches!(
            refused,
            Err(StoreError::InvalidTransition { from: LeadStatus::Red, .. })
        ));

        assert!(matches!(
            store.manual_override("nobody@example.com"),
            Err(StoreError::UnknownLead(_))
        ));
    }

    #[test]
    fn test_mark_sent_only_once() {
        let store = store_with(&["alice@example.com"]);
        let t = token("alice@example.com");
        let first = Utc::now();

        assert!(store.mark_sent(&t, "email.html", first).unwrap());
        assert!(!store.mark_sent(&t, "other.html", Utc::now()).unwrap());

        let lead = store.lead_by_token(&t).unwrap().unwrap();
        assert_eq!(lead.sent_at, Some(first));
        assert_eq!(lead.sent_template.as_deref(), Some("email.html"));
        assert_eq!(lead.status, LeadStatus::Gray);
        assert!(store.pending_dispatch().unwrap().is_empty());
    }

    #[test]
    fn test_pending_dispatch_order_and_filter() {
        let store = store_with(&["c@example.com", "a@example.com", "b@example.com"]);
        store
            .apply_event(&token("a@example.com"), TrackingEvent::Open, Utc::now())
            .unwrap();

        let pending: Vec<_> = store
            .pending_dispatch()
            .unwrap()
            .into_iter()
            .map(|l| l.email)
            .collect();
        assert_eq!(pending, vec!["c@example.com", "b@example.com"]);
    }

    #[test]
    fn test_gray_export_skips_sent_leads() {
        let store = store_with(&["a@example.com", "b@example.com", "c@example.com"]);
        store
            .mark_sent(&token("a@example.com"), "email.html", Utc::now())
            .unwrap();
        store
            .apply_event(&token("c@example.com"), TrackingEvent::Open, Utc::now())
            .unwrap();

        let emails = |status| -> Vec<String> {
            store
                .list_for_export(status)
                .unwrap()
                .into_iter()
                .map(|l| l.email)
                .collect()
        };
        assert_eq!(emails(LeadStatus::Gray), vec!["b@example.com"]);
        assert_eq!(emails(LeadStatus::Yellow), vec!["c@example.com"]);
        assert_eq!(
            store.status_counts().unwrap()[&LeadStatus::Gray],
            2,
            "counts still report sent leads as gray"
        );
    }

    #[test]
    fn test_details_cascade_on_delete() {
        let store = store_with(&["alice@example.com"]);
        let t = token("alice@example.com");
        let input = LeadDetailInput {
            name: "Alice".into(),
            phone: "+48 123".into(),
            company: "Bakery".into(),
            message: "Call me".into(),
        };

        store.submit_details(&t, &input, Utc::now()).unwrap();
        assert_eq!(store.lead_detail(&t).unwrap().unwrap().company, "Bakery");

        assert!(store.delete_lead("alice@example.com").unwrap());
        assert!(store.lead_detail(&t).unwrap().is_none());
        assert!(store.lead_by_token(&t).unwrap().is_none());

        let conn = store.conn().unwrap();
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM lead_details", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_pooled_calls_do_not_queue_behind_one_connection() {
        let dir = tempfile::tempdir().unwrap();
        let store = LeadStore::open(dir.path().join("pool.db"), Duration::from_millis(200)).unwrap();
        store
            .insert_lead(&key(), "alice@example.com", "Alice", Utc::now())
            .unwrap();

        let held: Vec<_> = (0..POOL_SIZE - 1).map(|_| store.conn().unwrap()).collect();
        assert!(store.lead_by_email("alice@example.com").unwrap().is_some());

        // With every connection taken, the wait is bounded by the store timeout.
        let last = store.conn().unwrap();
        let err = store.lead_by_email("alice@example.com").unwrap_err();
        assert!(matches!(err, StoreError::Pool(_)));
        assert!(matches!(
            crate::error::TrackingError::from(err),
            crate::error::TrackingError::Timeout
        ));

        drop(last);
        drop(held);
        assert!(store.lead_by_email("alice@example.com").unwrap().is_some());
    }

    #[test]
    fn test_details_require_lead() {
        let store = store_with(&[]);
        let result = store.submit_details(&token("ghost@example.com"), &LeadDetailInput::default(), Utc::now());
        assert!(matches!(result, Err(StoreError::UnknownToken)));
    }

    #[test]
    fn test_deleted_email_is_not_reimported() {
        let store = store_with(&["alice@example.com"]);
        store.delete_lead("alice@example.com").unwrap();

        let again = store.insert_lead(&key(), "alice@example.com", "", Utc::now());
        assert!(matches!(again, Err(StoreError::RetiredEmail(_))));
    }

    #[test]
    fn test_status_counts() {
        let store = store_with(&["a@example.com", "b@example.com"]);
        store
            .apply_event(&token("a@example.com"), TrackingEvent::Open, Utc::now())
            .unwrap();

        let counts = store.status_counts().unwrap();
        assert_eq!(counts[&LeadStatus::Gray], 1);
        assert_eq!(counts[&LeadStatus::Yellow], 1);
        assert_eq!(counts[&LeadStatus::Red], 0);
    }

    #[test]
    fn test_update_notes() {
        let store = store_with(&["alice@example.com"]);
        store.update_notes("alice@example.com", "called on monday").unwrap();
        let lead = store.lead_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(lead.notes, "called on monday");
        assert!(store.update_notes("x@example.com", "n").is_err());
    }
}
