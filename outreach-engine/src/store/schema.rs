//! Lead store schema.
//!
//! Tracked with `PRAGMA user_version`. Every statement is idempotent so the
//! tracker and the dispatcher can both open a fresh file without coordinating.

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS leads (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    email            TEXT NOT NULL UNIQUE,
    first_name       TEXT NOT NULL DEFAULT '',
    tracking_token   TEXT NOT NULL UNIQUE,
    status           TEXT NOT NULL DEFAULT 'gray'
                     CHECK (status IN ('gray', 'yellow', 'green', 'red', 'blue')),
    sent_at          TEXT,
    sent_template    TEXT,
    opened_at        TEXT,
    clicked_at       TEXT,
    interested_at    TEXT,
    unsubscribed_at  TEXT,
    interact_count   INTEGER NOT NULL DEFAULT 0,
    last_interact_at TEXT,
    notes            TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status, id);

CREATE TABLE IF NOT EXISTS lead_details (
    lead_token   TEXT PRIMARY KEY
                 REFERENCES leads(tracking_token) ON DELETE CASCADE,
    name         TEXT NOT NULL DEFAULT '',
    phone        TEXT NOT NULL DEFAULT '',
    company      TEXT NOT NULL DEFAULT '',
    message      TEXT NOT NULL DEFAULT '',
    submitted_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS retired_tokens (
    tracking_token TEXT PRIMARY KEY,
    retired_at     TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS leads_retire_token
AFTER DELETE ON leads
BEGIN
    INSERT OR IGNORE INTO retired_tokens (tracking_token, retired_at)
    VALUES (OLD.tracking_token, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'));
END;
"#;

/// Bring the schema up to [`SCHEMA_VERSION`].
pub fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(SCHEMA_V1)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    info!(from = version, to = SCHEMA_VERSION, "store_schema_migrated");
    Ok(())
}
