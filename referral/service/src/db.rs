// Copyright (c) 2024 The Botho Foundation

//! SQLite database for referral tracking.

use bth_referral_core::{Address, Referral, ReferralError, ReferralStatus, User};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{types::Type, Connection};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tracing::debug;

/// Column list matching [`row_to_user`].
pub(crate) const USER_COLUMNS: &str = "id, address, total_referrals, referred_by, created_at";

/// Column list matching [`row_to_referral`].
pub(crate) const REFERRAL_COLUMNS: &str = "id, referrer_id, referred_id, status, created_at";

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, ReferralError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(store_unavailable)?;

        conn.busy_timeout(busy_timeout).map_err(store_unavailable)?;
        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(store_unavailable)?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(store_unavailable)?;

        debug!(
            "Opened referral database at {} (journal_mode={})",
            path.display(),
            journal_mode
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, ReferralError> {
        let conn = Connection::open_in_memory().map_err(store_unavailable)?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(store_unavailable)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run database migrations.
    pub fn migrate(&self) -> Result<(), ReferralError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL UNIQUE,
                total_referrals INTEGER NOT NULL DEFAULT 0 CHECK (total_referrals >= 0),
                referred_by INTEGER REFERENCES users(id),
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_ranking ON users(total_referrals DESC, id ASC);

            CREATE TABLE IF NOT EXISTS referrals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                referrer_id INTEGER NOT NULL REFERENCES users(id),
                referred_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                CHECK (referrer_id <> referred_id)
            );

            CREATE INDEX IF NOT EXISTS idx_referrals_referrer ON referrals(referrer_id);
            "#,
        )
        .map_err(store_unavailable)?;

        Ok(())
    }

    /// Count all user rows.
    pub fn count_users(&self) -> Result<u64, ReferralError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(store_unavailable)?;
        Ok(count as u64)
    }

    /// Count all referral rows.
    pub fn count_referrals(&self) -> Result<u64, ReferralError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM referrals", [], |row| row.get(0))
            .map_err(store_unavailable)?;
        Ok(count as u64)
    }

    /// Acquire the connection.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, ReferralError> {
        self.conn
            .lock()
            .map_err(|e| ReferralError::StoreUnavailable(format!("Lock error: {}", e)))
    }
}

/// Map a store failure to the opaque infrastructure error.
pub(crate) fn store_unavailable(err: rusqlite::Error) -> ReferralError {
    ReferralError::StoreUnavailable(err.to_string())
}

/// Whether `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Current time as stored in `created_at` columns.
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a database row to a User.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let address_str: String = row.get(1)?;
    let total_referrals: i64 = row.get(2)?;

    let address = Address::parse(&address_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let total_referrals = u64::try_from(total_referrals)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(2, total_referrals))?;

    Ok(User {
        id: row.get(0)?,
        address,
        total_referrals,
        referred_by: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

/// Convert a database row to a Referral.
pub(crate) fn row_to_referral(row: &rusqlite::Row<'_>) -> rusqlite::Result<Referral> {
    let status_str: String = row.get(3)?;
    let status: ReferralStatus = status_str
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Referral {
        id: row.get(0)?,
        referrer_id: row.get(1)?,
        referred_id: row.get(2)?,
        status,
        created_at: timestamp_column(row, 4)?,
    })
}

fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}
