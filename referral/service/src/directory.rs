// Copyright (c) 2024 The Botho Foundation

//! User directory: get-or-create and lookup of users by address.

use bth_referral_core::{Address, ReferralError, User, UserId};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::{
    db::{now_millis, row_to_user, store_unavailable, Database, USER_COLUMNS},
    leaderboard,
};

/// Get-or-create access to user records.
#[derive(Clone)]
pub struct UserDirectory {
    db: Database,
}

impl UserDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Return the user for `address`, creating it with no referrals if absent.
    pub fn get_or_create(&self, address: &str) -> Result<User, ReferralError> {
        let address = ReferralError::check_address(address)?;
        let conn = self.db.lock()?;
        get_or_create(&conn, &address).map_err(store_unavailable)
    }

    /// Look up the user for `address` without creating it.
    pub fn find_by_address(&self, address: &Address) -> Result<Option<User>, ReferralError> {
        let conn = self.db.lock()?;
        find_by_address(&conn, address).map_err(store_unavailable)
    }

    /// 1-based rank of `user` on the leaderboard.
    pub fn rank_of(&self, user: &User) -> Result<u64, ReferralError> {
        let conn = self.db.lock()?;
        leaderboard::rank_of(&conn, user.id).map_err(store_unavailable)
    }

    /// Get-or-create `address` and compute its rank from the same snapshot.
    pub fn get_or_create_ranked(&self, address: &str) -> Result<(User, u64), ReferralError> {
        let address = ReferralError::check_address(address)?;
        let mut conn = self.db.lock()?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_unavailable)?;
        let user = get_or_create(&tx, &address).map_err(store_unavailable)?;
        let rank = leaderboard::rank_of(&tx, user.id).map_err(store_unavailable)?;
        tx.commit().map_err(store_unavailable)?;

        Ok((user, rank))
    }
}

/// Insert `address` unless present, then fetch the row.
///
/// The insert is a single conditional statement against the UNIQUE address
/// column, so concurrent callers for the same address converge on one row.
pub(crate) fn get_or_create(conn: &Connection, address: &Address) -> rusqlite::Result<User> {
    conn.execute(
        r#"
        INSERT INTO users (address, total_referrals, created_at)
        VALUES (?1, 0, ?2)
        ON CONFLICT(address) DO NOTHING
        "#,
        params![address.as_str(), now_millis()],
    )?;

    conn.query_row(
        &format!("SELECT {} FROM users WHERE address = ?1", USER_COLUMNS),
        params![address.as_str()],
        row_to_user,
    )
}

pub(crate) fn find_by_address(
    conn: &Connection,
    address: &Address,
) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE address = ?1", USER_COLUMNS),
        params![address.as_str()],
        row_to_user,
    )
    .optional()
}

/// Insert a new user that was referred by `referrer`. Fails with a UNIQUE
/// violation if the address already exists.
pub(crate) fn insert_referred(
    conn: &Connection,
    address: &Address,
    referrer: UserId,
) -> rusqlite::Result<User> {
    conn.query_row(
        &format!(
            r#"
            INSERT INTO users (address, total_referrals, referred_by, created_at)
            VALUES (?1, 0, ?2, ?3)
            RETURNING {}
            "#,
            USER_COLUMNS
        ),
        params![address.as_str(), referrer, now_millis()],
        row_to_user,
    )
}

/// Credit one completed referral to `user`.
pub(crate) fn increment_referrals(conn: &Connection, user: UserId) -> rusqlite::Result<()> {
    let updated = conn.execute(
        "UPDATE users SET total_referrals = total_referrals + 1 WHERE id = ?1",
        params![user],
    )?;

    if updated != 1 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}
