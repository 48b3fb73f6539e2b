// Copyright (c) 2024 The Botho Foundation

//! Leaderboard ordering and rank computation.
//!
//! Users are ordered by `total_referrals` descending, ties broken by user id
//! ascending (creation order). `rank_of` and `top` share this ordering, so a
//! user's position in a full-length `top` equals its rank.

use bth_referral_core::{LeaderboardEntry, ReferralError, UserId};
use rusqlite::{params, Connection};

use crate::db::{row_to_user, store_unavailable, Database, USER_COLUMNS};

/// Produces ranked views of the user table.
#[derive(Clone)]
pub struct LeaderboardRanker {
    db: Database,
}

impl LeaderboardRanker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Up to `n` users with the most referrals.
    pub fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, ReferralError> {
        let conn = self.db.lock()?;
        top(&conn, n).map_err(store_unavailable)
    }
}

/// 1-based rank of user `id`, computed in a single statement.
pub(crate) fn rank_of(conn: &Connection, id: UserId) -> rusqlite::Result<u64> {
    let ahead: i64 = conn.query_row(
        r#"
        SELECT COUNT(*)
        FROM users AS other, users AS me
        WHERE me.id = ?1
          AND (other.total_referrals > me.total_referrals
               OR (other.total_referrals = me.total_referrals AND other.id < me.id))
        "#,
        params![id],
        |row| row.get(0),
    )?;

    Ok(ahead as u64 + 1)
}

pub(crate) fn top(conn: &Connection, n: usize) -> rusqlite::Result<Vec<LeaderboardEntry>> {
    let limit = i64::try_from(n).unwrap_or(i64::MAX);

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users ORDER BY total_referrals DESC, id ASC LIMIT ?1",
        USER_COLUMNS
    ))?;

    let entries = stmt
        .query_map(params![limit], row_to_user)?
        .map(|user| {
            user.map(|user| LeaderboardEntry {
                address: user.address,
                total_referrals: user.total_referrals,
            })
        })
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}
