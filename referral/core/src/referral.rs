// Copyright (c) 2024 The Botho Foundation

//! Users, referral edges and the views derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::address::Address;

/// Store-assigned user identifier. Increases with insertion order, which makes
/// it the tie-break key for ranking.
pub type UserId = i64;

/// A tracked wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier
    pub id: UserId,

    /// Normalized account address
    pub address: Address,

    /// Number of completed referrals where this user is the referrer
    pub total_referrals: u64,

    /// The user who referred this one, if any. Never changes once set.
    pub referred_by: Option<UserId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// The status of a referral edge.
///
/// Registration is synchronous and atomic, so `Completed` is the only state a
/// stored referral can be in today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ReferralStatus {
    /// The referred user was created and the referrer credited
    Completed,
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferralStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// A status string that does not name a known [`ReferralStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown referral status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ReferralStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(ReferralStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A directed referral edge: `referrer_id` invited `referred_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    /// Unique referral identifier
    pub id: i64,

    /// The inviting user
    pub referrer_id: UserId,

    /// The invited user
    pub referred_id: UserId,

    /// Referral status
    pub status: ReferralStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Per-address statistics returned by the stats lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_referrals: u64,
    /// 1-based leaderboard position
    pub rank: u64,
    pub referral_link: String,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub address: Address,
    pub total_referrals: u64,
}

/// Build the invite link for `address`: `{site_url}/join?ref={address}`.
pub fn referral_link(site_url: &str, address: &Address) -> String {
    format!("{}/join?ref={}", site_url.trim_end_matches('/'), address)
}
