// Copyright (c) 2024 The Botho Foundation

//! BTH referral tracking service.
//!
//! Records wallet addresses, links each newly referred address to its
//! referrer, keeps a per-address referral count and serves a ranked
//! leaderboard over HTTP. State lives in SQLite.

pub mod api;
pub mod db;
pub mod directory;
pub mod leaderboard;
pub mod registrar;
pub mod service;

pub use db::Database;
pub use directory::UserDirectory;
pub use leaderboard::LeaderboardRanker;
pub use registrar::ReferralRegistrar;
pub use service::ReferralService;
