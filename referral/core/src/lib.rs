// Copyright (c) 2024 The Botho Foundation

//! Core types and logic for the BTH referral tracker.
//!
//! This crate provides the domain types shared by the referral service,
//! including:
//!
//! - Account address validation and normalization
//! - Users, referral edges and their status
//! - Stats and leaderboard views returned to clients
//! - Configuration structures
//! - The referral error taxonomy

pub mod address;
pub mod api;
pub mod config;
pub mod error;
pub mod referral;

pub use address::{is_valid_address, Address, AddressError};
pub use api::{ErrorResponse, RegisterReferralRequest, RegisterReferralResponse};
pub use config::{ConfigError, ReferralConfig, ReferralSettings, ServerSettings};
pub use error::ReferralError;
pub use referral::{
    referral_link, LeaderboardEntry, Referral, ReferralStatus, UnknownStatus, User, UserId,
    UserStats,
};
