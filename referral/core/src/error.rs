// Copyright (c) 2024 The Botho Foundation

//! Referral error taxonomy.

use crate::address::{Address, AddressError};

/// Message returned to clients for failures they did not cause.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Errors that can occur while registering referrals or reading stats.
#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: AddressError },

    #[error("You cannot refer yourself")]
    SelfReferral,

    #[error("User {0} is already registered")]
    AlreadyReferred(Address),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ReferralError {
    /// Parse `input` as an address, mapping failures to `InvalidAddress`.
    pub fn check_address(input: &str) -> Result<Address, Self> {
        Address::parse(input).map_err(|reason| ReferralError::InvalidAddress {
            input: input.to_string(),
            reason,
        })
    }

    /// Whether the caller caused this error (4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ReferralError::StoreUnavailable(_))
    }

    /// Message safe to return to the caller. Infrastructure details are
    /// never included.
    pub fn message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            INTERNAL_ERROR_MESSAGE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_address() {
        let err = ReferralError::check_address("0xNOTANADDR").unwrap_err();
        assert!(matches!(
            err,
            ReferralError::InvalidAddress {
                reason: AddressError::InvalidLength(9),
                ..
            }
        ));
        assert!(ReferralError::check_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_ok());
    }

    #[test]
    fn test_client_errors_keep_message() {
        assert!(ReferralError::SelfReferral.is_client_error());
        assert_eq!(
            ReferralError::SelfReferral.message(),
            "You cannot refer yourself"
        );
    }

    #[test]
    fn test_store_errors_are_opaque() {
        let err = ReferralError::StoreUnavailable("disk I/O error at /var/lib/x".to_string());
        assert!(!err.is_client_error());
        assert_eq!(err.message(), INTERNAL_ERROR_MESSAGE);
    }
}
