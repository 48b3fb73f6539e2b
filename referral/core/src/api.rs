// Copyright (c) 2024 The Botho Foundation

//! Request and response bodies of the referral HTTP API.

use serde::{Deserialize, Serialize};

use crate::referral::Referral;

/// Body of `POST /api/referral`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReferralRequest {
    pub referrer_address: String,
    pub referred_address: String,
}

/// Successful response of `POST /api/referral`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterReferralResponse {
    pub success: bool,
    pub referral: Referral,
}

/// Error body returned for any non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let req: RegisterReferralRequest = serde_json::from_str(
            r#"{"referrerAddress":"0xaaa","referredAddress":"0xbbb"}"#,
        )
        .unwrap();
        assert_eq!(req.referrer_address, "0xaaa");
        assert_eq!(req.referred_address, "0xbbb");
    }
}
