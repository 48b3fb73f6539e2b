// Copyright (c) 2024 The Botho Foundation

//! Referral service: the operations exposed to the HTTP gateway.

use bth_referral_core::{
    LeaderboardEntry, ReferralError, ReferralSettings, RegisterReferralRequest,
    RegisterReferralResponse, UserStats,
};

use crate::{
    db::Database, directory::UserDirectory, leaderboard::LeaderboardRanker,
    registrar::ReferralRegistrar,
};

/// Stats, leaderboard and registration over one database.
#[derive(Clone)]
pub struct ReferralService {
    directory: UserDirectory,
    registrar: ReferralRegistrar,
    ranker: LeaderboardRanker,
    settings: ReferralSettings,
}

impl ReferralService {
    pub fn new(db: Database, settings: ReferralSettings) -> Self {
        Self {
            directory: UserDirectory::new(db.clone()),
            registrar: ReferralRegistrar::new(db.clone()),
            ranker: LeaderboardRanker::new(db),
            settings,
        }
    }

    /// Referral count, rank and invite link for `address`. Unknown addresses
    /// are registered with no referrals.
    pub fn get_stats(&self, address: &str) -> Result<UserStats, ReferralError> {
        let (user, rank) = self.directory.get_or_create_ranked(address)?;

        Ok(UserStats {
            total_referrals: user.total_referrals,
            rank,
            referral_link: self.settings.referral_link(&user.address),
        })
    }

    /// The top of the leaderboard.
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ReferralError> {
        self.ranker.top(self.settings.leaderboard_size)
    }

    pub fn register_referral(
        &self,
        request: &RegisterReferralRequest,
    ) -> Result<RegisterReferralResponse, ReferralError> {
        let referral = self
            .registrar
            .register(&request.referrer_address, &request.referred_address)?;

        Ok(RegisterReferralResponse {
            success: true,
            referral,
        })
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn registrar(&self) -> &ReferralRegistrar {
        &self.registrar
    }

    pub fn ranker(&self) -> &LeaderboardRanker {
        &self.ranker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AAA: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BBB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn service() -> ReferralService {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let settings = ReferralSettings {
            site_url: "https://coop.example".to_string(),
            leaderboard_size: 3,
            ..Default::default()
        };
        ReferralService::new(db, settings)
    }

    fn request(referrer: &str, referred: &str) -> RegisterReferralRequest {
        RegisterReferralRequest {
            referrer_address: referrer.to_string(),
            referred_address: referred.to_string(),
        }
    }

    #[test]
    fn test_stats_after_first_referral() {
        let service = service();

        let response = service.register_referral(&request(AAA, BBB)).unwrap();
        assert!(response.success);

        let stats = service.get_stats(AAA).unwrap();
        assert_eq!(stats.total_referrals, 1);
        assert_eq!(stats.rank, 1);
        assert_eq!(
            stats.referral_link,
            format!("https://coop.example/join?ref={}", AAA)
        );

        let stats = service.get_stats(BBB).unwrap();
        assert_eq!(stats.total_referrals, 0);
        assert_eq!(stats.rank, 2);
    }

    #[test]
    fn test_stats_lookup_blocks_later_referral() {
        let service = service();

        service.get_stats(BBB).unwrap();
        let err = service.register_referral(&request(AAA, BBB)).unwrap_err();
        assert!(matches!(err, ReferralError::AlreadyReferred(_)));
    }

    #[test]
    fn test_stats_invalid_address() {
        let err = service().get_stats("not-an-address").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_leaderboard_uses_configured_size() {
        let service = service();
        for i in 1..=5u8 {
            service
                .register_referral(&request(AAA, &format!("0x{:040x}", i)))
                .unwrap();
        }

        let board = service.leaderboard().unwrap();
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].address.as_str(), AAA);
        assert_eq!(board[0].total_referrals, 5);
        assert!(board[1..].iter().all(|e| e.total_referrals == 0));
    }
}
