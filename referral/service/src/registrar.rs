// Copyright (c) 2024 The Botho Foundation

//! Referral registration.

use bth_referral_core::{Address, Referral, ReferralError, ReferralStatus, UserId};
use rusqlite::{params, Connection, TransactionBehavior};
use tracing::{debug, info};

use crate::{
    db::{
        is_unique_violation, now_millis, row_to_referral, store_unavailable, Database,
        REFERRAL_COLUMNS,
    },
    directory,
};

/// Records referral edges and credits referrers.
#[derive(Clone)]
pub struct ReferralRegistrar {
    db: Database,
}

impl ReferralRegistrar {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register `referred_address` as invited by `referrer_address`.
    ///
    /// The referrer is created if unknown. The referred address must not have
    /// a user record of any kind yet, including one created by a stats
    /// lookup. Creation of the referred user, the referral edge and the
    /// referrer's counter increment commit together or not at all.
    pub fn register(
        &self,
        referrer_address: &str,
        referred_address: &str,
    ) -> Result<Referral, ReferralError> {
        let referrer_address = ReferralError::check_address(referrer_address)?;
        let referred_address = ReferralError::check_address(referred_address)?;

        if referrer_address == referred_address {
            return Err(ReferralError::SelfReferral);
        }

        let mut conn = self.db.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_unavailable)?;

        let referrer =
            directory::get_or_create(&tx, &referrer_address).map_err(store_unavailable)?;

        if directory::find_by_address(&tx, &referred_address)
            .map_err(store_unavailable)?
            .is_some()
        {
            debug!("Rejecting referral of existing user {}", referred_address);
            return Err(ReferralError::AlreadyReferred(referred_address));
        }

        let referred = directory::insert_referred(&tx, &referred_address, referrer.id).map_err(
            |e| {
                if is_unique_violation(&e) {
                    ReferralError::AlreadyReferred(referred_address.clone())
                } else {
                    store_unavailable(e)
                }
            },
        )?;

        let referral =
            insert_referral(&tx, referrer.id, referred.id).map_err(store_unavailable)?;
        directory::increment_referrals(&tx, referrer.id).map_err(store_unavailable)?;

        tx.commit().map_err(store_unavailable)?;

        info!(
            "Registered referral {}: {} -> {}",
            referral.id,
            referrer_address.to_checksum(),
            referred_address.to_checksum()
        );

        Ok(referral)
    }

    /// Referrals made by `address`, newest first. Unknown addresses have none.
    pub fn referrals_of(&self, address: &Address) -> Result<Vec<Referral>, ReferralError> {
        let conn = self.db.lock()?;

        let referrer = directory::find_by_address(&conn, address).map_err(store_unavailable)?;
        match referrer {
            Some(user) => referrals_by(&conn, user.id).map_err(store_unavailable),
            None => Ok(Vec::new()),
        }
    }
}

fn insert_referral(
    conn: &Connection,
    referrer: UserId,
    referred: UserId,
) -> rusqlite::Result<Referral> {
    conn.query_row(
        &format!(
            r#"
            INSERT INTO referrals (referrer_id, referred_id, status, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING {}
            "#,
            REFERRAL_COLUMNS
        ),
        params![
            referrer,
            referred,
            ReferralStatus::Completed.to_string(),
            now_millis()
        ],
        row_to_referral,
    )
}

fn referrals_by(conn: &Connection, referrer: UserId) -> rusqlite::Result<Vec<Referral>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM referrals WHERE referrer_id = ?1 ORDER BY id DESC",
        REFERRAL_COLUMNS
    ))?;

    let referrals = stmt
        .query_map(params![referrer], row_to_referral)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(referrals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::UserDirectory;

    const ALICE: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const BOB: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
    const CAROL: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";

    fn setup() -> (Database, ReferralRegistrar, UserDirectory) {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        (
            db.clone(),
            ReferralRegistrar::new(db.clone()),
            UserDirectory::new(db),
        )
    }

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn test_register_creates_edge_and_credits_referrer() {
        let (db, registrar, directory) = setup();

        let referral = registrar.register(ALICE, BOB).unwrap();
        assert_eq!(referral.status, ReferralStatus::Completed);

        let alice = directory.find_by_address(&addr(ALICE)).unwrap().unwrap();
        let bob = directory.find_by_address(&addr(BOB)).unwrap().unwrap();

        assert_eq!(referral.referrer_id, alice.id);
        assert_eq!(referral.referred_id, bob.id);
        assert_eq!(alice.total_referrals, 1);
        assert_eq!(bob.total_referrals, 0);
        assert_eq!(bob.referred_by, Some(alice.id));

        assert_eq!(db.count_users().unwrap(), 2);
        assert_eq!(db.count_referrals().unwrap(), 1);
    }

    #[test]
    fn test_self_referral_rejected() {
        let (db, registrar, _) = setup();

        // Differently cased spellings of the same address
        let err = registrar.register(ALICE, &ALICE.to_lowercase()).unwrap_err();
        assert!(matches!(err, ReferralError::SelfReferral));
        assert_eq!(db.count_users().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_referral_rejected() {
        let (db, registrar, directory) = setup();

        registrar.register(ALICE, BOB).unwrap();
        let err = registrar.register(ALICE, BOB).unwrap_err();
        assert!(matches!(err, ReferralError::AlreadyReferred(ref a) if *a == addr(BOB)));

        // A different referrer cannot claim BOB either
        let err = registrar.register(CAROL, BOB).unwrap_err();
        assert!(matches!(err, ReferralError::AlreadyReferred(_)));

        let alice = directory.find_by_address(&addr(ALICE)).unwrap().unwrap();
        assert_eq!(alice.total_referrals, 1);
        assert_eq!(db.count_referrals().unwrap(), 1);
    }

    #[test]
    fn test_rejected_referral_rolls_back_referrer_creation() {
        let (db, registrar, directory) = setup();

        directory.get_or_create(BOB).unwrap();
        let err = registrar.register(CAROL, BOB).unwrap_err();
        assert!(matches!(err, ReferralError::AlreadyReferred(_)));

        // CAROL was only created inside the rolled back transaction
        assert!(directory.find_by_address(&addr(CAROL)).unwrap().is_none());
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let (db, registrar, _) = setup();

        let err = registrar.register("0xNOTANADDR", BOB).unwrap_err();
        assert!(matches!(err, ReferralError::InvalidAddress { .. }));

        let err = registrar.register(ALICE, "").unwrap_err();
        assert!(matches!(err, ReferralError::InvalidAddress { .. }));

        assert_eq!(db.count_users().unwrap(), 0);
        assert_eq!(db.count_referrals().unwrap(), 0);
    }

    #[test]
    fn test_referrals_of() {
        let (_, registrar, _) = setup();

        let first = registrar.register(ALICE, BOB).unwrap();
        let second = registrar.register(ALICE, CAROL).unwrap();

        let made = registrar.referrals_of(&addr(ALICE)).unwrap();
        assert_eq!(made, vec![second, first]);

        assert!(registrar.referrals_of(&addr(BOB)).unwrap().is_empty());
        assert!(registrar
            .referrals_of(&addr("0x0000000000000000000000000000000000000001"))
            .unwrap()
            .is_empty());
    }
}
