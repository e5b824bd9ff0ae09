//! SQLite ledger integration tests.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use gateway_types::{
        Account, AccountId, AccountKind, ApiTokenId, Currency, DomainError, LedgerError,
        LedgerRepository, Money, NewAccount, NewApiToken,
    };
    use uuid::Uuid;

    use crate::SqliteLedger;
    use crate::retry::with_optimistic_retry;
    use crate::security::hash_api_token;

    async fn setup_ledger() -> SqliteLedger {
        SqliteLedger::new("sqlite::memory:").await.unwrap()
    }

    fn new_account(user_id: Uuid, kind: AccountKind) -> NewAccount {
        NewAccount {
            user_id,
            kind,
            currency: Currency::BRL,
            metadata: serde_json::Value::Null,
        }
    }

    /// Creates an account and funds it through the optimistic update path.
    async fn funded_account(ledger: &SqliteLedger, amount: i64) -> Account {
        let account = ledger
            .create_account(new_account(Uuid::new_v4(), AccountKind::Wallet))
            .await
            .unwrap();
        let mut account = account;
        account
            .credit(Money::new(amount, Currency::BRL).unwrap())
            .unwrap();
        ledger.update_account(&account).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_account() {
        let ledger = setup_ledger().await;

        let account = ledger
            .create_account(new_account(Uuid::new_v4(), AccountKind::Wallet))
            .await
            .unwrap();

        assert_eq!(account.balance.amount(), 0);
        assert_eq!(account.available_balance.amount(), 0);
        assert_eq!(account.version, 1);
    }

    #[tokio::test]
    async fn test_duplicate_account_conflicts() {
        let ledger = setup_ledger().await;
        let user_id = Uuid::new_v4();

        ledger
            .create_account(new_account(user_id, AccountKind::Wallet))
            .await
            .unwrap();

        let result = ledger
            .create_account(new_account(user_id, AccountKind::Wallet))
            .await;
        assert!(matches!(result, Err(LedgerError::Conflict(_))));

        // A different kind for the same user is fine.
        ledger
            .create_account(new_account(user_id, AccountKind::Settlement))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_account_not_found() {
        let ledger = setup_ledger().await;
        let result = ledger.get_account(AccountId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_and_list_accounts_for_user() {
        let ledger = setup_ledger().await;
        let user_id = Uuid::new_v4();

        ledger
            .create_account(new_account(user_id, AccountKind::Wallet))
            .await
            .unwrap();
        ledger
            .create_account(new_account(user_id, AccountKind::Settlement))
            .await
            .unwrap();
        ledger
            .create_account(new_account(Uuid::new_v4(), AccountKind::Wallet))
            .await
            .unwrap();

        let found = ledger
            .find_account_for_user(user_id, AccountKind::Settlement)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.kind, AccountKind::Settlement);

        let listed = ledger.list_accounts_for_user(user_id).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_persists() {
        let ledger = setup_ledger().await;
        let account = funded_account(&ledger, 1000).await;
        assert_eq!(account.version, 2);

        let fetched = ledger.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(fetched.balance.amount(), 1000);
        assert_eq!(fetched.available_balance.amount(), 1000);
        assert_eq!(fetched.version, 2);
    }

    #[tokio::test]
    async fn test_stale_update_is_optimistic_lock() {
        let ledger = setup_ledger().await;
        let stale = funded_account(&ledger, 1000).await;

        // A concurrent writer bumps the version first.
        let mut winner = stale.clone();
        winner
            .credit(Money::new(1, Currency::BRL).unwrap())
            .unwrap();
        ledger.update_account(&winner).await.unwrap();

        // The stale copy must now lose, and the winner's write survive.
        let mut loser = stale;
        loser.credit(Money::new(500, Currency::BRL).unwrap()).unwrap();
        let result = ledger.update_account(&loser).await;
        assert!(matches!(result, Err(LedgerError::OptimisticLock { .. })));

        let fetched = ledger.get_account(loser.id).await.unwrap().unwrap();
        assert_eq!(fetched.balance.amount(), 1001);
    }

    #[tokio::test]
    async fn test_update_missing_account_is_not_found() {
        let ledger = setup_ledger().await;
        let account = Account::new(Uuid::new_v4(), AccountKind::Wallet, Currency::BRL);
        let result = ledger.update_account(&account).await;
        assert!(matches!(result, Err(LedgerError::NotFound)));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_conflict() {
        let ledger = setup_ledger().await;
        let account = funded_account(&ledger, 1000).await;

        // Invalidate the caller's copy.
        let mut winner = account.clone();
        winner.credit(Money::new(1, Currency::BRL).unwrap()).unwrap();
        ledger.update_account(&winner).await.unwrap();

        // Re-read-and-apply loop converges despite the stale start.
        let updated = with_optimistic_retry(3, || async {
            let mut current = ledger
                .get_account(account.id)
                .await?
                .ok_or(LedgerError::NotFound)?;
            current.credit(Money::new(100, Currency::BRL).unwrap())?;
            ledger.update_account(&current).await
        })
        .await
        .unwrap();

        assert_eq!(updated.balance.amount(), 1101);
    }

    #[tokio::test]
    async fn test_transfer_balance() {
        let ledger = setup_ledger().await;
        let alice = funded_account(&ledger, 1000).await;
        let bob = funded_account(&ledger, 0).await;

        let (debited, credited) = ledger
            .transfer_balance(alice.id, bob.id, Money::new(400, Currency::BRL).unwrap())
            .await
            .unwrap();

        assert_eq!(debited.balance.amount(), 600);
        assert_eq!(credited.balance.amount(), 400);

        let alice_stored = ledger.get_account(alice.id).await.unwrap().unwrap();
        let bob_stored = ledger.get_account(bob.id).await.unwrap().unwrap();
        assert_eq!(alice_stored.balance.amount(), 600);
        assert_eq!(alice_stored.available_balance.amount(), 600);
        assert_eq!(bob_stored.balance.amount(), 400);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_available_funds() {
        let ledger = setup_ledger().await;
        let alice = funded_account(&ledger, 300).await;
        let bob = funded_account(&ledger, 0).await;

        let result = ledger
            .transfer_balance(alice.id, bob.id, Money::new(400, Currency::BRL).unwrap())
            .await;
        assert!(matches!(
            result,
            Err(LedgerError::Domain(DomainError::InsufficientFunds { .. }))
        ));

        // Nothing moved.
        let alice_stored = ledger.get_account(alice.id).await.unwrap().unwrap();
        assert_eq!(alice_stored.balance.amount(), 300);
    }

    #[tokio::test]
    async fn test_transfer_respects_holds() {
        let ledger = setup_ledger().await;
        let mut alice = funded_account(&ledger, 1000).await;
        let bob = funded_account(&ledger, 0).await;

        alice.hold(Money::new(800, Currency::BRL).unwrap()).unwrap();
        ledger.update_account(&alice).await.unwrap();

        // Booked balance covers it but available does not.
        let result = ledger
            .transfer_balance(alice.id, bob.id, Money::new(500, Currency::BRL).unwrap())
            .await;
        assert!(matches!(
            result,
            Err(LedgerError::Domain(DomainError::InsufficientFunds { .. }))
        ));
    }

    #[tokio::test]
    async fn test_transfer_to_same_account_rejected() {
        let ledger = setup_ledger().await;
        let alice = funded_account(&ledger, 1000).await;

        let result = ledger
            .transfer_balance(alice.id, alice.id, Money::new(100, Currency::BRL).unwrap())
            .await;
        assert!(matches!(
            result,
            Err(LedgerError::Domain(DomainError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_transfer_missing_account() {
        let ledger = setup_ledger().await;
        let alice = funded_account(&ledger, 1000).await;

        let result = ledger
            .transfer_balance(alice.id, AccountId::new(), Money::new(100, Currency::BRL).unwrap())
            .await;
        assert!(matches!(result, Err(LedgerError::NotFound)));
    }

    #[tokio::test]
    async fn test_locked_reads_are_ordered_regardless_of_argument_order() {
        let ledger = setup_ledger().await;
        let a = funded_account(&ledger, 100).await;
        let b = funded_account(&ledger, 100).await;
        let c = funded_account(&ledger, 100).await;

        let mut expected = vec![a.id, b.id, c.id];
        expected.sort();

        for ids in [[a.id, b.id, c.id], [c.id, a.id, b.id], [b.id, c.id, a.id]] {
            let mut tx = ledger.begin().await.unwrap();
            let locked = ledger.accounts_for_update(&mut tx, &ids).await.unwrap();
            let got: Vec<AccountId> = locked.iter().map(|acc| acc.id).collect();
            assert_eq!(got, expected);
            tx.commit().await.unwrap();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API token tests
    // ─────────────────────────────────────────────────────────────────────────

    fn new_token(user_id: Uuid) -> NewApiToken {
        NewApiToken {
            user_id,
            name: "ci".to_string(),
            scopes: vec!["payments:read".to_string(), "payments:write".to_string()],
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_token_mint_and_lookup() {
        let ledger = setup_ledger().await;
        let user_id = Uuid::new_v4();

        let (token, secret) = ledger.create_api_token(new_token(user_id)).await.unwrap();
        assert!(secret.starts_with("gwt_"));
        assert_eq!(token.prefix, secret[..8]);

        let found = ledger
            .find_token_by_hash(&hash_api_token(&secret))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, token.id);
        assert_eq!(found.prefix, token.prefix);
        assert_eq!(found.scopes, token.scopes);
        assert!(found.is_usable(Utc::now()));

        let missing = ledger
            .find_token_by_hash(&hash_api_token("gwt_nope"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_token_expiry_roundtrip() {
        let ledger = setup_ledger().await;
        let expires_at = Utc::now() - Duration::hours(1);

        let (token, secret) = ledger
            .create_api_token(NewApiToken {
                user_id: Uuid::new_v4(),
                name: "expired".to_string(),
                scopes: vec![],
                expires_at: Some(expires_at),
            })
            .await
            .unwrap();

        // Expired tokens are still returned; usability is the caller's
        // check.
        let found = ledger
            .find_token_by_hash(&hash_api_token(&secret))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, token.id);
        assert!(found.is_expired(Utc::now()));
        assert!(!found.is_usable(Utc::now()));
    }

    #[tokio::test]
    async fn test_touch_token_records_use() {
        let ledger = setup_ledger().await;
        let (token, secret) = ledger
            .create_api_token(new_token(Uuid::new_v4()))
            .await
            .unwrap();

        ledger.touch_token(token.id, Some("203.0.113.9")).await.unwrap();

        let found = ledger
            .find_token_by_hash(&hash_api_token(&secret))
            .await
            .unwrap()
            .unwrap();
        assert!(found.last_used_at.is_some());
        assert_eq!(found.last_used_ip.as_deref(), Some("203.0.113.9"));

        let result = ledger.touch_token(ApiTokenId::new(), None).await;
        assert!(matches!(result, Err(LedgerError::NotFound)));
    }

    #[tokio::test]
    async fn test_revoked_token_is_filtered_from_lookup() {
        let ledger = setup_ledger().await;
        let (token, secret) = ledger
            .create_api_token(new_token(Uuid::new_v4()))
            .await
            .unwrap();

        let revoked = ledger.revoke_token(token.id, "rotated").await.unwrap();
        assert!(revoked.is_revoked());
        assert_eq!(revoked.revoked_reason.as_deref(), Some("rotated"));
        assert_eq!(revoked.version, 2);

        let found = ledger
            .find_token_by_hash(&hash_api_token(&secret))
            .await
            .unwrap();
        assert!(found.is_none());

        // The row survives for the audit trail.
        let listed = ledger.list_tokens_for_user(token.user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_revoked());
    }

    #[tokio::test]
    async fn test_revoke_twice_conflicts() {
        let ledger = setup_ledger().await;
        let (token, _secret) = ledger
            .create_api_token(new_token(Uuid::new_v4()))
            .await
            .unwrap();

        ledger.revoke_token(token.id, "first").await.unwrap();
        let result = ledger.revoke_token(token.id, "second").await;
        assert!(matches!(result, Err(LedgerError::Conflict(_))));

        let result = ledger.revoke_token(ApiTokenId::new(), "missing").await;
        assert!(matches!(result, Err(LedgerError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_tokens_for_user() {
        let ledger = setup_ledger().await;
        let user_id = Uuid::new_v4();

        ledger.create_api_token(new_token(user_id)).await.unwrap();
        ledger.create_api_token(new_token(user_id)).await.unwrap();
        ledger
            .create_api_token(new_token(Uuid::new_v4()))
            .await
            .unwrap();

        let tokens = ledger.list_tokens_for_user(user_id).await.unwrap();
        assert_eq!(tokens.len(), 2);
    }
}
