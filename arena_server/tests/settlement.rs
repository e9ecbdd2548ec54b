mod common;

use std::sync::Arc;

use arena_server::{
    errors::ArenaError,
    ledger::{
        model::{AuditKind, User},
        repository::UserRepository,
        LedgerGateway,
    },
    settlement::{BattleResolver, UniformDraw, WagerTable},
};

use common::{contention_tolerant_ledger, memory_repo, resolver_with, FORCED_LOSS, FORCED_WIN};

#[actix::test]
async fn single_wager_forced_win() {
    let repo = memory_repo(vec![User::new("u1", "neo", 100)]);
    let resolver = resolver_with(repo.clone(), FORCED_WIN);

    let outcome = resolver.resolve("u1", 1).await.unwrap();
    assert!(outcome.is_win);
    assert_eq!(outcome.prize_awarded, 40);
    assert_eq!(outcome.new_balance, 115);

    let stored = repo.find_user_by_id("u1").await.unwrap().unwrap();
    assert_eq!(stored.balance, 115);
    assert_eq!(stored.wins, 1);
    assert_eq!(stored.losses, 0);
}

#[actix::test]
async fn six_times_wager_forced_loss() {
    let repo = memory_repo(vec![User::new("u1", "neo", 100)]);
    let resolver = resolver_with(repo.clone(), FORCED_LOSS);

    let outcome = resolver.resolve("u1", 6).await.unwrap();
    assert!(!outcome.is_win);
    assert_eq!(outcome.prize_awarded, 0);
    assert_eq!(outcome.new_balance, 15);

    let stored = repo.find_user_by_id("u1").await.unwrap().unwrap();
    assert_eq!(stored.losses, 1);
}

#[actix::test]
async fn insufficient_balance_leaves_user_untouched() {
    let repo = memory_repo(vec![User::new("u1", "neo", 20)]);
    let resolver = resolver_with(repo.clone(), FORCED_WIN);

    let err = resolver.resolve("u1", 1).await.unwrap_err();
    assert!(matches!(
        err,
        ArenaError::InsufficientBalance {
            balance: 20,
            required: 25
        }
    ));

    let stored = repo.find_user_by_id("u1").await.unwrap().unwrap();
    assert_eq!(stored.balance, 20);
    assert_eq!((stored.wins, stored.losses, stored.version), (0, 0, 0));
    assert!(repo.audit_log().is_empty());
}

#[actix::test]
async fn balance_is_conserved_over_random_battles() {
    let repo = memory_repo(vec![User::new("u1", "neo", 1_000)]);
    let ledger = LedgerGateway::new(repo.clone(), contention_tolerant_ledger());
    let resolver = BattleResolver::new(ledger, Arc::new(UniformDraw));
    let table = WagerTable;

    let multipliers = [1, 2, 4, 6, 3];
    let mut balance = 1_000u64;
    for round in 0..40 {
        let multiplier = multipliers[round % multipliers.len()];
        let tier = table.lookup(multiplier);

        match resolver.resolve("u1", multiplier).await {
            Ok(outcome) => {
                let expected = balance - tier.cost + if outcome.is_win { tier.prize } else { 0 };
                assert_eq!(outcome.new_balance, expected);
                balance = outcome.new_balance;
            }
            Err(ArenaError::InsufficientBalance { balance: seen, .. }) => {
                assert!(seen < tier.cost);
                assert_eq!(seen, balance);
            }
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    let stored = repo.find_user_by_id("u1").await.unwrap().unwrap();
    assert_eq!(stored.balance, balance);
    let battles = repo
        .audit_log()
        .iter()
        .filter(|e| e.kind == AuditKind::BotBattle)
        .count();
    assert_eq!(battles as u32, stored.wins + stored.losses);
}
