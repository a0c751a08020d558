// End-to-end wager scenarios between ALICE, BOB and friends, driven through the engine.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use fireback_wagers::{
    BetStatus, Clock, EngineConfig, FireBackStatus, ManualClock, MemoryStore, NewBet, NewOption, OpeningStake,
    Visibility, WagerEngine, WagerError,
};

struct World {
    engine: WagerEngine,
    clock: Arc<ManualClock>,
}

fn world() -> World {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = WagerEngine::with_memory_store(Arc::new(MemoryStore::new()), clock.clone(), &EngineConfig::default());
    for (user, balance) in [("ALICE", dec!(100)), ("BOB", dec!(100)), ("CAROL", dec!(50))] {
        engine.open_account(user, Some(balance)).unwrap();
    }
    World { engine, clock }
}

fn coin_flip(w: &World, creator: &str) -> NewBet {
    NewBet {
        creator_id: creator.to_string(),
        description: "Heads or tails at halftime".to_string(),
        options: vec![
            NewOption { key: Some("A".into()), label: "Heads".into(), initial_odds: dec!(2.0) },
            NewOption { key: Some("B".into()), label: "Tails".into(), initial_odds: dec!(2.0) },
        ],
        closing_time: w.clock.now() + Duration::hours(2),
        visibility: Visibility::Public,
        challenged_users: None,
        minimum_wager: None,
        side_stake: Some("loser buys pizza".into()),
        opening_stake: None,
    }
}

#[test]
fn test_concrete_pool_scenario() {
    let w = world();
    let bet = w.engine.create_bet(coin_flip(&w, "ALICE")).unwrap();
    assert_eq!(bet.status, BetStatus::Bid);

    // User1 stakes $20 on A
    let first = w.engine.place_bet(&bet.id, "ALICE", "A", dec!(20)).unwrap();
    assert_eq!(first.status, BetStatus::Bid);
    assert_eq!(first.odds["A"], dec!(1.1));
    let snapshot = w.engine.get_bet(&bet.id).unwrap();
    assert_eq!(snapshot.options["A"].total_wagered, dec!(20));
    assert_eq!(snapshot.status, BetStatus::Bid);

    // User2 stakes $10 on B
    let second = w.engine.place_bet(&bet.id, "BOB", "B", dec!(10)).unwrap();
    assert_eq!(second.status, BetStatus::Open);
    assert_eq!(second.odds["A"], dec!(1.43));
    assert_eq!(second.odds["B"], dec!(2.85));

    w.clock.advance(Duration::hours(3));
    let report = w.engine.settle(&bet.id, "A").unwrap();

    assert_eq!(report.payouts.get("ALICE"), Some(&dec!(22.00)));
    assert!(!report.payouts.contains_key("BOB"));
    assert_eq!(w.engine.balance("ALICE").unwrap(), dec!(102.00));
    assert_eq!(w.engine.balance("BOB").unwrap(), dec!(90));
}

#[test]
fn test_bid_to_open_exactly_when_both_sides_backed() {
    let w = world();
    let bet = w.engine.create_bet(coin_flip(&w, "ALICE")).unwrap();

    for _ in 0..3 {
        let receipt = w.engine.place_bet(&bet.id, "ALICE", "A", dec!(5)).unwrap();
        assert_eq!(receipt.status, BetStatus::Bid);
    }
    let receipt = w.engine.place_bet(&bet.id, "CAROL", "B", dec!(0.01)).unwrap();
    assert_eq!(receipt.status, BetStatus::Open);
}

#[test]
fn test_backed_odds_stay_above_floor() {
    let w = world();
    w.engine.deposit("ALICE", dec!(10000)).unwrap();
    let bet = w.engine.create_bet(coin_flip(&w, "ALICE")).unwrap();

    w.engine.place_bet(&bet.id, "BOB", "B", dec!(0.01)).unwrap();
    for amount in [dec!(100), dec!(999.99), dec!(2500), dec!(5000)] {
        let receipt = w.engine.place_bet(&bet.id, "ALICE", "A", amount).unwrap();
        for odds in receipt.odds.values() {
            assert!(*odds >= dec!(1.1), "odds {} fell below the floor", odds);
        }
    }
}

#[test]
fn test_balances_never_negative() {
    let w = world();
    let bet = w.engine.create_bet(coin_flip(&w, "ALICE")).unwrap();

    let mut staked = Decimal::ZERO;
    for amount in [dec!(30), dec!(30), dec!(30), dec!(30)] {
        match w.engine.place_bet(&bet.id, "CAROL", "B", amount) {
            Ok(_) => staked += amount,
            Err(WagerError::InsufficientFunds { available, requested }) => {
                assert!(requested > available);
            }
            Err(other) => panic!("unexpected error {}", other),
        }
        assert!(w.engine.balance("CAROL").unwrap() >= Decimal::ZERO);
    }
    assert_eq!(staked, dec!(30));
    assert_eq!(w.engine.balance("CAROL").unwrap(), dec!(20));
}

#[test]
fn test_fire_back_match_then_cover_then_settle() {
    let w = world();
    let mut request = coin_flip(&w, "ALICE");
    request.opening_stake = Some(OpeningStake { option_key: "A".into(), amount: dec!(10) });
    let bet = w.engine.create_bet(request).unwrap();
    w.engine.place_bet(&bet.id, "BOB", "B", dec!(10)).unwrap();

    // BOB fires back: ALICE must go to 25 or back down
    let fb = w.engine.fire_back(&bet.id, "BOB", dec!(25)).unwrap();
    assert_eq!(w.engine.balance("BOB").unwrap(), dec!(90));

    let matched = w.engine.respond_to_fire_back(&fb.id, "ALICE", true).unwrap();
    assert_eq!(matched.status, FireBackStatus::Matched);
    assert!(matches!(
        w.engine.place_bet(&bet.id, "ALICE", "A", dec!(10)),
        Err(WagerError::BelowMinimumWager { .. })
    ));
    let cover = w.engine.place_bet(&bet.id, "ALICE", "A", dec!(25)).unwrap();
    assert_eq!(cover.status, BetStatus::Open);

    w.engine.lock_bet(&bet.id, "ALICE").unwrap();
    let report = w.engine.settle(&bet.id, "B").unwrap();
    assert_eq!(report.payouts.len(), 1);
    assert!(report.payouts["BOB"] > dec!(10));
    assert_eq!(
        w.engine.settle(&bet.id, "B").unwrap_err(),
        WagerError::AlreadySettled(bet.id.clone())
    );
}

#[test]
fn test_back_down_leaves_bet_untouched() {
    let w = world();
    let mut request = coin_flip(&w, "ALICE");
    request.opening_stake = Some(OpeningStake { option_key: "A".into(), amount: dec!(10) });
    let bet = w.engine.create_bet(request).unwrap();
    w.engine.place_bet(&bet.id, "BOB", "B", dec!(10)).unwrap();

    let fb = w.engine.fire_back(&bet.id, "BOB", dec!(40)).unwrap();
    let declined = w.engine.respond_to_fire_back(&fb.id, "ALICE", false).unwrap();
    assert_eq!(declined.status, FireBackStatus::Declined);
    assert_eq!(
        w.engine.respond_to_fire_back(&fb.id, "ALICE", true).unwrap_err(),
        WagerError::FireBackAlreadyResolved(fb.id.clone())
    );

    let after = w.engine.get_bet(&bet.id).unwrap();
    assert_eq!(after.status, BetStatus::Open);
    assert_eq!(after.total_pool(), dec!(20));
    assert_eq!(w.engine.balance("ALICE").unwrap(), dec!(90));
    assert!(w
        .engine
        .activity(10)
        .iter()
        .any(|e| e.details.contains("backed down")));
}

#[test]
fn test_closing_time_locks_lazily() {
    let w = world();
    let bet = w.engine.create_bet(coin_flip(&w, "ALICE")).unwrap();
    w.engine.place_bet(&bet.id, "ALICE", "A", dec!(10)).unwrap();
    w.engine.place_bet(&bet.id, "BOB", "B", dec!(10)).unwrap();

    w.clock.advance(Duration::hours(2));
    assert_eq!(w.engine.get_bet(&bet.id).unwrap().status, BetStatus::Open);

    w.clock.advance(Duration::seconds(1));
    assert_eq!(w.engine.get_bet(&bet.id).unwrap().status, BetStatus::Locked);
    assert!(matches!(
        w.engine.place_bet(&bet.id, "CAROL", "A", dec!(5)),
        Err(WagerError::BetNotAcceptingWagers { status: BetStatus::Locked, .. })
    ));
}
