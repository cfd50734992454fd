mod common;

use std::sync::Arc;
use std::thread;

use common::{Collector, account};
use tellerbook::application::{SharedAccount, TransactionEngine, execute_shared};
use tellerbook::domain::{DepositStrategy, TransferStrategy, WithdrawStrategy};

#[test]
fn test_concurrent_transfers_conserve_money() {
    let collector = Arc::new(Collector::default());
    let mut engine = TransactionEngine::new();
    engine.subscribe(collector.clone());
    let engine = Arc::new(engine);

    let accounts: Vec<SharedAccount> = (0..4)
        .map(|i| SharedAccount::new(account(&format!("ACC-{:04}", 1000 + i), "user", 1000.0)))
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            let accounts = accounts.clone();
            thread::spawn(move || {
                let mut committed = 0;
                for step in 0..200 {
                    let from = &accounts[(worker + step) % 4];
                    let to = &accounts[(worker + step + 1 + worker % 3) % 4];
                    if execute_shared(&engine, &TransferStrategy, from, 7.0, Some(to)).is_ok() {
                        committed += 1;
                    }
                }
                committed
            })
        })
        .collect();

    let committed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let total: f64 = accounts.iter().map(|a| a.balance()).sum();
    assert_eq!(total, 4000.0);
    assert!(accounts.iter().all(|a| a.balance() >= 0.0));

    let records: usize = accounts.iter().map(|a| a.transactions().len()).sum();
    assert_eq!(records, committed * 2);
    assert_eq!(collector.seen().len(), committed * 2);
}

#[test]
fn test_concurrent_withdrawals_never_overdraw() {
    let engine = Arc::new(TransactionEngine::new());
    let shared = SharedAccount::new(account("ACC-1000", "user1", 100.0));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let shared = shared.clone();
            thread::spawn(move || {
                (0..10)
                    .filter(|_| {
                        execute_shared(&engine, &WithdrawStrategy, &shared, 3.0, None).is_ok()
                    })
                    .count()
            })
        })
        .collect();

    let successes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    // 100 / 3 leaves 1.00 after 33 withdrawals
    assert_eq!(successes, 33);
    assert_eq!(shared.balance(), 1.0);
    assert_eq!(shared.transactions().len(), 33);
}

#[test]
fn test_history_matches_invocation_order() {
    let engine = TransactionEngine::new();
    let shared = SharedAccount::new(account("ACC-1000", "user1", 0.0));

    for amount in [1.0, 2.0, 3.0] {
        execute_shared(&engine, &DepositStrategy, &shared, amount, None).unwrap();
    }

    let amounts: Vec<f64> = shared.transactions().iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![1.0, 2.0, 3.0]);
    let history = shared.transactions();
    assert!(
        history
            .windows(2)
            .all(|pair| pair[0].balance_after == pair[1].balance_before)
    );
}
