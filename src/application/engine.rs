use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Clock, LedgerError, ObserverRegistry, SystemClock, TransactionObserver};
use crate::domain::{Account, Amount, Execution, OperationStrategy, Transaction};

/// The only path through which account balances change.
///
/// Each call runs one strategy, stamps its records with the clock's "now",
/// and publishes every produced record (source first, counterpart second)
/// to the registered observers after the accounts have been updated.
#[derive(Clone)]
pub struct TransactionEngine {
    observers: ObserverRegistry,
    clock: Arc<dyn Clock>,
}

impl TransactionEngine {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            observers: ObserverRegistry::new(),
            clock,
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn TransactionObserver>) -> bool {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, observer: &Arc<dyn TransactionObserver>) -> bool {
        self.observers.unsubscribe(observer)
    }

    /// Run `strategy` and return the source-side record. The counterpart of a
    /// transfer is in the target's history.
    pub fn execute_operation(
        &self,
        strategy: &dyn OperationStrategy,
        account: &mut Account,
        amount: Amount,
        target: Option<&mut Account>,
    ) -> Result<Transaction, LedgerError> {
        self.execute(strategy, account, amount, target)
            .map(Execution::into_source)
    }

    /// Like [`execute_operation`](Self::execute_operation) but hands back
    /// every record produced.
    pub fn execute(
        &self,
        strategy: &dyn OperationStrategy,
        account: &mut Account,
        amount: Amount,
        target: Option<&mut Account>,
    ) -> Result<Execution, LedgerError> {
        let kind = strategy.kind();
        debug!(
            operation = %kind,
            account = account.number(),
            target = target.as_ref().map(|t| t.number()),
            amount,
            "executing operation"
        );

        let execution = match strategy.execute(account, amount, target, self.clock.now()) {
            Ok(execution) => execution,
            Err(rejection) => {
                warn!(
                    operation = %kind,
                    account = account.number(),
                    amount,
                    reason = %rejection,
                    "operation rejected"
                );
                return Err(rejection.into());
            }
        };

        for record in execution.records() {
            info!(
                account = %record.account_number,
                kind = %record.kind,
                amount = record.amount,
                balance_before = record.balance_before,
                balance_after = record.balance_after,
                "transaction committed"
            );
            self.observers.publish(record);
        }

        Ok(execution)
    }
}

impl Default for TransactionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::application::FixedClock;
    use crate::domain::{
        DepositStrategy, Rejection, TransactionKind, TransferStrategy, WithdrawStrategy,
    };

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<Transaction>>,
    }

    impl TransactionObserver for Collector {
        fn on_transaction(&self, transaction: &Transaction) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(transaction.clone());
            Ok(())
        }
    }

    fn engine_with_collector() -> (TransactionEngine, Arc<Collector>) {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let mut engine = TransactionEngine::with_clock(Arc::new(FixedClock(at)));
        let collector = Arc::new(Collector::default());
        engine.subscribe(collector.clone());
        (engine, collector)
    }

    fn account(number: &str, balance: Amount) -> Account {
        Account::new(number, "owner", balance).unwrap()
    }

    #[test]
    fn test_deposit_notifies_once() {
        let (engine, collector) = engine_with_collector();
        let mut a = account("ACC-1000", 1000.0);

        let record = engine
            .execute_operation(&DepositStrategy, &mut a, 500.0, None)
            .unwrap();

        assert_eq!(record.kind, TransactionKind::Deposit);
        assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        assert_eq!(a.balance(), 1500.0);
        assert_eq!(*collector.seen.lock().unwrap(), vec![record]);
    }

    #[test]
    fn test_transfer_notifies_source_then_target() {
        let (engine, collector) = engine_with_collector();
        let mut a = account("ACC-1000", 1000.0);
        let mut b = account("ACC-1001", 500.0);

        let record = engine
            .execute_operation(&TransferStrategy, &mut a, 300.0, Some(&mut b))
            .unwrap();

        assert_eq!(record.account_number, "ACC-1000");
        let seen = collector.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], record);
        assert_eq!(seen[1].kind, TransactionKind::TransferIn);
        assert_eq!(Some(&seen[1]), b.last_transaction());
        assert!(seen[1].timestamp >= seen[0].timestamp);
    }

    #[test]
    fn test_rejection_is_typed_and_silent() {
        let (engine, collector) = engine_with_collector();
        let mut a = account("ACC-1000", 1000.0);

        let err = engine
            .execute_operation(&WithdrawStrategy, &mut a, 1500.0, None)
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InvalidOperation(Rejection::InsufficientFunds { .. })
        ));
        assert_eq!(a.balance(), 1000.0);
        assert!(a.transactions().is_empty());
        assert!(collector.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_execute_returns_both_legs() {
        let (engine, _collector) = engine_with_collector();
        let mut a = account("ACC-1000", 10.0);
        let mut b = account("ACC-1001", 0.0);

        let execution = engine
            .execute(&TransferStrategy, &mut a, 10.0, Some(&mut b))
            .unwrap();

        assert_eq!(execution.records().count(), 2);
        assert_eq!(a.balance(), 0.0);
        assert_eq!(b.balance(), 10.0);
    }

    #[test]
    fn test_unsubscribed_observer_is_not_notified() {
        let (mut engine, collector) = engine_with_collector();
        let handle: Arc<dyn TransactionObserver> = collector.clone();
        assert!(engine.unsubscribe(&handle));

        let mut a = account("ACC-1000", 0.0);
        engine
            .execute_operation(&DepositStrategy, &mut a, 1.0, None)
            .unwrap();

        assert!(collector.seen.lock().unwrap().is_empty());
    }
}
