use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

use crate::domain::Transaction;

/// Receives every committed transaction record.
pub trait TransactionObserver: Send + Sync {
    /// Short label used in log lines
    fn name(&self) -> &str {
        "observer"
    }

    fn on_transaction(&self, transaction: &Transaction) -> anyhow::Result<()>;
}

/// Outcome of delivering one record to every subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Ordered set of observers. Membership is by identity (the same `Arc`),
/// not by value.
#[derive(Default, Clone)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn TransactionObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if this observer was already subscribed.
    pub fn subscribe(&mut self, observer: Arc<dyn TransactionObserver>) -> bool {
        if self.contains(&observer) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Returns false if this observer was not subscribed.
    pub fn unsubscribe(&mut self, observer: &Arc<dyn TransactionObserver>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !same_observer(o, observer));
        self.observers.len() != before
    }

    pub fn contains(&self, observer: &Arc<dyn TransactionObserver>) -> bool {
        self.observers.iter().any(|o| same_observer(o, observer))
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `transaction` to each observer once, in subscription order.
    /// A failing or panicking observer is logged and skipped; later
    /// observers still receive the record.
    pub fn publish(&self, transaction: &Transaction) -> Delivery {
        let mut delivery = Delivery::default();

        for observer in &self.observers {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_transaction(transaction)));
            match outcome {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(err)) => {
                    delivery.failed += 1;
                    warn!(
                        observer = observer.name(),
                        transaction = %transaction.id,
                        error = %err,
                        "observer failed to handle transaction"
                    );
                }
                Err(_) => {
                    delivery.failed += 1;
                    warn!(
                        observer = observer.name(),
                        transaction = %transaction.id,
                        "observer panicked while handling transaction"
                    );
                }
            }
        }

        delivery
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.name()))
            .finish()
    }
}

fn same_observer(a: &Arc<dyn TransactionObserver>, b: &Arc<dyn TransactionObserver>) -> bool {
    // Data pointers only; the same object may carry different vtables.
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
