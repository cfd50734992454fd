//! Execution against accounts shared between threads.
//!
//! Each account sits behind its own mutex. Two-account operations lock in
//! ascending account-number order, so two opposing transfers can never wait
//! on each other.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{Account, AccountNumber, Amount, OperationStrategy, Rejection, Transaction};

use super::{LedgerError, TransactionEngine};

/// A cloneable handle to an account guarded by a mutex. The account number
/// is kept outside the lock so ordering never needs to lock.
#[derive(Debug, Clone)]
pub struct SharedAccount {
    number: AccountNumber,
    inner: Arc<Mutex<Account>>,
}

impl SharedAccount {
    pub fn new(account: Account) -> Self {
        Self {
            number: account.number().to_string(),
            inner: Arc::new(Mutex::new(account)),
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn lock(&self) -> MutexGuard<'_, Account> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn balance(&self) -> Amount {
        self.lock().balance()
    }

    /// Copy of the history at this moment
    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions().to_vec()
    }
}

/// Run `strategy` with exclusive access to the involved accounts.
pub fn execute_shared(
    engine: &TransactionEngine,
    strategy: &dyn OperationStrategy,
    source: &SharedAccount,
    amount: Amount,
    target: Option<&SharedAccount>,
) -> Result<Transaction, LedgerError> {
    let Some(target) = target else {
        let mut account = source.lock();
        return engine.execute_operation(strategy, &mut *account, amount, None);
    };

    if source.number() == target.number() || Arc::ptr_eq(&source.inner, &target.inner) {
        return Err(Rejection::SelfTransfer {
            account: source.number().to_string(),
        }
        .into());
    }

    let (mut source_guard, mut target_guard) = if source.number() < target.number() {
        let s = source.lock();
        let t = target.lock();
        (s, t)
    } else {
        let t = target.lock();
        let s = source.lock();
        (s, t)
    };

    engine.execute_operation(
        strategy,
        &mut *source_guard,
        amount,
        Some(&mut *target_guard),
    )
}
