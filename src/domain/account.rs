use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::{Amount, Rejection, Transaction};

pub type AccountNumber = String;

/// A balance owned by one user, together with its append-only history.
///
/// The balance only changes through [`Account::commit`], which is private to
/// the crate and always pairs the new balance with the record that explains it.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    number: AccountNumber,
    owner: String,
    balance: Amount,
    transactions: Vec<Transaction>,
}

impl Account {
    pub fn new(
        number: impl Into<AccountNumber>,
        owner: impl Into<String>,
        initial_balance: Amount,
    ) -> Result<Self, Rejection> {
        if !initial_balance.is_finite() {
            return Err(Rejection::NonFiniteAmount);
        }
        if initial_balance < 0.0 {
            return Err(Rejection::NegativeInitialBalance {
                balance: initial_balance,
            });
        }
        Ok(Self {
            number: number.into(),
            owner: owner.into(),
            balance: initial_balance,
            transactions: Vec::new(),
        })
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// History in commit order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn last_transaction(&self) -> Option<&Transaction> {
        self.transactions.last()
    }

    pub fn can_cover(&self, amount: Amount) -> bool {
        self.balance >= amount
    }

    /// Apply a record: the balance moves to `record.balance_after` and the
    /// record is appended to the history.
    pub(crate) fn commit(&mut self, record: Transaction) {
        debug_assert_eq!(record.account_number, self.number);
        debug_assert_eq!(record.balance_before, self.balance);
        self.balance = record.balance_after;
        self.transactions.push(record);
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Account[{}] owner: {}, balance: {}",
            self.number,
            self.owner,
            super::format_amount(self.balance)
        )
    }
}

/// Hands out sequential account numbers such as `ACC-1000`.
#[derive(Debug)]
pub struct AccountNumberGenerator {
    prefix: String,
    next: AtomicU64,
}

impl AccountNumberGenerator {
    pub const DEFAULT_PREFIX: &'static str = "ACC";
    pub const DEFAULT_START: u64 = 1000;

    pub fn new(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(start),
        }
    }

    pub fn next_number(&self) -> AccountNumber {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:04}", self.prefix, n)
    }
}

impl Default for AccountNumberGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX, Self::DEFAULT_START)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::TransactionKind;

    #[test]
    fn test_new_account_starts_empty() {
        let account = Account::new("ACC-1000", "alice", 1000.0).unwrap();

        assert_eq!(account.number(), "ACC-1000");
        assert_eq!(account.owner(), "alice");
        assert_eq!(account.balance(), 1000.0);
        assert!(account.transactions().is_empty());
        assert!(account.last_transaction().is_none());
    }

    #[test]
    fn test_zero_initial_balance_allowed() {
        assert!(Account::new("ACC-1000", "alice", 0.0).is_ok());
    }

    #[test]
    fn test_negative_initial_balance_rejected() {
        let result = Account::new("ACC-1000", "alice", -1.0);
        assert!(matches!(
            result,
            Err(Rejection::NegativeInitialBalance { .. })
        ));
    }

    #[test]
    fn test_nan_initial_balance_rejected() {
        assert!(matches!(
            Account::new("ACC-1000", "alice", f64::NAN),
            Err(Rejection::NonFiniteAmount)
        ));
    }

    #[test]
    fn test_commit_moves_balance_and_appends() {
        let mut account = Account::new("ACC-1000", "alice", 100.0).unwrap();
        let record = Transaction::new("ACC-1000", TransactionKind::Deposit, 50.0, 100.0, Utc::now());

        account.commit(record.clone());

        assert_eq!(account.balance(), 150.0);
        assert_eq!(account.transactions(), &[record]);
    }

    #[test]
    fn test_generator_is_sequential() {
        let generator = AccountNumberGenerator::default();
        assert_eq!(generator.next_number(), "ACC-1000");
        assert_eq!(generator.next_number(), "ACC-1001");
    }

    #[test]
    fn test_generator_custom_prefix() {
        let generator = AccountNumberGenerator::new("SAV", 42);
        assert_eq!(generator.next_number(), "SAV-0042");
    }
}
