use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountNumber, Amount};

pub type TransactionId = Uuid;

/// What a committed record did to the account it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::TransferOut => "TRANSFER_OUT",
            TransactionKind::TransferIn => "TRANSFER_IN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionKind::Deposit),
            "WITHDRAW" => Some(TransactionKind::Withdraw),
            "TRANSFER_OUT" => Some(TransactionKind::TransferOut),
            "TRANSFER_IN" => Some(TransactionKind::TransferIn),
            _ => None,
        }
    }

    /// Returns true if records of this kind increase the balance
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionKind::Deposit | TransactionKind::TransferIn)
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable record of one committed balance change on one account.
///
/// `balance_after == balance_before + amount` holds for every record built
/// through [`Transaction::new`]; the amount is signed (credits positive,
/// debits negative).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_number: AccountNumber,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
    /// Shared by both legs of a transfer
    pub correlation: Option<Uuid>,
}

impl Transaction {
    /// Create a record for a signed `amount` applied on top of `balance_before`.
    pub fn new(
        account_number: impl Into<AccountNumber>,
        kind: TransactionKind,
        amount: Amount,
        balance_before: Amount,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_number: account_number.into(),
            kind,
            amount,
            balance_before,
            balance_after: balance_before + amount,
            timestamp,
            description: None,
            correlation: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_correlation(mut self, correlation: Uuid) -> Self {
        self.correlation = Some(correlation);
        self
    }

    /// Absolute value of the amount moved
    pub fn magnitude(&self) -> Amount {
        self.amount.abs()
    }

    /// Returns true if `other` is the opposite leg of the same transfer
    pub fn is_counterpart_of(&self, other: &Transaction) -> bool {
        self.correlation.is_some()
            && self.correlation == other.correlation
            && self.id != other.id
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}: {} (balance: {} -> {})",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.kind,
            super::format_amount(self.amount),
            super::format_amount(self.balance_before),
            super::format_amount(self.balance_after),
        )?;
        if let Some(description) = &self.description {
            write!(f, " - {}", description)?;
        }
        Ok(())
    }
}
