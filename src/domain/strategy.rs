use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Account, AccountNumber, Amount, Transaction, TransactionKind};

/// The balance-mutating operations the ledger supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::Transfer => "transfer",
        }
    }

    pub fn requires_target(&self) -> bool {
        matches!(self, OperationKind::Transfer)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an operation was refused. Nothing is mutated when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NonPositiveAmount {
        amount: Amount,
    },
    NonFiniteAmount,
    InsufficientFunds {
        account: AccountNumber,
        balance: Amount,
        required: Amount,
    },
    MissingTarget,
    UnexpectedTarget,
    SelfTransfer {
        account: AccountNumber,
    },
    NegativeInitialBalance {
        balance: Amount,
    },
    BalanceOverflow {
        account: AccountNumber,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NonPositiveAmount { amount } => {
                write!(f, "amount must be positive, got {}", amount)
            }
            Rejection::NonFiniteAmount => write!(f, "amount must be a finite number"),
            Rejection::InsufficientFunds {
                account,
                balance,
                required,
            } => write!(
                f,
                "insufficient funds in account {}: balance {}, required {}",
                account,
                super::format_amount(*balance),
                super::format_amount(*required)
            ),
            Rejection::MissingTarget => write!(f, "a target account is required for a transfer"),
            Rejection::UnexpectedTarget => {
                write!(f, "this operation does not take a target account")
            }
            Rejection::SelfTransfer { account } => {
                write!(f, "cannot transfer from account {} to itself", account)
            }
            Rejection::NegativeInitialBalance { balance } => {
                write!(f, "initial balance cannot be negative, got {}", balance)
            }
            Rejection::BalanceOverflow { account } => {
                write!(f, "balance of account {} would overflow", account)
            }
        }
    }
}

impl std::error::Error for Rejection {}

/// The records produced by one successful operation, in commit order.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Record appended to the source account
    pub source: Transaction,
    /// Record appended to the target account, for two-account operations
    pub counterpart: Option<Transaction>,
}

impl Execution {
    fn single(source: Transaction) -> Self {
        Self {
            source,
            counterpart: None,
        }
    }

    /// Source record first, counterpart second
    pub fn records(&self) -> impl Iterator<Item = &Transaction> {
        std::iter::once(&self.source).chain(self.counterpart.as_ref())
    }

    pub fn into_source(self) -> Transaction {
        self.source
    }
}

/// One kind of balance-mutating operation.
///
/// `check` and `validate` never mutate. `execute` either commits every
/// record it returns or leaves both accounts untouched.
pub trait OperationStrategy: Send + Sync {
    fn kind(&self) -> OperationKind;

    /// Explain why `amount` cannot be applied to `account`, if it can't.
    fn check(&self, account: &Account, amount: Amount) -> Result<(), Rejection>;

    fn validate(&self, account: &Account, amount: Amount) -> bool {
        self.check(account, amount).is_ok()
    }

    fn execute(
        &self,
        source: &mut Account,
        amount: Amount,
        target: Option<&mut Account>,
        at: DateTime<Utc>,
    ) -> Result<Execution, Rejection>;
}

fn check_amount(amount: Amount) -> Result<(), Rejection> {
    if !amount.is_finite() {
        return Err(Rejection::NonFiniteAmount);
    }
    if amount <= 0.0 {
        return Err(Rejection::NonPositiveAmount { amount });
    }
    Ok(())
}

fn check_funds(account: &Account, amount: Amount) -> Result<(), Rejection> {
    if !account.can_cover(amount) {
        return Err(Rejection::InsufficientFunds {
            account: account.number().to_string(),
            balance: account.balance(),
            required: amount,
        });
    }
    Ok(())
}

fn check_credit(account: &Account, amount: Amount) -> Result<(), Rejection> {
    if !(account.balance() + amount).is_finite() {
        return Err(Rejection::BalanceOverflow {
            account: account.number().to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DepositStrategy;

impl OperationStrategy for DepositStrategy {
    fn kind(&self) -> OperationKind {
        OperationKind::Deposit
    }

    fn check(&self, account: &Account, amount: Amount) -> Result<(), Rejection> {
        check_amount(amount)?;
        check_credit(account, amount)
    }

    fn execute(
        &self,
        source: &mut Account,
        amount: Amount,
        target: Option<&mut Account>,
        at: DateTime<Utc>,
    ) -> Result<Execution, Rejection> {
        if target.is_some() {
            return Err(Rejection::UnexpectedTarget);
        }
        self.check(source, amount)?;

        let record = Transaction::new(
            source.number(),
            TransactionKind::Deposit,
            amount,
            source.balance(),
            at,
        );
        source.commit(record.clone());
        Ok(Execution::single(record))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawStrategy;

impl OperationStrategy for WithdrawStrategy {
    fn kind(&self) -> OperationKind {
        OperationKind::Withdraw
    }

    fn check(&self, account: &Account, amount: Amount) -> Result<(), Rejection> {
        check_amount(amount)?;
        check_funds(account, amount)
    }

    fn execute(
        &self,
        source: &mut Account,
        amount: Amount,
        target: Option<&mut Account>,
        at: DateTime<Utc>,
    ) -> Result<Execution, Rejection> {
        if target.is_some() {
            return Err(Rejection::UnexpectedTarget);
        }
        self.check(source, amount)?;

        let record = Transaction::new(
            source.number(),
            TransactionKind::Withdraw,
            -amount,
            source.balance(),
            at,
        );
        source.commit(record.clone());
        Ok(Execution::single(record))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferStrategy;

impl OperationStrategy for TransferStrategy {
    fn kind(&self) -> OperationKind {
        OperationKind::Transfer
    }

    fn check(&self, account: &Account, amount: Amount) -> Result<(), Rejection> {
        check_amount(amount)?;
        check_funds(account, amount)
    }

    fn execute(
        &self,
        source: &mut Account,
        amount: Amount,
        target: Option<&mut Account>,
        at: DateTime<Utc>,
    ) -> Result<Execution, Rejection> {
        let target = target.ok_or(Rejection::MissingTarget)?;
        if source.number() == target.number() {
            return Err(Rejection::SelfTransfer {
                account: source.number().to_string(),
            });
        }
        self.check(source, amount)?;
        check_credit(target, amount)?;

        // Both records are built before either account is touched.
        let event = Uuid::new_v4();
        let outgoing = Transaction::new(
            source.number(),
            TransactionKind::TransferOut,
            -amount,
            source.balance(),
            at,
        )
        .with_description(format!("Transfer to {}", target.number()))
        .with_correlation(event);
        let incoming = Transaction::new(
            target.number(),
            TransactionKind::TransferIn,
            amount,
            target.balance(),
            at,
        )
        .with_description(format!("Transfer from {}", source.number()))
        .with_correlation(event);

        source.commit(outgoing.clone());
        target.commit(incoming.clone());

        Ok(Execution {
            source: outgoing,
            counterpart: Some(incoming),
        })
    }
}

/// The shared stateless strategy for an operation kind.
pub fn strategy_for(kind: OperationKind) -> &'static dyn OperationStrategy {
    match kind {
        OperationKind::Deposit => &DepositStrategy,
        OperationKind::Withdraw => &WithdrawStrategy,
        OperationKind::Transfer => &TransferStrategy,
    }
}
