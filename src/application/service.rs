use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::domain::{
    Account, AccountNumber, AccountNumberGenerator, Amount, DepositStrategy, OperationStrategy,
    Rejection, Transaction, TransferStrategy, User, WithdrawStrategy,
};

use super::{LedgerError, TransactionEngine, TransactionObserver};

/// Settings for a ledger instance.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Prefix of generated account numbers (`ACC` gives `ACC-1000`)
    pub account_prefix: String,
    /// First generated account number
    pub first_account_number: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            account_prefix: AccountNumberGenerator::DEFAULT_PREFIX.to_string(),
            first_account_number: AccountNumberGenerator::DEFAULT_START,
        }
    }
}

/// Owns users and accounts, resolves account numbers, and routes every
/// balance change through the [`TransactionEngine`].
/// This is the primary interface for any client (shell, tests, embedding).
#[derive(Debug)]
pub struct LedgerService {
    users: HashMap<String, User>,
    accounts: HashMap<AccountNumber, Account>,
    engine: TransactionEngine,
    numbers: AccountNumberGenerator,
}

impl LedgerService {
    pub fn new(engine: TransactionEngine) -> Self {
        Self::with_config(engine, LedgerConfig::default())
    }

    pub fn with_config(engine: TransactionEngine, config: LedgerConfig) -> Self {
        Self {
            users: HashMap::new(),
            accounts: HashMap::new(),
            engine,
            numbers: AccountNumberGenerator::new(
                config.account_prefix,
                config.first_account_number,
            ),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn TransactionObserver>) -> bool {
        self.engine.subscribe(observer)
    }

    // ========================
    // Users
    // ========================

    /// Register a user and open their account. Returns the account number.
    pub fn create_user(
        &mut self,
        username: &str,
        password: &str,
        initial_balance: Amount,
    ) -> Result<AccountNumber, LedgerError> {
        if self.users.contains_key(username) {
            return Err(LedgerError::UserAlreadyExists(username.to_string()));
        }
        // Validate the balance first so a rejected user never consumes a number
        if !initial_balance.is_finite() {
            return Err(Rejection::NonFiniteAmount.into());
        }
        if initial_balance < 0.0 {
            return Err(Rejection::NegativeInitialBalance {
                balance: initial_balance,
            }
            .into());
        }

        let user = User::new(username, password)?;
        let account = Account::new(self.numbers.next_number(), username, initial_balance)?;
        let number = account.number().to_string();

        info!(user = username, account = %number, initial_balance, "user registered");
        self.users.insert(username.to_string(), user);
        self.accounts.insert(number.clone(), account);
        Ok(number)
    }

    /// Returns true and records the login time when the password matches.
    pub fn authenticate(&mut self, username: &str, password: &str) -> bool {
        match self.users.get_mut(username) {
            Some(user) if user.verify_password(password) => {
                user.record_login();
                true
            }
            _ => false,
        }
    }

    pub fn user(&self, username: &str) -> Result<&User, LedgerError> {
        self.users
            .get(username)
            .ok_or_else(|| LedgerError::UserNotFound(username.to_string()))
    }

    pub fn user_exists(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    // ========================
    // Accounts
    // ========================

    pub fn account(&self, number: &str) -> Result<&Account, LedgerError> {
        self.accounts
            .get(number)
            .ok_or_else(|| LedgerError::AccountNotFound(number.to_string()))
    }

    pub fn account_by_username(&self, username: &str) -> Result<&Account, LedgerError> {
        self.accounts
            .values()
            .find(|account| account.owner() == username)
            .ok_or_else(|| LedgerError::AccountNotFound(format!("owned by {}", username)))
    }

    /// All accounts ordered by account number
    pub fn accounts(&self) -> Vec<&Account> {
        let mut accounts: Vec<&Account> = self.accounts.values().collect();
        accounts.sort_by(|a, b| a.number().cmp(b.number()));
        accounts
    }

    pub fn balance(&self, number: &str) -> Result<Amount, LedgerError> {
        Ok(self.account(number)?.balance())
    }

    pub fn history(&self, number: &str) -> Result<&[Transaction], LedgerError> {
        Ok(self.account(number)?.transactions())
    }

    // ========================
    // Operations
    // ========================

    pub fn deposit(&mut self, number: &str, amount: Amount) -> Result<Transaction, LedgerError> {
        self.execute_single(&DepositStrategy, number, amount)
    }

    pub fn withdraw(&mut self, number: &str, amount: Amount) -> Result<Transaction, LedgerError> {
        self.execute_single(&WithdrawStrategy, number, amount)
    }

    /// Move `amount` from one account to another. Returns the source-side
    /// record; the incoming record is appended to the target's history.
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<Transaction, LedgerError> {
        self.transfer_with(&TransferStrategy, from, to, amount)
    }

    /// Run any strategy against resolved accounts.
    pub fn execute(
        &mut self,
        strategy: &dyn OperationStrategy,
        number: &str,
        amount: Amount,
        target: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        match target {
            Some(to) => {
                if strategy.kind().requires_target() {
                    self.transfer_with(strategy, number, to, amount)
                } else {
                    // Unknown accounts are reported before the misuse
                    self.account(number)?;
                    self.account(to)?;
                    Err(Rejection::UnexpectedTarget.into())
                }
            }
            None => self.execute_single(strategy, number, amount),
        }
    }

    fn transfer_with(
        &mut self,
        strategy: &dyn OperationStrategy,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<Transaction, LedgerError> {
        if !self.accounts.contains_key(from) {
            return Err(LedgerError::AccountNotFound(from.to_string()));
        }
        if from == to {
            return Err(Rejection::SelfTransfer {
                account: from.to_string(),
            }
            .into());
        }
        // Take the target out so both accounts can be borrowed mutably.
        let mut target = self
            .accounts
            .remove(to)
            .ok_or_else(|| LedgerError::AccountNotFound(to.to_string()))?;
        let result = match self.accounts.get_mut(from) {
            Some(source) => self
                .engine
                .execute_operation(strategy, source, amount, Some(&mut target)),
            None => Err(LedgerError::AccountNotFound(from.to_string())),
        };
        self.accounts.insert(to.to_string(), target);
        result
    }

    fn execute_single(
        &mut self,
        strategy: &dyn OperationStrategy,
        number: &str,
        amount: Amount,
    ) -> Result<Transaction, LedgerError> {
        let account = self
            .accounts
            .get_mut(number)
            .ok_or_else(|| LedgerError::AccountNotFound(number.to_string()))?;
        self.engine.execute_operation(strategy, account, amount, None)
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new(TransactionEngine::new())
    }
}
