use crate::domain::{Account, Amount, Transaction, TransactionKind};

use super::{LedgerError, LedgerService};

/// Per-account activity totals. All totals are positive magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountStatistics {
    pub transaction_count: usize,
    pub total_deposits: Amount,
    pub total_withdrawals: Amount,
    pub total_transfers_out: Amount,
    pub total_transfers_in: Amount,
}

impl AccountStatistics {
    pub fn from_history(history: &[Transaction]) -> Self {
        history.iter().fold(Self::default(), |mut stats, record| {
            stats.transaction_count += 1;
            let magnitude = record.magnitude();
            match record.kind {
                TransactionKind::Deposit => stats.total_deposits += magnitude,
                TransactionKind::Withdraw => stats.total_withdrawals += magnitude,
                TransactionKind::TransferOut => stats.total_transfers_out += magnitude,
                TransactionKind::TransferIn => stats.total_transfers_in += magnitude,
            }
            stats
        })
    }

    /// Money moved by transfers in either direction
    pub fn total_transfers(&self) -> Amount {
        self.total_transfers_out + self.total_transfers_in
    }
}

/// A logged-in view over a [`LedgerService`]: every operation acts on the
/// current user's account.
#[derive(Debug)]
pub struct Session {
    service: LedgerService,
    current_user: Option<String>,
}

impl Session {
    pub fn new(service: LedgerService) -> Self {
        Self {
            service,
            current_user: None,
        }
    }

    pub fn service(&self) -> &LedgerService {
        &self.service
    }

    /// Register a user without logging in. Returns the new account number.
    pub fn register(
        &mut self,
        username: &str,
        password: &str,
        initial_balance: Amount,
    ) -> Result<String, LedgerError> {
        self.service.create_user(username, password, initial_balance)
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<(), LedgerError> {
        if !self.service.authenticate(username, password) {
            return Err(LedgerError::InvalidCredentials);
        }
        self.current_user = Some(username.to_string());
        Ok(())
    }

    pub fn logout(&mut self) {
        self.current_user = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn current_username(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn current_account(&self) -> Result<&Account, LedgerError> {
        let username = self.current_user.as_deref().ok_or(LedgerError::NotLoggedIn)?;
        self.service.account_by_username(username)
    }

    fn current_number(&self) -> Result<String, LedgerError> {
        Ok(self.current_account()?.number().to_string())
    }

    pub fn balance(&self) -> Result<Amount, LedgerError> {
        Ok(self.current_account()?.balance())
    }

    pub fn deposit(&mut self, amount: Amount) -> Result<Transaction, LedgerError> {
        let number = self.current_number()?;
        self.service.deposit(&number, amount)
    }

    pub fn withdraw(&mut self, amount: Amount) -> Result<Transaction, LedgerError> {
        let number = self.current_number()?;
        self.service.withdraw(&number, amount)
    }

    /// Transfer to the account owned by `recipient`.
    pub fn transfer_to_user(
        &mut self,
        recipient: &str,
        amount: Amount,
    ) -> Result<Transaction, LedgerError> {
        let from = self.current_number()?;
        if !self.service.user_exists(recipient) {
            return Err(LedgerError::UserNotFound(recipient.to_string()));
        }
        let to = self.service.account_by_username(recipient)?.number().to_string();
        self.service.transfer(&from, &to, amount)
    }

    pub fn history(&self) -> Result<&[Transaction], LedgerError> {
        Ok(self.current_account()?.transactions())
    }

    pub fn statistics(&self) -> Result<AccountStatistics, LedgerError> {
        Ok(AccountStatistics::from_history(self.history()?))
    }
}
