// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tellerbook::application::{
    FixedClock, LedgerService, TransactionEngine, TransactionObserver,
};
use tellerbook::domain::{Account, Transaction};

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
}

/// Engine whose records all carry `date`
pub fn fixed_engine(date: &str) -> TransactionEngine {
    TransactionEngine::with_clock(Arc::new(FixedClock(parse_date(date))))
}

pub fn account(number: &str, owner: &str, balance: f64) -> Account {
    Account::new(number.to_string(), owner, balance).unwrap()
}

/// Observer that keeps every record it is handed, in order
#[derive(Default)]
pub struct Collector {
    seen: Mutex<Vec<Transaction>>,
}

impl Collector {
    pub fn seen(&self) -> Vec<Transaction> {
        self.seen.lock().unwrap().clone()
    }
}

impl TransactionObserver for Collector {
    fn name(&self) -> &str {
        "collector"
    }

    fn on_transaction(&self, transaction: &Transaction) -> Result<()> {
        self.seen.lock().unwrap().push(transaction.clone());
        Ok(())
    }
}

/// Test fixture: the two demo users
pub struct DemoUsers {
    pub service: LedgerService,
    pub user1: String,
    pub user2: String,
}

impl DemoUsers {
    /// user1 with 1000.00 and user2 with 500.00
    pub fn create() -> Result<Self> {
        Self::with_engine(TransactionEngine::new())
    }

    pub fn with_engine(engine: TransactionEngine) -> Result<Self> {
        let mut service = LedgerService::new(engine);
        let user1 = service.create_user("user1", "password1", 1000.0)?;
        let user2 = service.create_user("user2", "password2", 500.0)?;
        Ok(Self {
            service,
            user1,
            user2,
        })
    }

    pub fn total_balance(&self) -> f64 {
        self.service.accounts().iter().map(|a| a.balance()).sum()
    }
}
