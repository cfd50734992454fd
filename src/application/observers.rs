//! Stock observers: an audit trail, user-facing notifications, and a channel
//! forwarder for hosts that consume records on another task.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;

use super::TransactionObserver;
use crate::domain::{Transaction, TransactionKind, format_amount};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn tail(entries: &[String], count: usize) -> Vec<String> {
    let from = entries.len().saturating_sub(count);
    entries[from..].to_vec()
}

/// Keeps a formatted line for every committed record.
#[derive(Debug, Default)]
pub struct AuditLogger {
    entries: Mutex<Vec<String>>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_entry(transaction: &Transaction) -> String {
        format!(
            "[{}] Account: {} | Type: {} | Amount: {} | Balance: {} -> {}",
            transaction.timestamp.format("%Y-%m-%d %H:%M:%S"),
            transaction.account_number,
            transaction.kind,
            format_amount(transaction.amount),
            format_amount(transaction.balance_before),
            format_amount(transaction.balance_after),
        )
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    /// The last `count` entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<String> {
        tail(&lock(&self.entries), count)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

impl TransactionObserver for AuditLogger {
    fn name(&self) -> &str {
        "audit"
    }

    fn on_transaction(&self, transaction: &Transaction) -> anyhow::Result<()> {
        let entry = Self::format_entry(transaction);
        info!(target: "tellerbook::audit", "{}", entry);
        lock(&self.entries).push(entry);
        Ok(())
    }
}

/// Builds the message a user would receive for a record.
pub fn notification_message(transaction: &Transaction) -> String {
    let amount = format_amount(transaction.magnitude());
    let account = &transaction.account_number;
    match transaction.kind {
        TransactionKind::Deposit => format!("Deposit of {} credited to account {}", amount, account),
        TransactionKind::Withdraw => {
            format!("Withdrawal of {} debited from account {}", amount, account)
        }
        TransactionKind::TransferOut => {
            format!("Outgoing transfer of {} from account {}", amount, account)
        }
        TransactionKind::TransferIn => {
            format!("Incoming transfer of {} to account {}", amount, account)
        }
    }
}

/// Collects user notifications for every committed record.
#[derive(Debug, Default)]
pub struct NotificationService {
    notifications: Mutex<Vec<String>>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<String> {
        lock(&self.notifications).clone()
    }

    pub fn recent(&self, count: usize) -> Vec<String> {
        tail(&lock(&self.notifications), count)
    }

    pub fn clear(&self) {
        lock(&self.notifications).clear();
    }
}

impl TransactionObserver for NotificationService {
    fn name(&self) -> &str {
        "notifications"
    }

    fn on_transaction(&self, transaction: &Transaction) -> anyhow::Result<()> {
        let message = notification_message(transaction);
        info!(account = %transaction.account_number, "notification: {}", message);
        lock(&self.notifications).push(message);
        Ok(())
    }
}

/// Forwards records to an unbounded channel, one message per commit.
#[derive(Debug)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<Transaction>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<Transaction>) -> Self {
        Self { sender }
    }

    /// Create an observer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Transaction>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl TransactionObserver for ChannelObserver {
    fn name(&self) -> &str {
        "channel"
    }

    fn on_transaction(&self, transaction: &Transaction) -> anyhow::Result<()> {
        self.sender
            .send(transaction.clone())
            .ok()
            .context("transaction channel receiver was dropped")
    }
}
