use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Account, Transaction};

/// Full in-memory ledger snapshot
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot<'a> {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<&'a Account>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export one account's history to CSV format
    pub fn export_history_csv<W: Write>(&self, account_number: &str, writer: W) -> Result<usize> {
        let history = self.service.history(account_number)?;
        write_history_csv(history, writer)
    }

    /// Export one account's history as a JSON array
    pub fn export_history_json<W: Write>(&self, account_number: &str, writer: W) -> Result<usize> {
        let history = self.service.history(account_number)?;
        serde_json::to_writer_pretty(writer, history)?;
        Ok(history.len())
    }

    /// Export every account with its history as JSON
    pub fn export_snapshot_json<W: Write>(&self, writer: W) -> Result<usize> {
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts: self.service.accounts(),
        };
        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(snapshot.accounts.len())
    }
}

/// Write records as CSV, one row per record
pub fn write_history_csv<W: Write>(history: &[Transaction], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    // Write header
    csv_writer.write_record([
        "id",
        "timestamp",
        "account",
        "kind",
        "amount",
        "balance_before",
        "balance_after",
        "description",
    ])?;

    for record in history {
        csv_writer.write_record([
            record.id.to_string(),
            record.timestamp.to_rfc3339(),
            record.account_number.clone(),
            record.kind.as_str().to_string(),
            record.amount.to_string(),
            record.balance_before.to_string(),
            record.balance_after.to_string(),
            record.description.clone().unwrap_or_default(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(history.len())
}
