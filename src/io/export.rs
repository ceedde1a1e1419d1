use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::PointService;
use crate::domain::{Balance, Transaction, UserId};
use crate::storage::LedgerStore;

/// Output format for `export`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

/// Snapshot of one user's balance and history for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct UserSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub balance: Balance,
    pub history: Vec<Transaction>,
}

/// Exporter for converting a user's ledger data to CSV or JSON
pub struct Exporter<'a, S> {
    service: &'a PointService<S>,
}

impl<'a, S: LedgerStore> Exporter<'a, S> {
    pub fn new(service: &'a PointService<S>) -> Self {
        Self { service }
    }

    /// Export a user's history to CSV format
    pub async fn export_history_csv<W: Write>(&self, user_id: UserId, writer: W) -> Result<usize> {
        let history = self.service.get_history(user_id).await?;
        write_history_csv(&history, writer)
    }

    /// Export in the given format, returning how many transactions were written
    pub async fn export<W: Write>(
        &self,
        user_id: UserId,
        format: ExportFormat,
        writer: W,
    ) -> Result<usize> {
        match format {
            ExportFormat::Csv => self.export_history_csv(user_id, writer).await,
            ExportFormat::Json => self.export_snapshot_json(user_id, writer).await,
        }
    }

    /// Export a user's balance and history as a JSON document.
    ///
    /// Both come from one snapshot, so the history always replays to the balance.
    pub async fn export_snapshot_json<W: Write>(
        &self,
        user_id: UserId,
        mut writer: W,
    ) -> Result<usize> {
        let (balance, history) = self.service.snapshot(user_id).await?;
        let count = history.len();

        let snapshot = UserSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            balance,
            history,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        Ok(count)
    }
}

/// Write transactions as CSV rows, returning how many were written.
pub fn write_history_csv<W: Write>(history: &[Transaction], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(["id", "user_id", "kind", "amount", "occurred_at"])?;

    for tx in history {
        csv_writer.write_record(&[
            tx.id().to_string(),
            tx.user_id().to_string(),
            tx.kind().as_str().to_string(),
            tx.amount().to_string(),
            tx.occurred_at().to_rfc3339(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(history.len())
}
