mod memory;
mod repository;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Balance, Points, Transaction, TransactionKind, UserId};

pub use memory::*;
pub use repository::*;

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Current balance per user.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Stored balance, or a zero balance when the user has no record.
    async fn read(&self, user_id: UserId) -> Result<Balance>;

    /// Upsert the balance and return it with a fresh timestamp.
    async fn write(&self, user_id: UserId, amount: Points) -> Result<Balance>;
}

/// Append-only transaction log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append an entry, assigning the next id.
    async fn append(
        &self,
        user_id: UserId,
        amount: Points,
        kind: TransactionKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transaction>;

    /// All entries for a user in insertion order.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>>;
}

/// Result of a conditional commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Balance and history entry were both written.
    Committed(Balance, Transaction),
    /// The stored balance no longer matched the expected amount; nothing was written.
    Conflict,
}

/// A backend holding both balances and history.
#[async_trait]
pub trait LedgerStore: BalanceStore + HistoryStore {
    /// Replace the balance with `new_amount` only if it still equals
    /// `expected`, and append the matching history entry in the same step.
    ///
    /// A user without a record counts as holding 0. The entry carries the
    /// timestamp of the written balance. Either both writes land or neither.
    async fn commit(
        &self,
        user_id: UserId,
        expected: Points,
        new_amount: Points,
        kind: TransactionKind,
        magnitude: Points,
    ) -> Result<CommitOutcome>;

    /// Balance and history read as one consistent view.
    async fn snapshot(&self, user_id: UserId) -> Result<(Balance, Vec<Transaction>)>;
}
