use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Balance, Points, Transaction, TransactionKind, UserId};

use super::{BalanceStore, CommitOutcome, HistoryStore, LedgerStore};

/// In-process balance and history tables.
///
/// `commit` and `snapshot` hold the balance lock and then the history lock,
/// so readers never see a balance without its history entry.
#[derive(Default)]
pub struct MemoryStore {
    balances: RwLock<HashMap<UserId, Balance>>,
    history: RwLock<Vec<Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn read(&self, user_id: UserId) -> Result<Balance> {
        let balances = self
            .balances
            .read()
            .map_err(|_| anyhow!("balance table lock poisoned"))?;

        match balances.get(&user_id) {
            Some(balance) => Ok(balance.clone()),
            None => Ok(Balance::empty(user_id)?),
        }
    }

    async fn write(&self, user_id: UserId, amount: Points) -> Result<Balance> {
        let balance = Balance::new(user_id, amount, Utc::now())?;
        let mut balances = self
            .balances
            .write()
            .map_err(|_| anyhow!("balance table lock poisoned"))?;
        balances.insert(user_id, balance.clone());
        Ok(balance)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(
        &self,
        user_id: UserId,
        amount: Points,
        kind: TransactionKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let mut history = self
            .history
            .write()
            .map_err(|_| anyhow!("history table lock poisoned"))?;

        // Ids follow insertion order and never repeat since entries are never removed.
        let id = history.len() as i64 + 1;
        let entry = Transaction::new(id, user_id, amount, kind, occurred_at)?;
        history.push(entry.clone());
        Ok(entry)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let history = self
            .history
            .read()
            .map_err(|_| anyhow!("history table lock poisoned"))?;

        Ok(history
            .iter()
            .filter(|tx| tx.user_id() == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn commit(
        &self,
        user_id: UserId,
        expected: Points,
        new_amount: Points,
        kind: TransactionKind,
        magnitude: Points,
    ) -> Result<CommitOutcome> {
        let mut balances = self
            .balances
            .write()
            .map_err(|_| anyhow!("balance table lock poisoned"))?;

        let stored = balances.get(&user_id).map(Balance::amount).unwrap_or(0);
        if stored != expected {
            return Ok(CommitOutcome::Conflict);
        }

        let mut history = self
            .history
            .write()
            .map_err(|_| anyhow!("history table lock poisoned"))?;

        // Build both values before touching either table.
        let balance = Balance::new(user_id, new_amount, Utc::now())?;
        let id = history.len() as i64 + 1;
        let entry = Transaction::new(id, user_id, magnitude, kind, balance.updated_at())?;

        balances.insert(user_id, balance.clone());
        history.push(entry.clone());
        Ok(CommitOutcome::Committed(balance, entry))
    }

    async fn snapshot(&self, user_id: UserId) -> Result<(Balance, Vec<Transaction>)> {
        let balances = self
            .balances
            .read()
            .map_err(|_| anyhow!("balance table lock poisoned"))?;
        let history = self
            .history
            .read()
            .map_err(|_| anyhow!("history table lock poisoned"))?;

        let balance = match balances.get(&user_id) {
            Some(balance) => balance.clone(),
            None => Balance::empty(user_id)?,
        };
        let entries = history
            .iter()
            .filter(|tx| tx.user_id() == user_id)
            .cloned()
            .collect();
        Ok((balance, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_defaults_to_zero() -> Result<()> {
        let store = MemoryStore::new();
        let balance = store.read(42).await?;
        assert_eq!(balance.amount(), 0);
        assert_eq!(balance.user_id(), 42);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_rejects_invalid_user() {
        let store = MemoryStore::new();
        let err = store.read(0).await.unwrap_err();
        assert!(err.downcast_ref::<crate::domain::DomainError>().is_some());
    }

    #[tokio::test]
    async fn test_write_is_immediately_visible() -> Result<()> {
        let store = MemoryStore::new();
        let written = store.write(1, 700).await?;
        assert_eq!(store.read(1).await?, written);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_assigns_monotonic_ids() -> Result<()> {
        let store = MemoryStore::new();
        let now = Utc::now();
        let a = store.append(1, 100, TransactionKind::Charge, now).await?;
        let b = store.append(2, 200, TransactionKind::Charge, now).await?;
        let c = store.append(1, 50, TransactionKind::Use, now).await?;

        assert!(a.id() < b.id() && b.id() < c.id());

        let user_one = store.list_by_user(1).await?;
        assert_eq!(user_one.len(), 2);
        assert_eq!(user_one[0].kind(), TransactionKind::Charge);
        assert_eq!(user_one[1].kind(), TransactionKind::Use);
        assert_eq!(store.list_by_user(2).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_stamps_entry_with_balance_time() -> Result<()> {
        let store = MemoryStore::new();
        let outcome = store
            .commit(1, 0, 3_000, TransactionKind::Charge, 3_000)
            .await?;

        let CommitOutcome::Committed(balance, entry) = outcome else {
            panic!("expected a committed outcome, got {:?}", outcome);
        };
        assert_eq!(balance.amount(), 3_000);
        assert_eq!(entry.occurred_at(), balance.updated_at());
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_refuses_stale_expected_amount() -> Result<()> {
        let store = MemoryStore::new();
        store.commit(1, 0, 1_000, TransactionKind::Charge, 1_000).await?;

        // A writer that still believes the balance is 0 must not overwrite 1_000.
        let outcome = store
            .commit(1, 0, 500, TransactionKind::Charge, 500)
            .await?;
        assert_eq!(outcome, CommitOutcome::Conflict);

        assert_eq!(store.read(1).await?.amount(), 1_000);
        assert_eq!(store.list_by_user(1).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_pairs_balance_and_history() -> Result<()> {
        let store = MemoryStore::new();
        store.commit(4, 0, 800, TransactionKind::Charge, 800).await?;
        store.commit(4, 800, 300, TransactionKind::Use, 500).await?;

        let (balance, history) = store.snapshot(4).await?;
        assert_eq!(balance.amount(), 300);
        assert_eq!(history.len(), 2);

        let (empty, none) = store.snapshot(5).await?;
        assert_eq!(empty.amount(), 0);
        assert!(none.is_empty());
        Ok(())
    }
}
