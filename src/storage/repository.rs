use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{Balance, Points, Transaction, TransactionKind, UserId};

use super::{BalanceStore, CommitOutcome, HistoryStore, LedgerStore, MIGRATION_001_INITIAL};

const UPSERT_BALANCE: &str = r#"
    INSERT INTO user_points (user_id, amount, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(user_id) DO UPDATE SET amount = excluded.amount, updated_at = excluded.updated_at
"#;

// Compare-and-set on the amount the caller read. Being the first statement of
// the transaction, it takes the write lock before anything is read.
const UPDATE_BALANCE_IF_UNCHANGED: &str = r#"
    UPDATE user_points
    SET amount = ?, updated_at = ?
    WHERE user_id = ? AND amount = ?
"#;

const INSERT_BALANCE_IF_ABSENT: &str = r#"
    INSERT INTO user_points (user_id, amount, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(user_id) DO NOTHING
"#;

const SELECT_BALANCE: &str = r#"
    SELECT user_id, amount, updated_at
    FROM user_points
    WHERE user_id = ?
"#;

const SELECT_HISTORY: &str = r#"
    SELECT id, user_id, amount, kind, occurred_at
    FROM point_history
    WHERE user_id = ?
    ORDER BY id
"#;

const INSERT_HISTORY: &str = r#"
    INSERT INTO point_history (user_id, amount, kind, occurred_at)
    VALUES (?, ?, ?, ?)
    RETURNING id
"#;

/// SQLite-backed balance and history store.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    fn row_to_balance(row: &sqlx::sqlite::SqliteRow) -> Result<Balance> {
        let updated_at_str: String = row.get("updated_at");
        Ok(Balance::new(
            row.get("user_id"),
            row.get("amount"),
            parse_timestamp(&updated_at_str).context("Invalid updated_at timestamp")?,
        )?)
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.get("kind");
        let occurred_at_str: String = row.get("occurred_at");

        Ok(Transaction::new(
            row.get("id"),
            row.get("user_id"),
            row.get("amount"),
            TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            parse_timestamp(&occurred_at_str).context("Invalid occurred_at timestamp")?,
        )?)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl BalanceStore for Repository {
    async fn read(&self, user_id: UserId) -> Result<Balance> {
        let row = sqlx::query(SELECT_BALANCE)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch balance")?;

        match row {
            Some(row) => Self::row_to_balance(&row),
            None => Ok(Balance::empty(user_id)?),
        }
    }

    async fn write(&self, user_id: UserId, amount: Points) -> Result<Balance> {
        let balance = Balance::new(user_id, amount, Utc::now())?;

        sqlx::query(UPSERT_BALANCE)
            .bind(balance.user_id())
            .bind(balance.amount())
            .bind(balance.updated_at().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to save balance")?;

        Ok(balance)
    }
}

#[async_trait]
impl HistoryStore for Repository {
    async fn append(
        &self,
        user_id: UserId,
        amount: Points,
        kind: TransactionKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        // Validate before the insert so a bad entry never reaches the table.
        Transaction::new(0, user_id, amount, kind, occurred_at)?;

        let row = sqlx::query(INSERT_HISTORY)
            .bind(user_id)
            .bind(amount)
            .bind(kind.as_str())
            .bind(occurred_at.to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .context("Failed to append history entry")?;

        Ok(Transaction::new(
            row.get("id"),
            user_id,
            amount,
            kind,
            occurred_at,
        )?)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(SELECT_HISTORY)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list history")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }
}

#[async_trait]
impl LedgerStore for Repository {
    /// Balance update and history insert share one SQL transaction, and the
    /// update only applies while the stored amount still equals `expected`.
    /// This holds across processes sharing the database file.
    async fn commit(
        &self,
        user_id: UserId,
        expected: Points,
        new_amount: Points,
        kind: TransactionKind,
        magnitude: Points,
    ) -> Result<CommitOutcome> {
        let balance = Balance::new(user_id, new_amount, Utc::now())?;
        let occurred_at = balance.updated_at();
        Transaction::new(0, user_id, magnitude, kind, occurred_at)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let mut changed = sqlx::query(UPDATE_BALANCE_IF_UNCHANGED)
            .bind(balance.amount())
            .bind(occurred_at.to_rfc3339())
            .bind(user_id)
            .bind(expected)
            .execute(&mut *tx)
            .await
            .context("Failed to save balance")?
            .rows_affected();

        // No record yet counts as 0; another writer may have created it first.
        if changed == 0 && expected == 0 {
            changed = sqlx::query(INSERT_BALANCE_IF_ABSENT)
                .bind(user_id)
                .bind(balance.amount())
                .bind(occurred_at.to_rfc3339())
                .execute(&mut *tx)
                .await
                .context("Failed to save balance")?
                .rows_affected();
        }

        if changed == 0 {
            tx.rollback().await.context("Failed to roll back transaction")?;
            return Ok(CommitOutcome::Conflict);
        }

        let row = sqlx::query(INSERT_HISTORY)
            .bind(user_id)
            .bind(magnitude)
            .bind(kind.as_str())
            .bind(occurred_at.to_rfc3339())
            .fetch_one(&mut *tx)
            .await
            .context("Failed to append history entry")?;

        tx.commit().await.context("Failed to commit transaction")?;

        let entry = Transaction::new(row.get("id"), user_id, magnitude, kind, occurred_at)?;
        Ok(CommitOutcome::Committed(balance, entry))
    }

    /// Both queries run in one read transaction, so they see the same state.
    async fn snapshot(&self, user_id: UserId) -> Result<(Balance, Vec<Transaction>)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let balance_row = sqlx::query(SELECT_BALANCE)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch balance")?;

        let history_rows = sqlx::query(SELECT_HISTORY)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await
            .context("Failed to list history")?;

        tx.commit().await.context("Failed to end read transaction")?;

        let balance = match balance_row {
            Some(row) => Self::row_to_balance(&row)?,
            None => Balance::empty(user_id)?,
        };
        let history = history_rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;
        Ok((balance, history))
    }
}
