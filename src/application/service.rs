use tracing::{debug, info, warn};

use crate::domain::{
    ensure_positive_amount, ensure_positive_user_id, Balance, ConsistencyReport, PointPolicy,
    Points, Transaction, TransactionKind, UserId,
};
use crate::storage::{CommitOutcome, LedgerStore, MemoryStore, Repository};

use super::{AppError, UserLocks};

/// How many times a mutation re-reads and retries when another writer
/// sharing the same database changed the balance first.
const MAX_COMMIT_ATTEMPTS: u32 = 32;

/// The only component allowed to change a balance.
///
/// Every mutation runs format checks, then takes the user's lock, reads the
/// current balance, runs policy checks, and commits the new balance together
/// with its history entry. The commit only lands if the balance is still the
/// one that was read; otherwise the read and checks run again. A rejected
/// request never reaches the store.
pub struct PointService<S> {
    store: S,
    policy: PointPolicy,
    locks: UserLocks,
}

impl PointService<MemoryStore> {
    /// Service backed by in-process tables.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl PointService<Repository> {
    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }
}

impl<S: LedgerStore> PointService<S> {
    /// Create a new service over the given store with the default policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, PointPolicy::default())
    }

    pub fn with_policy(store: S, policy: PointPolicy) -> Self {
        Self {
            store,
            policy,
            locks: UserLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current balance, zero for a user with no record.
    ///
    /// The user id is checked by `Balance` construction inside the store.
    pub async fn get_balance(&self, user_id: UserId) -> Result<Balance, AppError> {
        let balance = self.store.read(user_id).await?;
        debug!(user_id, balance = balance.amount(), "balance read");
        Ok(balance)
    }

    /// Add points to a user's balance.
    pub async fn charge(&self, user_id: UserId, amount: Points) -> Result<Balance, AppError> {
        self.apply(user_id, amount, TransactionKind::Charge).await
    }

    /// Spend points from a user's balance.
    pub async fn use_points(&self, user_id: UserId, amount: Points) -> Result<Balance, AppError> {
        self.apply(user_id, amount, TransactionKind::Use).await
    }

    /// All transactions for a user, oldest first.
    pub async fn get_history(&self, user_id: UserId) -> Result<Vec<Transaction>, AppError> {
        // No Balance is built on this path, so the id is checked here.
        ensure_positive_user_id(user_id)?;
        let history = self.store.list_by_user(user_id).await?;
        debug!(user_id, entries = history.len(), "history read");
        Ok(history)
    }

    /// Balance and history taken from the same point in time.
    pub async fn snapshot(
        &self,
        user_id: UserId,
    ) -> Result<(Balance, Vec<Transaction>), AppError> {
        ensure_positive_user_id(user_id)?;
        Ok(self.store.snapshot(user_id).await?)
    }

    /// Replay the user's history and compare it with the stored balance.
    pub async fn check_consistency(&self, user_id: UserId) -> Result<ConsistencyReport, AppError> {
        let (balance, history) = self.snapshot(user_id).await?;
        let report = ConsistencyReport::build(user_id, balance.amount(), &history);

        if !report.is_consistent() {
            warn!(
                user_id,
                stored = report.stored,
                replayed = report.replayed,
                "balance does not match history"
            );
        }
        Ok(report)
    }

    async fn apply(
        &self,
        user_id: UserId,
        amount: Points,
        kind: TransactionKind,
    ) -> Result<Balance, AppError> {
        if let Err(err) = ensure_positive_amount(kind, amount)
            .and_then(|_| ensure_positive_user_id(user_id))
        {
            warn!(user_id, amount, kind = %kind, error = %err, "rejected malformed request");
            return Err(err.into());
        }

        let _guard = self.locks.acquire(user_id).await;

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let current = self.store.read(user_id).await?;
            let checked = match kind {
                TransactionKind::Charge => self.policy.check_charge(current.amount(), amount),
                TransactionKind::Use => self.policy.check_use(current.amount(), amount),
            };
            if let Err(err) = checked {
                warn!(user_id, amount, kind = %kind, error = %err, "rejected by policy");
                return Err(err.into());
            }

            // Policy checks bound the result to [0, max_balance], so this cannot overflow.
            let new_amount = current.amount() + kind.signed(amount);
            let outcome = self
                .store
                .commit(user_id, current.amount(), new_amount, kind, amount)
                .await?;

            match outcome {
                CommitOutcome::Committed(updated, entry) => {
                    info!(
                        user_id,
                        amount,
                        kind = %kind,
                        balance = updated.amount(),
                        transaction_id = entry.id(),
                        "balance updated"
                    );
                    return Ok(updated);
                }
                CommitOutcome::Conflict => {
                    debug!(user_id, attempt, "balance changed concurrently, retrying");
                }
            }
        }

        warn!(
            user_id,
            attempts = MAX_COMMIT_ATTEMPTS,
            "giving up after repeated write conflicts"
        );
        Err(AppError::WriteConflict {
            user_id,
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }
}
