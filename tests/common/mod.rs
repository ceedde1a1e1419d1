// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use pointledger::application::PointService;
use pointledger::domain::{replay_balance, Points, UserId};
use pointledger::storage::{LedgerStore, MemoryStore, Repository};
use tempfile::TempDir;

/// Helper to create a service backed by a temporary SQLite database
pub async fn sqlite_service() -> Result<(PointService<Repository>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = PointService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Second, independent service on the database created by `sqlite_service`,
/// with its own pool and its own per-user locks.
pub async fn connect_second(temp_dir: &TempDir) -> Result<PointService<Repository>> {
    let db_path = temp_dir.path().join("test.db");
    Ok(PointService::connect(db_path.to_str().unwrap()).await?)
}

/// Helper to create a service backed by in-memory tables
pub fn memory_service() -> PointService<MemoryStore> {
    PointService::in_memory()
}

/// Bring a fresh user to `amount` with a single charge.
pub async fn seed_balance<S: LedgerStore>(
    service: &PointService<S>,
    user_id: UserId,
    amount: Points,
) -> Result<()> {
    service.charge(user_id, amount).await?;
    Ok(())
}

/// Assert that the user's history replays to the stored balance.
pub async fn assert_replay_matches<S: LedgerStore>(
    service: &PointService<S>,
    user_id: UserId,
) -> Result<()> {
    let balance = service.get_balance(user_id).await?;
    let history = service.get_history(user_id).await?;
    assert_eq!(
        replay_balance(&history),
        balance.amount(),
        "history for user {} does not replay to its balance",
        user_id
    );
    Ok(())
}
