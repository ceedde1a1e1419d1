use super::{Points, Transaction, UserId};

/// Rebuild a balance from history: CHARGE adds, USE subtracts, starting at 0.
pub fn replay_balance(transactions: &[Transaction]) -> Points {
    transactions
        .iter()
        .fold(0, |balance, tx| balance + tx.kind().signed(tx.amount()))
}

/// Outcome of comparing a stored balance with its replayed history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub user_id: UserId,
    pub stored: Points,
    pub replayed: Points,
    pub transaction_count: usize,
}

impl ConsistencyReport {
    pub fn build(user_id: UserId, stored: Points, transactions: &[Transaction]) -> Self {
        Self {
            user_id,
            stored,
            replayed: replay_balance(transactions),
            transaction_count: transactions.len(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.stored == self.replayed
    }

    /// Stored minus replayed; zero when consistent.
    pub fn drift(&self) -> Points {
        self.stored - self.replayed
    }
}
