use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ensure_positive_user_id, DomainError, Points, UserId};

/// A user's current point holding.
///
/// Fields are private: every instance goes through [`Balance::new`], so a
/// balance with a non-positive user id or a negative amount cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    user_id: UserId,
    amount: Points,
    updated_at: DateTime<Utc>,
}

impl Balance {
    pub fn new(
        user_id: UserId,
        amount: Points,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        ensure_positive_user_id(user_id)?;
        if amount < 0 {
            return Err(DomainError::NegativeBalance(amount));
        }
        Ok(Self {
            user_id,
            amount,
            updated_at,
        })
    }

    /// Zero balance for a user with no record yet.
    pub fn empty(user_id: UserId) -> Result<Self, DomainError> {
        Self::new(user_id, 0, Utc::now())
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn amount(&self) -> Points {
        self.amount
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_balance_is_zero() {
        let balance = Balance::empty(1).unwrap();
        assert_eq!(balance.user_id(), 1);
        assert_eq!(balance.amount(), 0);
    }

    #[test]
    fn test_rejects_non_positive_user_id() {
        assert_eq!(
            Balance::empty(0),
            Err(DomainError::NonPositiveUserId(0))
        );
        assert_eq!(
            Balance::new(-3, 100, Utc::now()),
            Err(DomainError::NonPositiveUserId(-3))
        );
    }

    #[test]
    fn test_rejects_negative_amount() {
        assert_eq!(
            Balance::new(1, -1, Utc::now()),
            Err(DomainError::NegativeBalance(-1))
        );
    }

    #[test]
    fn test_zero_amount_is_valid() {
        assert!(Balance::new(1, 0, Utc::now()).is_ok());
    }
}
