use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ensure_positive_amount, ensure_positive_user_id, DomainError, Points, UserId};

pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Points added to the balance
    Charge,
    /// Points spent from the balance
    Use,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Charge => "CHARGE",
            TransactionKind::Use => "USE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CHARGE" => Some(TransactionKind::Charge),
            "USE" => Some(TransactionKind::Use),
            _ => None,
        }
    }

    /// Lowercase name used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Charge => "charge",
            TransactionKind::Use => "use",
        }
    }

    /// Signed effect of `amount` on a balance.
    pub fn signed(&self, amount: Points) -> Points {
        match self {
            TransactionKind::Charge => amount,
            TransactionKind::Use => -amount,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One history entry. Immutable once appended; `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    id: TransactionId,
    user_id: UserId,
    /// Magnitude of the change, always positive
    amount: Points,
    kind: TransactionKind,
    occurred_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        user_id: UserId,
        amount: Points,
        kind: TransactionKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        ensure_positive_user_id(user_id)?;
        ensure_positive_amount(kind, amount)?;
        Ok(Self {
            id,
            user_id,
            amount,
            kind,
            occurred_at,
        })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn amount(&self) -> Points {
        self.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [TransactionKind::Charge, TransactionKind::Use] {
            assert_eq!(TransactionKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::from_str("use"), Some(TransactionKind::Use));
        assert_eq!(TransactionKind::from_str("refund"), None);
    }

    #[test]
    fn test_signed_effect() {
        assert_eq!(TransactionKind::Charge.signed(500), 500);
        assert_eq!(TransactionKind::Use.signed(500), -500);
    }

    #[test]
    fn test_transaction_requires_positive_amount() {
        let result = Transaction::new(1, 1, 0, TransactionKind::Charge, Utc::now());
        assert!(matches!(
            result,
            Err(DomainError::NonPositiveAmount { amount: 0, .. })
        ));
    }

    #[test]
    fn test_transaction_requires_positive_user() {
        let result = Transaction::new(1, 0, 100, TransactionKind::Use, Utc::now());
        assert_eq!(result, Err(DomainError::NonPositiveUserId(0)));
    }

    #[test]
    fn test_kind_serializes_uppercase() {
        let json = serde_json::to_string(&TransactionKind::Charge).unwrap();
        assert_eq!(json, "\"CHARGE\"");
    }
}
