//! Format rules: checks on the shape of a request, independent of stored state.

use std::fmt;

use super::{Points, TransactionKind, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    NonPositiveUserId(UserId),
    NonPositiveAmount { kind: TransactionKind, amount: Points },
    NegativeBalance(Points),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::NonPositiveUserId(user_id) => {
                write!(f, "userId must be positive (got {})", user_id)
            }
            DomainError::NonPositiveAmount { kind, amount } => {
                write!(
                    f,
                    "{} amount must be greater than 0 (got {})",
                    kind.label(),
                    amount
                )
            }
            DomainError::NegativeBalance(amount) => {
                write!(f, "balance cannot be negative (got {})", amount)
            }
        }
    }
}

impl std::error::Error for DomainError {}

pub fn ensure_positive_user_id(user_id: UserId) -> Result<(), DomainError> {
    if user_id <= 0 {
        return Err(DomainError::NonPositiveUserId(user_id));
    }
    Ok(())
}

pub fn ensure_positive_amount(kind: TransactionKind, amount: Points) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::NonPositiveAmount { kind, amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_must_be_positive() {
        assert!(ensure_positive_user_id(1).is_ok());
        assert_eq!(
            ensure_positive_user_id(0),
            Err(DomainError::NonPositiveUserId(0))
        );
        assert_eq!(
            ensure_positive_user_id(-7),
            Err(DomainError::NonPositiveUserId(-7))
        );
    }

    #[test]
    fn test_amount_must_be_positive() {
        assert!(ensure_positive_amount(TransactionKind::Charge, 1).is_ok());
        assert!(ensure_positive_amount(TransactionKind::Use, 0).is_err());
        assert!(ensure_positive_amount(TransactionKind::Charge, -100).is_err());
    }

    #[test]
    fn test_messages_name_the_operation() {
        let charge = ensure_positive_amount(TransactionKind::Charge, 0).unwrap_err();
        assert_eq!(charge.to_string(), "charge amount must be greater than 0 (got 0)");

        let use_err = ensure_positive_amount(TransactionKind::Use, -1).unwrap_err();
        assert_eq!(use_err.to_string(), "use amount must be greater than 0 (got -1)");
    }
}
