use thiserror::Error;

use crate::domain::{DomainError, PolicyError, UserId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Policy violation: {0}")]
    PolicyViolation(#[from] PolicyError),

    #[error("Gave up after {attempts} conflicting writes for user {user_id}")]
    WriteConflict { user_id: UserId, attempts: u32 },

    #[error("Database error: {0}")]
    Database(anyhow::Error),
}

impl AppError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, AppError::InvalidArgument(_))
    }

    pub fn is_policy_violation(&self) -> bool {
        matches!(self, AppError::PolicyViolation(_))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::InvalidArgument(err.to_string())
    }
}

/// Store errors arrive as `anyhow::Error`; a domain rejection raised while
/// building a value inside the store is still a caller error.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DomainError>() {
            Ok(domain) => domain.into(),
            Err(other) => AppError::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_inside_anyhow_is_invalid_argument() {
        let err: AppError = anyhow::Error::new(DomainError::NonPositiveUserId(0)).into();
        assert!(err.is_invalid_argument());
        assert_eq!(
            err.to_string(),
            "Invalid argument: userId must be positive (got 0)"
        );
    }

    #[test]
    fn test_other_errors_are_database_errors() {
        let err: AppError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_write_conflict_message() {
        let err = AppError::WriteConflict {
            user_id: 9,
            attempts: 32,
        };
        assert!(!err.is_invalid_argument());
        assert_eq!(
            err.to_string(),
            "Gave up after 32 conflicting writes for user 9"
        );
    }

    #[test]
    fn test_policy_error_message() {
        let err: AppError = PolicyError::InsufficientPoints {
            balance: 5_000,
            requested: 10_000,
        }
        .into();
        assert!(err.is_policy_violation());
        assert!(err.to_string().starts_with("Policy violation:"));
    }
}
