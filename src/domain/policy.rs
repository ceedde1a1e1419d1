use std::fmt;

use super::Points;

/// Largest amount accepted by a single charge.
pub const DEFAULT_MAX_CHARGE: Points = 100_000;

/// Largest balance a user may hold.
pub const DEFAULT_MAX_BALANCE: Points = 100_000;

/// Business limits that depend on the user's current balance.
///
/// Kept apart from the format rules in `validation` so limits can change
/// without touching request-shape checks. All boundaries are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointPolicy {
    pub max_charge: Points,
    pub max_balance: Points,
}

impl Default for PointPolicy {
    fn default() -> Self {
        Self {
            max_charge: DEFAULT_MAX_CHARGE,
            max_balance: DEFAULT_MAX_BALANCE,
        }
    }
}

impl PointPolicy {
    pub fn check_charge(&self, current: Points, amount: Points) -> Result<(), PolicyError> {
        if amount > self.max_charge {
            return Err(PolicyError::ChargeCeilingExceeded {
                requested: amount,
                ceiling: self.max_charge,
            });
        }

        let exceeds_cap = current
            .checked_add(amount)
            .is_none_or(|total| total > self.max_balance);
        if exceeds_cap {
            return Err(PolicyError::HoldingCapExceeded {
                current,
                requested: amount,
                cap: self.max_balance,
            });
        }

        Ok(())
    }

    pub fn check_use(&self, current: Points, amount: Points) -> Result<(), PolicyError> {
        if amount > current {
            return Err(PolicyError::InsufficientPoints {
                balance: current,
                requested: amount,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    ChargeCeilingExceeded {
        requested: Points,
        ceiling: Points,
    },
    HoldingCapExceeded {
        current: Points,
        requested: Points,
        cap: Points,
    },
    InsufficientPoints {
        balance: Points,
        requested: Points,
    },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::ChargeCeilingExceeded { requested, ceiling } => write!(
                f,
                "a single charge cannot exceed {} points (requested {})",
                ceiling, requested
            ),
            PolicyError::HoldingCapExceeded {
                current,
                requested,
                cap,
            } => write!(
                f,
                "balance cannot exceed {} points (current {}, requested {})",
                cap, current, requested
            ),
            PolicyError::InsufficientPoints { balance, requested } => write!(
                f,
                "cannot use more points than the current balance (balance {}, requested {})",
                balance, requested
            ),
        }
    }
}

impl std::error::Error for PolicyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_ceiling() {
        let policy = PointPolicy::default();
        assert!(policy.check_charge(0, 100_000).is_ok());
        assert!(matches!(
            policy.check_charge(0, 100_001),
            Err(PolicyError::ChargeCeilingExceeded { .. })
        ));
    }

    #[test]
    fn test_holding_cap_is_inclusive() {
        let policy = PointPolicy::default();
        assert!(policy.check_charge(80_000, 20_000).is_ok());
        assert_eq!(
            policy.check_charge(90_000, 20_000),
            Err(PolicyError::HoldingCapExceeded {
                current: 90_000,
                requested: 20_000,
                cap: 100_000,
            })
        );
    }

    #[test]
    fn test_use_cannot_exceed_balance() {
        let policy = PointPolicy::default();
        assert!(policy.check_use(5_000, 5_000).is_ok());
        assert_eq!(
            policy.check_use(5_000, 10_000),
            Err(PolicyError::InsufficientPoints {
                balance: 5_000,
                requested: 10_000,
            })
        );
    }

    #[test]
    fn test_raised_limits() {
        let policy = PointPolicy {
            max_charge: 500_000,
            max_balance: 1_000_000,
        };
        assert!(policy.check_charge(900_000, 100_000).is_ok());
        assert!(policy.check_charge(900_000, 100_001).is_err());
    }

    #[test]
    fn test_cap_check_does_not_overflow() {
        let policy = PointPolicy {
            max_charge: Points::MAX,
            max_balance: Points::MAX,
        };
        assert!(matches!(
            policy.check_charge(Points::MAX, 1),
            Err(PolicyError::HoldingCapExceeded { .. })
        ));
    }
}
