//! Account lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a registered user account.
///
/// Routes are gated on status sets: some are reachable by accounts that have
/// not yet verified their email (`Pending`), most require `Active`, and
/// `Inactive` accounts are locked out of everything gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Registered but email not yet verified.
    Pending,
    /// Fully verified, in good standing.
    Active,
    /// Deactivated, either by the user or administratively.
    Inactive,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("invalid account status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_from_str_roundtrip() {
        for status in [
            AccountStatus::Pending,
            AccountStatus::Active,
            AccountStatus::Inactive,
        ] {
            let parsed: AccountStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("banned".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&AccountStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");
    }
}
