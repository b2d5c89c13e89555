//! Account status as stored by the user service

use std::fmt;

/// Lifecycle state of a user account.
///
/// Only [`AccountStatus::Active`] accounts may authenticate on the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
    Deleted,
    /// Any status string this service does not know about
    Other(String),
}

impl AccountStatus {
    /// Parse the raw column value (case-insensitive)
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "INACTIVE" => Self::Inactive,
            "SUSPENDED" => Self::Suspended,
            "DELETED" => Self::Deleted,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Deleted => "DELETED",
            Self::Other(s) => s,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
