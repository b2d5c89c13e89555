//! Identifiers for users and like targets
//!
//! Both are UUIDs. Targets are held to the stricter rule used by the
//! complaint service: RFC 4122 variant with a version between 1 and 5.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::{Uuid, Variant};

/// Error when parsing an identifier from a string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("identifier is empty")]
    Empty,

    #[error("invalid identifier format: {0}")]
    InvalidFormat(String),

    #[error("unsupported identifier version: {0}")]
    UnsupportedVersion(usize),
}

/// User identifier (token subject)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    #[inline]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a random v4 identifier
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[inline]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdParseError::Empty);
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdParseError::InvalidFormat(s.to_string()))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for UserId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identifier of a likeable target (a complaint)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetId(Uuid);

impl TargetId {
    /// Generate a random v4 identifier
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[inline]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }

    /// Wrap an existing UUID, applying the same rules as [`TargetId::parse`]
    pub fn from_uuid(id: Uuid) -> Result<Self, IdParseError> {
        if id.get_variant() != Variant::RFC4122 {
            return Err(IdParseError::InvalidFormat(id.to_string()));
        }
        match id.get_version_num() {
            1..=5 => Ok(Self(id)),
            v => Err(IdParseError::UnsupportedVersion(v)),
        }
    }

    /// Parse and validate a target identifier.
    ///
    /// Only the canonical hyphenated form is accepted.
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        if s.is_empty() {
            return Err(IdParseError::Empty);
        }
        if s.len() != 36 {
            return Err(IdParseError::InvalidFormat(s.to_string()));
        }
        let id = Uuid::try_parse(s).map_err(|_| IdParseError::InvalidFormat(s.to_string()))?;
        Self::from_uuid(id)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TargetId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TargetId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TargetId> for String {
    fn from(id: TargetId) -> Self {
        id.to_string()
    }
}

/// A (user, target) pair - the unit of like membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LikeKey {
    pub user_id: UserId,
    pub target_id: TargetId,
}

impl LikeKey {
    #[inline]
    pub const fn new(user_id: UserId, target_id: TargetId) -> Self {
        Self { user_id, target_id }
    }
}

impl fmt::Display for LikeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.target_id)
    }
}
