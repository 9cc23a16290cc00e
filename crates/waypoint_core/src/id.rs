//! Identifiers for agents and simulation runs.
//!
//! Agent IDs are small ordinals rather than random UUIDs: conflict
//! resolution gives priority to the lowest ID, so ordering is part of the
//! contract. Run IDs are UUID-backed and exist to correlate log output
//! across independent simulations.

use schemars::JsonSchema;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::str::FromStr;
use uuid::Uuid;

/// Errors that can occur when parsing IDs from their string form
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum IdError {
    #[error("Invalid ID format: expected prefix '{expected}', got '{actual}'")]
    #[diagnostic(help("Ensure the ID starts with the correct prefix followed by an underscore"))]
    InvalidPrefix { expected: String, actual: String },

    #[error("Invalid ID format: {0}")]
    #[diagnostic(help("IDs must be in the format 'prefix_value'"))]
    InvalidFormat(String),

    #[error("Invalid ordinal: {0}")]
    #[diagnostic(help("Agent ordinals are unsigned integers"))]
    InvalidOrdinal(#[from] std::num::ParseIntError),

    #[error("Invalid UUID: {0}")]
    #[diagnostic(help("The UUID portion of the ID must be a valid UUID"))]
    InvalidUuid(#[from] uuid::Error),
}

fn split_prefixed<'a>(s: &'a str, prefix: &str) -> Result<&'a str, IdError> {
    let mut parts = s.splitn(2, '_');
    let (Some(found), Some(rest)) = (parts.next(), parts.next()) else {
        return Err(IdError::InvalidFormat(format!(
            "'{s}' is not in 'prefix_value' form"
        )));
    };
    if found != prefix {
        return Err(IdError::InvalidPrefix {
            expected: prefix.to_string(),
            actual: found.to_string(),
        });
    }
    Ok(rest)
}

/// A totally ordered agent identifier, displayed as `agt_<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
pub struct AgentId(u32);

impl AgentId {
    pub const PREFIX: &'static str = "agt";

    pub fn new(ordinal: u32) -> Self {
        Self(ordinal)
    }

    /// The raw ordinal, zero-based in creation order
    pub fn ordinal(&self) -> u32 {
        self.0
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl FromStr for AgentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = split_prefixed(s, Self::PREFIX)?;
        Ok(Self(rest.parse()?))
    }
}

impl Serialize for AgentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AgentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AgentIdVisitor;

        impl Visitor<'_> for AgentIdVisitor {
            type Value = AgentId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an agent ID string like 'agt_0'")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                AgentId::from_str(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(AgentIdVisitor)
    }
}

/// A unique identifier for one simulation run, displayed as `run_<uuid>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub const PREFIX: &'static str = "run";

    /// Create a new ID with a generated UUID
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an ID from a specific UUID (useful for tests)
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// The nil ID (all zeros)
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl FromStr for RunId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = split_prefixed(s, Self::PREFIX)?;
        Ok(Self(Uuid::parse_str(rest)?))
    }
}

impl Serialize for RunId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RunIdVisitor;

        impl Visitor<'_> for RunIdVisitor {
            type Value = RunId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a run ID string like 'run_<uuid>'")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                RunId::from_str(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(RunIdVisitor)
    }
}
