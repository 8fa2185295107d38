use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task priority, ordered from least to most pressing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Position in declaration order; the legacy wire format.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub fn from_ordinal(ordinal: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(ordinal).ok()?).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::from_name(raw).ok_or_else(|| {
            AppError::invalid_input(format!(
                "priority must be one of low, medium, high (got '{}')",
                raw.trim()
            ))
        })
    }
}

/// How priorities are written into task records.
///
/// Both encodings are always accepted when reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityEncoding {
    /// Enum position (`0`, `1`, `2`).
    Ordinal,
    /// Stable lowercase name (`"low"`, `"medium"`, `"high"`).
    #[default]
    Name,
}

impl FromStr for PriorityEncoding {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ordinal" | "index" => Ok(Self::Ordinal),
            "name" | "string" => Ok(Self::Name),
            other => Err(AppError::invalid_input(format!(
                "priority encoding must be 'name' or 'ordinal' (got '{other}')"
            ))),
        }
    }
}
