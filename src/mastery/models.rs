use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ParseValueError;

/// How well a concept is known. Variants are ordered from weakest to strongest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum MasteryLevel {
    #[default]
    NotStarted,
    /// At least one exercise tagged with the concept has been passed
    Learning,
    /// A whole lesson covering the concept has been completed
    Proficient,
    /// Only reachable through an explicit set
    Mastered,
}

impl MasteryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::Learning => "learning",
            Self::Proficient => "proficient",
            Self::Mastered => "mastered",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MasteryLevel {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not-started" | "not_started" => Ok(Self::NotStarted),
            "learning" => Ok(Self::Learning),
            "proficient" => Ok(Self::Proficient),
            "mastered" => Ok(Self::Mastered),
            _ => Err(ParseValueError::new("mastery level", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMasteryRecord {
    pub concept: String,
    pub level: MasteryLevel,
    pub updated_at: DateTime<Utc>,
}

impl ConceptMasteryRecord {
    pub fn new(concept: impl Into<String>, level: MasteryLevel, updated_at: DateTime<Utc>) -> Self {
        Self {
            concept: concept.into(),
            level,
            updated_at,
        }
    }
}
