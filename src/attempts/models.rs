//! Data models for exercise attempts

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ParseValueError;

/// Kind of exercise the learner attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseType {
    /// Predict the values a program produces step by step
    Trace,
    /// Reorder shuffled lines into a working program
    Parsons,
    /// Complete the blanks in a partial program
    FillIn,
    /// Write a program from scratch
    Write,
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Parsons => "parsons",
            Self::FillIn => "fill-in",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "parsons" => Ok(Self::Parsons),
            "fill-in" | "fill_in" | "fillin" => Ok(Self::FillIn),
            "write" => Ok(Self::Write),
            _ => Err(ParseValueError::new("exercise type", s)),
        }
    }
}

/// A single submission for an exercise. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: Uuid,
    pub exercise_id: String,
    pub lesson_id: String,
    pub module_id: String,
    pub exercise_type: ExerciseType,
    pub success: bool,
    #[serde(default)]
    pub time_spent_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_code: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl Attempt {
    pub fn new(
        exercise_id: impl Into<String>,
        lesson_id: impl Into<String>,
        module_id: impl Into<String>,
        exercise_type: ExerciseType,
        success: bool,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise_id: exercise_id.into(),
            lesson_id: lesson_id.into(),
            module_id: module_id.into(),
            exercise_type,
            success,
            time_spent_ms: 0,
            submitted_code: None,
            attempted_at,
        }
    }

    pub fn with_time_spent(mut self, time_spent_ms: u64) -> Self {
        self.time_spent_ms = time_spent_ms;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.submitted_code = Some(code.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_type_parsing() {
        assert_eq!("trace".parse::<ExerciseType>().unwrap(), ExerciseType::Trace);
        assert_eq!("Fill-In".parse::<ExerciseType>().unwrap(), ExerciseType::FillIn);
        assert_eq!("fill_in".parse::<ExerciseType>().unwrap(), ExerciseType::FillIn);
        assert!("quiz".parse::<ExerciseType>().is_err());
    }

    #[test]
    fn test_attempt_serializes_camel_case() {
        let attempt = Attempt::new("e1", "l1", "m1", ExerciseType::FillIn, true, Utc::now())
            .with_time_spent(1500);
        let json = serde_json::to_value(&attempt).unwrap();

        assert_eq!(json["exerciseId"], "e1");
        assert_eq!(json["exerciseType"], "fill-in");
        assert_eq!(json["timeSpentMs"], 1500);
        assert!(json.get("submittedCode").is_none());
    }
}
