//! Data models for the review scheduler

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ParseValueError;

use super::algorithm::SchedulerError;

/// Status of a card in the spaced repetition system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardStatus {
    /// Created but never reviewed
    #[default]
    New,
    /// In initial learning phase
    Learning,
    /// Regular spaced review
    Review,
    /// Failed and re-learning
    Relearning,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Learning => "Learning",
            Self::Review => "Review",
            Self::Relearning => "Relearning",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "learning" => Ok(Self::Learning),
            "review" => Ok(Self::Review),
            "relearning" => Ok(Self::Relearning),
            _ => Err(ParseValueError::new("card state", s)),
        }
    }
}

/// How well the learner recalled an exercise during review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn is_recall(&self) -> bool {
        !matches!(self, Self::Again)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Again => "Again",
            Self::Hard => "Hard",
            Self::Good => "Good",
            Self::Easy => "Easy",
        };
        f.write_str(name)
    }
}

impl TryFrom<i32> for Rating {
    type Error = SchedulerError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            _ => Err(SchedulerError::InvalidRating(value.to_string())),
        }
    }
}

impl FromStr for Rating {
    type Err = SchedulerError;

    /// Accepts rating names (`again`, `hard`, `good`, `easy`) or UI numbers 1-4
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "again" | "1" => Ok(Self::Again),
            "hard" | "2" => Ok(Self::Hard),
            "good" | "3" => Ok(Self::Good),
            "easy" | "4" => Ok(Self::Easy),
            _ => Err(SchedulerError::InvalidRating(s.to_string())),
        }
    }
}

/// Spaced repetition state for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub exercise_id: String,
    /// When the card is due for review
    pub due: DateTime<Utc>,
    /// Days until predicted recall falls to roughly 90%
    pub stability: f64,
    /// 1 (easy) to 10 (hard)
    pub difficulty: f64,
    /// Days between the previous two reviews
    pub elapsed_days: f64,
    /// Interval chosen at the last review
    pub scheduled_days: f64,
    pub reps: u32,
    pub lapses: u32,
    pub state: CardStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Difficulty a card starts with before its first rating
const DEFAULT_DIFFICULTY: f64 = 5.0;

impl ReviewCard {
    pub fn new(exercise_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            due: now,
            stability: 0.0,
            difficulty: DEFAULT_DIFFICULTY,
            elapsed_days: 0.0,
            scheduled_days: 0.0,
            reps: 0,
            lapses: 0,
            state: CardStatus::New,
            last_review: None,
            created_at: now,
        }
    }

    /// Check if the card is due for review
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }

    /// The point the due date must never precede
    pub fn anchor(&self) -> DateTime<Utc> {
        self.last_review.unwrap_or(self.created_at)
    }
}

/// Counts of cards by state, used for session summaries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_cards: usize,
    pub new_cards: usize,
    pub learning_cards: usize,
    pub review_cards: usize,
    pub relearning_cards: usize,
    pub due_cards: usize,
    pub total_lapses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_parsing() {
        assert_eq!("Good".parse::<Rating>().unwrap(), Rating::Good);
        assert_eq!("1".parse::<Rating>().unwrap(), Rating::Again);
        assert_eq!(Rating::try_from(4).unwrap(), Rating::Easy);

        assert!(matches!(
            "perfect".parse::<Rating>(),
            Err(SchedulerError::InvalidRating(_))
        ));
        assert!(matches!(Rating::try_from(0), Err(SchedulerError::InvalidRating(_))));
        assert!(matches!(Rating::try_from(5), Err(SchedulerError::InvalidRating(_))));
    }

    #[test]
    fn test_new_card_is_due_immediately() {
        let now = Utc::now();
        let card = ReviewCard::new("e1", now);
        assert_eq!(card.state, CardStatus::New);
        assert!(card.is_due(now));
        assert_eq!(card.anchor(), now);
    }
}
