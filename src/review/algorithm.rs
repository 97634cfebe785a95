//! Forgetting-curve review scheduler
//!
//! A simplified FSRS-style model. Each card carries a stability (days until
//! recall probability decays to about 90%) and a difficulty (1-10). A review
//! rating updates both, and the next interval is the time at which predicted
//! recall falls to the configured retention target.
//!
//! Ratings:
//! - Again: forgot. Stability drops sharply, the card relearns in minutes
//! - Hard: recalled with serious effort
//! - Good: recalled after some hesitation
//! - Easy: recalled without effort
//!
//! Recall decays as `R(t) = exp(-t / (9 * S))`. With that constant, `R(S)` is
//! about 0.895, so stability reads directly as "days until ~90% recall".

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::SchedulerConfig;

use super::models::{CardStatus, Rating, ReviewCard};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Invalid rating: {0:?} (expected again, hard, good, easy or 1-4)")]
    InvalidRating(String),

    #[error("Invalid card state for {exercise_id}: {reason}")]
    InvalidCard { exercise_id: String, reason: String },

    #[error("Invalid scheduler config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Scale of the exponential forgetting curve
pub const DECAY_SCALE: f64 = 9.0;

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Floor for stability after a lapse, so repeated failures stay reviewable
pub const MIN_STABILITY: f64 = 0.01;

/// Upper bound accepted for `maximum_interval_days` (about a century)
pub const MAX_INTERVAL_DAYS: f64 = 36_500.0;

/// Log-scale base of the stability gain after a successful recall
const GROWTH_BASE: f64 = 1.4;
/// Larger stabilities grow proportionally less
const STABILITY_DAMPING: f64 = 0.12;

/// Stability and difficulty assigned by the very first rating
fn initial_state(rating: Rating) -> (f64, f64) {
    match rating {
        Rating::Again => (0.4, 7.0),
        Rating::Hard => (1.2, 6.0),
        Rating::Good => (2.5, 5.0),
        Rating::Easy => (6.0, 3.5),
    }
}

/// Elapsed days between the last review and `now`, never negative.
///
/// Device clocks are not trusted, so a `now` before the last review counts as
/// no time elapsed.
pub fn elapsed_days(last_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match last_review {
        Some(last) => {
            let millis = (now - last).num_milliseconds().max(0);
            millis as f64 / 86_400_000.0
        }
        None => 0.0,
    }
}

/// Predicted probability of recall after `elapsed_days`
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    (-elapsed_days.max(0.0) / (stability * DECAY_SCALE)).exp()
}

/// Days until recall decays to `desired_retention`, clamped to `[1, maximum]`
pub fn interval_for_stability(stability: f64, desired_retention: f64, maximum: f64) -> f64 {
    let days = -DECAY_SCALE * stability * desired_retention.ln();
    days.clamp(1.0, maximum.max(1.0))
}

/// Move difficulty by a rating-dependent step, shrinking the step as the
/// value approaches the bound it is moving towards
fn next_difficulty(difficulty: f64, rating: Rating) -> f64 {
    let step = match rating {
        Rating::Again => 2.0,
        Rating::Hard => 0.6,
        Rating::Good => -0.3,
        Rating::Easy => -1.5,
    };
    let span = MAX_DIFFICULTY - MIN_DIFFICULTY;
    let room = if step > 0.0 {
        (MAX_DIFFICULTY - difficulty) / span
    } else {
        (difficulty - MIN_DIFFICULTY) / span
    };
    (difficulty + step * room).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Stability after a successful recall. The gain grows with `1 - R`, so a
/// review close to forgetting strengthens memory more than an early one.
fn recall_stability(
    stability: f64,
    difficulty: f64,
    retrievability: f64,
    rating: Rating,
    config: &SchedulerConfig,
) -> f64 {
    let modifier = match rating {
        Rating::Hard => config.hard_penalty,
        Rating::Easy => config.easy_bonus,
        _ => 1.0,
    };
    let gain = GROWTH_BASE.exp()
        * (11.0 - difficulty)
        * stability.powf(-STABILITY_DAMPING)
        * ((1.0 - retrievability).exp() - 1.0)
        * modifier;
    stability * (1.0 + gain.max(0.0))
}

/// Stability after a lapse: between 20% and 50% of the previous value
fn lapse_stability(stability: f64, retrievability: f64) -> f64 {
    (stability * (0.2 + 0.3 * retrievability)).max(MIN_STABILITY)
}

/// Pure scheduler: the output depends only on the card, rating, time and config
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Apply a rating to a card and return the updated card
    pub fn review(&self, card: &ReviewCard, rating: Rating, now: DateTime<Utc>) -> Result<ReviewCard> {
        validate_card(card)?;

        let elapsed = elapsed_days(card.last_review, now);
        let mut next = card.clone();
        next.elapsed_days = elapsed;
        next.reps = card.reps.saturating_add(1);

        if card.state == CardStatus::New {
            let (stability, difficulty) = initial_state(rating);
            next.stability = stability;
            next.difficulty = difficulty;
            next.state = CardStatus::Learning;
        } else {
            let recall = retrievability(elapsed, card.stability);
            next.difficulty = next_difficulty(card.difficulty, rating);

            if rating.is_recall() {
                next.stability =
                    recall_stability(card.stability, card.difficulty, recall, rating, &self.config);
                next.state = match card.state {
                    CardStatus::Learning if next.reps > self.config.graduation_reps => {
                        CardStatus::Review
                    }
                    CardStatus::Learning => CardStatus::Learning,
                    _ => CardStatus::Review,
                };
            } else {
                next.stability = lapse_stability(card.stability, recall);
                next.lapses = card.lapses.saturating_add(1);
                next.state = CardStatus::Relearning;
            }
        }

        next.scheduled_days = self.scheduled_days(&next, rating);
        // Anchor on the later of `now` and the previous review so a skewed
        // clock can never move the due date before the last review.
        let anchor = card.last_review.map_or(now, |last| last.max(now));
        next.last_review = Some(anchor);
        next.due = due_after(anchor, next.scheduled_days).ok_or_else(|| SchedulerError::InvalidCard {
            exercise_id: card.exercise_id.clone(),
            reason: "next due date is out of range".to_string(),
        })?;

        log::debug!(
            "Reviewed {} with {}: {} -> {}, stability {:.2} -> {:.2}, next in {}",
            card.exercise_id,
            rating,
            card.state,
            next.state,
            card.stability,
            next.stability,
            format_interval(next.scheduled_days)
        );

        Ok(next)
    }

    /// Interval each rating would produce, in `Rating::ALL` order
    pub fn preview(&self, card: &ReviewCard, now: DateTime<Utc>) -> Result<[f64; 4]> {
        let mut intervals = [0.0; 4];
        for (slot, rating) in intervals.iter_mut().zip(Rating::ALL) {
            *slot = self.review(card, rating, now)?.scheduled_days;
        }
        Ok(intervals)
    }

    fn scheduled_days(&self, next: &ReviewCard, rating: Rating) -> f64 {
        if rating == Rating::Again {
            return self.config.relearning_minutes / (24.0 * 60.0);
        }
        match next.state {
            CardStatus::Learning => {
                let factor = match rating {
                    Rating::Hard => 0.5,
                    Rating::Easy => 2.0,
                    _ => 1.0,
                };
                self.config.learning_step_days * factor
            }
            _ => interval_for_stability(
                next.stability,
                self.config.desired_retention,
                self.config.maximum_interval_days,
            ),
        }
    }
}

fn due_after(anchor: DateTime<Utc>, days: f64) -> Option<DateTime<Utc>> {
    let offset = Duration::try_milliseconds((days * 86_400_000.0).round() as i64)?;
    anchor.checked_add_signed(offset)
}

fn validate_config(config: &SchedulerConfig) -> Result<()> {
    let fail = |reason: &str| Err(SchedulerError::InvalidConfig(reason.to_string()));

    if !(config.desired_retention > 0.0 && config.desired_retention < 1.0) {
        return fail("desired_retention must be between 0 and 1");
    }
    if !(config.learning_step_days > 0.0) {
        return fail("learning_step_days must be positive");
    }
    if !(config.relearning_minutes > 0.0) {
        return fail("relearning_minutes must be positive");
    }
    if !(config.maximum_interval_days >= 1.0 && config.maximum_interval_days <= MAX_INTERVAL_DAYS) {
        return fail("maximum_interval_days must be between 1 and 36500");
    }
    if config.learning_step_days > MAX_INTERVAL_DAYS || config.relearning_minutes > MAX_INTERVAL_DAYS * 1440.0 {
        return fail("learning steps must not exceed 36500 days");
    }
    if !(config.easy_bonus >= 1.0) || !(config.hard_penalty > 0.0 && config.hard_penalty <= 1.0) {
        return fail("easy_bonus must be >= 1 and hard_penalty within (0, 1]");
    }
    Ok(())
}

/// Check that a card satisfies the invariants the review flow maintains
pub(crate) fn validate_card(card: &ReviewCard) -> Result<()> {
    let invalid = |reason: &str| {
        Err(SchedulerError::InvalidCard {
            exercise_id: card.exercise_id.clone(),
            reason: reason.to_string(),
        })
    };

    if !card.stability.is_finite() || card.stability < 0.0 {
        return invalid("stability must be a finite, non-negative number");
    }
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&card.difficulty) {
        return invalid("difficulty must be between 1 and 10");
    }
    if card.state == CardStatus::New && card.reps > 0 {
        return invalid("a new card cannot have reviews");
    }
    if card.state != CardStatus::New && card.stability <= 0.0 {
        return invalid("a reviewed card must have positive stability");
    }
    Ok(())
}

/// Format an interval in days to a compact human-readable string
pub fn format_interval(days: f64) -> String {
    let minutes = (days * 24.0 * 60.0).round() as i64;
    if minutes < 60 {
        format!("{}m", minutes.max(1))
    } else if minutes < 24 * 60 {
        format!("{}h", minutes / 60)
    } else {
        let days = days.round() as i64;
        if days < 7 {
            format!("{}d", days)
        } else if days < 30 {
            format!("{}w", days / 7)
        } else if days < 365 {
            format!("{}mo", days / 30)
        } else {
            format!("{}y", days / 365)
        }
    }
}
