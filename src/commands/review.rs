use chrono::Utc;

use crate::review::{Rating, ReviewCard, ReviewStats};
use crate::AppState;

use super::progress::{lock_engine, CommandResult};

/// Cards due now, most overdue first
pub fn get_due_cards(state: &AppState) -> CommandResult<Vec<ReviewCard>> {
    let engine = lock_engine(state)?;
    engine.due_cards(Utc::now()).map_err(Into::into)
}

/// Grade a review. `rating` is a name or the UI's 1-4 button number.
pub fn review_exercise(
    state: &AppState,
    exercise_id: String,
    rating: String,
) -> CommandResult<ReviewCard> {
    let rating: Rating = rating.parse()?;
    let mut engine = lock_engine(state)?;
    engine
        .review_exercise(&exercise_id, rating, Utc::now())
        .map_err(Into::into)
}

/// Store a card scheduled by the UI
pub fn upsert_review_card(state: &AppState, card: ReviewCard) -> CommandResult<()> {
    let mut engine = lock_engine(state)?;
    engine.upsert_review_card(&card).map_err(Into::into)
}

pub fn get_review_stats(state: &AppState) -> CommandResult<ReviewStats> {
    let engine = lock_engine(state)?;
    engine.review_stats(Utc::now()).map_err(Into::into)
}
