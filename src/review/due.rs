//! Read-only queries for building review sessions

use chrono::{DateTime, Utc};

use crate::storage::{Result, ReviewCardRepository};

use super::models::{CardStatus, ReviewCard, ReviewStats};

pub trait DueReviewQuery: ReviewCardRepository {
    /// Cards whose due time has passed, earliest-overdue first
    fn due_cards(&self, now: DateTime<Utc>) -> Result<Vec<ReviewCard>> {
        let mut cards: Vec<ReviewCard> = self
            .cards_due_by(now)?
            .into_iter()
            .filter(|card| card.is_due(now))
            .collect();
        cards.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.exercise_id.cmp(&b.exercise_id)));
        Ok(cards)
    }

    fn review_stats(&self, now: DateTime<Utc>) -> Result<ReviewStats> {
        let cards = self.list_cards()?;
        let mut stats = ReviewStats {
            total_cards: cards.len(),
            ..ReviewStats::default()
        };

        for card in &cards {
            match card.state {
                CardStatus::New => stats.new_cards += 1,
                CardStatus::Learning => stats.learning_cards += 1,
                CardStatus::Review => stats.review_cards += 1,
                CardStatus::Relearning => stats.relearning_cards += 1,
            }
            if card.is_due(now) {
                stats.due_cards += 1;
            }
            stats.total_lapses += u64::from(card.lapses);
        }

        Ok(stats)
    }
}

impl<T: ReviewCardRepository + ?Sized> DueReviewQuery for T {}
