use crate::{ReviewUpdate, VocabCard};
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_REVIEW_INTERVAL_MINUTES: i64 = 90;

/// Due-queue selection and the review update rule.
///
/// Holds no state besides the review interval, so a single value can be
/// shared freely between callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduler {
    review_interval: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            review_interval: Duration::minutes(DEFAULT_REVIEW_INTERVAL_MINUTES),
        }
    }
}

impl Scheduler {
    pub fn new(review_interval: Duration) -> Self {
        Self { review_interval }
    }

    pub fn with_interval_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    pub fn review_interval(&self) -> Duration {
        self.review_interval
    }

    /// Cards with `next_review_time <= now`, earliest first.
    ///
    /// Ties keep their snapshot order.
    pub fn due_queue(&self, cards: &[VocabCard], now: DateTime<Utc>) -> Vec<VocabCard> {
        let mut due: Vec<VocabCard> = cards.iter().filter(|c| c.is_due(now)).cloned().collect();
        due.sort_by_key(|c| c.next_review_time);
        due
    }

    pub fn due_queue_now(&self, cards: &[VocabCard]) -> Vec<VocabCard> {
        self.due_queue(cards, Utc::now())
    }

    /// Proficiency moves by `delta` (clamped to 1..=5); the card comes back
    /// after the fixed interval counted from `now`, whatever the new level.
    pub fn apply_review(&self, card: &VocabCard, delta: i32, now: DateTime<Utc>) -> ReviewUpdate {
        ReviewUpdate {
            id: card.id,
            proficiency_level: card.proficiency_level.shifted(delta),
            next_review_time: now + self.review_interval,
        }
    }
}

pub fn due_queue(cards: &[VocabCard], now: DateTime<Utc>) -> Vec<VocabCard> {
    Scheduler::default().due_queue(cards, now)
}

pub fn apply_review(card: &VocabCard, delta: i32, now: DateTime<Utc>) -> ReviewUpdate {
    Scheduler::default().apply_review(card, delta, now)
}

/// Earliest review time strictly after `now`, if any card is waiting.
pub fn next_due_after(cards: &[VocabCard], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    cards
        .iter()
        .map(|c| c.next_review_time)
        .filter(|t| *t > now)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Proficiency;

    fn card_due_at(t: DateTime<Utc>) -> VocabCard {
        let mut c = VocabCard::new("water", "水", "seoi2");
        c.next_review_time = t;
        c
    }

    #[test]
    fn custom_interval_is_used() {
        let s = Scheduler::with_interval_minutes(10);
        let now = Utc::now();
        let u = s.apply_review(&card_due_at(now), 0, now);
        assert_eq!(u.next_review_time, now + Duration::minutes(10));
    }

    #[test]
    fn extreme_deltas_saturate() {
        let now = Utc::now();
        let c = card_due_at(now);
        assert_eq!(apply_review(&c, i32::MAX, now).proficiency_level, Proficiency::MAX);
        assert_eq!(apply_review(&c, i32::MIN, now).proficiency_level, Proficiency::MIN);
    }

    #[test]
    fn next_due_after_skips_due_cards() {
        let now = Utc::now();
        let cards = vec![
            card_due_at(now - Duration::hours(1)),
            card_due_at(now + Duration::hours(3)),
            card_due_at(now + Duration::hours(2)),
        ];
        assert_eq!(next_due_after(&cards, now), Some(now + Duration::hours(2)));
        assert_eq!(next_due_after(&cards[..1], now), None);
    }
}
