use crate::{Proficiency, VocabCard, PROFICIENCY_MAX, PROFICIENCY_MIN};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct StatsSummary {
    pub total: u32,
    pub due: u32,
    /// Card count per proficiency level, index 0 is level 1.
    pub per_level: [u32; PROFICIENCY_MAX as usize],
    pub next_due_at: Option<DateTime<Utc>>,
}

impl StatsSummary {
    pub fn count_at(&self, level: Proficiency) -> u32 {
        self.per_level[(level.get() - PROFICIENCY_MIN) as usize]
    }

    pub fn mean_proficiency(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: u32 = self
            .per_level
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u32 + PROFICIENCY_MIN as u32) * n)
            .sum();
        sum as f32 / self.total as f32
    }
}

pub fn summarize(cards: &[VocabCard], now: DateTime<Utc>) -> StatsSummary {
    let mut s = StatsSummary::default();
    for c in cards {
        s.total += 1;
        if c.is_due(now) {
            s.due += 1;
        }
        s.per_level[(c.proficiency_level.get() - PROFICIENCY_MIN) as usize] += 1;
    }
    s.next_due_at = crate::next_due_after(cards, now);
    s
}
