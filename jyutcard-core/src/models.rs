use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type CardId = Uuid;

pub const PROFICIENCY_MIN: u8 = 1;
pub const PROFICIENCY_MAX: u8 = 5;

/// Self-reported recall strength, 1 (hardest) to 5 (easiest).
///
/// Every constructor clamps into range, including deserialization, so a
/// value read from a store that holds e.g. `7` comes back as `5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Proficiency(u8);

impl Proficiency {
    pub const MIN: Proficiency = Proficiency(PROFICIENCY_MIN);
    pub const MAX: Proficiency = Proficiency(PROFICIENCY_MAX);

    pub fn clamped(level: i64) -> Self {
        Self(level.clamp(PROFICIENCY_MIN as i64, PROFICIENCY_MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Shift by `delta`, saturating at both ends of the range.
    pub fn shifted(self, delta: i32) -> Self {
        Self::clamped((self.0 as i64).saturating_add(delta as i64))
    }
}

impl Default for Proficiency {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<i64> for Proficiency {
    fn from(level: i64) -> Self {
        Self::clamped(level)
    }
}

impl From<Proficiency> for i64 {
    fn from(p: Proficiency) -> Self {
        p.0 as i64
    }
}

impl fmt::Display for Proficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recall quality offered by the review front ends.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Recall {
    Difficult,
    Same,
    Easy,
}

impl Recall {
    pub fn delta(&self) -> i32 {
        match self {
            Recall::Difficult => -1,
            Recall::Same => 0,
            Recall::Easy => 1,
        }
    }
}

impl FromStr for Recall {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "d" | "difficult" | "hard" => Ok(Recall::Difficult),
            "2" | "s" | "same" => Ok(Recall::Same),
            "3" | "e" | "easy" => Ok(Recall::Easy),
            _ => Err(crate::CoreError::Invalid("recall")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabCard {
    pub id: CardId,
    pub english: String,
    pub cantonese: String,
    pub jyutping: String,
    pub proficiency_level: Proficiency,
    pub next_review_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VocabCard {
    /// A fresh card at the lowest proficiency, due immediately.
    pub fn new(
        english: impl Into<String>,
        cantonese: impl Into<String>,
        jyutping: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            english: english.into(),
            cantonese: cantonese.into(),
            jyutping: jyutping.into(),
            proficiency_level: Proficiency::default(),
            next_review_time: now,
            created_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_time <= now
    }
}

/// The state a review produces and a repository persists.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewUpdate {
    pub id: CardId,
    pub proficiency_level: Proficiency,
    pub next_review_time: DateTime<Utc>,
}
