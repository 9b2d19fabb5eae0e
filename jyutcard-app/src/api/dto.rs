use chrono::{DateTime, Utc};
use jyutcard_core::{Recall, ReviewUpdate, VocabCard};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
pub struct CardOut {
    pub id: Uuid,
    pub english: String,
    pub cantonese: String,
    pub jyutping: String,
    pub proficiency_level: u8,
    pub next_review_time: DateTime<Utc>,
}

impl From<VocabCard> for CardOut {
    fn from(c: VocabCard) -> Self {
        Self {
            id: c.id,
            english: c.english,
            cantonese: c.cantonese,
            jyutping: c.jyutping,
            proficiency_level: c.proficiency_level.get(),
            next_review_time: c.next_review_time,
        }
    }
}

#[derive(Deserialize)]
pub struct CardIn {
    pub english: String,
    pub cantonese: String,
    pub jyutping: String,
    pub proficiency_level: Option<i64>,
}

/// Either a raw `delta` or a named `recall` ("difficult", "same", "easy").
#[derive(Deserialize)]
pub struct ReviewIn {
    pub card_id: Uuid,
    pub delta: Option<i32>,
    pub recall: Option<String>,
}

impl ReviewIn {
    pub fn delta(&self) -> Option<i32> {
        match (self.delta, &self.recall) {
            (Some(d), None) => Some(d),
            (None, Some(r)) => r.parse::<Recall>().ok().map(|r| r.delta()),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ReviewOut {
    pub id: Uuid,
    pub proficiency_level: u8,
    pub next_review_time: DateTime<Utc>,
}

impl From<ReviewUpdate> for ReviewOut {
    fn from(u: ReviewUpdate) -> Self {
        Self {
            id: u.id,
            proficiency_level: u.proficiency_level.get(),
            next_review_time: u.next_review_time,
        }
    }
}
