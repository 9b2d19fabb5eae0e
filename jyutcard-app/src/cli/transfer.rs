use chrono::{DateTime, Utc};
use jyutcard_core::{Proficiency, VocabCard};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BUNDLE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: u32,
    pub cards: Vec<VocabCard>,
}

/// One CSV line. Empty level or time columns mean "new card".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CsvRow {
    pub english: String,
    pub cantonese: String,
    pub jyutping: String,
    pub proficiency_level: Option<i64>,
    pub next_review_time: Option<DateTime<Utc>>,
}

impl From<&VocabCard> for CsvRow {
    fn from(c: &VocabCard) -> Self {
        Self {
            english: c.english.clone(),
            cantonese: c.cantonese.clone(),
            jyutping: c.jyutping.clone(),
            proficiency_level: Some(c.proficiency_level.into()),
            next_review_time: Some(c.next_review_time),
        }
    }
}

impl CsvRow {
    pub fn into_card(self) -> VocabCard {
        let mut card = VocabCard::new(self.english, self.cantonese, self.jyutping);
        if let Some(p) = self.proficiency_level {
            card.proficiency_level = Proficiency::clamped(p);
        }
        if let Some(t) = self.next_review_time {
            card.next_review_time = t;
        }
        card
    }
}

/// Imported cards get fresh ids so re-importing an export never collides.
pub fn reissue(card: VocabCard) -> VocabCard {
    VocabCard {
        id: Uuid::new_v4(),
        ..card
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn csv_row_defaults_to_new_card() {
        let data = "english,cantonese,jyutping,proficiency_level,next_review_time\n\
                    hello,你好,nei5 hou2,,\n\
                    bye,拜拜,baai1 baai3,7,2024-01-02T03:04:05Z\n";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<CsvRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();

        let fresh = rows[0].clone().into_card();
        assert_eq!(fresh.proficiency_level, Proficiency::MIN);
        assert_eq!(fresh.next_review_time, fresh.created_at);

        let known = rows[1].clone().into_card();
        assert_eq!(known.proficiency_level, Proficiency::MAX);
        assert_eq!(
            known.next_review_time,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
    }

    #[test]
    fn csv_export_reads_back() {
        let card = VocabCard::new("water", "水", "seoi2");
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.serialize(CsvRow::from(&card)).unwrap();
        let bytes = wtr.into_inner().unwrap();

        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let row: CsvRow = rdr.deserialize().next().unwrap().unwrap();
        let back = row.into_card();
        assert_ne!(back.id, card.id);
        assert_eq!(back.cantonese, "水");
        assert_eq!(back.next_review_time, card.next_review_time);
    }

    #[test]
    fn reissue_keeps_schedule() {
        let card = VocabCard::new("a", "一", "jat1");
        let again = reissue(card.clone());
        assert_ne!(again.id, card.id);
        assert_eq!(again.next_review_time, card.next_review_time);
        assert_eq!(again.proficiency_level, card.proficiency_level);
    }
}
