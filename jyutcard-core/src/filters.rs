use crate::{Proficiency, VocabCard};

/// Case-insensitive substring match on any of the three display fields.
pub fn filter_by_text(cards: &[VocabCard], query: &str) -> Vec<VocabCard> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return cards.to_vec();
    }
    cards
        .iter()
        .filter(|c| {
            c.english.to_lowercase().contains(&q)
                || c.cantonese.contains(query.trim())
                || c.jyutping.to_lowercase().contains(&q)
        })
        .cloned()
        .collect()
}

pub fn filter_by_proficiency(cards: &[VocabCard], level: Proficiency) -> Vec<VocabCard> {
    cards
        .iter()
        .filter(|c| c.proficiency_level == level)
        .cloned()
        .collect()
}
