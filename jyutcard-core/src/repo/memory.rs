use crate::{CardId, CoreError, ReviewUpdate, VocabCard};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryRepo {
    cards: RwLock<HashMap<CardId, VocabCard>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: impl IntoIterator<Item = VocabCard>) -> Self {
        let map = cards.into_iter().map(|c| (c.id, c)).collect();
        Self {
            cards: RwLock::new(map),
        }
    }
}

#[async_trait]
impl crate::repo::CardRepository for MemoryRepo {
    async fn fetch_all(&self) -> Result<Vec<VocabCard>, CoreError> {
        let mut v: Vec<VocabCard> = self.cards.read().values().cloned().collect();
        v.sort_by_key(|c| (c.created_at, c.id));
        Ok(v)
    }

    async fn persist(&self, update: &ReviewUpdate) -> Result<(), CoreError> {
        let mut m = self.cards.write();
        let Some(card) = m.get_mut(&update.id) else {
            return Err(CoreError::NotFound("card"));
        };
        card.proficiency_level = update.proficiency_level;
        card.next_review_time = update.next_review_time;
        Ok(())
    }

    async fn insert_card(&self, card: &VocabCard) -> Result<VocabCard, CoreError> {
        let mut m = self.cards.write();
        if m.contains_key(&card.id) {
            return Err(CoreError::Conflict("card id already exists"));
        }
        m.insert(card.id, card.clone());
        Ok(card.clone())
    }

    async fn get_card(&self, id: CardId) -> Result<VocabCard, CoreError> {
        self.cards
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("card"))
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        self.cards
            .write()
            .remove(&id)
            .ok_or(CoreError::NotFound("card"))?;
        Ok(())
    }
}
