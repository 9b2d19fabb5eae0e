use crate::{CardId, CoreError, ReviewUpdate, VocabCard};
use async_trait::async_trait;

pub mod memory;

#[async_trait]
pub trait CardRepository: Send + Sync {
    // Scheduling boundary
    async fn fetch_all(&self) -> Result<Vec<VocabCard>, CoreError>;
    async fn persist(&self, update: &ReviewUpdate) -> Result<(), CoreError>;

    // Card management
    async fn insert_card(&self, card: &VocabCard) -> Result<VocabCard, CoreError>;
    async fn get_card(&self, id: CardId) -> Result<VocabCard, CoreError>;
    async fn delete_card(&self, id: CardId) -> Result<(), CoreError>;
}
