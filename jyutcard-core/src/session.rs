use crate::{CardRepository, CoreError, ReviewUpdate, Scheduler, SessionError, VocabCard};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a review front end currently is.
///
/// Transitions are plain functions of the previous state and the result
/// of a repository call, so every front end shares the same rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ReviewState {
    #[default]
    Loading,
    Ready {
        queue: Vec<VocabCard>,
        index: usize,
    },
    Empty,
    Error(String),
}

impl ReviewState {
    pub fn from_queue(queue: Vec<VocabCard>) -> Self {
        if queue.is_empty() {
            ReviewState::Empty
        } else {
            ReviewState::Ready { queue, index: 0 }
        }
    }

    /// A failed fetch becomes `Error`, never `Empty`.
    pub fn from_snapshot(
        snapshot: Result<Vec<VocabCard>, CoreError>,
        scheduler: &Scheduler,
        now: DateTime<Utc>,
    ) -> Self {
        match snapshot {
            Ok(cards) => Self::from_queue(scheduler.due_queue(&cards, now)),
            Err(e) => Self::failed(SessionError::SnapshotUnavailable(e)),
        }
    }

    pub fn failed(reason: impl ToString) -> Self {
        ReviewState::Error(reason.to_string())
    }

    pub fn current(&self) -> Option<&VocabCard> {
        match self {
            ReviewState::Ready { queue, index } => queue.get(*index),
            _ => None,
        }
    }

    /// 1-based position and queue length while `Ready`.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            ReviewState::Ready { queue, index } => Some((index + 1, queue.len())),
            _ => None,
        }
    }

    /// Move to the next card without reviewing, wrapping at the end.
    pub fn skip(self) -> Self {
        match self {
            ReviewState::Ready { queue, index } => {
                let index = if index + 1 < queue.len() { index + 1 } else { 0 };
                ReviewState::Ready { queue, index }
            }
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewState::Empty | ReviewState::Error(_))
    }
}

pub async fn load_due_queue<R: CardRepository + ?Sized>(
    repo: &R,
    scheduler: &Scheduler,
    now: DateTime<Utc>,
) -> Result<Vec<VocabCard>, SessionError> {
    let snapshot = repo
        .fetch_all()
        .await
        .map_err(SessionError::SnapshotUnavailable)?;
    let queue = scheduler.due_queue(&snapshot, now);
    debug!(total = snapshot.len(), due = queue.len(), "due queue computed");
    Ok(queue)
}

/// Apply the review rule and write the result. Re-deriving the queue is
/// left to the caller.
pub async fn submit_review<R: CardRepository + ?Sized>(
    repo: &R,
    scheduler: &Scheduler,
    card: &VocabCard,
    delta: i32,
    now: DateTime<Utc>,
) -> Result<ReviewUpdate, SessionError> {
    let update = scheduler.apply_review(card, delta, now);
    debug!(
        card = %card.id,
        delta,
        from = %card.proficiency_level,
        to = %update.proficiency_level,
        "review applied"
    );
    persist_update(repo, update).await
}

/// Write an already computed update, e.g. one carried by `NotSaved`.
pub async fn persist_update<R: CardRepository + ?Sized>(
    repo: &R,
    update: ReviewUpdate,
) -> Result<ReviewUpdate, SessionError> {
    match repo.persist(&update).await {
        Ok(()) => Ok(update),
        Err(source) => {
            warn!(card = %update.id, error = %source, "review not saved");
            Err(SessionError::NotSaved { update, source })
        }
    }
}

/// A repository, a scheduler and the state of one review run.
pub struct ReviewSession {
    repo: Arc<dyn CardRepository>,
    scheduler: Scheduler,
    state: ReviewState,
}

impl ReviewSession {
    pub fn new(repo: Arc<dyn CardRepository>, scheduler: Scheduler) -> Self {
        Self {
            repo,
            scheduler,
            state: ReviewState::Loading,
        }
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Fetch a fresh snapshot and rebuild the queue from it.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> &ReviewState {
        self.state = ReviewState::Loading;
        let snapshot = self.repo.fetch_all().await;
        self.state = ReviewState::from_snapshot(snapshot, &self.scheduler, now);
        &self.state
    }

    /// Review the displayed card. `Ok(None)` when nothing is displayed.
    ///
    /// The queue is not touched on success; call `refresh` afterwards.
    pub async fn review(
        &mut self,
        delta: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ReviewUpdate>, SessionError> {
        let Some(card) = self.state.current().cloned() else {
            return Ok(None);
        };
        match submit_review(&*self.repo, &self.scheduler, &card, delta, now).await {
            Ok(update) => Ok(Some(update)),
            Err(e) => {
                self.state = ReviewState::failed(&e);
                Err(e)
            }
        }
    }

    pub async fn retry(&mut self, update: ReviewUpdate) -> Result<ReviewUpdate, SessionError> {
        persist_update(&*self.repo, update).await
    }

    pub fn skip(&mut self) {
        self.state = std::mem::take(&mut self.state).skip();
    }
}
