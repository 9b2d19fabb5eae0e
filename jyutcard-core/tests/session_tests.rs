use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jyutcard_core::{
    load_due_queue, memory::MemoryRepo, persist_update, submit_review, CardId, CardRepository,
    CoreError, Proficiency, ReviewSession, ReviewState, ReviewUpdate, Scheduler, SessionError,
    VocabCard,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn card(english: &str, due: DateTime<Utc>, offset_secs: i64) -> VocabCard {
    let mut c = VocabCard::new(english, "字", "zi6");
    c.next_review_time = due;
    c.created_at = t0() - Duration::days(30) + Duration::seconds(offset_secs);
    c
}

/// Wraps a `MemoryRepo` and fails on demand.
#[derive(Default)]
struct FlakyRepo {
    inner: MemoryRepo,
    fail_fetch: AtomicBool,
    fail_persist: AtomicBool,
}

#[async_trait]
impl CardRepository for FlakyRepo {
    async fn fetch_all(&self) -> Result<Vec<VocabCard>, CoreError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("unreachable"));
        }
        self.inner.fetch_all().await
    }

    async fn persist(&self, update: &ReviewUpdate) -> Result<(), CoreError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("write rejected"));
        }
        self.inner.persist(update).await
    }

    async fn insert_card(&self, card: &VocabCard) -> Result<VocabCard, CoreError> {
        self.inner.insert_card(card).await
    }

    async fn get_card(&self, id: CardId) -> Result<VocabCard, CoreError> {
        self.inner.get_card(id).await
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        self.inner.delete_card(id).await
    }
}

#[test]
fn state_from_snapshot() {
    let s = Scheduler::default();
    let now = t0();
    let due = card("due", now - Duration::minutes(1), 0);
    let later = card("later", now + Duration::minutes(1), 1);

    let st = ReviewState::from_snapshot(Ok(vec![later.clone(), due.clone()]), &s, now);
    assert_eq!(st.current(), Some(&due));
    assert_eq!(st.position(), Some((1, 1)));

    let st = ReviewState::from_snapshot(Ok(vec![later]), &s, now);
    assert_eq!(st, ReviewState::Empty);
    assert!(st.is_terminal());

    let st = ReviewState::from_snapshot(Err(CoreError::Storage("down")), &s, now);
    match st {
        ReviewState::Error(reason) => assert!(reason.contains("cannot determine due cards")),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[test]
fn skip_wraps_and_ignores_other_states() {
    let now = t0();
    let a = card("a", now - Duration::minutes(2), 0);
    let b = card("b", now - Duration::minutes(1), 1);
    let st = ReviewState::from_queue(vec![a.clone(), b.clone()]);

    let st = st.skip();
    assert_eq!(st.current(), Some(&b));
    let st = st.skip();
    assert_eq!(st.current(), Some(&a));

    assert_eq!(ReviewState::Empty.skip(), ReviewState::Empty);
    assert_eq!(ReviewState::Loading.skip(), ReviewState::Loading);
}

#[tokio::test]
async fn fetch_failure_is_not_an_empty_queue() {
    let repo = FlakyRepo::default();
    repo.fail_fetch.store(true, Ordering::SeqCst);
    let err = load_due_queue(&repo, &Scheduler::default(), t0())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::SnapshotUnavailable(_)));
}

#[tokio::test]
async fn submit_then_reload_drops_reviewed_card() {
    let now = t0();
    let a = card("a", now - Duration::hours(2), 0);
    let b = card("b", now - Duration::hours(1), 1);
    let repo = MemoryRepo::with_cards([a.clone(), b.clone()]);
    let s = Scheduler::default();

    let q = load_due_queue(&repo, &s, now).await.unwrap();
    assert_eq!(q.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a.id, b.id]);

    let u = submit_review(&repo, &s, &q[0], 1, now).await.unwrap();
    assert_eq!(u.proficiency_level.get(), 2);
    assert_eq!(repo.get_card(a.id).await.unwrap().next_review_time, now + Duration::minutes(90));

    let q = load_due_queue(&repo, &s, now).await.unwrap();
    assert_eq!(q.len(), 1);
    assert_eq!(q[0].id, b.id);
}

#[tokio::test]
async fn persist_failure_returns_the_computed_update() {
    let now = t0();
    let a = card("a", now - Duration::hours(1), 0);
    let repo = FlakyRepo::default();
    repo.inner.insert_card(&a).await.unwrap();
    repo.fail_persist.store(true, Ordering::SeqCst);

    let err = submit_review(&repo, &Scheduler::default(), &a, 1, now)
        .await
        .unwrap_err();
    let SessionError::NotSaved { update, .. } = err else {
        panic!("expected NotSaved");
    };
    assert_eq!(update.id, a.id);
    assert_eq!(update.proficiency_level, Proficiency::clamped(2));

    repo.fail_persist.store(false, Ordering::SeqCst);
    let saved = persist_update(&repo, update).await.unwrap();
    assert_eq!(saved, update);
    assert_eq!(repo.get_card(a.id).await.unwrap().proficiency_level.get(), 2);
}

#[tokio::test]
async fn persist_unknown_card_is_not_found() {
    let repo = MemoryRepo::new();
    let update = ReviewUpdate {
        id: uuid::Uuid::new_v4(),
        proficiency_level: Proficiency::MIN,
        next_review_time: t0(),
    };
    let err = persist_update(&repo, update).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::NotSaved { source: CoreError::NotFound(_), .. }
    ));
}

#[tokio::test]
async fn session_runs_until_nothing_is_due() {
    let now = t0();
    let cards = vec![
        card("one", now - Duration::minutes(30), 0),
        card("two", now - Duration::minutes(20), 1),
        card("three", now + Duration::minutes(20), 2),
    ];
    let repo = Arc::new(MemoryRepo::with_cards(cards.clone()));
    let mut session = ReviewSession::new(repo.clone(), Scheduler::default());
    assert_eq!(session.state(), &ReviewState::Loading);

    session.refresh(now).await;
    assert_eq!(session.state().position(), Some((1, 2)));

    let mut reviewed = Vec::new();
    while let Some(card) = session.state().current().cloned() {
        let u = session.review(-1, now).await.unwrap().unwrap();
        assert_eq!(u.id, card.id);
        reviewed.push(card.english);
        session.refresh(now).await;
    }

    assert_eq!(reviewed, vec!["one", "two"]);
    assert_eq!(session.state(), &ReviewState::Empty);
    assert_eq!(session.review(0, now).await.unwrap(), None);
}

#[tokio::test]
async fn session_enters_error_on_failed_write_and_can_retry() {
    let now = t0();
    let a = card("a", now - Duration::minutes(5), 0);
    let repo = Arc::new(FlakyRepo::default());
    repo.inner.insert_card(&a).await.unwrap();
    let mut session = ReviewSession::new(repo.clone(), Scheduler::default());
    session.refresh(now).await;

    repo.fail_persist.store(true, Ordering::SeqCst);
    let err = session.review(1, now).await.unwrap_err();
    assert!(matches!(session.state(), ReviewState::Error(r) if r.contains("review not saved")));

    repo.fail_persist.store(false, Ordering::SeqCst);
    let SessionError::NotSaved { update, .. } = err else {
        panic!("expected NotSaved");
    };
    session.retry(update).await.unwrap();
    session.refresh(now).await;
    assert_eq!(session.state(), &ReviewState::Empty);
}
