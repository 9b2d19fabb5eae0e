use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::routes::{create_card, due_cards, list_cards, post_review, stats, AppState};
use jyutcard_core::{CardRepository, Scheduler};

pub fn router(repo: Arc<dyn CardRepository>, scheduler: Scheduler) -> Router {
    let state = Arc::new(AppState { repo, scheduler });

    Router::new()
        .route("/cards", get(list_cards).post(create_card))
        .route("/due", get(due_cards))
        .route("/review", post(post_review))
        .route("/stats", get(stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(
    repo: Arc<dyn CardRepository>,
    scheduler: Scheduler,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let app = router(repo, scheduler);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "api listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dto::{CardOut, ReviewOut};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use jyutcard_core::{memory::MemoryRepo, VocabCard};
    use tower::ServiceExt;

    fn seeded() -> (Arc<MemoryRepo>, VocabCard, VocabCard) {
        let now = Utc::now();
        let mut due = VocabCard::new("dog", "狗", "gau2");
        due.next_review_time = now - Duration::hours(1);
        let mut later = VocabCard::new("cat", "貓", "maau1");
        later.next_review_time = now + Duration::hours(1);
        let repo = Arc::new(MemoryRepo::with_cards([due.clone(), later.clone()]));
        (repo, due, later)
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn due_lists_only_due_cards() {
        let (repo, due, _) = seeded();
        let app = router(repo, Scheduler::default());
        let (status, body) = call(app, Request::get("/due").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let cards: Vec<CardOut> = serde_json::from_slice(&body).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, due.id);
    }

    #[tokio::test]
    async fn review_reschedules_and_clears_queue() {
        let (repo, due, _) = seeded();
        let app = router(repo.clone(), Scheduler::default());

        let before = Utc::now();
        let body = format!(r#"{{"card_id":"{}","recall":"easy"}}"#, due.id);
        let (status, body) = call(app.clone(), post_json("/review", &body)).await;
        assert_eq!(status, StatusCode::OK);
        let out: ReviewOut = serde_json::from_slice(&body).unwrap();
        assert_eq!(out.proficiency_level, 2);
        assert!(out.next_review_time >= before + Duration::minutes(90));

        let (_, body) = call(app, Request::get("/due").body(Body::empty()).unwrap()).await;
        let cards: Vec<CardOut> = serde_json::from_slice(&body).unwrap();
        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn review_rejects_bad_input() {
        let (repo, due, _) = seeded();
        let app = router(repo, Scheduler::default());

        let unknown = format!(r#"{{"card_id":"{}","delta":1}}"#, uuid::Uuid::new_v4());
        let (status, _) = call(app.clone(), post_json("/review", &unknown)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let both = format!(r#"{{"card_id":"{}","delta":1,"recall":"easy"}}"#, due.id);
        let (status, _) = call(app.clone(), post_json("/review", &both)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let junk = format!(r#"{{"card_id":"{}","recall":"meh"}}"#, due.id);
        let (status, _) = call(app, post_json("/review", &junk)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_then_list_with_query() {
        let app = router(Arc::new(MemoryRepo::new()), Scheduler::default());
        let (status, _) = call(
            app.clone(),
            post_json(
                "/cards",
                r#"{"english":"good morning","cantonese":"早晨","jyutping":"zou2 san4","proficiency_level":8}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = call(app, Request::get("/cards?q=morning").body(Body::empty()).unwrap()).await;
        let cards: Vec<CardOut> = serde_json::from_slice(&body).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].proficiency_level, 5);
    }
}
