use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use jyutcard_core::{
    filter_by_text, load_due_queue, submit_review, summarize, CardRepository, CoreError,
    Proficiency, Scheduler, SessionError, StatsSummary, VocabCard,
};

use crate::api::dto::{CardIn, CardOut, ReviewIn, ReviewOut};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn CardRepository>,
    pub scheduler: Scheduler,
}

#[derive(Deserialize)]
pub struct ListQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
pub struct DueQuery {
    max: Option<usize>,
}

fn status_of(e: &CoreError) -> StatusCode {
    match e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn session_status(e: &SessionError) -> StatusCode {
    warn!(error = %e, "request failed at the repository");
    StatusCode::SERVICE_UNAVAILABLE
}

pub async fn list_cards(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<CardOut>>, StatusCode> {
    let mut cards = st.repo.fetch_all().await.map_err(|e| status_of(&e))?;
    if let Some(text) = q.q {
        cards = filter_by_text(&cards, &text);
    }
    Ok(Json(cards.into_iter().map(CardOut::from).collect()))
}

pub async fn create_card(
    State(st): State<Arc<AppState>>,
    Json(body): Json<CardIn>,
) -> Result<(StatusCode, Json<CardOut>), StatusCode> {
    if body.english.trim().is_empty() || body.cantonese.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut card = VocabCard::new(body.english, body.cantonese, body.jyutping);
    if let Some(p) = body.proficiency_level {
        card.proficiency_level = Proficiency::clamped(p);
    }
    let card = st.repo.insert_card(&card).await.map_err(|e| status_of(&e))?;
    Ok((StatusCode::CREATED, Json(card.into())))
}

pub async fn due_cards(
    State(st): State<Arc<AppState>>,
    Query(q): Query<DueQuery>,
) -> Result<Json<Vec<CardOut>>, StatusCode> {
    let mut queue = load_due_queue(&*st.repo, &st.scheduler, Utc::now())
        .await
        .map_err(|e| session_status(&e))?;
    if let Some(m) = q.max {
        queue.truncate(m);
    }
    Ok(Json(queue.into_iter().map(CardOut::from).collect()))
}

pub async fn post_review(
    State(st): State<Arc<AppState>>,
    Json(body): Json<ReviewIn>,
) -> Result<Json<ReviewOut>, StatusCode> {
    let delta = body.delta().ok_or(StatusCode::BAD_REQUEST)?;
    let card = st.repo.get_card(body.card_id).await.map_err(|e| status_of(&e))?;
    let update = submit_review(&*st.repo, &st.scheduler, &card, delta, Utc::now())
        .await
        .map_err(|e| session_status(&e))?;
    Ok(Json(update.into()))
}

pub async fn stats(State(st): State<Arc<AppState>>) -> Result<Json<StatsSummary>, StatusCode> {
    let cards = st.repo.fetch_all().await.map_err(|e| status_of(&e))?;
    Ok(Json(summarize(&cards, Utc::now())))
}
