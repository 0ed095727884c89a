//! Coach notes (private) and athlete updates (shared). Both are newest-first
//! lists addressed by position.

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::client_key;
use crate::db::AppState;
use crate::error::AppError;
use crate::models::{AthleteUpdate, CoachNote};

#[derive(Debug, Deserialize)]
pub struct JournalEntryRequest {
  pub title: String,
  #[serde(default)]
  pub content: String,
  /// Display date; defaults to today, e.g. "Oct 19, 2026"
  pub date: Option<String>,
}

impl JournalEntryRequest {
  /// Title required; date filled in
  fn into_parts(self) -> Result<(String, String, String), AppError> {
    let title = self.title.trim().to_string();
    if title.is_empty() {
      return Err(AppError::BadRequest("Title required".into()));
    }
    let date = self
      .date
      .filter(|d| !d.trim().is_empty())
      .unwrap_or_else(|| Utc::now().format("%b %-d, %Y").to_string());
    Ok((title, self.content, date))
  }
}

/// ---------------------------------------------------------------------------
/// Coach Notes
/// ---------------------------------------------------------------------------

pub async fn list_notes(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<Json<Vec<CoachNote>>, AppError> {
  let key = client_key(&email)?;
  Ok(Json(state.store.list_notes(&key).await?))
}

pub async fn add_note(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Json(body): Json<JournalEntryRequest>,
) -> Result<(StatusCode, Json<Vec<CoachNote>>), AppError> {
  let key = client_key(&email)?;
  let (title, content, date) = body.into_parts()?;

  state
    .store
    .add_note(&key, &CoachNote { title, content, date })
    .await?;
  info!(client = %key, "Added coach note");

  Ok((StatusCode::CREATED, Json(state.store.list_notes(&key).await?)))
}

pub async fn delete_note(
  State(state): State<Arc<AppState>>,
  Path((email, index)): Path<(String, usize)>,
) -> Result<StatusCode, AppError> {
  let key = client_key(&email)?;
  state.store.delete_note(&key, index).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// ---------------------------------------------------------------------------
/// Athlete Updates
/// ---------------------------------------------------------------------------

pub async fn list_updates(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<Json<Vec<AthleteUpdate>>, AppError> {
  let key = client_key(&email)?;
  Ok(Json(state.store.list_updates(&key).await?))
}

pub async fn add_update(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Json(body): Json<JournalEntryRequest>,
) -> Result<(StatusCode, Json<Vec<AthleteUpdate>>), AppError> {
  let key = client_key(&email)?;
  let (title, content, date) = body.into_parts()?;

  state
    .store
    .add_update(&key, &AthleteUpdate { title, content, date })
    .await?;
  info!(client = %key, "Posted athlete update");

  Ok((StatusCode::CREATED, Json(state.store.list_updates(&key).await?)))
}

pub async fn delete_update(
  State(state): State<Arc<AppState>>,
  Path((email, index)): Path<(String, usize)>,
) -> Result<StatusCode, AppError> {
  let key = client_key(&email)?;
  state.store.delete_update(&key, index).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::StoreError;
  use crate::test_utils::setup_test_state;

  fn entry(title: &str, date: Option<&str>) -> JournalEntryRequest {
    JournalEntryRequest {
      title: title.into(),
      content: "Felt strong on the hills".into(),
      date: date.map(String::from),
    }
  }

  #[tokio::test]
  async fn test_add_note_returns_newest_first() {
    let state = setup_test_state("http://localhost").await;
    let path = || Path("a@b.com".to_string());

    add_note(State(state.clone()), path(), Json(entry("Week 1", Some("Oct 5, 2026"))))
      .await
      .unwrap();
    let (status, Json(notes)) = add_note(State(state.clone()), path(), Json(entry("Week 2", None)))
      .await
      .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(notes[0].title, "Week 2");
    assert!(!notes[0].date.is_empty());
    assert_eq!(notes[1].date, "Oct 5, 2026");

    // updates are a separate list
    let Json(updates) = list_updates(State(state), path()).await.unwrap();
    assert!(updates.is_empty());
  }

  #[tokio::test]
  async fn test_blank_title_rejected() {
    let state = setup_test_state("http://localhost").await;
    let err = add_update(State(state), Path("a@b.com".into()), Json(entry("  ", None)))
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
  }

  #[tokio::test]
  async fn test_delete_update_out_of_range() {
    let state = setup_test_state("http://localhost").await;
    add_update(State(state.clone()), Path("a@b.com".into()), Json(entry("Race recap", None)))
      .await
      .unwrap();

    let err = delete_update(State(state.clone()), Path(("a@b.com".into(), 3)))
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::Store(StoreError::NotFound(_))));

    delete_update(State(state.clone()), Path(("a@b.com".into(), 0)))
      .await
      .unwrap();
    let Json(updates) = list_updates(State(state), Path("a@b.com".into())).await.unwrap();
    assert!(updates.is_empty());
  }
}
