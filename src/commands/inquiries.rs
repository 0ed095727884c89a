use axum::{
  extract::{Query, State},
  Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::AppState;
use crate::error::AppError;
use crate::models::{Inquiry, InquiryPatch, InquiryStatus, StatusCounts};
use crate::portal::{filter_by_status, PortalClient};

#[derive(Debug, Deserialize)]
pub struct InquiriesQuery {
  pub status: Option<InquiryStatus>,
}

#[derive(Debug, Serialize)]
pub struct InquiryList {
  pub inquiries: Vec<Inquiry>,
  /// Always counted over every inquiry, not just the filtered ones
  pub counts: StatusCounts,
}

pub async fn list_inquiries(
  State(state): State<Arc<AppState>>,
  Query(query): Query<InquiriesQuery>,
) -> Result<Json<InquiryList>, AppError> {
  let portal = PortalClient::from_config(&state.config)?;
  let all = portal.list_inquiries().await?;
  let counts = StatusCounts::tally(&all);

  Ok(Json(InquiryList {
    inquiries: filter_by_status(all, query.status),
    counts,
  }))
}

pub async fn update_inquiry(
  State(state): State<Arc<AppState>>,
  Json(patch): Json<InquiryPatch>,
) -> Result<Json<Inquiry>, AppError> {
  if patch.id.trim().is_empty() {
    return Err(AppError::BadRequest("Inquiry id required".into()));
  }

  let portal = PortalClient::from_config(&state.config)?;
  let updated = portal.update_inquiry(&patch).await?;
  info!(inquiry = %updated.id, status = ?updated.status, "Updated inquiry");
  Ok(Json(updated))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::setup_test_state;

  const INQUIRIES: &str = r#"[
    {"id":"1","createdAt":"2026-10-01T10:00:00Z","status":"new","name":"Ana","email":"ana@x.com"},
    {"id":"2","createdAt":"2026-10-02T10:00:00Z","status":"contacted","name":"Ben","email":"ben@x.com"},
    {"id":"3","createdAt":"2026-10-03T10:00:00Z","status":"new","name":"Cy","email":"cy@x.com"}
  ]"#;

  #[tokio::test]
  async fn test_filtered_list_keeps_full_counts() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/api/inquiries")
      .match_header("x-api-key", "portal-key")
      .with_status(200)
      .with_body(INQUIRIES)
      .create_async()
      .await;

    let state = setup_test_state(&server.url()).await;
    let query = InquiriesQuery {
      status: Some(InquiryStatus::Contacted),
    };
    let Json(list) = list_inquiries(State(state), Query(query)).await.unwrap();

    assert_eq!(list.inquiries.len(), 1);
    assert_eq!(list.inquiries[0].name, "Ben");
    assert_eq!(list.counts.all, 3);
    assert_eq!(list.counts.new, 2);
  }

  #[tokio::test]
  async fn test_update_requires_id() {
    let state = setup_test_state("http://localhost").await;
    let err = update_inquiry(State(state), Json(InquiryPatch::default()))
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
  }

  #[tokio::test]
  async fn test_update_returns_portal_copy() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("PATCH", "/api/inquiries")
      .with_status(200)
      .with_body(
        r#"{"id":"2","createdAt":"2026-10-02T10:00:00Z","status":"onboarded","name":"Ben","email":"ben@x.com","coachNotes":"Starts Monday"}"#,
      )
      .create_async()
      .await;

    let state = setup_test_state(&server.url()).await;
    let patch = InquiryPatch {
      id: "2".into(),
      status: Some(InquiryStatus::Onboarded),
      coach_notes: Some("Starts Monday".into()),
    };
    let Json(updated) = update_inquiry(State(state), Json(patch)).await.unwrap();
    assert_eq!(updated.status, InquiryStatus::Onboarded);
    assert_eq!(updated.coach_notes, "Starts Monday");
  }
}
