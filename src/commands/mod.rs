pub mod ai;
pub mod athlete;
pub mod clients;
pub mod inquiries;
pub mod journal;
pub mod schedules;
pub mod strava;

use axum::{
  extract::{Request, State},
  middleware::Next,
  response::Response,
  Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::db::AppState;
use crate::error::AppError;
use crate::models::Client;
use crate::store::ClientKey;

pub const COACH_PASSWORD_HEADER: &str = "x-coach-password";

/// ---------------------------------------------------------------------------
/// Coach Authentication
/// ---------------------------------------------------------------------------

/// Rejects any request whose `x-coach-password` header does not match the
/// configured coach password
pub async fn require_coach(
  State(state): State<Arc<AppState>>,
  request: Request,
  next: Next,
) -> Result<Response, AppError> {
  let provided = request
    .headers()
    .get(COACH_PASSWORD_HEADER)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default();

  let matches: bool = provided
    .as_bytes()
    .ct_eq(state.config.coach_password.as_bytes())
    .into();

  if !matches {
    warn!(path = %request.uri().path(), "Rejected request with bad coach password");
    return Err(AppError::Unauthorized);
  }

  Ok(next.run(request).await)
}

/// ---------------------------------------------------------------------------
/// Health
/// ---------------------------------------------------------------------------

pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
  state.store.ping().await?;
  Ok(Json(json!({ "status": "ok" })))
}

/// ---------------------------------------------------------------------------
/// Shared Helpers
/// ---------------------------------------------------------------------------

pub(crate) fn client_key(email: &str) -> Result<ClientKey, AppError> {
  let key = ClientKey::new(email);
  if key.is_empty() {
    return Err(AppError::BadRequest("Client email required".into()));
  }
  Ok(key)
}

pub(crate) async fn require_client(state: &AppState, key: &ClientKey) -> Result<Client, AppError> {
  state
    .store
    .get_client(key)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Client not found: {}", key)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_client_key_rejects_blank() {
    assert!(client_key("  ").is_err());
    assert_eq!(client_key(" Jane@X.com ").unwrap().as_str(), "jane@x.com");
  }

  #[tokio::test]
  async fn test_health_pings_store() {
    let state = crate::test_utils::setup_test_state("http://localhost").await;
    let Json(body) = health(State(state)).await.unwrap();
    assert_eq!(body["status"], "ok");
  }
}
