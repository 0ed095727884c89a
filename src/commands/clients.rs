use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use std::sync::Arc;
use tracing::info;

use super::{client_key, require_client};
use crate::db::AppState;
use crate::error::AppError;
use crate::models::Client;

pub async fn list_clients(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Client>>, AppError> {
  Ok(Json(state.store.list_clients().await?))
}

pub async fn get_client(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<Json<Client>, AppError> {
  let key = client_key(&email)?;
  Ok(Json(require_client(&state, &key).await?))
}

/// Create or update a client account
pub async fn save_client(
  State(state): State<Arc<AppState>>,
  Json(mut client): Json<Client>,
) -> Result<Json<Client>, AppError> {
  let key = client_key(&client.email)?;
  if client.name.trim().is_empty() {
    return Err(AppError::BadRequest("Client name required".into()));
  }
  client.email = key.to_string();

  state.store.save_client(&client).await?;
  info!(client = %key, "Saved client");

  Ok(Json(require_client(&state, &key).await?))
}

/// Remove the account along with its schedules, notes, context and tokens
pub async fn delete_client(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<StatusCode, AppError> {
  let key = client_key(&email)?;
  if !state.store.delete_client(&key).await? {
    return Err(AppError::NotFound(format!("Client not found: {}", key)));
  }
  info!(client = %key, "Deleted client");
  Ok(StatusCode::NO_CONTENT)
}
