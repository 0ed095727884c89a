use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::client_key;
use crate::db::AppState;
use crate::error::AppError;
use crate::models::schedule::week_start;
use crate::models::{
  active_injuries, latest_check_in, next_race, InjuryRecord, RaceGoal, WeeklyCheckIn,
};

/// ---------------------------------------------------------------------------
/// Race Goals
/// ---------------------------------------------------------------------------

pub async fn list_race_goals(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<Json<Vec<RaceGoal>>, AppError> {
  let key = client_key(&email)?;
  Ok(Json(state.store.list_race_goals(&key).await?))
}

/// Create (no id) or replace (known id) a race goal
pub async fn save_race_goal(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Json(goal): Json<RaceGoal>,
) -> Result<(StatusCode, Json<RaceGoal>), AppError> {
  let key = client_key(&email)?;
  if goal.race_type.trim().is_empty() {
    return Err(AppError::BadRequest("Race type required".into()));
  }

  let saved = state.store.save_race_goal(&key, &goal).await?;
  info!(client = %key, race = %saved.id, date = %saved.date, "Saved race goal");
  Ok((StatusCode::CREATED, Json(saved)))
}

/// ---------------------------------------------------------------------------
/// Injuries
/// ---------------------------------------------------------------------------

pub async fn list_injuries(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<Json<Vec<InjuryRecord>>, AppError> {
  let key = client_key(&email)?;
  Ok(Json(state.store.list_injuries(&key).await?))
}

pub async fn save_injury(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Json(injury): Json<InjuryRecord>,
) -> Result<(StatusCode, Json<InjuryRecord>), AppError> {
  let key = client_key(&email)?;
  if injury.description.trim().is_empty() {
    return Err(AppError::BadRequest("Injury description required".into()));
  }

  let saved = state.store.save_injury(&key, &injury).await?;
  info!(client = %key, injury = %saved.id, status = %saved.status, "Saved injury");
  Ok((StatusCode::CREATED, Json(saved)))
}

/// ---------------------------------------------------------------------------
/// Check-ins
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
  /// Any day in the week; defaults to the current week
  pub week_start: Option<NaiveDate>,
  pub body_feeling: u8,
  pub sleep_quality: u8,
  pub stress_level: u8,
  #[serde(default)]
  pub notes: String,
}

pub async fn list_check_ins(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<Json<Vec<WeeklyCheckIn>>, AppError> {
  let key = client_key(&email)?;
  Ok(Json(state.store.list_check_ins(&key).await?))
}

pub async fn add_check_in(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Json(body): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<WeeklyCheckIn>), AppError> {
  let key = client_key(&email)?;
  let now = Utc::now();

  let check_in = WeeklyCheckIn {
    week_start: week_start(body.week_start.unwrap_or_else(|| now.date_naive())),
    body_feeling: body.body_feeling,
    sleep_quality: body.sleep_quality,
    stress_level: body.stress_level,
    notes: body.notes,
    created_at: now,
  };
  check_in.validate().map_err(AppError::BadRequest)?;

  state.store.add_check_in(&key, &check_in).await?;
  info!(client = %key, week = %check_in.week_start, "Recorded check-in");
  Ok((StatusCode::CREATED, Json(check_in)))
}

/// ---------------------------------------------------------------------------
/// Combined Context
/// ---------------------------------------------------------------------------

/// What schedule generation reads about an athlete
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteContext {
  pub next_race: Option<RaceGoal>,
  pub active_injuries: Vec<InjuryRecord>,
  pub latest_check_in: Option<WeeklyCheckIn>,
}

pub(crate) async fn load_context(
  state: &AppState,
  email: &str,
  today: NaiveDate,
) -> Result<AthleteContext, AppError> {
  let key = client_key(email)?;
  let goals = state.store.list_race_goals(&key).await?;
  let injuries = state.store.list_injuries(&key).await?;
  let check_ins = state.store.list_check_ins(&key).await?;

  Ok(AthleteContext {
    next_race: next_race(&goals, today).cloned(),
    active_injuries: active_injuries(&injuries),
    latest_check_in: latest_check_in(&check_ins).cloned(),
  })
}

pub async fn get_context(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<Json<AthleteContext>, AppError> {
  Ok(Json(load_context(&state, &email, Utc::now().date_naive()).await?))
}
