use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::client_key;
use crate::db::AppState;
use crate::error::AppError;
use crate::models::schedule::{week_days, week_start};
use crate::models::DAY_KEYS;
use crate::store::ClientKey;
use crate::strava::{
  build_auth_url, exchange_code_for_tokens, fetch_activities, match_schedule_to_activities,
  refresh_tokens, weekly_summaries, CompletionReport, OAuthState, StravaActivity, StravaConfig,
  StravaError, WeeklySummary,
};

const DEFAULT_ACTIVITY_DAYS: i64 = 28;
const MAX_ACTIVITY_DAYS: i64 = 365;
/// Strava's page size ceiling
const DEFAULT_PER_PAGE: u32 = 200;
const DEFAULT_SUMMARY_WEEKS: u32 = 4;
const MAX_SUMMARY_WEEKS: u32 = 52;

/// ---------------------------------------------------------------------------
/// Start OAuth Flow
/// ---------------------------------------------------------------------------

/// Authorization URL the coach sends to the client. The client's email is
/// carried through `state` and comes back with the code.
pub async fn auth_url(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
  let key = client_key(&email)?;
  let config = StravaConfig::from_app_config(&state.config)?;
  let url = build_auth_url(&config, key.as_str())?;
  Ok(Json(json!({ "url": url })))
}

/// ---------------------------------------------------------------------------
/// Exchange Code
/// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
  pub code: Option<String>,
  pub client_email: Option<String>,
  /// The `state` value echoed back by the OAuth redirect
  pub state: Option<String>,
}

impl TokenRequest {
  /// Explicit email wins over the one packed into `state`
  fn email(&self) -> Option<String> {
    self
      .client_email
      .clone()
      .filter(|e| !e.trim().is_empty())
      .or_else(|| {
        self
          .state
          .as_deref()
          .and_then(|s| serde_json::from_str::<OAuthState>(s).ok())
          .map(|s| s.client_email)
      })
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
  pub connected: bool,
  pub athlete_id: Option<String>,
  pub expires_at: String,
}

pub async fn exchange_token(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TokenRequest>,
) -> Result<Json<ConnectionStatus>, AppError> {
  let Some(code) = body.code.clone().filter(|c| !c.is_empty()) else {
    return Err(AppError::BadRequest("Authorization code required".into()));
  };
  let Some(email) = body.email() else {
    return Err(AppError::BadRequest("Client email required".into()));
  };
  let key = client_key(&email)?;

  let config = StravaConfig::from_app_config(&state.config)?;
  let tokens = exchange_code_for_tokens(&config, &code).await?;
  state.store.save_strava_tokens(&key, &tokens).await?;

  info!(client = %key, athlete = ?tokens.athlete_id, "Strava connected");
  Ok(Json(ConnectionStatus {
    connected: true,
    athlete_id: tokens.athlete_id,
    expires_at: tokens.expires_at.to_rfc3339(),
  }))
}

/// ---------------------------------------------------------------------------
/// Refresh Tokens
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
  pub client_email: String,
}

pub async fn refresh(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RefreshRequest>,
) -> Result<Json<ConnectionStatus>, AppError> {
  let key = client_key(&body.client_email)?;
  let config = StravaConfig::from_app_config(&state.config)?;

  let existing = state
    .store
    .load_strava_tokens(&key)
    .await?
    .ok_or(StravaError::NotAuthenticated)?;

  let new_tokens = refresh_tokens(&config, &existing.refresh_token).await?;
  state.store.save_strava_tokens(&key, &new_tokens).await?;

  info!(client = %key, "Strava tokens refreshed");
  Ok(Json(ConnectionStatus {
    connected: true,
    athlete_id: new_tokens.athlete_id.or(existing.athlete_id),
    expires_at: new_tokens.expires_at.to_rfc3339(),
  }))
}

/// ---------------------------------------------------------------------------
/// Disconnect Strava
/// ---------------------------------------------------------------------------

pub async fn disconnect(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
) -> Result<StatusCode, AppError> {
  let key = client_key(&email)?;
  state.store.clear_strava_tokens(&key).await?;
  info!(client = %key, "Strava disconnected");
  Ok(StatusCode::NO_CONTENT)
}

/// ---------------------------------------------------------------------------
/// Get Valid Access Token (with auto-refresh)
/// ---------------------------------------------------------------------------

/// A usable access token for the client, refreshed first when it is about
/// to expire
pub async fn valid_access_token(
  state: &AppState,
  config: &StravaConfig,
  key: &ClientKey,
) -> Result<String, StravaError> {
  let mut tokens = state
    .store
    .load_strava_tokens(key)
    .await?
    .ok_or(StravaError::NotAuthenticated)?;

  if tokens.needs_refresh() {
    tokens = refresh_tokens(config, &tokens.refresh_token).await?;
    state.store.save_strava_tokens(key, &tokens).await?;
    info!(client = %key, "Strava tokens auto-refreshed");
  }

  Ok(tokens.access_token)
}

/// Runs since `after` (unix seconds) with a fresh token
async fn recent_runs(
  state: &AppState,
  key: &ClientKey,
  after: i64,
  per_page: u32,
) -> Result<Vec<StravaActivity>, StravaError> {
  let config = StravaConfig::from_app_config(&state.config)?;
  let token = valid_access_token(state, &config, key).await?;
  fetch_activities(&config, &token, Some(after), per_page)
    .await
    .inspect_err(|e| warn!(client = %key, "Strava activity fetch failed: {}", e))
}

fn midnight_timestamp(day: NaiveDate) -> i64 {
  day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp()
}

/// ---------------------------------------------------------------------------
/// Activities and Summaries
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
  pub days: Option<i64>,
  pub per_page: Option<u32>,
}

pub async fn activities(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Query(query): Query<ActivitiesQuery>,
) -> Result<Json<Value>, AppError> {
  let key = client_key(&email)?;
  let days = query.days.unwrap_or(DEFAULT_ACTIVITY_DAYS).clamp(1, MAX_ACTIVITY_DAYS);
  let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, DEFAULT_PER_PAGE);
  let after = (Utc::now() - Duration::days(days)).timestamp();

  let runs = recent_runs(&state, &key, after, per_page).await?;
  Ok(Json(json!({ "activities": runs })))
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
  pub weeks: Option<u32>,
}

/// Mileage per completed week, oldest first
pub async fn weekly(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Query(query): Query<WeeklyQuery>,
) -> Result<Json<Vec<WeeklySummary>>, AppError> {
  let key = client_key(&email)?;
  let weeks = query.weeks.unwrap_or(DEFAULT_SUMMARY_WEEKS).clamp(1, MAX_SUMMARY_WEEKS);
  let today = Utc::now().date_naive();
  let first_week = week_start(today - Duration::weeks(weeks as i64));

  let runs = recent_runs(&state, &key, midnight_timestamp(first_week), DEFAULT_PER_PAGE).await?;
  Ok(Json(weekly_summaries(&runs, today, weeks)))
}

#[derive(Debug, Deserialize)]
pub struct CompletionQuery {
  /// Any day in the week; defaults to the current week
  pub week: Option<NaiveDate>,
}

/// How much of a week's saved schedule the client actually ran
pub async fn completion(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Query(query): Query<CompletionQuery>,
) -> Result<Json<CompletionReport>, AppError> {
  let key = client_key(&email)?;
  let start = week_start(query.week.unwrap_or_else(|| Utc::now().date_naive()));
  let end = start + Duration::days(7);

  let schedule = state.store.get_schedule(&key, start).await?;
  let planned: BTreeMap<_, _> = week_days(start)
    .into_iter()
    .zip(DAY_KEYS)
    .filter_map(|(day, name)| schedule.get(name).map(|w| (day, w.clone())))
    .collect();

  let runs: Vec<StravaActivity> = recent_runs(&state, &key, midnight_timestamp(start), DEFAULT_PER_PAGE)
    .await?
    .into_iter()
    .filter(|a| a.start_date.date_naive() < end)
    .collect();

  Ok(Json(match_schedule_to_activities(&planned, &runs)))
}
