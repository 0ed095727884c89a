use axum::{
  extract::{Path, Query, State},
  Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::client_key;
use crate::analysis::{
  calculate_weekly_load, check_training_principles, detect_overtraining, OvertrainingVerdict,
  PrinciplesCheck,
};
use crate::db::AppState;
use crate::error::AppError;
use crate::models::schedule::{week_days, week_start};
use crate::models::{Schedule, TrainingWeek};
use crate::store::training_history;
use crate::validation::{parse_schedule, validate_schedule, ValidationResult};

/// Weeks of history the overtraining check compares against
const ANALYSIS_HISTORY_WEEKS: usize = 4;
const MAX_HISTORY_WEEKS: usize = 52;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekScheduleResponse {
  pub week_start: NaiveDate,
  pub days: Vec<NaiveDate>,
  pub schedule: Schedule,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<String>,
}

pub async fn get_schedule(
  State(state): State<Arc<AppState>>,
  Path((email, week)): Path<(String, NaiveDate)>,
) -> Result<Json<WeekScheduleResponse>, AppError> {
  let key = client_key(&email)?;
  let start = week_start(week);
  let schedule = state.store.get_schedule(&key, start).await?;

  Ok(Json(WeekScheduleResponse {
    week_start: start,
    days: week_days(start),
    schedule,
    warnings: vec![],
  }))
}

/// Replace a week's schedule. The body must pass validation; warnings are
/// returned alongside the saved week.
pub async fn put_schedule(
  State(state): State<Arc<AppState>>,
  Path((email, week)): Path<(String, NaiveDate)>,
  Json(body): Json<Value>,
) -> Result<Json<WeekScheduleResponse>, AppError> {
  let key = client_key(&email)?;
  let start = week_start(week);

  let (schedule, warnings) = parse_schedule(&body).map_err(AppError::InvalidSchedule)?;
  state.store.save_schedule(&key, start, &schedule).await?;
  info!(client = %key, week = %start, warnings = warnings.len(), "Saved schedule");

  Ok(Json(WeekScheduleResponse {
    week_start: start,
    days: week_days(start),
    schedule,
    warnings,
  }))
}

/// ---------------------------------------------------------------------------
/// Analysis
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAnalysis {
  pub validation: ValidationResult,
  /// Scoring only runs on a structurally valid week
  pub weekly_load: Option<f64>,
  pub overtraining: Option<OvertrainingVerdict>,
  pub principles: Option<PrinciplesCheck>,
  pub history: Vec<TrainingWeek>,
}

/// Score a candidate week against the client's last four saved weeks
pub async fn analyze_schedule(
  State(state): State<Arc<AppState>>,
  Path((email, week)): Path<(String, NaiveDate)>,
  Json(body): Json<Value>,
) -> Result<Json<ScheduleAnalysis>, AppError> {
  let key = client_key(&email)?;
  let start = week_start(week);
  let history = training_history(state.store.as_ref(), &key, start, ANALYSIS_HISTORY_WEEKS).await?;

  let analysis = match parse_schedule(&body) {
    Ok((schedule, _)) => ScheduleAnalysis {
      validation: validate_schedule(&body),
      weekly_load: Some(calculate_weekly_load(&schedule)),
      overtraining: Some(detect_overtraining(&schedule, &history)),
      principles: Some(check_training_principles(&schedule)),
      history,
    },
    Err(validation) => ScheduleAnalysis {
      validation,
      weekly_load: None,
      overtraining: None,
      principles: None,
      history,
    },
  };

  debug!(
    client = %key,
    week = %start,
    load = ?analysis.weekly_load,
    flagged = analysis.overtraining.as_ref().map(|v| v.is_overtraining()).unwrap_or(false),
    "Analyzed schedule"
  );

  Ok(Json(analysis))
}

/// ---------------------------------------------------------------------------
/// History
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
  pub weeks: Option<usize>,
  /// Weeks strictly before this date's week; defaults to the current week
  pub before: Option<NaiveDate>,
}

pub async fn get_history(
  State(state): State<Arc<AppState>>,
  Path(email): Path<String>,
  Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TrainingWeek>>, AppError> {
  let key = client_key(&email)?;
  let weeks = query.weeks.unwrap_or(ANALYSIS_HISTORY_WEEKS).min(MAX_HISTORY_WEEKS);
  let before = week_start(query.before.unwrap_or_else(|| Utc::now().date_naive()));

  Ok(Json(
    training_history(state.store.as_ref(), &key, before, weeks).await?,
  ))
}
