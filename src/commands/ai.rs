use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use super::athlete::load_context;
use super::client_key;
use crate::db::AppState;
use crate::error::AppError;
use crate::llm::{ClaudeClient, ScheduleGenerationInput};
use crate::models::schedule::week_start;
use crate::models::{InjuryRecord, RaceGoal, TrainingWeek, WeeklyCheckIn};
use crate::store::training_history;

/// Weeks of history sent to the model when the caller sends none
const PROMPT_HISTORY_WEEKS: usize = 4;

/// Request body for schedule generation. Context the caller leaves out is
/// read from the client's stored records.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateScheduleRequest {
  pub client_name: Option<String>,
  pub client_email: Option<String>,
  pub week_start: Option<String>,
  pub training_history: Option<Vec<TrainingWeek>>,
  pub race_goal: Option<RaceGoal>,
  pub injuries: Option<Vec<InjuryRecord>>,
  pub latest_check_in: Option<WeeklyCheckIn>,
  pub coach_notes: Option<String>,
}

fn failure(details: impl ToString) -> Response {
  (
    StatusCode::INTERNAL_SERVER_ERROR,
    Json(json!({
      "success": false,
      "error": "Failed to generate schedule",
      "details": details.to_string(),
    })),
  )
    .into_response()
}

/// Fill in whatever the caller left out from the store
async fn build_input(
  state: &AppState,
  request: GenerateScheduleRequest,
  email: String,
  week: NaiveDate,
) -> Result<ScheduleGenerationInput, AppError> {
  let key = client_key(&email)?;
  let context = load_context(state, &email, Utc::now().date_naive()).await?;

  let training_history = match request.training_history {
    Some(history) => history,
    None => training_history(state.store.as_ref(), &key, week, PROMPT_HISTORY_WEEKS).await?,
  };

  let client_name = match request.client_name.filter(|n| !n.trim().is_empty()) {
    Some(name) => name,
    None => state
      .store
      .get_client(&key)
      .await?
      .map(|c| c.name)
      .unwrap_or_else(|| email.clone()),
  };

  Ok(ScheduleGenerationInput {
    client_name,
    client_email: email,
    current_week_start: week,
    training_history,
    race_goal: request.race_goal.or(context.next_race),
    injuries: request.injuries.unwrap_or(context.active_injuries),
    latest_check_in: request.latest_check_in.or(context.latest_check_in),
    coach_notes: request.coach_notes.unwrap_or_default(),
  })
}

/// Generate a week with the language model.
///
/// Missing `clientEmail` or `weekStart`, or a supplied check-in with scores
/// outside 1-5, is a 400; any later failure is a 500
/// with `success: false` and the underlying message in `details`.
pub async fn generate_schedule(
  State(state): State<Arc<AppState>>,
  Json(mut request): Json<GenerateScheduleRequest>,
) -> Response {
  let email = request.client_email.take().filter(|e| !e.trim().is_empty());
  let week_raw = request.week_start.take().filter(|w| !w.trim().is_empty());

  let (Some(email), Some(week_raw)) = (email, week_raw) else {
    return AppError::BadRequest(
      "Missing required fields: clientEmail and weekStart are required".into(),
    )
    .into_response();
  };

  let Ok(week) = week_raw.parse::<NaiveDate>() else {
    return AppError::BadRequest(format!("Invalid weekStart: {}", week_raw)).into_response();
  };
  let week = week_start(week);

  if let Some(Err(message)) = request.latest_check_in.as_ref().map(|c| c.validate()) {
    return AppError::BadRequest(message).into_response();
  }

  info!(client = %email, week = %week, "Generating schedule");

  let result = async {
    let input = build_input(&state, request, email, week).await?;
    let client = ClaudeClient::from_config(&state.config)?;
    let (schedule, _usage) = client.generate_weekly_schedule(&input).await?;
    Ok::<_, AppError>(schedule)
  }
  .await;

  match result {
    Ok(schedule) => Json(json!({ "success": true, "schedule": schedule })).into_response(),
    Err(e) => {
      error!("Schedule generation error: {}", e);
      failure(e)
    }
  }
}
