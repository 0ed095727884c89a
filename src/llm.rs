//! LLM integration for weekly schedule generation
//!
//! Builds one prompt from the athlete's context, makes a single call to the
//! Claude messages API and parses the reply into a typed seven-day schedule.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::models::{InjuryRecord, RaceGoal, Schedule, TrainingWeek, WeeklyCheckIn, Workout, DAY_KEYS};
use crate::validation::{is_truthy, sanitize_workout};

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const API_VERSION: &str = "2023-06-01";
const SCHEDULE_MAX_TOKENS: u32 = 2000;
const SCHEDULE_TEMPERATURE: f32 = 1.0;
const SCHEDULE_SYSTEM_PROMPT: &str = include_str!("prompts/schedule_system.txt");

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum LlmError {
  #[error("ANTHROPIC_API_KEY is not set")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Invalid schedule format from AI: {0}")]
  Parse(String),

  #[error("Invalid schedule format from AI: Missing {0} in schedule")]
  MissingDay(String),
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  temperature: f32,
  system: String,
  messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Schedule Generation Contract
/// ---------------------------------------------------------------------------

/// Everything the coach knows about the athlete going into the week
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleGenerationInput {
  pub client_name: String,
  pub client_email: String,
  pub current_week_start: NaiveDate,
  /// Most recent first
  #[serde(default)]
  pub training_history: Vec<TrainingWeek>,
  #[serde(default)]
  pub race_goal: Option<RaceGoal>,
  #[serde(default)]
  pub injuries: Vec<InjuryRecord>,
  #[serde(default)]
  pub latest_check_in: Option<WeeklyCheckIn>,
  #[serde(default)]
  pub coach_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSchedule {
  pub monday: Workout,
  pub tuesday: Workout,
  pub wednesday: Workout,
  pub thursday: Workout,
  pub friday: Workout,
  pub saturday: Workout,
  pub sunday: Workout,
  pub reasoning: String,
  pub weekly_mileage: f64,
  pub focus_areas: Vec<String>,
}

impl GeneratedSchedule {
  /// The seven workouts keyed by lowercase day name
  pub fn to_schedule(&self) -> Schedule {
    [
      &self.monday,
      &self.tuesday,
      &self.wednesday,
      &self.thursday,
      &self.friday,
      &self.saturday,
      &self.sunday,
    ]
    .into_iter()
    .zip(DAY_KEYS)
    .map(|(workout, day)| (day.to_string(), workout.clone()))
    .collect()
  }
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

pub struct ClaudeClient {
  client: Client,
  api_key: String,
  base_url: String,
  model: String,
}

impl ClaudeClient {
  pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
    Self {
      client: Client::new(),
      api_key: api_key.to_string(),
      base_url: base_url.trim_end_matches('/').to_string(),
      model: model.to_string(),
    }
  }

  pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
    let api_key = config
      .anthropic_api_key
      .as_deref()
      .ok_or(LlmError::MissingApiKey)?;

    Ok(Self::new(api_key, &config.anthropic_base_url, &config.anthropic_model))
  }

  /// Call Claude with a system prompt and user message
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    let request = ClaudeRequest {
      model: self.model.clone(),
      max_tokens,
      temperature: SCHEDULE_TEMPERATURE,
      system: system_prompt.to_string(),
      messages: vec![ClaudeMessage {
        role: "user".to_string(),
        content: user_message.to_string(),
      }],
    };

    let response = self
      .client
      .post(format!("{}/v1/messages", self.base_url))
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("Unexpected response type from Claude".to_string()))?;

    Ok((text, claude_response.usage))
  }

  /// Single-shot schedule generation; no retries
  pub async fn generate_weekly_schedule(
    &self,
    input: &ScheduleGenerationInput,
  ) -> Result<(GeneratedSchedule, Usage), LlmError> {
    info!(client = %input.client_email, week = %input.current_week_start, "Starting schedule generation");

    let user_message = build_user_prompt(input, Utc::now());

    let started = Instant::now();
    let (response_text, usage) = self
      .complete(SCHEDULE_SYSTEM_PROMPT, &user_message, SCHEDULE_MAX_TOKENS)
      .await?;

    info!(
      latency_ms = started.elapsed().as_millis() as u64,
      input_tokens = usage.input_tokens,
      output_tokens = usage.output_tokens,
      "Claude responded"
    );

    let schedule = parse_schedule_response(&response_text).map_err(|e| {
      warn!(error = %e, raw = %response_text, "Failed to parse schedule response");
      e
    })?;

    info!(client = %input.client_email, "Schedule generated successfully");
    Ok((schedule, usage))
  }
}

/// ---------------------------------------------------------------------------
/// Prompt Building
/// ---------------------------------------------------------------------------

/// Whole days until the race, rounding any partial day up
pub fn days_until(race_date: NaiveDate, now: DateTime<Utc>) -> i64 {
  let race_start = race_date.and_time(NaiveTime::default()).and_utc();
  let millis = (race_start - now).num_milliseconds() as f64;
  (millis / 86_400_000.0).ceil() as i64
}

fn format_training_history(history: &[TrainingWeek]) -> String {
  if history.is_empty() {
    return "No training history available".to_string();
  }

  history
    .iter()
    .enumerate()
    .map(|(i, week)| {
      format!(
        "Week {} ago ({}): {} miles, {} workouts",
        i + 1,
        week.week_start,
        week.total_miles,
        week.workout_count
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

fn format_injuries(injuries: &[InjuryRecord]) -> String {
  if injuries.is_empty() {
    return "No active injuries".to_string();
  }

  injuries
    .iter()
    .map(|injury| {
      format!(
        "- {} ({}) - Areas: {}",
        injury.description,
        injury.status,
        injury.affected_areas.join(", ")
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

fn format_race_goal(goal: Option<&RaceGoal>, now: DateTime<Utc>) -> String {
  let Some(goal) = goal else {
    return "No current race goal".to_string();
  };

  let mut lines = vec![
    format!(
      "{} on {} ({} days away)",
      goal.race_type,
      goal.date,
      days_until(goal.date, now)
    ),
    format!(
      "Target Time: {}",
      goal.target_time.as_deref().unwrap_or("Not specified")
    ),
    format!(
      "Priority: {}-race ({})",
      goal.priority.as_str(),
      goal.priority.description()
    ),
  ];
  if let Some(notes) = goal.notes.as_deref().filter(|n| !n.is_empty()) {
    lines.push(format!("Notes: {}", notes));
  }
  lines.join("\n")
}

fn format_check_in(check_in: Option<&WeeklyCheckIn>) -> String {
  let Some(c) = check_in else {
    return "Body Feeling: N/A/5\nSleep Quality: N/A/5\nStress Level: N/A/5".to_string();
  };

  let mut lines = vec![
    format!("Body Feeling: {}/5 ({})", c.body_feeling, c.body_feeling_label()),
    format!("Sleep Quality: {}/5 ({})", c.sleep_quality, c.sleep_quality_label()),
    format!("Stress Level: {}/5 ({})", c.stress_level, c.stress_level_label()),
  ];
  if !c.notes.is_empty() {
    lines.push(format!("Additional notes: {}", c.notes));
  }
  lines.join("\n")
}

fn average_mileage(history: &[TrainingWeek]) -> String {
  if history.is_empty() {
    return "N/A".to_string();
  }
  let total: f64 = history.iter().map(|w| w.total_miles).sum();
  format!("{:.1}", total / history.len() as f64)
}

pub fn build_user_prompt(input: &ScheduleGenerationInput, now: DateTime<Utc>) -> String {
  let coach_notes = if input.coach_notes.trim().is_empty() {
    "No additional notes"
  } else {
    input.coach_notes.as_str()
  };

  format!(
    r#"ATHLETE PROFILE:
Name: {name}
Email: {email}

RACE GOAL:
{race}

RECENT TRAINING HISTORY (last {weeks} weeks):
{history}
Average weekly mileage: {avg} miles

CURRENT STATUS (this week):
{check_in}

INJURIES & HEALTH:
{injuries}

COACH NOTES:
{notes}

---

Generate a training schedule for the week starting {week_start}.

IMPORTANT CONSIDERATIONS:
- Respect the athlete's current fitness level and recent training load
- Account for any injuries or low body feeling scores
- Consider sleep quality and stress when planning intensity
- Progress mileage gradually (max 10% increase)
- If a race is within 2-3 weeks, begin tapering
- Balance hard training with adequate recovery

Respond with ONLY valid JSON matching the format specified in the system prompt. Do not include markdown formatting or code blocks."#,
    name = input.client_name,
    email = input.client_email,
    race = format_race_goal(input.race_goal.as_ref(), now),
    weeks = input.training_history.len(),
    history = format_training_history(&input.training_history),
    avg = average_mileage(&input.training_history),
    check_in = format_check_in(input.latest_check_in.as_ref()),
    injuries = format_injuries(&input.injuries),
    notes = coach_notes,
    week_start = input.current_week_start,
  )
}

/// ---------------------------------------------------------------------------
/// Response Parsing
/// ---------------------------------------------------------------------------

/// Extract JSON from Claude's response (handles markdown code blocks)
fn extract_json(text: &str) -> Result<String, LlmError> {
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  if let Some(start) = text.find("```") {
    let start = start + 3;
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// Strict on the seven days, lenient on everything inside them
pub fn parse_schedule_response(content: &str) -> Result<GeneratedSchedule, LlmError> {
  let json_str = extract_json(content)?;
  let parsed: Value = serde_json::from_str(&json_str).map_err(|e| LlmError::Parse(e.to_string()))?;

  let mut days = Vec::with_capacity(DAY_KEYS.len());
  for day in DAY_KEYS {
    let entry = parsed
      .get(day)
      .filter(|v| is_truthy(v))
      .ok_or_else(|| LlmError::MissingDay(day.to_string()))?;
    days.push(sanitize_workout(entry));
  }

  let reasoning = parsed
    .get("reasoning")
    .and_then(Value::as_str)
    .filter(|s| !s.is_empty())
    .unwrap_or("No reasoning provided")
    .to_string();

  let weekly_mileage = parsed
    .get("weeklyMileage")
    .and_then(Value::as_f64)
    .unwrap_or(0.0);

  let focus_areas = parsed
    .get("focusAreas")
    .and_then(Value::as_array)
    .map(|areas| {
      areas
        .iter()
        .filter_map(|a| a.as_str().map(String::from))
        .collect()
    })
    .unwrap_or_default();

  let [monday, tuesday, wednesday, thursday, friday, saturday, sunday]: [Workout; 7] = days
    .try_into()
    .map_err(|_| LlmError::Parse("Expected seven days".to_string()))?;

  Ok(GeneratedSchedule {
    monday,
    tuesday,
    wednesday,
    thursday,
    friday,
    saturday,
    sunday,
    reasoning,
    weekly_mileage,
    focus_areas,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{mock_check_in, mock_injury, mock_race_goal, training_week};
  use chrono::{Duration, TimeZone};

  const PAYLOAD: &str = r#"{
    "monday": {"distance": "5", "pace": "9:00", "notes": "Easy"},
    "tuesday": {"distance": "6", "pace": "8:15", "notes": "Tempo run"},
    "wednesday": {"distance": "0", "pace": "", "notes": "Rest"},
    "thursday": {"distance": "5", "pace": "8:45", "notes": "Easy with strides"},
    "friday": {"distance": "4", "pace": "9:00", "notes": "Easy"},
    "saturday": {"distance": "10", "pace": "9:15", "notes": "Long run"},
    "sunday": {"distance": "3", "pace": "9:30", "notes": "Recovery"},
    "reasoning": "Base building",
    "weeklyMileage": 33,
    "focusAreas": ["Aerobic base", "Threshold"]
  }"#;

  fn sample_input() -> ScheduleGenerationInput {
    ScheduleGenerationInput {
      client_name: "Jane Runner".into(),
      client_email: "jane@example.com".into(),
      current_week_start: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
      training_history: vec![
        training_week(1, &[("monday", "20", ""), ("saturday", "10", "Long run")]),
        training_week(2, &[("monday", "25", "")]),
      ],
      race_goal: None,
      injuries: vec![],
      latest_check_in: None,
      coach_notes: String::new(),
    }
  }

  #[test]
  fn test_extract_json_direct() {
    let result = extract_json(r#"{"monday": {}}"#).unwrap();
    assert!(result.contains("monday"));
  }

  #[test]
  fn test_extract_json_fallback() {
    let result = extract_json(r#"Here you go: {"reasoning": "x"} enjoy"#).unwrap();
    assert_eq!(result, r#"{"reasoning": "x"}"#);
    assert!(extract_json("no braces here").is_err());
  }

  #[test]
  fn test_fenced_and_plain_parse_identically() {
    let fenced = format!("```json\n{}\n```", PAYLOAD);
    let plain = parse_schedule_response(PAYLOAD).unwrap();
    assert_eq!(parse_schedule_response(&fenced).unwrap(), plain);
    assert_eq!(plain.weekly_mileage, 33.0);
    assert_eq!(plain.tuesday, Workout::new("6", "8:15", "Tempo run"));
    assert_eq!(plain.focus_areas, vec!["Aerobic base", "Threshold"]);
  }

  #[test]
  fn test_missing_friday_names_the_day() {
    let mut value: Value = serde_json::from_str(PAYLOAD).unwrap();
    value.as_object_mut().unwrap().remove("friday");

    let err = parse_schedule_response(&value.to_string()).unwrap_err();
    assert!(matches!(err, LlmError::MissingDay(ref d) if d == "friday"));
    assert!(err.to_string().contains("friday"));
  }

  #[test]
  fn test_partial_days_and_narrative_defaults() {
    let sparse = r#"{
      "monday": {"distance": "5"}, "tuesday": {"pace": "8:00"}, "wednesday": {"notes": "Rest"},
      "thursday": {}, "friday": {"distance": 4}, "saturday": {"distance": "10"}, "sunday": {"distance": ""}
    }"#;
    let schedule = parse_schedule_response(sparse).unwrap();
    assert_eq!(schedule.tuesday, Workout::new("0", "8:00", ""));
    assert_eq!(schedule.friday.distance, "4");
    assert_eq!(schedule.sunday.distance, "0");
    assert_eq!(schedule.reasoning, "No reasoning provided");
    assert_eq!(schedule.weekly_mileage, 0.0);
    assert!(schedule.focus_areas.is_empty());
    assert_eq!(schedule.to_schedule().len(), 7);
  }

  #[test]
  fn test_invalid_json_is_parse_error() {
    let err = parse_schedule_response("{not json}").unwrap_err();
    assert!(matches!(err, LlmError::Parse(_)));
  }

  #[test]
  fn test_days_until_rounds_up() {
    let race = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
    let morning = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
    // 12 days and 15 hours
    assert_eq!(days_until(race, morning), 13);
    let midnight = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap();
    assert_eq!(days_until(race, midnight), 12);
  }

  #[test]
  fn test_prompt_without_context_uses_sentinels() {
    let mut input = sample_input();
    input.training_history.clear();
    let prompt = build_user_prompt(&input, Utc::now());

    assert!(prompt.contains("No current race goal"));
    assert!(prompt.contains("No training history available"));
    assert!(prompt.contains("Average weekly mileage: N/A miles"));
    assert!(prompt.contains("Body Feeling: N/A/5"));
    assert!(prompt.contains("No active injuries"));
    assert!(prompt.contains("No additional notes"));
    assert!(prompt.contains("week starting 2026-10-19"));
  }

  #[test]
  fn test_prompt_renders_context() {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let mut input = sample_input();
    input.race_goal = Some(RaceGoal {
      date: (now + Duration::days(30)).date_naive(),
      ..mock_race_goal(30)
    });
    input.injuries = vec![mock_injury()];
    input.latest_check_in = Some(mock_check_in(2, 4, 3));
    input.coach_notes = "Travelling Thursday".into();

    let prompt = build_user_prompt(&input, now);

    assert!(prompt.contains("Week 1 ago (2026-10-12): 30 miles, 2 workouts"));
    assert!(prompt.contains("Week 2 ago (2026-10-05): 25 miles, 1 workouts"));
    assert!(prompt.contains("Average weekly mileage: 27.5 miles"));
    assert!(prompt.contains("Half Marathon on 2026-11-18 (30 days away)"));
    assert!(prompt.contains("Priority: A-race (Primary goal)"));
    assert!(prompt.contains("Body Feeling: 2/5 (Low energy)"));
    assert!(prompt.contains("Sleep Quality: 4/5 (Good sleep)"));
    assert!(prompt.contains("Stress Level: 3/5 (Moderate stress)"));
    assert!(prompt.contains("- Sore calf (recovering) - Areas: calf, achilles"));
    assert!(prompt.contains("Travelling Thursday"));
  }

  #[tokio::test]
  async fn test_generate_weekly_schedule_against_mock() {
    let mut server = mockito::Server::new_async().await;
    let body = serde_json::json!({
      "content": [{"type": "text", "text": format!("```json\n{}\n```", PAYLOAD)}],
      "model": "claude-sonnet-4-5-20250929",
      "stop_reason": "end_turn",
      "usage": {"input_tokens": 812, "output_tokens": 340}
    });
    let mock = server
      .mock("POST", "/v1/messages")
      .match_header("x-api-key", "test-key")
      .match_header("anthropic-version", API_VERSION)
      .match_body(mockito::Matcher::PartialJson(serde_json::json!({
        "max_tokens": 2000,
        "temperature": 1.0
      })))
      .with_status(200)
      .with_body(body.to_string())
      .create_async()
      .await;

    let client = ClaudeClient::new("test-key", &server.url(), "claude-sonnet-4-5-20250929");
    let (schedule, usage) = client.generate_weekly_schedule(&sample_input()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(schedule.saturday.notes, "Long run");
    assert_eq!(usage.output_tokens, 340);
  }

  #[tokio::test]
  async fn test_api_error_message_surfaces() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/v1/messages")
      .with_status(529)
      .with_body(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
      .create_async()
      .await;

    let client = ClaudeClient::new("k", &server.url(), "m");
    let err = client.generate_weekly_schedule(&sample_input()).await.unwrap_err();
    assert!(matches!(err, LlmError::Api(ref m) if m == "Overloaded"));
  }

  #[test]
  fn test_missing_key_from_config() {
    let mut config = AppConfig::for_tests("http://localhost");
    config.anthropic_api_key = None;
    assert!(matches!(
      ClaudeClient::from_config(&config),
      Err(LlmError::MissingApiKey)
    ));
  }
}
