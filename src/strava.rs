use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};
use url::Url;

use crate::config::AppConfig;
use crate::models::schedule::{parse_distance, round1, week_start};
use crate::models::Workout;
use crate::store::StoreError;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const OAUTH_SCOPE: &str = "read,activity:read_all";
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;
/// Lifetime assumed when the token endpoint reports neither expiry field
const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 6;
const METERS_TO_MILES: f64 = 0.000621371;
const MPS_TO_MPH: f64 = 2.23694;
/// Actual distance within this band of planned counts as completed
const COMPLETION_BAND: (f64, f64) = (0.8, 1.2);

/// ---------------------------------------------------------------------------
/// OAuth Data Structures
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StravaConfig {
  pub client_id: String,
  pub client_secret: String,
  pub redirect_uri: Option<String>,
  pub auth_url: String,
  pub token_url: String,
  pub api_base: String,
}

impl StravaConfig {
  pub fn from_app_config(config: &AppConfig) -> Result<Self, StravaError> {
    Ok(Self {
      client_id: config
        .strava_client_id
        .clone()
        .ok_or_else(|| StravaError::MissingConfig("STRAVA_CLIENT_ID".into()))?,
      client_secret: config
        .strava_client_secret
        .clone()
        .ok_or_else(|| StravaError::MissingConfig("STRAVA_CLIENT_SECRET".into()))?,
      redirect_uri: config.strava_redirect_uri.clone(),
      auth_url: format!("{}/authorize", config.strava_oauth_base),
      token_url: format!("{}/token", config.strava_oauth_base),
      api_base: config.strava_api_base.clone(),
    })
  }
}

/// Response from Strava token endpoint. Every field is optional on the wire
/// so a partial reply surfaces as an OAuth error rather than a decode error.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub access_token: Option<String>,
  pub refresh_token: Option<String>,
  pub expires_at: Option<i64>,
  pub expires_in: Option<i64>,
  pub athlete: Option<AthleteInfo>,
}

/// Basic athlete info returned with tokens
#[derive(Debug, Deserialize)]
pub struct AthleteInfo {
  pub id: i64,
}

/// Stored token state, one per client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaTokens {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
  pub athlete_id: Option<String>,
}

impl StravaTokens {
  pub fn from_response(resp: TokenResponse, now: DateTime<Utc>) -> Result<Self, StravaError> {
    let (Some(access_token), Some(refresh_token)) = (resp.access_token, resp.refresh_token) else {
      return Err(StravaError::OAuth("Invalid token response from Strava".into()));
    };

    let expires_at = resp
      .expires_at
      .and_then(|ts| DateTime::from_timestamp(ts, 0))
      .or_else(|| resp.expires_in.map(|secs| now + Duration::seconds(secs)))
      .unwrap_or_else(|| now + Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS));

    Ok(Self {
      access_token,
      refresh_token,
      expires_at,
      athlete_id: resp.athlete.map(|a| a.id.to_string()),
    })
  }

  pub fn needs_refresh(&self) -> bool {
    let buffer = Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES);
    Utc::now() + buffer >= self.expires_at
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StravaError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("OAuth error: {0}")]
  OAuth(String),

  #[error("Strava API error ({status}): {message}")]
  Api { status: u16, message: String },

  #[error("Database error: {0}")]
  Database(#[from] StoreError),

  #[error("Not authenticated with Strava")]
  NotAuthenticated,
}

/// Strava error bodies look like `{"message": "...", "errors": [...]}`
fn error_message(body: &str, fallback: &str) -> String {
  serde_json::from_str::<serde_json::Value>(body)
    .ok()
    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
    .unwrap_or_else(|| {
      if body.is_empty() {
        fallback.to_string()
      } else {
        body.to_string()
      }
    })
}

/// ---------------------------------------------------------------------------
/// OAuth URL Generation
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
  pub client_email: String,
}

/// Authorization URL for connecting one client's account. The client email
/// rides along in `state` so the token can be stored against it afterwards.
pub fn build_auth_url(config: &StravaConfig, client_email: &str) -> Result<String, StravaError> {
  let redirect_uri = config
    .redirect_uri
    .as_deref()
    .ok_or_else(|| StravaError::MissingConfig("STRAVA_REDIRECT_URI".into()))?;

  let mut url = Url::parse(&config.auth_url).map_err(|e| StravaError::OAuth(e.to_string()))?;

  let state = serde_json::to_string(&OAuthState {
    client_email: client_email.to_string(),
  })
  .map_err(|e| StravaError::OAuth(e.to_string()))?;

  url
    .query_pairs_mut()
    .append_pair("client_id", &config.client_id)
    .append_pair("redirect_uri", redirect_uri)
    .append_pair("response_type", "code")
    .append_pair("scope", OAUTH_SCOPE)
    .append_pair("state", &state)
    .append_pair("approval_prompt", "force");

  Ok(url.to_string())
}

/// ---------------------------------------------------------------------------
/// Token Exchange and Refresh
/// ---------------------------------------------------------------------------

async fn request_tokens(
  config: &StravaConfig,
  grant: &[(&str, &str)],
  action: &str,
) -> Result<StravaTokens, StravaError> {
  let client = Client::new();

  let mut form = vec![
    ("client_id", config.client_id.as_str()),
    ("client_secret", config.client_secret.as_str()),
  ];
  form.extend_from_slice(grant);

  let response = client.post(&config.token_url).form(&form).send().await?;

  if !response.status().is_success() {
    let error_text = response.text().await.unwrap_or_default();
    return Err(StravaError::OAuth(format!(
      "{} failed: {}",
      action,
      error_message(&error_text, "unknown error")
    )));
  }

  let token_response: TokenResponse = response.json().await?;
  StravaTokens::from_response(token_response, Utc::now())
}

/// Authorization code grant
pub async fn exchange_code_for_tokens(
  config: &StravaConfig,
  code: &str,
) -> Result<StravaTokens, StravaError> {
  request_tokens(
    config,
    &[("code", code), ("grant_type", "authorization_code")],
    "Token exchange",
  )
  .await
}

/// Refresh token grant
pub async fn refresh_tokens(
  config: &StravaConfig,
  refresh_token: &str,
) -> Result<StravaTokens, StravaError> {
  request_tokens(
    config,
    &[("refresh_token", refresh_token), ("grant_type", "refresh_token")],
    "Token refresh",
  )
  .await
}

/// ---------------------------------------------------------------------------
/// Strava API - Activity Fetching
/// ---------------------------------------------------------------------------

/// Activity summary from Strava API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StravaActivity {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  /// Strava uses "type" for legacy and "sport_type" for newer activities
  #[serde(rename = "type", default)]
  pub activity_type: String,
  #[serde(default)]
  pub sport_type: String,
  pub start_date: DateTime<Utc>,
  /// meters
  #[serde(default)]
  pub distance: f64,
  /// seconds
  #[serde(default)]
  pub moving_time: i64,
  #[serde(default)]
  pub elapsed_time: i64,
  /// m/s
  #[serde(default)]
  pub average_speed: f64,
  #[serde(default)]
  pub max_speed: f64,
  #[serde(default)]
  pub total_elevation_gain: Option<f64>,
  #[serde(default)]
  pub average_heartrate: Option<f64>,
  #[serde(default)]
  pub max_heartrate: Option<f64>,
}

impl StravaActivity {
  pub fn is_run(&self) -> bool {
    self.activity_type == "Run" || self.sport_type == "Run"
  }

  pub fn miles(&self) -> f64 {
    meters_to_miles(self.distance)
  }
}

/// Fetch recent runs. Non-running activities are dropped.
pub async fn fetch_activities(
  config: &StravaConfig,
  access_token: &str,
  after: Option<i64>,
  per_page: u32,
) -> Result<Vec<StravaActivity>, StravaError> {
  let client = Client::new();

  let mut url = format!("{}/athlete/activities?per_page={}", config.api_base, per_page);

  if let Some(after_timestamp) = after {
    url.push_str(&format!("&after={}", after_timestamp));
  }

  let response = client
    .get(&url)
    .header("Authorization", format!("Bearer {}", access_token))
    .send()
    .await?;

  if response.status() == reqwest::StatusCode::UNAUTHORIZED {
    return Err(StravaError::NotAuthenticated);
  }

  if !response.status().is_success() {
    let status = response.status().as_u16();
    let error_text = response.text().await.unwrap_or_default();
    return Err(StravaError::Api {
      status,
      message: error_message(&error_text, "Failed to fetch activities"),
    });
  }

  let response_text = response.text().await?;

  let activities: Vec<StravaActivity> = serde_json::from_str(&response_text).map_err(|e| {
    warn!(
      "Failed to parse Strava activities: {} (first 500 chars: {})",
      e,
      response_text.chars().take(500).collect::<String>()
    );
    StravaError::Api {
      status: 200,
      message: format!("Failed to parse activities: {}", e),
    }
  })?;

  let total = activities.len();
  let runs: Vec<StravaActivity> = activities.into_iter().filter(|a| a.is_run()).collect();
  debug!(total, runs = runs.len(), "Fetched Strava activities");

  Ok(runs)
}

/// ---------------------------------------------------------------------------
/// Aggregation
/// ---------------------------------------------------------------------------

pub fn meters_to_miles(meters: f64) -> f64 {
  meters * METERS_TO_MILES
}

/// m/s to "M:SS" per mile; zero speed renders "0:00"
pub fn speed_to_pace(meters_per_second: f64) -> String {
  if meters_per_second <= 0.0 {
    return "0:00".to_string();
  }

  let minutes_per_mile = 60.0 / (meters_per_second * MPS_TO_MPH);
  let mut minutes = minutes_per_mile.floor() as i64;
  let mut seconds = ((minutes_per_mile - minutes as f64) * 60.0).round() as i64;
  if seconds == 60 {
    minutes += 1;
    seconds = 0;
  }

  format!("{}:{:02}", minutes, seconds)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
  pub week_start: NaiveDate,
  pub total_miles: f64,
  pub total_runs: usize,
  pub avg_pace: String,
  pub longest_run: f64,
  pub activities: Vec<StravaActivity>,
}

/// One summary per week for the `weeks_back` weeks before the current one,
/// oldest first. Weeks without runs are still reported.
pub fn weekly_summaries(
  activities: &[StravaActivity],
  today: NaiveDate,
  weeks_back: u32,
) -> Vec<WeeklySummary> {
  let mut by_week: HashMap<NaiveDate, Vec<&StravaActivity>> = HashMap::new();
  for activity in activities.iter().filter(|a| a.is_run()) {
    by_week
      .entry(week_start(activity.start_date.date_naive()))
      .or_default()
      .push(activity);
  }

  (1..=weeks_back as i64)
    .rev()
    .map(|i| {
      let start = week_start(today - Duration::weeks(i));
      let runs = by_week.remove(&start).unwrap_or_default();

      let total_miles: f64 = runs.iter().map(|a| a.miles()).sum();
      let avg_speed = if runs.is_empty() {
        0.0
      } else {
        runs.iter().map(|a| a.average_speed).sum::<f64>() / runs.len() as f64
      };
      let longest_run = runs.iter().map(|a| a.miles()).fold(0.0, f64::max);

      WeeklySummary {
        week_start: start,
        total_miles: round1(total_miles),
        total_runs: runs.len(),
        avg_pace: speed_to_pace(avg_speed),
        longest_run: round1(longest_run),
        activities: runs.into_iter().cloned().collect(),
      }
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayVariance {
  pub day: NaiveDate,
  pub planned: f64,
  pub actual: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
  pub completed: usize,
  pub total: usize,
  /// Whole percent
  pub completion_rate: u32,
  pub variance: Vec<DayVariance>,
}

/// Compare planned workouts (keyed by calendar date) with the runs actually
/// recorded on those dates. Rest days are ignored.
pub fn match_schedule_to_activities(
  planned: &BTreeMap<NaiveDate, Workout>,
  activities: &[StravaActivity],
) -> CompletionReport {
  let mut actual_by_day: HashMap<NaiveDate, f64> = HashMap::new();
  for activity in activities {
    *actual_by_day
      .entry(activity.start_date.date_naive())
      .or_default() += activity.miles();
  }

  let mut completed = 0;
  let mut variance = Vec::new();

  for (day, workout) in planned {
    let planned_miles = parse_distance(&workout.distance).unwrap_or(0.0);
    if planned_miles == 0.0 {
      continue;
    }

    let actual = actual_by_day.get(day).copied().unwrap_or(0.0);
    let (low, high) = COMPLETION_BAND;
    if actual >= planned_miles * low && actual <= planned_miles * high {
      completed += 1;
    }

    variance.push(DayVariance {
      day: *day,
      planned: round1(planned_miles),
      actual: round1(actual),
    });
  }

  let total = variance.len();
  let completion_rate = if total > 0 {
    ((completed as f64 / total as f64) * 100.0).round() as u32
  } else {
    0
  };

  CompletionReport {
    completed,
    total,
    completion_rate,
    variance,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
