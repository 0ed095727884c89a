use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
  pub email: String,
  pub name: String,
  /// Accepted on input, never echoed back
  #[serde(default, skip_serializing)]
  pub password: String,
  #[serde(default)]
  pub strava_connected: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub strava_athlete_id: Option<String>,
}

/// Private coach-side note about a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachNote {
  pub title: String,
  pub content: String,
  pub date: String,
}

/// Progress update shared with the athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteUpdate {
  pub title: String,
  pub content: String,
  pub date: String,
}
