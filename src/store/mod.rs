//! Typed persistence for everything scoped to a client
//!
//! Records are addressed by `ClientKey` (normalized email) rather than ad hoc
//! string prefixes. Handlers and scoring code depend on `CoachRepository`;
//! `SqliteStore` is the production implementation.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
  AthleteUpdate, Client, CoachNote, InjuryRecord, RaceGoal, Schedule, TrainingWeek,
  WeeklyCheckIn,
};
use crate::strava::StravaTokens;

/// ---------------------------------------------------------------------------
/// Keys and Errors
/// ---------------------------------------------------------------------------

/// Client identity: the account email, trimmed and lowercased
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientKey(String);

impl ClientKey {
  pub fn new(email: &str) -> Self {
    Self(email.trim().to_lowercase())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl std::fmt::Display for ClientKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Not found: {0}")]
  NotFound(String),
}

/// ---------------------------------------------------------------------------
/// Repository
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait CoachRepository: Send + Sync {
  async fn ping(&self) -> Result<(), StoreError>;

  // Clients
  async fn list_clients(&self) -> Result<Vec<Client>, StoreError>;
  async fn get_client(&self, key: &ClientKey) -> Result<Option<Client>, StoreError>;
  async fn save_client(&self, client: &Client) -> Result<(), StoreError>;
  /// Removes the account and every record scoped to it. Returns false when
  /// no such client existed.
  async fn delete_client(&self, key: &ClientKey) -> Result<bool, StoreError>;

  // Week schedules; a week never saved reads as an empty schedule
  async fn get_schedule(&self, key: &ClientKey, week_start: NaiveDate) -> Result<Schedule, StoreError>;
  async fn save_schedule(
    &self,
    key: &ClientKey,
    week_start: NaiveDate,
    schedule: &Schedule,
  ) -> Result<(), StoreError>;
  /// Saved weeks strictly before `before`, most recent first
  async fn schedules_before(
    &self,
    key: &ClientKey,
    before: NaiveDate,
    limit: usize,
  ) -> Result<Vec<(NaiveDate, Schedule)>, StoreError>;

  // Notes and updates, newest first; index addresses that order
  async fn list_notes(&self, key: &ClientKey) -> Result<Vec<CoachNote>, StoreError>;
  async fn add_note(&self, key: &ClientKey, note: &CoachNote) -> Result<(), StoreError>;
  async fn delete_note(&self, key: &ClientKey, index: usize) -> Result<(), StoreError>;
  async fn list_updates(&self, key: &ClientKey) -> Result<Vec<AthleteUpdate>, StoreError>;
  async fn add_update(&self, key: &ClientKey, update: &AthleteUpdate) -> Result<(), StoreError>;
  async fn delete_update(&self, key: &ClientKey, index: usize) -> Result<(), StoreError>;

  // Athlete context
  async fn list_race_goals(&self, key: &ClientKey) -> Result<Vec<RaceGoal>, StoreError>;
  async fn save_race_goal(&self, key: &ClientKey, goal: &RaceGoal) -> Result<RaceGoal, StoreError>;
  async fn list_injuries(&self, key: &ClientKey) -> Result<Vec<InjuryRecord>, StoreError>;
  async fn save_injury(&self, key: &ClientKey, injury: &InjuryRecord) -> Result<InjuryRecord, StoreError>;
  /// Most recent first
  async fn list_check_ins(&self, key: &ClientKey) -> Result<Vec<WeeklyCheckIn>, StoreError>;
  async fn add_check_in(&self, key: &ClientKey, check_in: &WeeklyCheckIn) -> Result<(), StoreError>;

  // Strava tokens
  async fn load_strava_tokens(&self, key: &ClientKey) -> Result<Option<StravaTokens>, StoreError>;
  async fn save_strava_tokens(&self, key: &ClientKey, tokens: &StravaTokens) -> Result<(), StoreError>;
  async fn clear_strava_tokens(&self, key: &ClientKey) -> Result<(), StoreError>;
}

/// Prior weeks as training-history summaries, most recent first.
/// Totals are recomputed from each stored schedule.
pub async fn training_history(
  repo: &dyn CoachRepository,
  key: &ClientKey,
  before: NaiveDate,
  weeks: usize,
) -> Result<Vec<TrainingWeek>, StoreError> {
  let weeks = repo.schedules_before(key, before, weeks).await?;
  Ok(
    weeks
      .into_iter()
      .map(|(week_start, schedule)| TrainingWeek::from_schedule(week_start, schedule))
      .collect(),
  )
}
