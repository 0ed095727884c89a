//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database and store setup/teardown
//! - Mock data factories
//! - Helper assertions

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::AppState;
use crate::models::{
  Client, InjuryRecord, InjuryStatus, RaceGoal, RacePriority, Schedule, TrainingWeek,
  WeeklyCheckIn, Workout,
};
use crate::store::SqliteStore;
use crate::strava::{StravaActivity, StravaTokens};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

pub async fn setup_test_store() -> SqliteStore {
  SqliteStore::new(setup_test_db().await)
}

pub async fn teardown_test_store(store: SqliteStore) {
  teardown_test_db(store.pool().clone()).await;
}

/// App state over a fresh in-memory store, integrations pointed at `base_url`
pub async fn setup_test_state(base_url: &str) -> Arc<AppState> {
  Arc::new(AppState {
    store: Arc::new(setup_test_store().await),
    config: AppConfig::for_tests(base_url),
  })
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A fixed Monday used as "this week"
pub fn test_week() -> NaiveDate {
  NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

/// Build a schedule from (day, distance, notes) triples
pub fn schedule_of(days: &[(&str, &str, &str)]) -> Schedule {
  days
    .iter()
    .map(|(day, distance, notes)| (day.to_string(), Workout::new(distance, "", notes)))
    .collect()
}

/// The reference week: load 36.8, 33 miles, wednesday off
pub fn mock_schedule() -> Schedule {
  let mut schedule = schedule_of(&[
    ("monday", "5", "Easy"),
    ("tuesday", "6", "Tempo run"),
    ("wednesday", "0", "Rest"),
    ("thursday", "5", "Easy"),
    ("friday", "4", "Easy"),
    ("saturday", "10", "Long run"),
    ("sunday", "3", "Recovery"),
  ]);
  for workout in schedule.values_mut() {
    workout.pace = "9:00".into();
  }
  schedule
}

/// A history entry `weeks_ago` weeks before `test_week()`
pub fn training_week(weeks_ago: i64, days: &[(&str, &str, &str)]) -> TrainingWeek {
  TrainingWeek::from_schedule(test_week() - Duration::weeks(weeks_ago), schedule_of(days))
}

pub fn mock_client(email: &str) -> Client {
  Client {
    email: email.to_string(),
    name: "Test Runner".to_string(),
    password: "secret".to_string(),
    strava_connected: false,
    strava_athlete_id: None,
  }
}

/// A-race half marathon `days_out` days from today
pub fn mock_race_goal(days_out: i64) -> RaceGoal {
  RaceGoal {
    id: String::new(),
    date: Utc::now().date_naive() + Duration::days(days_out),
    race_type: "Half Marathon".to_string(),
    target_time: Some("1:45:00".to_string()),
    priority: RacePriority::A,
    notes: None,
  }
}

pub fn mock_injury() -> InjuryRecord {
  InjuryRecord {
    id: String::new(),
    date: NaiveDate::from_ymd_opt(2026, 10, 1).expect("valid date"),
    description: "Sore calf".to_string(),
    status: InjuryStatus::Recovering,
    affected_areas: vec!["calf".to_string(), "achilles".to_string()],
    notes: None,
  }
}

pub fn mock_check_in(body: u8, sleep: u8, stress: u8) -> WeeklyCheckIn {
  WeeklyCheckIn {
    week_start: test_week(),
    body_feeling: body,
    sleep_quality: sleep,
    stress_level: stress,
    notes: String::new(),
    created_at: Utc::now(),
  }
}

/// Tokens valid for `hours` more hours
pub fn mock_strava_tokens(hours: i64) -> StravaTokens {
  StravaTokens {
    access_token: "access-123".to_string(),
    refresh_token: "refresh-456".to_string(),
    expires_at: Utc::now() + Duration::hours(hours),
    athlete_id: Some("98765".to_string()),
  }
}

/// A run starting at `start_date` (RFC 3339) covering `meters`
pub fn mock_activity(id: i64, start_date: &str, meters: f64) -> StravaActivity {
  StravaActivity {
    id,
    name: "Morning Run".to_string(),
    activity_type: "Run".to_string(),
    sport_type: "Run".to_string(),
    start_date: start_date.parse().expect("RFC 3339 start date"),
    distance: meters,
    moving_time: 3600,
    elapsed_time: 3700,
    average_speed: 2.98,
    max_speed: 4.1,
    total_elevation_gain: Some(40.0),
    average_heartrate: Some(145.0),
    max_heartrate: Some(165.0),
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Create a DateTime N days ago from now
pub fn datetime_days_ago(days: i64) -> DateTime<Utc> {
  Utc::now() - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::schedule::week_start;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table'
       AND name IN ('clients', 'week_schedules', 'check_ins', 'strava_tokens')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 4, "Expected 4 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    assert_eq!(week_start(test_week()), test_week());
    assert_eq!(mock_schedule().len(), 7);
    assert_eq!(training_week(2, &[]).week_start.to_string(), "2026-10-05");
    assert!(mock_check_in(3, 3, 3).validate().is_ok());
    assert!(!mock_strava_tokens(6).needs_refresh());
    assert!(mock_activity(1, "2026-10-12T07:00:00Z", 5000.0).is_run());
  }
}
