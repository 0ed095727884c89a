use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use super::{ClientKey, CoachRepository, StoreError};
use crate::models::{
  AthleteUpdate, Client, CoachNote, InjuryRecord, InjuryStatus, RaceGoal, RacePriority, Schedule,
  WeeklyCheckIn,
};
use crate::strava::StravaTokens;

/// Every table holding rows owned by a client (besides `clients` itself)
const CLIENT_SCOPED_TABLES: [&str; 7] = [
  "week_schedules",
  "coach_notes",
  "athlete_updates",
  "race_goals",
  "injuries",
  "check_ins",
  "strava_tokens",
];

const NOTES_TABLE: &str = "coach_notes";
const UPDATES_TABLE: &str = "athlete_updates";

type JournalRow = (String, String, String);
type RaceGoalRow = (String, NaiveDate, String, Option<String>, String, Option<String>);
type InjuryRow = (String, NaiveDate, String, String, String, Option<String>);
type CheckInRow = (NaiveDate, i64, i64, i64, String, DateTime<Utc>);

/// SQLite-backed repository
#[derive(Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  /// ---------------------------------------------------------------------------
  /// Notes / Updates share one table shape
  /// ---------------------------------------------------------------------------

  async fn list_journal(&self, table: &str, key: &ClientKey) -> Result<Vec<JournalRow>, StoreError> {
    let sql = format!(
      "SELECT title, content, date FROM {} WHERE client_email = ?1 ORDER BY id DESC",
      table
    );
    let rows: Vec<JournalRow> = sqlx::query_as(&sql)
      .bind(key.as_str())
      .fetch_all(&self.pool)
      .await?;
    Ok(rows)
  }

  async fn add_journal(
    &self,
    table: &str,
    key: &ClientKey,
    title: &str,
    content: &str,
    date: &str,
  ) -> Result<(), StoreError> {
    let sql = format!(
      "INSERT INTO {} (client_email, title, content, date) VALUES (?1, ?2, ?3, ?4)",
      table
    );
    sqlx::query(&sql)
      .bind(key.as_str())
      .bind(title)
      .bind(content)
      .bind(date)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn delete_journal(&self, table: &str, key: &ClientKey, index: usize) -> Result<(), StoreError> {
    let not_found = || StoreError::NotFound(format!("{} entry {} for {}", table, index, key));
    // SQLite reads a negative OFFSET as zero
    let offset = i64::try_from(index).map_err(|_| not_found())?;

    let sql = format!(
      "SELECT id FROM {} WHERE client_email = ?1 ORDER BY id DESC LIMIT 1 OFFSET ?2",
      table
    );
    let id: Option<i64> = sqlx::query_scalar(&sql)
      .bind(key.as_str())
      .bind(offset)
      .fetch_optional(&self.pool)
      .await?;

    let id = id.ok_or_else(not_found)?;

    sqlx::query(&format!("DELETE FROM {} WHERE id = ?1", table))
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

/// Corrupt stored JSON reads as an empty week
fn decode_schedule(key: &ClientKey, week_start: NaiveDate, json: &str) -> Schedule {
  serde_json::from_str(json).unwrap_or_else(|e| {
    warn!(client = %key, %week_start, "Stored schedule is unreadable, using empty week: {}", e);
    Schedule::new()
  })
}

#[async_trait]
impl CoachRepository for SqliteStore {
  async fn ping(&self) -> Result<(), StoreError> {
    sqlx::query("SELECT 1").execute(&self.pool).await?;
    Ok(())
  }

  /// ---------------------------------------------------------------------------
  /// Clients
  /// ---------------------------------------------------------------------------

  async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
    let rows: Vec<(String, String, String, bool, Option<String>)> = sqlx::query_as(
      "SELECT email, name, password, strava_connected, strava_athlete_id FROM clients ORDER BY name",
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(email, name, password, strava_connected, strava_athlete_id)| Client {
          email,
          name,
          password,
          strava_connected,
          strava_athlete_id,
        })
        .collect(),
    )
  }

  async fn get_client(&self, key: &ClientKey) -> Result<Option<Client>, StoreError> {
    let row: Option<(String, String, String, bool, Option<String>)> = sqlx::query_as(
      "SELECT email, name, password, strava_connected, strava_athlete_id
             FROM clients WHERE email = ?1",
    )
    .bind(key.as_str())
    .fetch_optional(&self.pool)
    .await?;

    Ok(row.map(|(email, name, password, strava_connected, strava_athlete_id)| Client {
      email,
      name,
      password,
      strava_connected,
      strava_athlete_id,
    }))
  }

  async fn save_client(&self, client: &Client) -> Result<(), StoreError> {
    let key = ClientKey::new(&client.email);

    // Strava linkage is owned by the token methods and survives edits
    sqlx::query(
      r#"
      INSERT INTO clients (email, name, password, strava_connected, strava_athlete_id)
      VALUES (?1, ?2, ?3, ?4, ?5)
      ON CONFLICT(email) DO UPDATE SET
        name = excluded.name,
        password = excluded.password
      "#,
    )
    .bind(key.as_str())
    .bind(&client.name)
    .bind(&client.password)
    .bind(client.strava_connected)
    .bind(&client.strava_athlete_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn delete_client(&self, key: &ClientKey) -> Result<bool, StoreError> {
    let mut tx = self.pool.begin().await?;

    for table in CLIENT_SCOPED_TABLES {
      sqlx::query(&format!("DELETE FROM {} WHERE client_email = ?1", table))
        .bind(key.as_str())
        .execute(&mut *tx)
        .await?;
    }

    let result = sqlx::query("DELETE FROM clients WHERE email = ?1")
      .bind(key.as_str())
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
  }

  /// ---------------------------------------------------------------------------
  /// Schedules
  /// ---------------------------------------------------------------------------

  async fn get_schedule(&self, key: &ClientKey, week_start: NaiveDate) -> Result<Schedule, StoreError> {
    let json: Option<String> = sqlx::query_scalar(
      "SELECT schedule_json FROM week_schedules WHERE client_email = ?1 AND week_start = ?2",
    )
    .bind(key.as_str())
    .bind(week_start)
    .fetch_optional(&self.pool)
    .await?;

    Ok(
      json
        .map(|j| decode_schedule(key, week_start, &j))
        .unwrap_or_default(),
    )
  }

  async fn save_schedule(
    &self,
    key: &ClientKey,
    week_start: NaiveDate,
    schedule: &Schedule,
  ) -> Result<(), StoreError> {
    let json = serde_json::to_string(schedule).unwrap_or_default();

    sqlx::query(
      r#"
      INSERT INTO week_schedules (client_email, week_start, schedule_json, updated_at)
      VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
      ON CONFLICT(client_email, week_start) DO UPDATE SET
        schedule_json = excluded.schedule_json,
        updated_at = CURRENT_TIMESTAMP
      "#,
    )
    .bind(key.as_str())
    .bind(week_start)
    .bind(&json)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn schedules_before(
    &self,
    key: &ClientKey,
    before: NaiveDate,
    limit: usize,
  ) -> Result<Vec<(NaiveDate, Schedule)>, StoreError> {
    let rows: Vec<(NaiveDate, String)> = sqlx::query_as(
      r#"
      SELECT week_start, schedule_json FROM week_schedules
      WHERE client_email = ?1 AND week_start < ?2
      ORDER BY week_start DESC
      LIMIT ?3
      "#,
    )
    .bind(key.as_str())
    .bind(before)
    .bind(limit as i64)
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(week_start, json)| (week_start, decode_schedule(key, week_start, &json)))
        .collect(),
    )
  }

  /// ---------------------------------------------------------------------------
  /// Notes and Updates
  /// ---------------------------------------------------------------------------

  async fn list_notes(&self, key: &ClientKey) -> Result<Vec<CoachNote>, StoreError> {
    let rows = self.list_journal(NOTES_TABLE, key).await?;
    Ok(
      rows
        .into_iter()
        .map(|(title, content, date)| CoachNote { title, content, date })
        .collect(),
    )
  }

  async fn add_note(&self, key: &ClientKey, note: &CoachNote) -> Result<(), StoreError> {
    self
      .add_journal(NOTES_TABLE, key, &note.title, &note.content, &note.date)
      .await
  }

  async fn delete_note(&self, key: &ClientKey, index: usize) -> Result<(), StoreError> {
    self.delete_journal(NOTES_TABLE, key, index).await
  }

  async fn list_updates(&self, key: &ClientKey) -> Result<Vec<AthleteUpdate>, StoreError> {
    let rows = self.list_journal(UPDATES_TABLE, key).await?;
    Ok(
      rows
        .into_iter()
        .map(|(title, content, date)| AthleteUpdate { title, content, date })
        .collect(),
    )
  }

  async fn add_update(&self, key: &ClientKey, update: &AthleteUpdate) -> Result<(), StoreError> {
    self
      .add_journal(UPDATES_TABLE, key, &update.title, &update.content, &update.date)
      .await
  }

  async fn delete_update(&self, key: &ClientKey, index: usize) -> Result<(), StoreError> {
    self.delete_journal(UPDATES_TABLE, key, index).await
  }

  /// ---------------------------------------------------------------------------
  /// Race Goals, Injuries, Check-ins
  /// ---------------------------------------------------------------------------

  async fn list_race_goals(&self, key: &ClientKey) -> Result<Vec<RaceGoal>, StoreError> {
    let rows: Vec<RaceGoalRow> = sqlx::query_as(
      r#"
      SELECT id, date, race_type, target_time, priority, notes
      FROM race_goals WHERE client_email = ?1
      ORDER BY date
      "#,
    )
    .bind(key.as_str())
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(id, date, race_type, target_time, priority, notes)| RaceGoal {
          priority: priority.parse().unwrap_or_else(|e| {
            warn!(client = %key, race = %id, "{}; treating as C-race", e);
            RacePriority::C
          }),
          id,
          date,
          race_type,
          target_time,
          notes,
        })
        .collect(),
    )
  }

  async fn save_race_goal(&self, key: &ClientKey, goal: &RaceGoal) -> Result<RaceGoal, StoreError> {
    let mut goal = goal.clone();
    if goal.id.is_empty() {
      goal.id = Uuid::new_v4().to_string();
    }

    sqlx::query(
      r#"
      INSERT INTO race_goals (id, client_email, date, race_type, target_time, priority, notes)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
      ON CONFLICT(id) DO UPDATE SET
        date = excluded.date,
        race_type = excluded.race_type,
        target_time = excluded.target_time,
        priority = excluded.priority,
        notes = excluded.notes
      "#,
    )
    .bind(&goal.id)
    .bind(key.as_str())
    .bind(goal.date)
    .bind(&goal.race_type)
    .bind(&goal.target_time)
    .bind(goal.priority.as_str())
    .bind(&goal.notes)
    .execute(&self.pool)
    .await?;

    Ok(goal)
  }

  async fn list_injuries(&self, key: &ClientKey) -> Result<Vec<InjuryRecord>, StoreError> {
    let rows: Vec<InjuryRow> = sqlx::query_as(
      r#"
      SELECT id, date, description, status, affected_areas_json, notes
      FROM injuries WHERE client_email = ?1
      ORDER BY date DESC
      "#,
    )
    .bind(key.as_str())
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(id, date, description, status, areas_json, notes)| {
          let status = status.parse().unwrap_or_else(|e| {
            warn!(client = %key, injury = %id, "{}; treating as active", e);
            InjuryStatus::Active
          });
          let affected_areas = serde_json::from_str(&areas_json).unwrap_or_else(|e| {
            warn!(client = %key, injury = %id, "Unreadable affected areas: {}", e);
            Vec::new()
          });
          InjuryRecord {
            id,
            date,
            description,
            status,
            affected_areas,
            notes,
          }
        })
        .collect(),
    )
  }

  async fn save_injury(&self, key: &ClientKey, injury: &InjuryRecord) -> Result<InjuryRecord, StoreError> {
    let mut injury = injury.clone();
    if injury.id.is_empty() {
      injury.id = Uuid::new_v4().to_string();
    }
    let areas_json = serde_json::to_string(&injury.affected_areas).unwrap_or_default();

    sqlx::query(
      r#"
      INSERT INTO injuries (id, client_email, date, description, status, affected_areas_json, notes)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
      ON CONFLICT(id) DO UPDATE SET
        date = excluded.date,
        description = excluded.description,
        status = excluded.status,
        affected_areas_json = excluded.affected_areas_json,
        notes = excluded.notes
      "#,
    )
    .bind(&injury.id)
    .bind(key.as_str())
    .bind(injury.date)
    .bind(&injury.description)
    .bind(injury.status.to_string())
    .bind(&areas_json)
    .bind(&injury.notes)
    .execute(&self.pool)
    .await?;

    Ok(injury)
  }

  async fn list_check_ins(&self, key: &ClientKey) -> Result<Vec<WeeklyCheckIn>, StoreError> {
    let rows: Vec<CheckInRow> = sqlx::query_as(
      r#"
      SELECT week_start, body_feeling, sleep_quality, stress_level, notes, created_at
      FROM check_ins WHERE client_email = ?1
      ORDER BY created_at DESC, id DESC
      "#,
    )
    .bind(key.as_str())
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(week_start, body, sleep, stress, notes, created_at)| WeeklyCheckIn {
          week_start,
          body_feeling: body as u8,
          sleep_quality: sleep as u8,
          stress_level: stress as u8,
          notes,
          created_at,
        })
        .collect(),
    )
  }

  async fn add_check_in(&self, key: &ClientKey, check_in: &WeeklyCheckIn) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO check_ins (
        client_email, week_start, body_feeling, sleep_quality, stress_level, notes, created_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
      "#,
    )
    .bind(key.as_str())
    .bind(check_in.week_start)
    .bind(check_in.body_feeling as i64)
    .bind(check_in.sleep_quality as i64)
    .bind(check_in.stress_level as i64)
    .bind(&check_in.notes)
    .bind(check_in.created_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  /// ---------------------------------------------------------------------------
  /// Strava Tokens
  /// ---------------------------------------------------------------------------

  async fn load_strava_tokens(&self, key: &ClientKey) -> Result<Option<StravaTokens>, StoreError> {
    let row: Option<(String, String, DateTime<Utc>, Option<String>)> = sqlx::query_as(
      "SELECT access_token, refresh_token, expires_at, athlete_id
             FROM strava_tokens WHERE client_email = ?1",
    )
    .bind(key.as_str())
    .fetch_optional(&self.pool)
    .await?;

    Ok(row.map(|(access_token, refresh_token, expires_at, athlete_id)| StravaTokens {
      access_token,
      refresh_token,
      expires_at,
      athlete_id,
    }))
  }

  async fn save_strava_tokens(&self, key: &ClientKey, tokens: &StravaTokens) -> Result<(), StoreError> {
    let mut tx = self.pool.begin().await?;

    // A refresh response carries no athlete; keep the one we already know
    sqlx::query(
      r#"
      INSERT INTO strava_tokens (client_email, access_token, refresh_token, expires_at, athlete_id)
      VALUES (?1, ?2, ?3, ?4, ?5)
      ON CONFLICT(client_email) DO UPDATE SET
        access_token = excluded.access_token,
        refresh_token = excluded.refresh_token,
        expires_at = excluded.expires_at,
        athlete_id = COALESCE(excluded.athlete_id, strava_tokens.athlete_id)
      "#,
    )
    .bind(key.as_str())
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(tokens.expires_at)
    .bind(&tokens.athlete_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
      r#"
      UPDATE clients SET
        strava_connected = 1,
        strava_athlete_id = COALESCE(?2, strava_athlete_id)
      WHERE email = ?1
      "#,
    )
    .bind(key.as_str())
    .bind(&tokens.athlete_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
  }

  async fn clear_strava_tokens(&self, key: &ClientKey) -> Result<(), StoreError> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM strava_tokens WHERE client_email = ?1")
      .bind(key.as_str())
      .execute(&mut *tx)
      .await?;

    sqlx::query(
      "UPDATE clients SET strava_connected = 0, strava_athlete_id = NULL WHERE email = ?1",
    )
    .bind(key.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::training_history;
  use crate::test_utils::*;
  use chrono::Duration;

  #[tokio::test]
  async fn test_client_roundtrip_normalizes_email() {
    let store = setup_test_store().await;

    let mut client = mock_client("Jane.Runner@Example.com");
    store.save_client(&client).await.unwrap();

    let key = ClientKey::new("jane.runner@example.com");
    let loaded = store.get_client(&key).await.unwrap().expect("client saved");
    assert_eq!(loaded.email, "jane.runner@example.com");
    assert_eq!(loaded.name, "Test Runner");

    client.name = "Jane Runner".into();
    store.save_client(&client).await.unwrap();
    let clients = store.list_clients().await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "Jane Runner");

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_missing_week_reads_empty() {
    let store = setup_test_store().await;
    let key = ClientKey::new("a@b.com");

    let schedule = store.get_schedule(&key, test_week()).await.unwrap();
    assert!(schedule.is_empty());

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_schedule_save_and_history_order() {
    let store = setup_test_store().await;
    let key = ClientKey::new("a@b.com");
    let this_week = test_week();

    for weeks_ago in 1..=5 {
      let start = this_week - Duration::weeks(weeks_ago);
      let schedule = schedule_of(&[("monday", &format!("{}", weeks_ago * 2), "")]);
      store.save_schedule(&key, start, &schedule).await.unwrap();
    }
    // the current week itself is not history
    store.save_schedule(&key, this_week, &mock_schedule()).await.unwrap();

    let history = training_history(&store, &key, this_week, 4).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].week_start, this_week - Duration::weeks(1));
    assert_eq!(history[0].total_miles, 2.0);
    assert_eq!(history[3].week_start, this_week - Duration::weeks(4));
    assert_eq!(history[3].workout_count, 1);

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_corrupt_schedule_reads_empty() {
    let store = setup_test_store().await;
    let key = ClientKey::new("a@b.com");

    sqlx::query(
      "INSERT INTO week_schedules (client_email, week_start, schedule_json) VALUES (?1, ?2, 'not json')",
    )
    .bind(key.as_str())
    .bind(test_week())
    .execute(store.pool())
    .await
    .unwrap();

    let schedule = store.get_schedule(&key, test_week()).await.unwrap();
    assert!(schedule.is_empty());

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_notes_newest_first_and_delete_by_index() {
    let store = setup_test_store().await;
    let key = ClientKey::new("a@b.com");

    for title in ["first", "second", "third"] {
      let note = CoachNote {
        title: title.into(),
        content: "c".into(),
        date: "Oct 19, 2026".into(),
      };
      store.add_note(&key, &note).await.unwrap();
    }

    let notes = store.list_notes(&key).await.unwrap();
    let titles: Vec<_> = notes.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["third", "second", "first"]);

    store.delete_note(&key, 1).await.unwrap();
    let titles: Vec<_> = store
      .list_notes(&key)
      .await
      .unwrap()
      .into_iter()
      .map(|n| n.title)
      .collect();
    assert_eq!(titles, vec!["third", "first"]);

    let err = store.delete_note(&key, 5).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    // updates live in their own list
    assert!(store.list_updates(&key).await.unwrap().is_empty());

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_huge_index_deletes_nothing() {
    let store = setup_test_store().await;
    let key = ClientKey::new("a@b.com");

    for title in ["old", "new"] {
      let note = CoachNote {
        title: title.into(),
        content: "c".into(),
        date: "Oct 19, 2026".into(),
      };
      store.add_note(&key, &note).await.unwrap();
      let update = AthleteUpdate {
        title: title.into(),
        content: "c".into(),
        date: "Oct 19, 2026".into(),
      };
      store.add_update(&key, &update).await.unwrap();
    }

    let err = store.delete_note(&key, usize::MAX).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    let err = store.delete_update(&key, usize::MAX).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    assert_eq!(store.list_notes(&key).await.unwrap().len(), 2);
    assert_eq!(store.list_updates(&key).await.unwrap()[0].title, "new");

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_race_goals_and_injuries_get_ids() {
    let store = setup_test_store().await;
    let key = ClientKey::new("a@b.com");

    let goal = store.save_race_goal(&key, &mock_race_goal(30)).await.unwrap();
    assert!(!goal.id.is_empty());
    let injury = store.save_injury(&key, &mock_injury()).await.unwrap();
    assert!(!injury.id.is_empty());

    let goals = store.list_race_goals(&key).await.unwrap();
    assert_eq!(goals, vec![goal]);
    let injuries = store.list_injuries(&key).await.unwrap();
    assert_eq!(injuries, vec![injury]);

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_check_ins_latest_first() {
    let store = setup_test_store().await;
    let key = ClientKey::new("a@b.com");

    let mut older = mock_check_in(2, 2, 4);
    older.created_at = datetime_days_ago(7);
    let newer = mock_check_in(4, 4, 2);
    store.add_check_in(&key, &older).await.unwrap();
    store.add_check_in(&key, &newer).await.unwrap();

    let check_ins = store.list_check_ins(&key).await.unwrap();
    assert_eq!(check_ins.len(), 2);
    assert_eq!(check_ins[0].body_feeling, 4);

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_strava_tokens_mark_client_connected() {
    let store = setup_test_store().await;
    let client = mock_client("a@b.com");
    store.save_client(&client).await.unwrap();
    let key = ClientKey::new(&client.email);

    let tokens = mock_strava_tokens(6);
    store.save_strava_tokens(&key, &tokens).await.unwrap();

    let loaded = store.load_strava_tokens(&key).await.unwrap().expect("tokens saved");
    assert_eq!(loaded.access_token, tokens.access_token);
    assert_eq!(loaded.athlete_id.as_deref(), Some("98765"));
    let connected = store.get_client(&key).await.unwrap().unwrap();
    assert!(connected.strava_connected);

    // refresh without athlete keeps the known one
    let refreshed = StravaTokens {
      athlete_id: None,
      ..mock_strava_tokens(6)
    };
    store.save_strava_tokens(&key, &refreshed).await.unwrap();
    let loaded = store.load_strava_tokens(&key).await.unwrap().unwrap();
    assert_eq!(loaded.athlete_id.as_deref(), Some("98765"));

    store.clear_strava_tokens(&key).await.unwrap();
    assert!(store.load_strava_tokens(&key).await.unwrap().is_none());
    assert!(!store.get_client(&key).await.unwrap().unwrap().strava_connected);

    teardown_test_store(store).await;
  }

  #[tokio::test]
  async fn test_delete_client_removes_scoped_records() {
    let store = setup_test_store().await;
    let client = mock_client("gone@b.com");
    store.save_client(&client).await.unwrap();
    let key = ClientKey::new(&client.email);
    let other = ClientKey::new("stays@b.com");

    store.save_schedule(&key, test_week(), &mock_schedule()).await.unwrap();
    store.save_schedule(&other, test_week(), &mock_schedule()).await.unwrap();
    store
      .add_note(&key, &CoachNote { title: "t".into(), content: "c".into(), date: "d".into() })
      .await
      .unwrap();
    store.save_strava_tokens(&key, &mock_strava_tokens(6)).await.unwrap();

    assert!(store.delete_client(&key).await.unwrap());
    assert!(store.get_client(&key).await.unwrap().is_none());
    assert!(store.get_schedule(&key, test_week()).await.unwrap().is_empty());
    assert!(store.list_notes(&key).await.unwrap().is_empty());
    assert!(store.load_strava_tokens(&key).await.unwrap().is_none());
    assert!(!store.get_schedule(&other, test_week()).await.unwrap().is_empty());

    assert!(!store.delete_client(&key).await.unwrap());

    teardown_test_store(store).await;
  }
}
