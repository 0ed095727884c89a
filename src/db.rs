use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::store::CoachRepository;

pub type DbPool = SqlitePool;

/// Shared state handed to every handler
pub struct AppState {
  pub store: Arc<dyn CoachRepository>,
  pub config: AppConfig,
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> Result<DbPool, Box<dyn std::error::Error + Send + Sync>> {
  info!("Initializing database at: {}", database_url);

  // Each connection to an in-memory database is its own database
  let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect(database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_initialize_in_memory_runs_migrations() {
    let pool = initialize_db("sqlite::memory:").await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(count, 0);
  }
}
