pub mod analysis;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod portal;
pub mod store;
pub mod strava;
pub mod validation;

#[cfg(test)]
mod test_utils;

use axum::{
  middleware,
  routing::{delete, get, post},
  Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use commands::{ai, athlete, clients, inquiries, journal, schedules, strava as strava_routes};
use config::AppConfig;
use db::AppState;
use store::SqliteStore;

const DEFAULT_LOG_FILTER: &str = "coach_desk_lib=info,coach_desk=info,tower_http=info";

/// Every route except `/health` requires the coach password header
pub fn app(state: Arc<AppState>) -> Router {
  let protected = Router::new()
    // Clients
    .route("/clients", get(clients::list_clients).post(clients::save_client))
    .route(
      "/clients/:email",
      get(clients::get_client).delete(clients::delete_client),
    )
    // Schedules
    .route(
      "/clients/:email/schedules/:week_start",
      get(schedules::get_schedule).put(schedules::put_schedule),
    )
    .route(
      "/clients/:email/schedules/:week_start/analyze",
      post(schedules::analyze_schedule),
    )
    .route("/clients/:email/history", get(schedules::get_history))
    // Journal
    .route(
      "/clients/:email/notes",
      get(journal::list_notes).post(journal::add_note),
    )
    .route("/clients/:email/notes/:index", delete(journal::delete_note))
    .route(
      "/clients/:email/updates",
      get(journal::list_updates).post(journal::add_update),
    )
    .route("/clients/:email/updates/:index", delete(journal::delete_update))
    // Athlete context
    .route(
      "/clients/:email/race-goals",
      get(athlete::list_race_goals).post(athlete::save_race_goal),
    )
    .route(
      "/clients/:email/injuries",
      get(athlete::list_injuries).post(athlete::save_injury),
    )
    .route(
      "/clients/:email/check-ins",
      get(athlete::list_check_ins).post(athlete::add_check_in),
    )
    .route("/clients/:email/context", get(athlete::get_context))
    // AI
    .route("/generate-schedule", post(ai::generate_schedule))
    // Strava
    .route("/clients/:email/strava", delete(strava_routes::disconnect))
    .route("/clients/:email/strava/auth-url", get(strava_routes::auth_url))
    .route("/clients/:email/strava/activities", get(strava_routes::activities))
    .route("/clients/:email/strava/weekly", get(strava_routes::weekly))
    .route("/clients/:email/strava/completion", get(strava_routes::completion))
    .route("/strava/token", post(strava_routes::exchange_token))
    .route("/strava/refresh", post(strava_routes::refresh))
    // Inquiries
    .route(
      "/inquiries",
      get(inquiries::list_inquiries).patch(inquiries::update_inquiry),
    )
    .route_layer(middleware::from_fn_with_state(
      state.clone(),
      commands::require_coach,
    ));

  Router::new()
    .route("/health", get(commands::health))
    .merge(protected)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// ---------------------------------------------------------------------------
/// Startup
/// ---------------------------------------------------------------------------

fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
  // A second init (tests, embedding) keeps the first subscriber
  let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  init_logging();

  let config = AppConfig::from_env()?;
  let pool = db::initialize_db(&config.database_url).await?;

  if config.anthropic_api_key.is_none() {
    info!("ANTHROPIC_API_KEY not set; schedule generation will fail until it is");
  }

  let bind_addr = config.bind_addr;
  let state = Arc::new(AppState {
    store: Arc::new(SqliteStore::new(pool)),
    config,
  });

  let listener = tokio::net::TcpListener::bind(bind_addr).await?;
  info!("Listening on {}", listener.local_addr()?);

  axum::serve(listener, app(state))
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  use tokio::signal;

  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      error!("Failed to listen for Ctrl+C: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        error!("Failed to install SIGTERM handler: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  info!("Shutdown signal received");
}
