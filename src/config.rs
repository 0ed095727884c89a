use std::env;
use std::net::SocketAddr;

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://coach-desk.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_STRAVA_OAUTH_BASE: &str = "https://www.strava.com/oauth";
const DEFAULT_STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing required environment variable: {0}")]
  Missing(&'static str),

  #[error("Invalid value for {name}: {value}")]
  Invalid { name: &'static str, value: String },
}

/// Process configuration, read once at startup.
///
/// Only the coach password is required; each integration reports its own
/// missing settings when first used.
#[derive(Debug, Clone)]
pub struct AppConfig {
  pub database_url: String,
  pub bind_addr: SocketAddr,
  pub coach_password: String,

  pub anthropic_api_key: Option<String>,
  pub anthropic_base_url: String,
  pub anthropic_model: String,

  pub strava_client_id: Option<String>,
  pub strava_client_secret: Option<String>,
  pub strava_redirect_uri: Option<String>,
  pub strava_oauth_base: String,
  pub strava_api_base: String,

  pub portal_url: Option<String>,
  pub inquiries_api_key: Option<String>,
}

/// Unset and blank both count as absent
fn optional(name: &str) -> Option<String> {
  env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

fn or_default(name: &str, default: &str) -> String {
  optional(name).unwrap_or_else(|| default.to_string())
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let bind_raw = or_default("BIND_ADDR", DEFAULT_BIND_ADDR);
    let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
      name: "BIND_ADDR",
      value: bind_raw.clone(),
    })?;

    Ok(Self {
      database_url: or_default("DATABASE_URL", DEFAULT_DATABASE_URL),
      bind_addr,
      coach_password: optional("COACH_PASSWORD").ok_or(ConfigError::Missing("COACH_PASSWORD"))?,

      anthropic_api_key: optional("ANTHROPIC_API_KEY"),
      anthropic_base_url: or_default("ANTHROPIC_BASE_URL", DEFAULT_ANTHROPIC_BASE_URL),
      anthropic_model: or_default("ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL),

      strava_client_id: optional("STRAVA_CLIENT_ID"),
      strava_client_secret: optional("STRAVA_CLIENT_SECRET"),
      strava_redirect_uri: optional("STRAVA_REDIRECT_URI"),
      strava_oauth_base: or_default("STRAVA_OAUTH_BASE", DEFAULT_STRAVA_OAUTH_BASE),
      strava_api_base: or_default("STRAVA_API_BASE", DEFAULT_STRAVA_API_BASE),

      portal_url: optional("CLIENT_PORTAL_URL"),
      inquiries_api_key: optional("INQUIRIES_API_KEY"),
    })
  }

  /// Config with every integration pointed at `base_url`, for tests
  #[cfg(test)]
  pub fn for_tests(base_url: &str) -> Self {
    Self {
      database_url: "sqlite::memory:".into(),
      bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
      coach_password: "test-password".into(),
      anthropic_api_key: Some("test-key".into()),
      anthropic_base_url: base_url.to_string(),
      anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
      strava_client_id: Some("12345".into()),
      strava_client_secret: Some("strava-secret".into()),
      strava_redirect_uri: Some("http://localhost:3000/strava/callback".into()),
      strava_oauth_base: format!("{}/oauth", base_url),
      strava_api_base: format!("{}/api/v3", base_url),
      portal_url: Some(base_url.to_string()),
      inquiries_api_key: Some("portal-key".into()),
    }
  }
}
