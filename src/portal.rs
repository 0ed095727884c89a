//! Client portal proxy for lead inquiries
//!
//! Inquiries are collected by the public-facing portal; this side only lists
//! them and pushes status or note changes back.

use reqwest::Client;
use tracing::debug;

use crate::config::AppConfig;
use crate::models::{Inquiry, InquiryPatch, InquiryStatus};

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
  #[error("Missing configuration: {0}")]
  MissingConfig(&'static str),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Portal returned {status}: {body}")]
  Api { status: u16, body: String },
}

pub struct PortalClient {
  client: Client,
  base_url: String,
  api_key: String,
}

impl PortalClient {
  pub fn new(base_url: &str, api_key: &str) -> Self {
    Self {
      client: Client::new(),
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
    }
  }

  pub fn from_config(config: &AppConfig) -> Result<Self, PortalError> {
    let base_url = config
      .portal_url
      .as_deref()
      .ok_or(PortalError::MissingConfig("CLIENT_PORTAL_URL"))?;
    let api_key = config
      .inquiries_api_key
      .as_deref()
      .ok_or(PortalError::MissingConfig("INQUIRIES_API_KEY"))?;
    Ok(Self::new(base_url, api_key))
  }

  fn endpoint(&self) -> String {
    format!("{}/api/inquiries", self.base_url)
  }

  async fn check(response: reqwest::Response) -> Result<reqwest::Response, PortalError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PortalError::Api {
      status: status.as_u16(),
      body,
    })
  }

  pub async fn list_inquiries(&self) -> Result<Vec<Inquiry>, PortalError> {
    let response = self
      .client
      .get(self.endpoint())
      .header("x-api-key", &self.api_key)
      .send()
      .await?;

    let inquiries: Vec<Inquiry> = Self::check(response).await?.json().await?;
    debug!(count = inquiries.len(), "Fetched inquiries from portal");
    Ok(inquiries)
  }

  /// Apply a partial update; the portal answers with the updated inquiry
  pub async fn update_inquiry(&self, patch: &InquiryPatch) -> Result<Inquiry, PortalError> {
    let response = self
      .client
      .patch(self.endpoint())
      .header("x-api-key", &self.api_key)
      .json(patch)
      .send()
      .await?;

    Ok(Self::check(response).await?.json().await?)
  }
}

/// Keep only inquiries in `status`; `None` keeps everything
pub fn filter_by_status(inquiries: Vec<Inquiry>, status: Option<InquiryStatus>) -> Vec<Inquiry> {
  match status {
    Some(wanted) => inquiries.into_iter().filter(|i| i.status == wanted).collect(),
    None => inquiries,
  }
}
