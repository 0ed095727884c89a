use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
  New,
  Contacted,
  Onboarded,
  Declined,
}

/// A coaching signup collected by the client portal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
  pub id: String,
  pub created_at: DateTime<Utc>,
  pub status: InquiryStatus,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub experience_level: String,
  #[serde(default)]
  pub program_interest: String,
  #[serde(default)]
  pub weekly_mileage: String,
  #[serde(default)]
  pub goals: String,
  #[serde(default)]
  pub availability: String,
  #[serde(default)]
  pub coach_notes: String,
}

/// Partial update sent to the portal; only set fields are transmitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryPatch {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<InquiryStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub coach_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub all: usize,
  pub new: usize,
  pub contacted: usize,
  pub onboarded: usize,
  pub declined: usize,
}

impl StatusCounts {
  pub fn tally(inquiries: &[Inquiry]) -> Self {
    let mut counts = StatusCounts {
      all: inquiries.len(),
      ..Default::default()
    };
    for inquiry in inquiries {
      match inquiry.status {
        InquiryStatus::New => counts.new += 1,
        InquiryStatus::Contacted => counts.contacted += 1,
        InquiryStatus::Onboarded => counts.onboarded += 1,
        InquiryStatus::Declined => counts.declined += 1,
      }
    }
    counts
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tally_by_status() {
    let json = r#"[
      {"id":"1","createdAt":"2026-10-01T10:00:00Z","status":"new","name":"A","email":"a@x.com"},
      {"id":"2","createdAt":"2026-10-02T10:00:00Z","status":"new","name":"B","email":"b@x.com"},
      {"id":"3","createdAt":"2026-10-03T10:00:00Z","status":"onboarded","name":"C","email":"c@x.com"}
    ]"#;
    let inquiries: Vec<Inquiry> = serde_json::from_str(json).unwrap();
    let counts = StatusCounts::tally(&inquiries);
    assert_eq!(counts.all, 3);
    assert_eq!(counts.new, 2);
    assert_eq!(counts.onboarded, 1);
    assert_eq!(counts.contacted, 0);
  }

  #[test]
  fn test_patch_omits_unset_fields() {
    let patch = InquiryPatch {
      id: "7".into(),
      status: Some(InquiryStatus::Contacted),
      coach_notes: None,
    };
    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(json, serde_json::json!({"id": "7", "status": "contacted"}));
  }
}
