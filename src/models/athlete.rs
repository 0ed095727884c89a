use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Race Goals
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePriority {
  A,
  B,
  C,
}

impl RacePriority {
  pub fn description(&self) -> &'static str {
    match self {
      RacePriority::A => "Primary goal",
      RacePriority::B => "Secondary",
      RacePriority::C => "Training race",
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      RacePriority::A => "A",
      RacePriority::B => "B",
      RacePriority::C => "C",
    }
  }
}

impl std::str::FromStr for RacePriority {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "A" => Ok(Self::A),
      "B" => Ok(Self::B),
      "C" => Ok(Self::C),
      _ => Err(format!("Unknown race priority: {}", s)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceGoal {
  #[serde(default)]
  pub id: String,
  pub date: NaiveDate,
  /// "5K", "10K", "Half Marathon", "Marathon"
  #[serde(rename = "type")]
  pub race_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_time: Option<String>,
  pub priority: RacePriority,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Earliest goal dated today or later
pub fn next_race(goals: &[RaceGoal], today: NaiveDate) -> Option<&RaceGoal> {
  goals
    .iter()
    .filter(|g| g.date >= today)
    .min_by_key(|g| (g.date, g.priority.as_str()))
}

/// ---------------------------------------------------------------------------
/// Injuries
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryStatus {
  Active,
  Recovering,
  Healed,
}

impl InjuryStatus {
  /// Active and recovering injuries still shape the plan
  pub fn is_current(&self) -> bool {
    matches!(self, Self::Active | Self::Recovering)
  }
}

impl std::fmt::Display for InjuryStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Active => write!(f, "active"),
      Self::Recovering => write!(f, "recovering"),
      Self::Healed => write!(f, "healed"),
    }
  }
}

impl std::str::FromStr for InjuryStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "active" => Ok(Self::Active),
      "recovering" => Ok(Self::Recovering),
      "healed" => Ok(Self::Healed),
      _ => Err(format!("Unknown injury status: {}", s)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjuryRecord {
  #[serde(default)]
  pub id: String,
  pub date: NaiveDate,
  pub description: String,
  pub status: InjuryStatus,
  #[serde(default)]
  pub affected_areas: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

pub fn active_injuries(injuries: &[InjuryRecord]) -> Vec<InjuryRecord> {
  injuries
    .iter()
    .filter(|i| i.status.is_current())
    .cloned()
    .collect()
}

/// ---------------------------------------------------------------------------
/// Weekly Check-ins
/// ---------------------------------------------------------------------------

/// Athlete self-report. Each score runs 1 (worst/lowest) to 5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCheckIn {
  pub week_start: NaiveDate,
  pub body_feeling: u8,
  pub sleep_quality: u8,
  pub stress_level: u8,
  #[serde(default)]
  pub notes: String,
  pub created_at: DateTime<Utc>,
}

impl WeeklyCheckIn {
  pub fn validate(&self) -> Result<(), String> {
    for (name, score) in [
      ("bodyFeeling", self.body_feeling),
      ("sleepQuality", self.sleep_quality),
      ("stressLevel", self.stress_level),
    ] {
      if !(1..=5).contains(&score) {
        return Err(format!("{} must be between 1 and 5, got {}", name, score));
      }
    }
    Ok(())
  }

  pub fn body_feeling_label(&self) -> &'static str {
    tier_label(self.body_feeling, "Low energy", "Moderate", "Feeling good")
  }

  pub fn sleep_quality_label(&self) -> &'static str {
    tier_label(self.sleep_quality, "Poor sleep", "Average", "Good sleep")
  }

  pub fn stress_level_label(&self) -> &'static str {
    tier_label(self.stress_level, "Low stress", "Moderate stress", "High stress")
  }
}

pub fn latest_check_in(check_ins: &[WeeklyCheckIn]) -> Option<&WeeklyCheckIn> {
  check_ins.iter().max_by_key(|c| c.created_at)
}

/// <=2 low, >=4 high, otherwise middle
fn tier_label(score: u8, low: &'static str, mid: &'static str, high: &'static str) -> &'static str {
  if score <= 2 {
    low
  } else if score >= 4 {
    high
  } else {
    mid
  }
}
