//! Deterministic training-load checks for planned weeks
//!
//! Everything here is pure: callers load schedules and history from the
//! repository and hand the typed values in. Load is recomputed from the
//! workouts on every call and never stored.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::models::schedule::round1;
use crate::models::{Schedule, TrainingWeek, Workout};

/// ---------------------------------------------------------------------------
/// Thresholds
/// ---------------------------------------------------------------------------

/// Flag a week whose load exceeds the historical mean by more than this
const MAX_LOAD_INCREASE_PCT: f64 = 15.0;

/// Recommended cap relative to the historical mean
const RECOMMENDED_LOAD_FACTOR: f64 = 1.1;

/// A week at or above this share of the mean counts as high load
const HIGH_LOAD_FACTOR: f64 = 0.9;

/// Number of most recent weeks inspected for a high-load streak
const HIGH_LOAD_WINDOW: usize = 3;

/// Single-day distance above which a day is hard regardless of notes
const HARD_DAY_DISTANCE: f64 = 12.0;

/// ---------------------------------------------------------------------------
/// Workout Intensity (keyword based)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
  Tempo,
  Interval,
  LongRun,
  Easy,
}

impl Intensity {
  /// Classify from free-text notes, case-insensitive. Precedence is tempo,
  /// then interval, then long run: "tempo intervals" is a tempo day.
  pub fn classify(notes: &str) -> Self {
    let notes = notes.to_lowercase();
    if notes.contains("tempo") || notes.contains("threshold") {
      Intensity::Tempo
    } else if notes.contains("interval") || notes.contains("speed") || notes.contains("5k pace") {
      Intensity::Interval
    } else if notes.contains("long run") {
      Intensity::LongRun
    } else {
      Intensity::Easy
    }
  }

  /// Extra load as a fraction of the day's distance
  pub fn surcharge(&self) -> f64 {
    match self {
      Intensity::Tempo => 0.3,
      Intensity::Interval => 0.5,
      Intensity::LongRun => 0.2,
      Intensity::Easy => 0.0,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Weekly Load
/// ---------------------------------------------------------------------------

/// Load contributed by one workout: distance plus the intensity surcharge
pub fn workout_load(workout: &Workout) -> f64 {
  let distance = workout.distance_miles();
  distance + distance * Intensity::classify(&workout.notes).surcharge()
}

/// Weighted weekly load, rounded to one decimal
pub fn calculate_weekly_load(schedule: &Schedule) -> f64 {
  round1(schedule.values().map(workout_load).sum())
}

/// ---------------------------------------------------------------------------
/// Overtraining Detection
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum OvertrainingVerdict {
  Clear,
  Flagged {
    reason: String,
    recommendation: String,
  },
}

impl OvertrainingVerdict {
  pub fn is_overtraining(&self) -> bool {
    matches!(self, OvertrainingVerdict::Flagged { .. })
  }
}

/// Serializes as `{overtraining: false}` or
/// `{overtraining: true, reason, recommendation}`
impl Serialize for OvertrainingVerdict {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match self {
      OvertrainingVerdict::Clear => {
        let mut s = serializer.serialize_struct("OvertrainingVerdict", 1)?;
        s.serialize_field("overtraining", &false)?;
        s.end()
      }
      OvertrainingVerdict::Flagged {
        reason,
        recommendation,
      } => {
        let mut s = serializer.serialize_struct("OvertrainingVerdict", 3)?;
        s.serialize_field("overtraining", &true)?;
        s.serialize_field("reason", reason)?;
        s.serialize_field("recommendation", recommendation)?;
        s.end()
      }
    }
  }
}

/// Compare a candidate week against prior weeks (most recent first).
///
/// Rule 1: load more than 15% above the historical mean.
/// Rule 2: with at least three prior weeks, two of the last three and the
/// candidate all at or above 90% of the mean.
/// No history gives no baseline and is never flagged. Over a history with no
/// load at all, any positive load is flagged under rule 1.
pub fn detect_overtraining(schedule: &Schedule, history: &[TrainingWeek]) -> OvertrainingVerdict {
  if history.is_empty() {
    return OvertrainingVerdict::Clear;
  }

  let new_load = calculate_weekly_load(schedule);
  let history_loads: Vec<f64> = history
    .iter()
    .map(|week| calculate_weekly_load(&week.schedule))
    .collect();
  let avg_load = history_loads.iter().sum::<f64>() / history_loads.len() as f64;

  // Any load over an idle history is an unbounded jump
  if avg_load <= 0.0 {
    if new_load > 0.0 {
      return OvertrainingVerdict::Flagged {
        reason: format!(
          "Weekly load increased from {:.1} to {:.1} (should be max 10%)",
          avg_load, new_load
        ),
        recommendation: format!("Reduce to {:.1} total load", avg_load * RECOMMENDED_LOAD_FACTOR),
      };
    }
    return OvertrainingVerdict::Clear;
  }

  let increase_pct = (new_load - avg_load) * 100.0 / avg_load;
  if increase_pct > MAX_LOAD_INCREASE_PCT {
    return OvertrainingVerdict::Flagged {
      reason: format!(
        "Weekly load increased by {:.1}% (should be max 10%)",
        increase_pct
      ),
      recommendation: format!(
        "Reduce to {:.1} total load",
        avg_load * RECOMMENDED_LOAD_FACTOR
      ),
    };
  }

  if history_loads.len() >= HIGH_LOAD_WINDOW {
    let high_threshold = avg_load * HIGH_LOAD_FACTOR;
    let recent_high = history_loads
      .iter()
      .take(HIGH_LOAD_WINDOW)
      .filter(|&&load| load >= high_threshold)
      .count();

    if recent_high >= 2 && new_load >= high_threshold {
      return OvertrainingVerdict::Flagged {
        reason: "Three consecutive high-load weeks detected".to_string(),
        recommendation: "Consider a recovery week with reduced volume".to_string(),
      };
    }
  }

  OvertrainingVerdict::Clear
}

/// ---------------------------------------------------------------------------
/// Training Principles (hard/easy balance)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrinciplesCheck {
  pub passed: bool,
  pub violations: Vec<String>,
}

fn is_hard_day(workout: &Workout) -> bool {
  let notes = workout.notes.to_lowercase();
  notes.contains("tempo")
    || notes.contains("threshold")
    || notes.contains("interval")
    || notes.contains("speed")
    || notes.contains("long run")
    || workout.distance_miles() > HARD_DAY_DISTANCE
}

/// Check spacing and count of hard days. Days are visited in key order.
pub fn check_training_principles(schedule: &Schedule) -> PrinciplesCheck {
  let mut violations = Vec::new();
  let mut consecutive_hard = 0;
  let mut hard_days = 0;

  for workout in schedule.values() {
    if is_hard_day(workout) {
      hard_days += 1;
      consecutive_hard += 1;
      if consecutive_hard > 2 {
        violations.push("More than 2 consecutive hard days detected".to_string());
      }
    } else {
      consecutive_hard = 0;
    }
  }

  if hard_days > 3 {
    violations.push(format!(
      "Too many hard days ({}) - violates 80/20 rule",
      hard_days
    ));
  }

  PrinciplesCheck {
    passed: violations.is_empty(),
    violations,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
