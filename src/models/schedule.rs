use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowercase day keys every generated or validated week must carry
pub const DAY_KEYS: [&str; 7] = [
  "monday",
  "tuesday",
  "wednesday",
  "thursday",
  "friday",
  "saturday",
  "sunday",
];

/// One planned day. Distance stays textual because coaches type it freely
/// ("5", "6.2", "8 miles"); arithmetic goes through `distance_miles`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workout {
  #[serde(default)]
  pub distance: String,
  #[serde(default)]
  pub pace: String,
  #[serde(default)]
  pub notes: String,
}

impl Workout {
  pub fn new(distance: &str, pace: &str, notes: &str) -> Self {
    Self {
      distance: distance.to_string(),
      pace: pace.to_string(),
      notes: notes.to_string(),
    }
  }

  /// Numeric distance; empty or unparseable text counts as zero
  pub fn distance_miles(&self) -> f64 {
    parse_distance(&self.distance).unwrap_or(0.0)
  }
}

/// Day label -> workout. Ordered so iteration is deterministic.
pub type Schedule = BTreeMap<String, Workout>;

/// Parse the leading numeric portion of a distance string.
///
/// Accepts an optional sign, digits with an optional fraction and an optional
/// exponent, and ignores trailing text ("8 miles" -> 8). Returns `None` when
/// no number leads the string.
pub fn parse_distance(raw: &str) -> Option<f64> {
  let s = raw.trim_start();
  let bytes = s.as_bytes();
  let mut end = 0;

  if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
    end = 1;
  }

  let int_start = end;
  while end < bytes.len() && bytes[end].is_ascii_digit() {
    end += 1;
  }
  let mut mantissa_digits = end - int_start;

  if end < bytes.len() && bytes[end] == b'.' {
    let frac_start = end + 1;
    let mut frac_end = frac_start;
    while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
      frac_end += 1;
    }
    mantissa_digits += frac_end - frac_start;
    if mantissa_digits > 0 {
      end = frac_end;
    }
  }

  if mantissa_digits == 0 {
    return None;
  }

  if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
    let mut exp_end = end + 1;
    if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
      exp_end += 1;
    }
    let exp_digits_start = exp_end;
    while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
      exp_end += 1;
    }
    if exp_end > exp_digits_start {
      end = exp_end;
    }
  }

  s[..end].parse::<f64>().ok()
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
  (value * 10.0).round() / 10.0
}

/// ---------------------------------------------------------------------------
/// Training Weeks
/// ---------------------------------------------------------------------------

/// A past week summarized from its schedule. Always derived on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingWeek {
  pub week_start: NaiveDate,
  #[serde(default)]
  pub schedule: Schedule,
  pub total_miles: f64,
  pub workout_count: u32,
}

impl TrainingWeek {
  pub fn from_schedule(week_start: NaiveDate, schedule: Schedule) -> Self {
    let total_miles = round1(schedule.values().map(Workout::distance_miles).sum());
    let workout_count = schedule
      .values()
      .filter(|w| w.distance_miles() > 0.0)
      .count() as u32;

    Self {
      week_start,
      schedule,
      total_miles,
      workout_count,
    }
  }
}

/// Monday of the week containing `date` (Sunday belongs to the week before)
pub fn week_start(date: NaiveDate) -> NaiveDate {
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// The seven dates of the week beginning at `start`
pub fn week_days(start: NaiveDate) -> Vec<NaiveDate> {
  (0..7).map(|i| start + Duration::days(i)).collect()
}
