//! Structural and safety checks for a weekly schedule received as raw JSON
//!
//! Schedules arrive untyped (AI output, coach form posts). `validate_schedule`
//! reports every problem it finds; `parse_schedule` runs it and only hands back
//! a typed `Schedule` when there are no errors.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::schedule::parse_distance;
use crate::models::{Schedule, Workout, DAY_KEYS};

/// Single-day distance that earns a warning
const HIGH_DAY_DISTANCE: f64 = 30.0;

/// Weekly total that earns a warning
const HIGH_WEEKLY_MILEAGE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
  pub valid: bool,
  pub errors: Vec<String>,
  pub warnings: Vec<String>,
}

impl ValidationResult {
  fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
    Self {
      valid: errors.is_empty(),
      errors,
      warnings,
    }
  }
}

/// ---------------------------------------------------------------------------
/// JSON Helpers
/// ---------------------------------------------------------------------------

/// Loose truthiness: null, false, 0, NaN and "" are all "not there"
pub(crate) fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

/// Numeric reading of a distance value; `None` when it does not parse
fn distance_value(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => parse_distance(s),
    _ => None,
  }
}

/// Render a JSON value the way it was written (strings without quotes)
fn display_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Present and truthy day entry, if any
fn day_entry<'a>(schedule: &'a Map<String, Value>, day: &str) -> Option<&'a Value> {
  schedule.get(day).filter(|v| is_truthy(v))
}

/// Distance of a day for totals: only truthy distances that parse count
fn day_distance(schedule: &Map<String, Value>, day: &str) -> Option<f64> {
  let entry = day_entry(schedule, day)?;
  let distance = entry.get("distance").filter(|v| is_truthy(v))?;
  distance_value(distance)
}

/// ---------------------------------------------------------------------------
/// Validation
/// ---------------------------------------------------------------------------

pub fn validate_schedule(schedule: &Value) -> ValidationResult {
  let mut errors = Vec::new();
  let mut warnings = Vec::new();

  let Some(days) = schedule.as_object() else {
    errors.push("Schedule must be an object".to_string());
    return ValidationResult::from_parts(errors, warnings);
  };

  for day in DAY_KEYS {
    let Some(entry) = day_entry(days, day) else {
      errors.push(format!("Missing {} in schedule", day));
      continue;
    };

    let Some(workout) = entry.as_object() else {
      errors.push(format!("{} workout must be an object", day));
      continue;
    };

    match workout.get("distance") {
      None | Some(Value::Null) => errors.push(format!("{} missing distance field", day)),
      Some(raw) => match distance_value(raw) {
        None => errors.push(format!(
          "{} has invalid distance: {}",
          day,
          display_value(raw)
        )),
        Some(d) if d < 0.0 => errors.push(format!("{} has negative distance: {}", day, d)),
        Some(d) if d > HIGH_DAY_DISTANCE => warnings.push(format!(
          "{} has unusually high distance: {} miles",
          day, d
        )),
        Some(_) => {}
      },
    }

    if matches!(workout.get("pace"), Some(pace) if !pace.is_string()) {
      warnings.push(format!("{} pace should be a string", day));
    }

    if matches!(workout.get("notes"), Some(notes) if !notes.is_string()) {
      warnings.push(format!("{} notes should be a string", day));
    }
  }

  let weekly_mileage: f64 = DAY_KEYS
    .iter()
    .filter_map(|day| day_distance(days, day))
    .sum();

  if weekly_mileage > HIGH_WEEKLY_MILEAGE {
    warnings.push(format!("Weekly mileage is very high: {} miles", weekly_mileage));
  }

  // A day rests when it is absent, has no distance, or its distance is zero
  // or unreadable.
  let rest_days = DAY_KEYS
    .iter()
    .filter(|day| match day_distance(days, day) {
      Some(d) => d == 0.0,
      None => true,
    })
    .count();

  if rest_days == 0 {
    warnings.push("No rest days scheduled - consider adding at least one".to_string());
  }

  ValidationResult::from_parts(errors, warnings)
}

/// ---------------------------------------------------------------------------
/// Typed Parse
/// ---------------------------------------------------------------------------

/// Normalize a loosely shaped workout: missing or empty distance becomes
/// "0", missing pace and notes become empty strings. Non-string values are
/// rendered to text.
pub fn sanitize_workout(value: &Value) -> Workout {
  let field = |name: &str, fallback: &str| -> String {
    match value.get(name) {
      Some(v) if is_truthy(v) || v.is_number() || v.is_boolean() => display_value(v),
      _ => fallback.to_string(),
    }
  };

  Workout {
    distance: field("distance", "0"),
    pace: field("pace", ""),
    notes: field("notes", ""),
  }
}

/// Validate and, when there are no errors, convert to a typed schedule keyed
/// by the lowercase day names. Warnings travel back alongside the schedule.
pub fn parse_schedule(value: &Value) -> Result<(Schedule, Vec<String>), ValidationResult> {
  let result = validate_schedule(value);
  if !result.valid {
    return Err(result);
  }

  let schedule = DAY_KEYS
    .iter()
    .map(|day| (day.to_string(), sanitize_workout(&value[*day])))
    .collect();

  Ok((schedule, result.warnings))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn full_week() -> Value {
    json!({
      "monday": {"distance": "5", "pace": "9:00", "notes": "Easy"},
      "tuesday": {"distance": "6", "pace": "8:15", "notes": "Tempo run"},
      "wednesday": {"distance": "0", "pace": "", "notes": "Rest"},
      "thursday": {"distance": "5", "pace": "8:45", "notes": "Easy"},
      "friday": {"distance": "4", "pace": "9:00", "notes": "Easy"},
      "saturday": {"distance": "10", "pace": "9:15", "notes": "Long run"},
      "sunday": {"distance": "3", "pace": "9:30", "notes": "Recovery"}
    })
  }

  #[test]
  fn test_valid_week_has_no_findings() {
    let result = validate_schedule(&full_week());
    assert!(result.valid);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
  }

  #[test]
  fn test_non_object_is_rejected() {
    for value in [json!(null), json!("monday"), json!([1, 2]), json!(7)] {
      let result = validate_schedule(&value);
      assert!(!result.valid);
      assert_eq!(result.errors, vec!["Schedule must be an object"]);
    }
  }

  #[test]
  fn test_missing_wednesday() {
    let mut week = full_week();
    week.as_object_mut().unwrap().remove("wednesday");

    let result = validate_schedule(&week);
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("wednesday"));
    // wednesday was the only rest day; an absent day still counts as rest
    assert!(result.warnings.is_empty());
  }

  #[test]
  fn test_high_single_day_is_only_a_warning() {
    let mut week = full_week();
    week["saturday"]["distance"] = json!("35");

    let result = validate_schedule(&week);
    assert!(result.valid);
    assert!(result.errors.is_empty());
    assert_eq!(
      result.warnings,
      vec!["saturday has unusually high distance: 35 miles"]
    );
  }

  #[test]
  fn test_distance_errors() {
    let mut week = full_week();
    week["monday"] = json!({"pace": "9:00"});
    week["tuesday"]["distance"] = json!("far");
    week["thursday"]["distance"] = json!("-3");
    week["friday"] = json!("run");

    let result = validate_schedule(&week);
    assert!(!result.valid);
    assert_eq!(
      result.errors,
      vec![
        "monday missing distance field",
        "tuesday has invalid distance: far",
        "thursday has negative distance: -3",
        "friday workout must be an object",
      ]
    );
  }

  #[test]
  fn test_numeric_distance_is_accepted() {
    let mut week = full_week();
    week["monday"]["distance"] = json!(5);
    assert!(validate_schedule(&week).valid);
  }

  #[test]
  fn test_non_string_pace_and_notes_warn() {
    let mut week = full_week();
    week["monday"]["pace"] = json!(9);
    week["monday"]["notes"] = json!(["easy"]);

    let result = validate_schedule(&week);
    assert!(result.valid);
    assert_eq!(
      result.warnings,
      vec!["monday pace should be a string", "monday notes should be a string"]
    );
  }

  #[test]
  fn test_weekly_mileage_and_rest_day_warnings() {
    let week = json!({
      "monday": {"distance": "20"},
      "tuesday": {"distance": "20"},
      "wednesday": {"distance": "20"},
      "thursday": {"distance": "20"},
      "friday": {"distance": "20"},
      "saturday": {"distance": "20"},
      "sunday": {"distance": "1"}
    });

    let result = validate_schedule(&week);
    assert!(result.valid);
    assert_eq!(
      result.warnings,
      vec![
        "Weekly mileage is very high: 121 miles",
        "No rest days scheduled - consider adding at least one",
      ]
    );
  }

  #[test]
  fn test_falsy_day_counts_as_missing() {
    let mut week = full_week();
    week["sunday"] = json!(null);
    week["monday"] = json!("");

    let result = validate_schedule(&week);
    assert_eq!(
      result.errors,
      vec!["Missing monday in schedule", "Missing sunday in schedule"]
    );
  }

  #[test]
  fn test_sanitize_workout_defaults() {
    assert_eq!(sanitize_workout(&json!({})), Workout::new("0", "", ""));
    assert_eq!(
      sanitize_workout(&json!({"distance": "", "pace": null, "notes": "Easy"})),
      Workout::new("0", "", "Easy")
    );
    assert_eq!(
      sanitize_workout(&json!({"distance": 6.5, "pace": "8:00"})),
      Workout::new("6.5", "8:00", "")
    );
  }

  #[test]
  fn test_parse_schedule_returns_typed_week() {
    let (schedule, warnings) = parse_schedule(&full_week()).unwrap();
    assert_eq!(schedule.len(), 7);
    assert_eq!(schedule["tuesday"], Workout::new("6", "8:15", "Tempo run"));
    assert!(warnings.is_empty());

    let mut broken = full_week();
    broken.as_object_mut().unwrap().remove("friday");
    let err = parse_schedule(&broken).unwrap_err();
    assert!(!err.valid);
  }
}
