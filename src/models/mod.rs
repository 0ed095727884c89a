pub mod athlete;
pub mod client;
pub mod inquiry;
pub mod schedule;

pub use athlete::{
  active_injuries, latest_check_in, next_race, InjuryRecord, InjuryStatus, RaceGoal, RacePriority,
  WeeklyCheckIn,
};
pub use client::{AthleteUpdate, Client, CoachNote};
pub use inquiry::{Inquiry, InquiryPatch, InquiryStatus, StatusCounts};
pub use schedule::{Schedule, TrainingWeek, Workout, DAY_KEYS};
