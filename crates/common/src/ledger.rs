//! Per-user progression ledger
//!
//! `ProgressionState` is the only place points, level and streak counters change.
//! Its fields are private; all mutation goes through [`ProgressionState::apply_activity`],
//! [`ProgressionState::update_streak`] and [`ProgressionState::add_points`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const POINTS_PER_LEVEL: i64 = 1000;

/// Level for a point total: `floor(points / 1000) + 1`
pub fn level_for_points(points: i64) -> i32 {
    (points.max(0) / POINTS_PER_LEVEL) as i32 + 1
}

/// Persisted shape of a user's progression, as loaded from and saved to storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRecord {
    pub user_id: Uuid,
    pub carbon_points: i64,
    pub total_co2_saved: f64,
    pub level: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_date: Option<NaiveDate>,
    pub total_activities: i64,
}

/// How a streak update changed the current streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// First activity ever
    Started,
    /// Same calendar day as the previous activity
    Unchanged,
    /// Exactly one day after the previous activity
    Extended,
    /// Gap of more than one day, or a backdated activity
    Reset,
}

/// Level before and after a point-awarding operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelChange {
    pub from: i32,
    pub to: i32,
}

impl LevelChange {
    pub fn leveled_up(&self) -> bool {
        self.to > self.from
    }
}

/// Result of applying one activity to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityApplied {
    pub level: LevelChange,
    pub streak: StreakChange,
}

/// A user's running progression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionState {
    user_id: Uuid,
    carbon_points: i64,
    total_co2_saved: f64,
    level: i32,
    current_streak: i32,
    longest_streak: i32,
    last_activity_date: Option<NaiveDate>,
    total_activities: i64,
}

impl ProgressionState {
    /// Fresh state for a user with no activity
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            carbon_points: 0,
            total_co2_saved: 0.0,
            level: 1,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            total_activities: 0,
        }
    }

    /// Rebuild from storage. Repairs records that violate the ledger invariants.
    pub fn restore(record: ProgressionRecord) -> Self {
        let carbon_points = record.carbon_points.max(0);
        let current_streak = record.current_streak.max(0);
        Self {
            user_id: record.user_id,
            carbon_points,
            total_co2_saved: record.total_co2_saved.max(0.0),
            level: record.level.max(level_for_points(carbon_points)),
            current_streak,
            longest_streak: record.longest_streak.max(current_streak),
            last_activity_date: record.last_activity_date,
            total_activities: record.total_activities.max(0),
        }
    }

    pub fn to_record(&self) -> ProgressionRecord {
        ProgressionRecord {
            user_id: self.user_id,
            carbon_points: self.carbon_points,
            total_co2_saved: self.total_co2_saved,
            level: self.level,
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_activity_date: self.last_activity_date,
            total_activities: self.total_activities,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn carbon_points(&self) -> i64 {
        self.carbon_points
    }

    pub fn total_co2_saved(&self) -> f64 {
        self.total_co2_saved
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn current_streak(&self) -> i32 {
        self.current_streak
    }

    pub fn longest_streak(&self) -> i32 {
        self.longest_streak
    }

    pub fn last_activity_date(&self) -> Option<NaiveDate> {
        self.last_activity_date
    }

    pub fn total_activities(&self) -> i64 {
        self.total_activities
    }

    /// Points still needed to reach the next level
    pub fn points_to_next_level(&self) -> i64 {
        self.level as i64 * POINTS_PER_LEVEL - self.carbon_points
    }

    /// Percent of the way through the current level
    pub fn level_progress(&self) -> f64 {
        let level_base = (self.level as i64 - 1) * POINTS_PER_LEVEL;
        (self.carbon_points - level_base) as f64 / POINTS_PER_LEVEL as f64 * 100.0
    }

    /// Record an accepted activity: points, CO2 saved, activity count, then the streak.
    pub fn apply_activity(&mut self, impact: f64, points: u32, date: NaiveDate) -> ActivityApplied {
        let level = self.add_points(points);

        if impact > 0.0 {
            self.total_co2_saved = round3(self.total_co2_saved + impact);
        }
        self.total_activities += 1;

        let streak = self.update_streak(date);
        ActivityApplied { level, streak }
    }

    /// Advance the streak for an activity on `date`.
    ///
    /// A date before `last_activity_date` resets the streak to 1, same as a gap.
    pub fn update_streak(&mut self, date: NaiveDate) -> StreakChange {
        let change = match self.last_activity_date {
            None => {
                self.current_streak = 1;
                StreakChange::Started
            }
            Some(last) => match (date - last).num_days() {
                0 => StreakChange::Unchanged,
                1 => {
                    self.current_streak += 1;
                    StreakChange::Extended
                }
                _ => {
                    self.current_streak = 1;
                    StreakChange::Reset
                }
            },
        };

        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_activity_date = Some(date);
        change
    }

    /// Credit reward points. Level only ever moves up.
    pub fn add_points(&mut self, points: u32) -> LevelChange {
        let from = self.level;
        self.carbon_points += i64::from(points);
        self.level = self.level.max(level_for_points(self.carbon_points));
        LevelChange {
            from,
            to: self.level,
        }
    }
}

/// Round to 3 decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
