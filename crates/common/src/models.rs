//! Domain models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Declares a fieldless enum whose serde and database form is a fixed snake_case string.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::Validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

text_enum! {
    /// Top-level activity category
    ActivityCategory {
        Transport => "transport",
        Food => "food",
        Energy => "energy",
        Waste => "waste",
    }
}

text_enum! {
    TransportMode {
        Walk => "walk",
        Bicycle => "bicycle",
        Ebike => "ebike",
        Microbus => "microbus",
        SafaTempo => "safa_tempo",
        Motorcycle => "motorcycle",
        Car => "car",
        Bus => "bus",
        Taxi => "taxi",
        Rickshaw => "rickshaw",
    }
}

text_enum! {
    MealType {
        Vegan => "vegan",
        Vegetarian => "vegetarian",
        DalBhat => "dal_bhat",
        VegetableCurry => "vegetable_curry",
        Chicken => "chicken",
        Buff => "buff",
        Pork => "pork",
        Fish => "fish",
        Egg => "egg",
        Dairy => "dairy",
    }
}

text_enum! {
    EnergyType {
        SolarUsed => "solar_used",
        LightsOff => "lights_off",
        AcOff => "ac_off",
        Unplugged => "unplugged",
        EnergyEfficient => "energy_efficient",
    }
}

text_enum! {
    WasteType {
        Recycled => "recycled",
        Composted => "composted",
        Reused => "reused",
        AvoidedPlastic => "avoided_plastic",
    }
}

text_enum! {
    /// A progression statistic that badge requirements and achievement triggers compare against
    Metric {
        Streak => "streak",
        Co2Saved => "co2_saved",
        ActivitiesCount => "activities_count",
        Level => "level",
        Points => "points",
    }
}

text_enum! {
    /// Statistic the global leaderboard is ordered by
    LeaderboardMetric {
        Points => "points",
        Co2Saved => "co2_saved",
        Streak => "streak",
    }
}

text_enum! {
    ChallengeTarget {
        Co2Saved => "co2_saved",
        ActivitiesCount => "activities_count",
        Streak => "streak",
    }
}

text_enum! {
    NotificationKind {
        Badge => "badge",
        Achievement => "achievement",
        LevelUp => "level_up",
        Challenge => "challenge",
        Streak => "streak",
        Reward => "reward",
    }
}

text_enum! {
    BadgeCategory {
        Streak => "streak",
        Co2 => "co2",
        Activity => "activity",
        Social => "social",
        Special => "special",
    }
}

text_enum! {
    Rarity {
        Common => "common",
        Rare => "rare",
        Epic => "epic",
        Legendary => "legendary",
    }
}

text_enum! {
    ChallengeKind {
        Individual => "individual",
        Team => "team",
    }
}

text_enum! {
    Difficulty {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportDetails {
    pub mode: Option<TransportMode>,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodDetails {
    pub meal_type: Option<MealType>,
    pub servings: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyDetails {
    pub energy_type: Option<EnergyType>,
    /// Explicit saving; takes precedence over the per-type default
    pub kwh_saved: Option<f64>,
    pub hours: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WasteDetails {
    pub waste_type: Option<WasteType>,
    pub weight_kg: Option<f64>,
}

/// Category-specific attributes of an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ActivityDetails {
    Transport(TransportDetails),
    Food(FoodDetails),
    Energy(EnergyDetails),
    Waste(WasteDetails),
}

impl ActivityDetails {
    pub fn category(&self) -> ActivityCategory {
        match self {
            ActivityDetails::Transport(_) => ActivityCategory::Transport,
            ActivityDetails::Food(_) => ActivityCategory::Food,
            ActivityDetails::Energy(_) => ActivityCategory::Energy,
            ActivityDetails::Waste(_) => ActivityCategory::Waste,
        }
    }
}

/// A logged activity. Impact and points are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub details: ActivityDetails,
    pub description: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// kg CO2, positive = saved, negative = emitted
    pub co2_impact: f64,
    pub points_earned: u32,
    pub logged_at: DateTime<Utc>,
}

impl Activity {
    /// Calendar day used for streaks and challenge windows
    pub fn date(&self) -> NaiveDate {
        self.logged_at.date_naive()
    }

    pub fn category(&self) -> ActivityCategory {
        self.details.category()
    }
}

/// A badge definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: BadgeCategory,
    pub rarity: Rarity,
    pub requirement: Metric,
    pub requirement_value: f64,
    pub points_reward: u32,
    pub icon: String,
    pub is_active: bool,
}

/// A badge earned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_id: Uuid,
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
    pub is_showcased: bool,
}

/// An achievement definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub trigger: Metric,
    pub trigger_value: f64,
    pub points_reward: u32,
    /// Badge granted alongside completion
    pub badge_id: Option<String>,
    pub is_active: bool,
}

/// A user's progress toward an achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievement {
    pub user_id: Uuid,
    pub achievement_id: String,
    /// Raw metric value, capped at the trigger value
    pub progress: f64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A time-boxed challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub kind: ChallengeKind,
    pub difficulty: Difficulty,
    pub target: ChallengeTarget,
    pub target_value: f64,
    pub reward_points: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

impl Challenge {
    pub fn has_started(&self, today: NaiveDate) -> bool {
        self.start_date <= today
    }

    pub fn has_ended(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }

    pub fn is_ongoing(&self, today: NaiveDate) -> bool {
        self.has_started(today) && !self.has_ended(today)
    }

    /// Whether a calendar day falls inside the challenge window (inclusive)
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// A user's enrolment in a challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeParticipation {
    pub challenge_id: Uuid,
    pub user_id: Uuid,
    /// Percent, 0..=100
    pub progress: f64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

/// A notification waiting to be delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
}

/// A stored notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One day of a user's streak history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStreak {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub activities_count: i32,
    pub co2_saved: f64,
    pub streak_day: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_round_trips_through_str() {
        for mode in TransportMode::ALL {
            assert_eq!(mode.as_str().parse::<TransportMode>().unwrap(), *mode);
        }
    }

    #[test]
    fn test_unknown_subtype_is_validation_error() {
        assert!(matches!(
            "hovercraft".parse::<TransportMode>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_activity_details_tagged_by_category() {
        let details: ActivityDetails = serde_json::from_str(
            r#"{"category": "food", "meal_type": "dal_bhat", "servings": 2}"#,
        )
        .unwrap();

        assert_eq!(details.category(), ActivityCategory::Food);
        assert_eq!(
            details,
            ActivityDetails::Food(FoodDetails {
                meal_type: Some(MealType::DalBhat),
                servings: Some(2),
            })
        );
    }

    #[test]
    fn test_challenge_window_is_inclusive() {
        let challenge = Challenge {
            id: Uuid::new_v4(),
            name: "Car-free week".to_string(),
            description: String::new(),
            kind: ChallengeKind::Individual,
            difficulty: Difficulty::Easy,
            target: ChallengeTarget::ActivitiesCount,
            target_value: 5.0,
            reward_points: 100,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            is_active: true,
        };

        assert!(challenge.covers(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(challenge.covers(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()));
        assert!(!challenge.covers(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()));
        assert!(challenge.is_ongoing(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()));
        assert!(challenge.has_ended(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()));
    }
}
