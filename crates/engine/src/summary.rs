//! Fixed-window activity summaries and all-time statistics

use chrono::{Datelike, Duration, NaiveDate};
use common::ledger::ProgressionState;
use common::models::{Activity, ActivityCategory};
use common::{Error, Result};
use serde::Serialize;

/// kg CO2 absorbed by one tree per year
const TREE_ABSORPTION_KG: f64 = 21.0;
/// kg CO2 per car mile
const CAR_MILE_KG: f64 = 0.404;
/// kg CO2 per smartphone charge
const PHONE_CHARGE_KG: f64 = 0.008;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn co2_to_trees(co2_kg: f64) -> f64 {
    round_to(co2_kg / TREE_ABSORPTION_KG, 2)
}

pub fn co2_to_car_miles(co2_kg: f64) -> f64 {
    round_to(co2_kg / CAR_MILE_KG, 1)
}

pub fn co2_to_phone_charges(co2_kg: f64) -> f64 {
    round_to(co2_kg / PHONE_CHARGE_KG, 0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBreakdown {
    pub date: NaiveDate,
    pub co2_saved: f64,
    pub activities_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: ActivityCategory,
    pub co2_saved: f64,
    pub count: usize,
    pub points: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_co2_saved: f64,
    pub total_points: u64,
    pub total_activities: usize,
    pub daily_breakdown: Vec<DayBreakdown>,
    pub category_breakdown: Vec<CategoryBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_day: Option<DayBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Equivalences {
    pub trees: f64,
    pub car_miles: f64,
    pub phone_charges: f64,
}

impl Equivalences {
    pub fn for_co2(co2_kg: f64) -> Self {
        Self {
            trees: co2_to_trees(co2_kg),
            car_miles: co2_to_car_miles(co2_kg),
            phone_charges: co2_to_phone_charges(co2_kg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityStats {
    pub total_co2_saved: f64,
    pub total_points: i64,
    pub total_activities: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub equivalences: Equivalences,
    pub by_category: Vec<CategoryBreakdown>,
}

/// Monday through Sunday of the week containing `today`
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(6))
}

/// First and last day of a calendar month
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || Error::Validation(format!("Invalid month {}-{}", year, month));
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((start, next - Duration::days(1)))
}

fn saved(activities: &[&Activity]) -> f64 {
    activities
        .iter()
        .map(|a| a.co2_impact)
        .filter(|impact| *impact > 0.0)
        .sum()
}

fn categories(activities: &[&Activity]) -> Vec<CategoryBreakdown> {
    ActivityCategory::ALL
        .iter()
        .map(|category| {
            let matching: Vec<&Activity> = activities
                .iter()
                .copied()
                .filter(|a| a.category() == *category)
                .collect();
            CategoryBreakdown {
                category: *category,
                co2_saved: round_to(saved(&matching), 2),
                count: matching.len(),
                points: matching.iter().map(|a| u64::from(a.points_earned)).sum(),
            }
        })
        .collect()
}

fn summarize(activities: &[Activity], start: NaiveDate, end: NaiveDate) -> PeriodSummary {
    let in_period: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.date() >= start && a.date() <= end)
        .collect();

    let daily_breakdown = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            let day: Vec<&Activity> = in_period
                .iter()
                .copied()
                .filter(|a| a.date() == date)
                .collect();
            DayBreakdown {
                date,
                co2_saved: round_to(saved(&day), 2),
                activities_count: day.len(),
            }
        })
        .collect();

    PeriodSummary {
        start,
        end,
        total_co2_saved: round_to(saved(&in_period), 2),
        total_points: in_period.iter().map(|a| u64::from(a.points_earned)).sum(),
        total_activities: in_period.len(),
        daily_breakdown,
        category_breakdown: categories(&in_period),
        best_day: None,
    }
}

/// Summary of the Monday-to-Sunday week containing `today`
pub fn weekly_summary(activities: &[Activity], today: NaiveDate) -> PeriodSummary {
    let (start, end) = week_bounds(today);
    summarize(activities, start, end)
}

/// Summary of a calendar month, including the day with the most CO2 saved
pub fn monthly_summary(activities: &[Activity], year: i32, month: u32) -> Result<PeriodSummary> {
    let (start, end) = month_bounds(year, month)?;
    let mut summary = summarize(activities, start, end);

    // earliest day wins ties
    summary.best_day = summary
        .daily_breakdown
        .iter()
        .filter(|d| d.co2_saved > 0.0)
        .fold(None, |best: Option<&DayBreakdown>, day| match best {
            Some(b) if b.co2_saved >= day.co2_saved => Some(b),
            _ => Some(day),
        })
        .cloned();
    Ok(summary)
}

/// All-time statistics from the ledger and the full activity history
pub fn activity_stats(state: &ProgressionState, activities: &[Activity]) -> ActivityStats {
    let all: Vec<&Activity> = activities.iter().collect();
    ActivityStats {
        total_co2_saved: round_to(state.total_co2_saved(), 2),
        total_points: state.carbon_points(),
        total_activities: state.total_activities(),
        current_streak: state.current_streak(),
        longest_streak: state.longest_streak(),
        equivalences: Equivalences::for_co2(state.total_co2_saved()),
        by_category: categories(&all),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::models::{ActivityDetails, FoodDetails, TransportDetails, TransportMode};
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn activity(date: NaiveDate, details: ActivityDetails, co2: f64, points: u32) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            details,
            description: "test".to_string(),
            location: None,
            notes: None,
            co2_impact: co2,
            points_earned: points,
            logged_at: Utc
                .from_utc_datetime(&date.and_hms_opt(9, 0, 0).unwrap()),
        }
    }

    fn ride(date: NaiveDate, co2: f64, points: u32) -> Activity {
        activity(
            date,
            ActivityDetails::Transport(TransportDetails {
                mode: Some(TransportMode::Bicycle),
                distance_km: Some(10.0),
            }),
            co2,
            points,
        )
    }

    fn meal(date: NaiveDate, co2: f64) -> Activity {
        activity(date, ActivityDetails::Food(FoodDetails::default()), co2, 0)
    }

    #[test]
    fn test_week_bounds_monday_to_sunday() {
        // 2024-01-10 is a Wednesday
        assert_eq!(week_bounds(day(2024, 1, 10)), (day(2024, 1, 8), day(2024, 1, 14)));
        assert_eq!(week_bounds(day(2024, 1, 8)), (day(2024, 1, 8), day(2024, 1, 14)));
        assert_eq!(week_bounds(day(2024, 1, 14)), (day(2024, 1, 8), day(2024, 1, 14)));
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(2024, 2).unwrap(), (day(2024, 2, 1), day(2024, 2, 29)));
        assert_eq!(month_bounds(2023, 12).unwrap(), (day(2023, 12, 1), day(2023, 12, 31)));
        assert!(matches!(month_bounds(2024, 13), Err(Error::Validation(_))));
        assert!(matches!(month_bounds(2024, 0), Err(Error::Validation(_))));
    }

    #[test]
    fn test_weekly_summary_ignores_emissions_and_other_weeks() {
        let activities = vec![
            ride(day(2024, 1, 8), 1.71, 17),
            meal(day(2024, 1, 9), -5.8),
            ride(day(2024, 1, 9), 0.5, 5),
            ride(day(2024, 1, 15), 3.0, 30),
        ];

        let summary = weekly_summary(&activities, day(2024, 1, 10));

        assert_eq!(summary.total_activities, 3);
        assert_eq!(summary.total_co2_saved, 2.21);
        assert_eq!(summary.total_points, 22);
        assert_eq!(summary.daily_breakdown.len(), 7);
        assert_eq!(summary.daily_breakdown[1].activities_count, 2);
        assert_eq!(summary.daily_breakdown[1].co2_saved, 0.5);
        assert!(summary.best_day.is_none());

        let food = summary
            .category_breakdown
            .iter()
            .find(|c| c.category == ActivityCategory::Food)
            .unwrap();
        assert_eq!(food.count, 1);
        assert_eq!(food.co2_saved, 0.0);
    }

    #[test]
    fn test_monthly_summary_best_day() {
        let activities = vec![
            ride(day(2024, 2, 3), 1.0, 10),
            ride(day(2024, 2, 10), 2.0, 20),
            ride(day(2024, 2, 20), 2.0, 20),
            ride(day(2024, 3, 1), 9.0, 90),
        ];

        let summary = monthly_summary(&activities, 2024, 2).unwrap();

        assert_eq!(summary.daily_breakdown.len(), 29);
        assert_eq!(summary.total_co2_saved, 5.0);
        let best = summary.best_day.unwrap();
        assert_eq!(best.date, day(2024, 2, 10));
        assert_eq!(best.co2_saved, 2.0);
    }

    #[test]
    fn test_monthly_summary_without_savings_has_no_best_day() {
        let activities = vec![meal(day(2024, 2, 3), -2.9)];
        let summary = monthly_summary(&activities, 2024, 2).unwrap();
        assert!(summary.best_day.is_none());
        assert_eq!(summary.total_activities, 1);
    }

    #[test]
    fn test_equivalences() {
        assert_eq!(co2_to_trees(42.0), 2.0);
        assert_eq!(co2_to_car_miles(4.04), 10.0);
        assert_eq!(co2_to_phone_charges(1.0), 125.0);
    }

    #[test]
    fn test_activity_stats_reads_ledger() {
        let mut state = ProgressionState::new(Uuid::nil());
        state.apply_activity(1.71, 17, day(2024, 1, 8));
        state.apply_activity(-5.8, 0, day(2024, 1, 9));
        let activities = vec![ride(day(2024, 1, 8), 1.71, 17), meal(day(2024, 1, 9), -5.8)];

        let stats = activity_stats(&state, &activities);

        assert_eq!(stats.total_co2_saved, 1.71);
        assert_eq!(stats.total_points, 17);
        assert_eq!(stats.total_activities, 2);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.by_category.len(), ActivityCategory::ALL.len());
    }
}
