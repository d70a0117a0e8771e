#[cfg(test)]
mod tests {
    use crate::ledger::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn state_with(points: i64, streak: i32, longest: i32, last: Option<NaiveDate>) -> ProgressionState {
        ProgressionState::restore(ProgressionRecord {
            user_id: Uuid::new_v4(),
            carbon_points: points,
            total_co2_saved: 0.0,
            level: level_for_points(points),
            current_streak: streak,
            longest_streak: longest,
            last_activity_date: last,
            total_activities: 0,
        })
    }

    // level tests
    #[test]
    fn test_level_for_points_boundaries() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(999), 1);
        assert_eq!(level_for_points(1000), 2);
        assert_eq!(level_for_points(2500), 3);
    }

    #[test]
    fn test_level_up_from_950_with_60_points() {
        let mut state = state_with(950, 0, 0, None);

        let applied = state.apply_activity(6.0, 60, day(2024, 1, 10));

        assert_eq!(state.carbon_points(), 1010);
        assert_eq!(state.level(), 2);
        assert_eq!(applied.level, LevelChange { from: 1, to: 2 });
        assert!(applied.level.leveled_up());
    }

    #[test]
    fn test_add_points_keeps_level_formula() {
        let mut state = ProgressionState::new(Uuid::new_v4());
        for points in [0, 1, 499, 500, 999, 1, 3000] {
            state.add_points(points);
            assert_eq!(state.level(), level_for_points(state.carbon_points()));
        }
    }

    #[test]
    fn test_level_progress_and_next_level() {
        let state = state_with(1250, 0, 0, None);

        assert_eq!(state.points_to_next_level(), 750);
        assert!((state.level_progress() - 25.0).abs() < 1e-9);
    }

    // apply_activity tests
    #[test]
    fn test_apply_activity_ignores_negative_impact_for_co2_total() {
        let mut state = ProgressionState::new(Uuid::new_v4());

        state.apply_activity(-5.8, 0, day(2024, 1, 1));
        state.apply_activity(1.71, 17, day(2024, 1, 1));

        assert!((state.total_co2_saved() - 1.71).abs() < 1e-9);
        assert_eq!(state.total_activities(), 2);
        assert_eq!(state.carbon_points(), 17);
    }

    // streak tests
    #[test]
    fn test_first_activity_starts_streak() {
        let mut state = ProgressionState::new(Uuid::new_v4());

        assert_eq!(state.update_streak(day(2024, 1, 1)), StreakChange::Started);
        assert_eq!(state.current_streak(), 1);
        assert_eq!(state.longest_streak(), 1);
        assert_eq!(state.last_activity_date(), Some(day(2024, 1, 1)));
    }

    #[test]
    fn test_next_day_extends_streak_by_one() {
        let mut state = state_with(0, 3, 3, Some(day(2024, 1, 10)));

        assert_eq!(state.update_streak(day(2024, 1, 11)), StreakChange::Extended);
        assert_eq!(state.current_streak(), 4);
        assert_eq!(state.longest_streak(), 4);
    }

    #[test]
    fn test_same_day_does_not_inflate_streak() {
        let mut state = state_with(0, 3, 3, Some(day(2024, 1, 10)));

        assert_eq!(state.update_streak(day(2024, 1, 10)), StreakChange::Unchanged);
        assert_eq!(state.current_streak(), 3);
        assert_eq!(state.last_activity_date(), Some(day(2024, 1, 10)));
    }

    #[test]
    fn test_gap_of_two_days_resets_streak() {
        let mut state = state_with(0, 5, 5, Some(day(2024, 1, 10)));

        assert_eq!(state.update_streak(day(2024, 1, 12)), StreakChange::Reset);
        assert_eq!(state.current_streak(), 1);
        assert_eq!(state.longest_streak(), 5);
    }

    #[test]
    fn test_backdated_activity_resets_streak() {
        let mut state = state_with(0, 4, 6, Some(day(2024, 1, 10)));

        assert_eq!(state.update_streak(day(2024, 1, 8)), StreakChange::Reset);
        assert_eq!(state.current_streak(), 1);
        assert_eq!(state.longest_streak(), 6);
        assert_eq!(state.last_activity_date(), Some(day(2024, 1, 8)));
    }

    #[test]
    fn test_longest_streak_never_decreases() {
        let mut state = ProgressionState::new(Uuid::new_v4());
        let dates = [
            day(2024, 1, 1),
            day(2024, 1, 2),
            day(2024, 1, 3),
            day(2024, 1, 7),
            day(2024, 1, 7),
            day(2024, 1, 5),
            day(2024, 1, 6),
        ];

        let mut previous_longest = 0;
        for date in dates {
            state.update_streak(date);
            assert!(state.longest_streak() >= previous_longest);
            assert!(state.longest_streak() >= state.current_streak());
            previous_longest = state.longest_streak();
        }
        assert_eq!(state.longest_streak(), 3);
    }

    #[test]
    fn test_restore_repairs_inconsistent_record() {
        let state = ProgressionState::restore(ProgressionRecord {
            user_id: Uuid::new_v4(),
            carbon_points: 2100,
            total_co2_saved: 10.0,
            level: 1,
            current_streak: 7,
            longest_streak: 2,
            last_activity_date: None,
            total_activities: 3,
        });

        assert_eq!(state.level(), 3);
        assert_eq!(state.longest_streak(), 7);
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.7100000000000002), 1.71);
        assert_eq!(round3(-5.8), -5.8);
        assert_eq!(round3(0.0404), 0.04);
    }
}
