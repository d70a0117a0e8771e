#[cfg(test)]
mod tests {
    use crate::challenges::*;
    use crate::clock::{Clock, FixedClock};
    use crate::memory::MemoryStore;
    use crate::notifier::{MemoryNotifier, RewardNotifier};
    use crate::store::Store;
    use chrono::{NaiveDate, TimeZone, Utc};
    use common::ledger::{level_for_points, ProgressionRecord, ProgressionState};
    use common::models::*;
    use common::Error;
    use std::sync::Arc;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn challenge(target: ChallengeTarget, value: f64, start: NaiveDate, end: NaiveDate) -> Challenge {
        Challenge {
            id: Uuid::new_v4(),
            name: "Green Week".to_string(),
            description: "Save CO2 this week".to_string(),
            kind: ChallengeKind::Individual,
            difficulty: Difficulty::Easy,
            target,
            target_value: value,
            reward_points: 200,
            start_date: start,
            end_date: end,
            is_active: true,
        }
    }

    fn ride(user_id: Uuid, date: NaiveDate, co2: f64) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            user_id,
            details: ActivityDetails::Transport(TransportDetails {
                mode: Some(TransportMode::Bicycle),
                distance_km: Some(5.0),
            }),
            description: "ride".to_string(),
            location: None,
            notes: None,
            co2_impact: co2,
            points_earned: 0,
            logged_at: Utc.from_utc_datetime(&date.and_hms_opt(8, 0, 0).unwrap()),
        }
    }

    fn state_with_streak(user_id: Uuid, streak: i32) -> ProgressionState {
        ProgressionState::restore(ProgressionRecord {
            user_id,
            carbon_points: 0,
            total_co2_saved: 0.0,
            level: level_for_points(0),
            current_streak: streak,
            longest_streak: streak,
            last_activity_date: Some(day(2024, 1, 10)),
            total_activities: 0,
        })
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<MemoryNotifier>,
        clock: Arc<FixedClock>,
        tracker: ChallengeTracker,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
        ));
        let tracker = ChallengeTracker::new(
            store.clone(),
            RewardNotifier::new(notifier.clone()),
            clock.clone(),
        );
        Fixture {
            store,
            notifier,
            clock,
            tracker,
        }
    }

    // window_progress tests
    #[test]
    fn test_co2_progress_sums_positive_impact_inside_window() {
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::Co2Saved, 10.0, day(2024, 1, 8), day(2024, 1, 14));
        let activities = vec![
            ride(user, day(2024, 1, 8), 2.0),
            ride(user, day(2024, 1, 14), 3.0),
            ride(user, day(2024, 1, 9), -4.0),
            ride(user, day(2024, 1, 7), 5.0),
            ride(user, day(2024, 1, 15), 5.0),
        ];

        let progress = window_progress(&c, &activities, &ProgressionState::new(user));
        assert!((progress - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_count_progress_caps_at_100() {
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::ActivitiesCount, 2.0, day(2024, 1, 8), day(2024, 1, 14));
        let activities = vec![
            ride(user, day(2024, 1, 8), 0.0),
            ride(user, day(2024, 1, 9), -1.0),
            ride(user, day(2024, 1, 10), 1.0),
        ];

        assert_eq!(window_progress(&c, &activities, &ProgressionState::new(user)), 100.0);
    }

    #[test]
    fn test_streak_progress_uses_current_streak() {
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::Streak, 10.0, day(2024, 1, 8), day(2024, 1, 14));

        let progress = window_progress(&c, &[], &state_with_streak(user, 4));
        assert!((progress - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_target_never_progresses() {
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::Co2Saved, 0.0, day(2024, 1, 8), day(2024, 1, 14));
        let activities = vec![ride(user, day(2024, 1, 9), 3.0)];

        assert_eq!(window_progress(&c, &activities, &ProgressionState::new(user)), 0.0);
    }

    // join / leave tests
    #[tokio::test]
    async fn test_join_future_challenge_keeps_zero_progress() {
        let f = fixture();
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::ActivitiesCount, 1.0, day(2024, 2, 1), day(2024, 2, 7));
        f.store.add_challenge(c.clone());
        f.store.add_activity(ride(user, day(2024, 1, 10), 1.0));

        let mut state = ProgressionState::new(user);
        let (participation, award) = f.tracker.join(&mut state, c.id).await.unwrap();

        assert_eq!(participation.progress, 0.0);
        assert!(!participation.is_completed);
        assert!(award.is_none());
        assert_eq!(participation.joined_at, f.clock.now());
    }

    #[tokio::test]
    async fn test_join_ended_challenge_rejected() {
        let f = fixture();
        let c = challenge(ChallengeTarget::Co2Saved, 5.0, day(2024, 1, 1), day(2024, 1, 9));
        f.store.add_challenge(c.clone());

        let mut state = ProgressionState::new(Uuid::new_v4());
        let result = f.tracker.join(&mut state, c.id).await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_join_challenge_ending_today_allowed() {
        let f = fixture();
        let c = challenge(ChallengeTarget::Co2Saved, 5.0, day(2024, 1, 1), day(2024, 1, 10));
        f.store.add_challenge(c.clone());

        let mut state = ProgressionState::new(Uuid::new_v4());
        assert!(f.tracker.join(&mut state, c.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_join_rejected() {
        let f = fixture();
        let c = challenge(ChallengeTarget::Co2Saved, 5.0, day(2024, 1, 8), day(2024, 1, 14));
        f.store.add_challenge(c.clone());

        let mut state = ProgressionState::new(Uuid::new_v4());
        f.tracker.join(&mut state, c.id).await.unwrap();
        let second = f.tracker.join(&mut state, c.id).await;
        assert!(matches!(second, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_join_missing_or_inactive_challenge_not_found() {
        let f = fixture();
        let mut inactive = challenge(ChallengeTarget::Co2Saved, 5.0, day(2024, 1, 8), day(2024, 1, 14));
        inactive.is_active = false;
        f.store.add_challenge(inactive.clone());

        let mut state = ProgressionState::new(Uuid::new_v4());
        assert!(matches!(
            f.tracker.join(&mut state, Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            f.tracker.join(&mut state, inactive.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_join_open_challenge_completes_immediately() {
        let f = fixture();
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::Co2Saved, 3.0, day(2024, 1, 8), day(2024, 1, 14));
        f.store.add_challenge(c.clone());
        f.store.add_activity(ride(user, day(2024, 1, 9), 2.0));
        f.store.add_activity(ride(user, day(2024, 1, 10), 1.5));

        let mut state = ProgressionState::new(user);
        let (participation, award) = f.tracker.join(&mut state, c.id).await.unwrap();

        assert!(participation.is_completed);
        assert_eq!(participation.progress, 100.0);
        assert_eq!(participation.completed_at, Some(f.clock.now()));
        assert_eq!(award.unwrap().points(), 200);
        assert_eq!(state.carbon_points(), 200);
        assert_eq!(f.notifier.count(NotificationKind::Challenge), 1);
        assert_eq!(
            f.notifier.sent()[0].title,
            "Challenge Completed: Green Week"
        );

        // completion and reward are stored together
        let saved = f.store.load_progression(user).await.unwrap().unwrap();
        assert_eq!(saved.carbon_points, 200);
    }

    #[tokio::test]
    async fn test_failed_completion_credits_nothing() {
        let f = fixture();
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::ActivitiesCount, 1.0, day(2024, 1, 8), day(2024, 1, 14));
        f.store.add_challenge(c.clone());
        f.store.add_activity(ride(user, day(2024, 1, 10), 1.0));
        f.store.fail("complete_challenge");

        let mut state = ProgressionState::new(user);
        assert!(matches!(
            f.tracker.join(&mut state, c.id).await,
            Err(Error::Database(_))
        ));
        assert_eq!(state.carbon_points(), 0);
        assert!(f.store.load_progression(user).await.unwrap().is_none());

        f.store.recover();
        let (participation, award) = f.tracker.refresh(&mut state, c.id).await.unwrap();
        assert!(participation.is_completed);
        assert_eq!(award.unwrap().points(), 200);
        assert_eq!(
            f.store.load_progression(user).await.unwrap().unwrap().carbon_points,
            200
        );
    }

    #[tokio::test]
    async fn test_completed_challenge_is_not_rewarded_twice() {
        let f = fixture();
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::ActivitiesCount, 1.0, day(2024, 1, 8), day(2024, 1, 14));
        f.store.add_challenge(c.clone());
        f.store.add_activity(ride(user, day(2024, 1, 10), 1.0));

        let mut state = ProgressionState::new(user);
        f.tracker.join(&mut state, c.id).await.unwrap();
        let (participation, award) = f.tracker.refresh(&mut state, c.id).await.unwrap();
        let again = f.tracker.refresh_open(&mut state).await.unwrap();

        assert!(participation.is_completed);
        assert!(award.is_none());
        assert!(again.is_empty());
        assert_eq!(state.carbon_points(), 200);
        assert_eq!(f.notifier.count(NotificationKind::Challenge), 1);
    }

    #[tokio::test]
    async fn test_progress_never_decreases_after_streak_reset() {
        let f = fixture();
        let user = Uuid::new_v4();
        let c = challenge(ChallengeTarget::Streak, 10.0, day(2024, 1, 8), day(2024, 1, 14));
        f.store.add_challenge(c.clone());

        let mut state = state_with_streak(user, 6);
        let (joined, _) = f.tracker.join(&mut state, c.id).await.unwrap();
        assert!((joined.progress - 60.0).abs() < 1e-9);

        let mut reset = state_with_streak(user, 1);
        let (refreshed, award) = f.tracker.refresh(&mut reset, c.id).await.unwrap();
        assert!(award.is_none());
        assert!((refreshed.progress - 60.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_leave_rules() {
        let f = fixture();
        let user = Uuid::new_v4();
        let open = challenge(ChallengeTarget::Co2Saved, 100.0, day(2024, 1, 8), day(2024, 1, 14));
        let easy = challenge(ChallengeTarget::ActivitiesCount, 1.0, day(2024, 1, 8), day(2024, 1, 14));
        f.store.add_challenge(open.clone());
        f.store.add_challenge(easy.clone());
        f.store.add_activity(ride(user, day(2024, 1, 10), 1.0));

        let mut state = ProgressionState::new(user);
        f.tracker.join(&mut state, open.id).await.unwrap();
        f.tracker.join(&mut state, easy.id).await.unwrap();

        assert!(matches!(
            f.tracker.leave(user, easy.id).await,
            Err(Error::Conflict(_))
        ));
        f.tracker.leave(user, open.id).await.unwrap();
        assert!(matches!(
            f.tracker.leave(user, open.id).await,
            Err(Error::NotFound(_))
        ));
    }

    // leaderboard / stats tests
    #[tokio::test]
    async fn test_leaderboard_orders_by_progress_then_join_time() {
        let f = fixture();
        let c = challenge(ChallengeTarget::Co2Saved, 10.0, day(2024, 1, 8), day(2024, 1, 14));
        f.store.add_challenge(c.clone());

        let (a, b, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        f.store.add_activity(ride(b, day(2024, 1, 9), 5.0));
        f.store.add_activity(ride(d, day(2024, 1, 9), 5.0));

        for user in [a, b, d] {
            let mut state = ProgressionState::new(user);
            f.tracker.join(&mut state, c.id).await.unwrap();
            f.clock.set(f.clock.now() + chrono::Duration::minutes(1));
        }

        let board = f.tracker.leaderboard(c.id).await.unwrap();
        let order: Vec<Uuid> = board.iter().map(|s| s.participation.user_id).collect();
        assert_eq!(order, vec![b, d, a]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[2].rank, 3);

        assert!(matches!(
            f.tracker.leaderboard(Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let f = fixture();
        let user = Uuid::new_v4();
        let done = challenge(ChallengeTarget::ActivitiesCount, 1.0, day(2024, 1, 8), day(2024, 1, 14));
        let running = challenge(ChallengeTarget::Co2Saved, 100.0, day(2024, 1, 8), day(2024, 1, 14));
        let upcoming = challenge(ChallengeTarget::Co2Saved, 100.0, day(2024, 2, 1), day(2024, 2, 7));
        for c in [&done, &running, &upcoming] {
            f.store.add_challenge(c.clone());
        }
        f.store.add_activity(ride(user, day(2024, 1, 10), 1.0));

        let mut state = ProgressionState::new(user);
        for c in [&done, &running, &upcoming] {
            f.tracker.join(&mut state, c.id).await.unwrap();
        }

        let stats = f.tracker.stats(user).await.unwrap();
        assert_eq!(
            stats,
            ChallengeStats {
                joined: 3,
                completed: 1,
                active: 1,
                completion_rate: 33.3,
                total_reward_points: 200,
            }
        );
    }
}
