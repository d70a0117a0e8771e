//! Tests for the global leaderboard
//!
//! Users are ranked by one progression statistic. Listed users take their list
//! position; anyone past the cut is ranked one behind everybody strictly ahead.

#[cfg(test)]
mod tests {
    use crate::clock::FixedClock;
    use crate::handler::ProgressionEngine;
    use crate::leaderboard::{self, MAX_LEADERBOARD_LIMIT};
    use crate::memory::MemoryStore;
    use crate::notifier::MemoryNotifier;
    use crate::validate::ActivityInput;
    use chrono::{TimeZone, Utc};
    use common::ledger::{level_for_points, ProgressionRecord};
    use common::models::LeaderboardMetric;
    use common::Error;
    use std::sync::Arc;
    use uuid::Uuid;

    fn user(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn record(user_id: Uuid, points: i64, co2: f64, streak: i32) -> ProgressionRecord {
        ProgressionRecord {
            user_id,
            carbon_points: points,
            total_co2_saved: co2,
            level: level_for_points(points),
            current_streak: streak,
            longest_streak: streak,
            last_activity_date: None,
            total_activities: 1,
        }
    }

    fn engine(store: Arc<MemoryStore>) -> ProgressionEngine {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
        ));
        ProgressionEngine::new(store, Arc::new(MemoryNotifier::new()), clock)
    }

    /// Five users with distinct points, CO2 totals and streaks
    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.set_progression(record(user(1), 500, 12.5, 2));
        store.set_progression(record(user(2), 900, 40.0, 1));
        store.set_progression(record(user(3), 100, 90.123, 7));
        store.set_progression(record(user(4), 300, 3.0, 0));
        store.set_progression(record(user(5), 700, 25.0, 4));
        store
    }

    fn ranked_users(board: &leaderboard::GlobalLeaderboard) -> Vec<Uuid> {
        board.entries.iter().map(|e| e.user_id).collect()
    }

    #[tokio::test]
    async fn test_points_ranking() {
        let engine = engine(seeded());

        let board = engine
            .leaderboard(user(1), LeaderboardMetric::Points, 10)
            .await
            .unwrap();

        assert_eq!(
            ranked_users(&board),
            vec![user(2), user(5), user(1), user(4), user(3)]
        );
        let ranks: Vec<i64> = board.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert_eq!(board.your_rank, 3);
        assert_eq!(board.total_users, 5);
        assert_eq!(board.metric, LeaderboardMetric::Points);
    }

    #[tokio::test]
    async fn test_co2_and_streak_rankings() {
        let engine = engine(seeded());

        let co2 = engine
            .leaderboard(user(4), LeaderboardMetric::Co2Saved, 10)
            .await
            .unwrap();
        assert_eq!(
            ranked_users(&co2),
            vec![user(3), user(2), user(5), user(1), user(4)]
        );
        assert_eq!(co2.entries[0].total_co2_saved, 90.12);
        assert_eq!(co2.your_rank, 5);

        let streak = engine
            .leaderboard(user(3), LeaderboardMetric::Streak, 10)
            .await
            .unwrap();
        assert_eq!(
            ranked_users(&streak),
            vec![user(3), user(5), user(1), user(2), user(4)]
        );
        assert_eq!(streak.entries[0].current_streak, 7);
        assert_eq!(streak.your_rank, 1);
    }

    /// Equal values fall back to points, then to the lower user id
    #[tokio::test]
    async fn test_ties_are_broken_deterministically() {
        let store = Arc::new(MemoryStore::new());
        store.set_progression(record(user(9), 200, 0.0, 3));
        store.set_progression(record(user(8), 400, 0.0, 3));
        store.set_progression(record(user(7), 200, 0.0, 3));

        let board = engine(store)
            .leaderboard(user(9), LeaderboardMetric::Streak, 10)
            .await
            .unwrap();

        assert_eq!(ranked_users(&board), vec![user(8), user(7), user(9)]);
        assert_eq!(board.your_rank, 3);
    }

    #[tokio::test]
    async fn test_user_below_the_cut_gets_rank() {
        let engine = engine(seeded());

        let board = engine
            .leaderboard(user(3), LeaderboardMetric::Points, 2)
            .await
            .unwrap();

        assert_eq!(ranked_users(&board), vec![user(2), user(5)]);
        assert_eq!(board.your_rank, 5);
        assert_eq!(board.total_users, 5);
    }

    /// Below the cut, users tied on the metric share the better rank
    #[tokio::test]
    async fn test_tied_user_below_the_cut_shares_rank() {
        let store = seeded();
        store.set_progression(record(user(6), 300, 1.0, 0));

        let board = engine(store)
            .leaderboard(user(6), LeaderboardMetric::Points, 3)
            .await
            .unwrap();

        assert_eq!(board.entries.len(), 3);
        assert_eq!(board.your_rank, 4);
        assert_eq!(board.total_users, 6);
    }

    #[tokio::test]
    async fn test_user_without_progression_is_ranked_last() {
        let engine = engine(seeded());

        let board = engine
            .leaderboard(Uuid::new_v4(), LeaderboardMetric::Points, 10)
            .await
            .unwrap();

        assert_eq!(board.entries.len(), 5);
        assert_eq!(board.your_rank, 6);
        assert_eq!(board.total_users, 5);
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let store = Arc::new(MemoryStore::new());
        for n in 0..(MAX_LEADERBOARD_LIMIT as u128 + 20) {
            store.set_progression(record(user(n + 1), n as i64, 0.0, 0));
        }
        let caller = record(user(1), 0, 0.0, 0);

        let none = leaderboard::global(store.as_ref(), &caller, LeaderboardMetric::Points, 0)
            .await
            .unwrap();
        assert_eq!(none.entries.len(), 1);

        let huge = leaderboard::global(store.as_ref(), &caller, LeaderboardMetric::Points, 10_000)
            .await
            .unwrap();
        assert_eq!(huge.entries.len(), MAX_LEADERBOARD_LIMIT as usize);
        assert_eq!(huge.total_users, MAX_LEADERBOARD_LIMIT + 20);
        assert_eq!(huge.your_rank, MAX_LEADERBOARD_LIMIT + 20);
    }

    #[tokio::test]
    async fn test_logged_activity_moves_user_up() {
        let store = seeded();
        let engine = engine(store);
        let newcomer = user(42);

        let ride = ActivityInput {
            category: "transport".to_string(),
            transport_mode: Some("bicycle".to_string()),
            distance_km: Some(200.0),
            ..Default::default()
        };
        let logged = engine.log_activity(newcomer, ride).await.unwrap();

        let board = engine
            .leaderboard(newcomer, LeaderboardMetric::Points, 10)
            .await
            .unwrap();
        let entry = board
            .entries
            .iter()
            .find(|e| e.user_id == newcomer)
            .unwrap();

        assert_eq!(entry.carbon_points, logged.progression.carbon_points());
        assert!(entry.carbon_points > 300);
        assert_eq!(board.your_rank, 4);
        assert_eq!(board.total_users, 6);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let store = seeded();
        store.fail("top_progressions");

        let err = engine(store)
            .leaderboard(user(1), LeaderboardMetric::Points, 10)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Database(_)));
    }
}
