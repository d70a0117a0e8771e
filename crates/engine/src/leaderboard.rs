//! Global ranking of users by a progression statistic

use common::ledger::ProgressionRecord;
use common::models::LeaderboardMetric;
use common::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::store::Store;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 100;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub carbon_points: i64,
    pub total_co2_saved: f64,
    pub level: i32,
    pub current_streak: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalLeaderboard {
    pub metric: LeaderboardMetric,
    pub entries: Vec<LeaderboardEntry>,
    /// The requesting user's rank, whether or not they made the list
    pub your_rank: i64,
    pub total_users: i64,
}

pub fn metric_value(record: &ProgressionRecord, metric: LeaderboardMetric) -> f64 {
    match metric {
        LeaderboardMetric::Points => record.carbon_points as f64,
        LeaderboardMetric::Co2Saved => record.total_co2_saved,
        LeaderboardMetric::Streak => record.current_streak as f64,
    }
}

/// Number records that are already in rank order, starting at 1
pub fn rank(records: Vec<ProgressionRecord>) -> Vec<LeaderboardEntry> {
    records
        .into_iter()
        .zip(1..)
        .map(|(record, rank)| LeaderboardEntry {
            rank,
            user_id: record.user_id,
            carbon_points: record.carbon_points,
            total_co2_saved: (record.total_co2_saved * 100.0).round() / 100.0,
            level: record.level,
            current_streak: record.current_streak,
        })
        .collect()
}

/// Top `limit` users by `metric`, plus where `user` stands.
///
/// Listed users keep their list position. Anyone below the cut is ranked one
/// behind the number of users with a strictly higher value.
pub async fn global(
    store: &dyn Store,
    user: &ProgressionRecord,
    metric: LeaderboardMetric,
    limit: i64,
) -> Result<GlobalLeaderboard> {
    let limit = limit.clamp(1, MAX_LEADERBOARD_LIMIT);
    let entries = rank(store.top_progressions(metric, limit).await?);

    let your_rank = match entries.iter().find(|e| e.user_id == user.user_id) {
        Some(entry) => entry.rank,
        None => {
            store
                .count_progressions_above(metric, metric_value(user, metric))
                .await?
                + 1
        }
    };

    Ok(GlobalLeaderboard {
        metric,
        entries,
        your_rank,
        total_users: store.count_progressions().await?,
    })
}
