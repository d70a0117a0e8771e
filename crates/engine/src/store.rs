//! Persistence contract and its PostgreSQL implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::ledger::ProgressionRecord;
use common::models::{
    AchievementDefinition, Activity, BadgeDefinition, Challenge, ChallengeParticipation,
    DailyStreak, LeaderboardMetric, UserAchievement, UserBadge,
};
use common::Result;
use sqlx::PgPool;
use uuid::Uuid;

/// Durable storage used by the engine.
///
/// Every write that changes a user's ledger takes the updated
/// [`ProgressionRecord`] and stores it in the same unit of work, so a failure
/// part way through an operation never leaves an award without its points.
///
/// Award methods (`award_badge`, `complete_achievement`, `join_challenge`,
/// `complete_challenge`) return `false` instead of failing when the unique
/// (user, item) record already exists. In that case the ledger is left as is.
#[async_trait]
pub trait Store: Send + Sync {
    async fn load_progression(&self, user_id: Uuid) -> Result<Option<ProgressionRecord>>;
    /// Ledgers ordered by `metric`, highest first, ties broken by points then user id
    async fn top_progressions(
        &self,
        metric: LeaderboardMetric,
        limit: i64,
    ) -> Result<Vec<ProgressionRecord>>;
    async fn count_progressions_above(&self, metric: LeaderboardMetric, value: f64)
        -> Result<i64>;
    async fn count_progressions(&self) -> Result<i64>;

    /// Store a new activity together with its day's streak row and the updated ledger
    async fn record_activity(
        &self,
        activity: &Activity,
        day: &DailyStreak,
        progression: &ProgressionRecord,
    ) -> Result<()>;
    async fn recent_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<Activity>>;
    /// Activities whose calendar day lies in `[from, to]`
    async fn activities_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Activity>>;
    async fn all_activities(&self, user_id: Uuid) -> Result<Vec<Activity>>;

    async fn streak_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyStreak>>;
    async fn streak_history(&self, user_id: Uuid, limit: i64) -> Result<Vec<DailyStreak>>;

    async fn active_badges(&self) -> Result<Vec<BadgeDefinition>>;
    async fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>>;
    async fn award_badge(
        &self,
        user_id: Uuid,
        badge_id: &str,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool>;
    async fn toggle_badge_showcase(&self, user_id: Uuid, badge_id: &str) -> Result<Option<bool>>;

    async fn active_achievements(&self) -> Result<Vec<AchievementDefinition>>;
    async fn user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>>;
    async fn save_achievement_progress(
        &self,
        user_id: Uuid,
        achievement_id: &str,
        progress: f64,
    ) -> Result<()>;
    async fn complete_achievement(
        &self,
        user_id: Uuid,
        achievement_id: &str,
        progress: f64,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool>;

    async fn challenge(&self, challenge_id: Uuid) -> Result<Option<Challenge>>;
    async fn participation(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ChallengeParticipation>>;
    async fn join_challenge(&self, participation: &ChallengeParticipation) -> Result<bool>;
    async fn leave_challenge(&self, challenge_id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn save_challenge_progress(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        progress: f64,
    ) -> Result<()>;
    async fn complete_challenge(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool>;
    async fn user_challenges(&self, user_id: Uuid)
        -> Result<Vec<(Challenge, ChallengeParticipation)>>;
    /// Incomplete participations in active challenges whose window contains `today`
    async fn open_challenges(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<(Challenge, ChallengeParticipation)>>;
    async fn challenge_participants(&self, challenge_id: Uuid)
        -> Result<Vec<ChallengeParticipation>>;
}

fn db_err(e: sqlx::Error) -> common::Error {
    common::Error::Database(e.to_string())
}

/// [`Store`] backed by the `db` crate.
///
/// Ledger writes run in a transaction with the rows they account for. Rows are
/// not locked across an operation, so two processes serving the same user can
/// still interleave; only [`crate::locks::UserLocks`] serializes a user, and it
/// covers a single process.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn load_progression(&self, user_id: Uuid) -> Result<Option<ProgressionRecord>> {
        db::progression::get(&self.pool, user_id).await.map_err(db_err)
    }

    async fn top_progressions(
        &self,
        metric: LeaderboardMetric,
        limit: i64,
    ) -> Result<Vec<ProgressionRecord>> {
        db::progression::top(&self.pool, metric, limit)
            .await
            .map_err(db_err)
    }

    async fn count_progressions_above(
        &self,
        metric: LeaderboardMetric,
        value: f64,
    ) -> Result<i64> {
        db::progression::count_above(&self.pool, metric, value)
            .await
            .map_err(db_err)
    }

    async fn count_progressions(&self) -> Result<i64> {
        db::progression::count(&self.pool).await.map_err(db_err)
    }

    async fn record_activity(
        &self,
        activity: &Activity,
        day: &DailyStreak,
        progression: &ProgressionRecord,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        db::activities::insert(&mut *tx, activity)
            .await
            .map_err(db_err)?;
        db::streaks::record_day(&mut *tx, day)
            .await
            .map_err(db_err)?;
        db::progression::save(&mut *tx, progression)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn recent_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<Activity>> {
        db::activities::list_recent(&self.pool, user_id, limit)
            .await
            .map_err(db_err)
    }

    async fn activities_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Activity>> {
        db::activities::list_between(&self.pool, user_id, from, to)
            .await
            .map_err(db_err)
    }

    async fn all_activities(&self, user_id: Uuid) -> Result<Vec<Activity>> {
        db::activities::list_all_for_user(&self.pool, user_id)
            .await
            .map_err(db_err)
    }

    async fn streak_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyStreak>> {
        db::streaks::get_day(&self.pool, user_id, date)
            .await
            .map_err(db_err)
    }

    async fn streak_history(&self, user_id: Uuid, limit: i64) -> Result<Vec<DailyStreak>> {
        db::streaks::history(&self.pool, user_id, limit)
            .await
            .map_err(db_err)
    }

    async fn active_badges(&self) -> Result<Vec<BadgeDefinition>> {
        db::badges::list_active(&self.pool).await.map_err(db_err)
    }

    async fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        db::badges::list_for_user(&self.pool, user_id)
            .await
            .map_err(db_err)
    }

    async fn award_badge(
        &self,
        user_id: Uuid,
        badge_id: &str,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        // dropping the transaction rolls it back
        if !db::badges::award(&mut *tx, user_id, badge_id, at)
            .await
            .map_err(db_err)?
        {
            return Ok(false);
        }
        db::progression::save(&mut *tx, progression)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn toggle_badge_showcase(&self, user_id: Uuid, badge_id: &str) -> Result<Option<bool>> {
        db::badges::toggle_showcase(&self.pool, user_id, badge_id)
            .await
            .map_err(db_err)
    }

    async fn active_achievements(&self) -> Result<Vec<AchievementDefinition>> {
        db::achievements::list_active(&self.pool).await.map_err(db_err)
    }

    async fn user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>> {
        db::achievements::list_for_user(&self.pool, user_id)
            .await
            .map_err(db_err)
    }

    async fn save_achievement_progress(
        &self,
        user_id: Uuid,
        achievement_id: &str,
        progress: f64,
    ) -> Result<()> {
        db::achievements::save_progress(&self.pool, user_id, achievement_id, progress)
            .await
            .map_err(db_err)
    }

    async fn complete_achievement(
        &self,
        user_id: Uuid,
        achievement_id: &str,
        progress: f64,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        if !db::achievements::complete(&mut *tx, user_id, achievement_id, progress, at)
            .await
            .map_err(db_err)?
        {
            return Ok(false);
        }
        db::progression::save(&mut *tx, progression)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn challenge(&self, challenge_id: Uuid) -> Result<Option<Challenge>> {
        db::challenges::get(&self.pool, challenge_id)
            .await
            .map_err(db_err)
    }

    async fn participation(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ChallengeParticipation>> {
        db::challenges::get_participation(&self.pool, challenge_id, user_id)
            .await
            .map_err(db_err)
    }

    async fn join_challenge(&self, participation: &ChallengeParticipation) -> Result<bool> {
        db::challenges::join(&self.pool, participation)
            .await
            .map_err(db_err)
    }

    async fn leave_challenge(&self, challenge_id: Uuid, user_id: Uuid) -> Result<bool> {
        db::challenges::leave(&self.pool, challenge_id, user_id)
            .await
            .map_err(db_err)
    }

    async fn save_challenge_progress(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        progress: f64,
    ) -> Result<()> {
        db::challenges::save_progress(&self.pool, challenge_id, user_id, progress)
            .await
            .map_err(db_err)
    }

    async fn complete_challenge(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        if !db::challenges::complete(&mut *tx, challenge_id, user_id, at)
            .await
            .map_err(db_err)?
        {
            return Ok(false);
        }
        db::progression::save(&mut *tx, progression)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn user_challenges(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Challenge, ChallengeParticipation)>> {
        db::challenges::list_for_user(&self.pool, user_id)
            .await
            .map_err(db_err)
    }

    async fn open_challenges(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<(Challenge, ChallengeParticipation)>> {
        db::challenges::list_open_for_user(&self.pool, user_id, today)
            .await
            .map_err(db_err)
    }

    async fn challenge_participants(
        &self,
        challenge_id: Uuid,
    ) -> Result<Vec<ChallengeParticipation>> {
        db::challenges::list_participants(&self.pool, challenge_id)
            .await
            .map_err(db_err)
    }
}
