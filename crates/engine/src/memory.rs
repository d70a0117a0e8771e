//! In-memory [`Store`] used by tests and local tooling

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::ledger::ProgressionRecord;
use common::models::{
    AchievementDefinition, Activity, BadgeDefinition, Challenge, ChallengeParticipation,
    DailyStreak, LeaderboardMetric, UserAchievement, UserBadge,
};
use common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::leaderboard::metric_value;
use crate::store::Store;

#[derive(Debug, Default)]
struct Tables {
    progression: HashMap<Uuid, ProgressionRecord>,
    activities: Vec<Activity>,
    streaks: HashMap<(Uuid, NaiveDate), DailyStreak>,
    badges: Vec<BadgeDefinition>,
    user_badges: Vec<UserBadge>,
    achievements: Vec<AchievementDefinition>,
    user_achievements: HashMap<(Uuid, String), UserAchievement>,
    challenges: Vec<Challenge>,
    participations: Vec<ChallengeParticipation>,
}

impl Tables {
    fn save_progression(&mut self, record: &ProgressionRecord) {
        self.progression.insert(record.user_id, record.clone());
    }
}

/// Same award and progress semantics as the PostgreSQL store, kept in process memory.
///
/// Each method applies all of its writes under one lock, so a write is either
/// fully visible or absent. Operations named with [`MemoryStore::fail`] return
/// `Error::Database` until [`MemoryStore::recover`] is called.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn failing(&self) -> MutexGuard<'_, HashSet<&'static str>> {
        self.failing.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing().contains(operation) {
            return Err(Error::Database(format!("{} unavailable", operation)));
        }
        Ok(())
    }

    /// Make the named store operation fail, e.g. `"active_achievements"`
    pub fn fail(&self, operation: &'static str) {
        self.failing().insert(operation);
    }

    /// Clear every injected failure
    pub fn recover(&self) {
        self.failing().clear();
    }

    pub fn add_badge(&self, badge: BadgeDefinition) {
        self.tables().badges.push(badge);
    }

    pub fn add_achievement(&self, achievement: AchievementDefinition) {
        self.tables().achievements.push(achievement);
    }

    pub fn add_challenge(&self, challenge: Challenge) {
        self.tables().challenges.push(challenge);
    }

    /// Insert an activity without touching the ledger
    pub fn add_activity(&self, activity: Activity) {
        self.tables().activities.push(activity);
    }

    /// Overwrite a user's ledger
    pub fn set_progression(&self, record: ProgressionRecord) {
        self.tables().save_progression(&record);
    }

    pub fn activity_count(&self, user_id: Uuid) -> usize {
        self.tables()
            .activities
            .iter()
            .filter(|a| a.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_progression(&self, user_id: Uuid) -> Result<Option<ProgressionRecord>> {
        self.check("load_progression")?;
        Ok(self.tables().progression.get(&user_id).cloned())
    }

    async fn top_progressions(
        &self,
        metric: LeaderboardMetric,
        limit: i64,
    ) -> Result<Vec<ProgressionRecord>> {
        self.check("top_progressions")?;
        let mut records: Vec<ProgressionRecord> =
            self.tables().progression.values().cloned().collect();
        records.sort_by(|a, b| {
            metric_value(b, metric)
                .total_cmp(&metric_value(a, metric))
                .then(b.carbon_points.cmp(&a.carbon_points))
                .then(a.user_id.cmp(&b.user_id))
        });
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn count_progressions_above(
        &self,
        metric: LeaderboardMetric,
        value: f64,
    ) -> Result<i64> {
        self.check("count_progressions_above")?;
        let ahead = self
            .tables()
            .progression
            .values()
            .filter(|r| metric_value(r, metric) > value)
            .count();
        Ok(ahead as i64)
    }

    async fn count_progressions(&self) -> Result<i64> {
        self.check("count_progressions")?;
        Ok(self.tables().progression.len() as i64)
    }

    async fn record_activity(
        &self,
        activity: &Activity,
        day: &DailyStreak,
        progression: &ProgressionRecord,
    ) -> Result<()> {
        self.check("record_activity")?;
        let mut tables = self.tables();
        tables.activities.push(activity.clone());
        tables.streaks.insert((day.user_id, day.date), day.clone());
        tables.save_progression(progression);
        Ok(())
    }

    async fn recent_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<Activity>> {
        self.check("recent_activities")?;
        let mut activities: Vec<Activity> = self
            .tables()
            .activities
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        activities.truncate(limit.max(0) as usize);
        Ok(activities)
    }

    async fn activities_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Activity>> {
        self.check("activities_between")?;
        let mut activities: Vec<Activity> = self
            .tables()
            .activities
            .iter()
            .filter(|a| a.user_id == user_id && a.date() >= from && a.date() <= to)
            .cloned()
            .collect();
        activities.sort_by_key(|a| a.logged_at);
        Ok(activities)
    }

    async fn all_activities(&self, user_id: Uuid) -> Result<Vec<Activity>> {
        self.check("all_activities")?;
        let mut activities: Vec<Activity> = self
            .tables()
            .activities
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        activities.sort_by_key(|a| a.logged_at);
        Ok(activities)
    }

    async fn streak_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<DailyStreak>> {
        self.check("streak_day")?;
        Ok(self.tables().streaks.get(&(user_id, date)).cloned())
    }

    async fn streak_history(&self, user_id: Uuid, limit: i64) -> Result<Vec<DailyStreak>> {
        self.check("streak_history")?;
        let mut days: Vec<DailyStreak> = self
            .tables()
            .streaks
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        days.sort_by(|a, b| b.date.cmp(&a.date));
        days.truncate(limit.max(0) as usize);
        Ok(days)
    }

    async fn active_badges(&self) -> Result<Vec<BadgeDefinition>> {
        self.check("active_badges")?;
        Ok(self
            .tables()
            .badges
            .iter()
            .filter(|b| b.is_active)
            .cloned()
            .collect())
    }

    async fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        self.check("user_badges")?;
        Ok(self
            .tables()
            .user_badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn award_badge(
        &self,
        user_id: Uuid,
        badge_id: &str,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool> {
        self.check("award_badge")?;
        let mut tables = self.tables();
        if tables
            .user_badges
            .iter()
            .any(|b| b.user_id == user_id && b.badge_id == badge_id)
        {
            return Ok(false);
        }
        tables.user_badges.push(UserBadge {
            user_id,
            badge_id: badge_id.to_string(),
            earned_at: at,
            is_showcased: false,
        });
        tables.save_progression(progression);
        Ok(true)
    }

    async fn toggle_badge_showcase(&self, user_id: Uuid, badge_id: &str) -> Result<Option<bool>> {
        self.check("toggle_badge_showcase")?;
        let mut tables = self.tables();
        let badge = tables
            .user_badges
            .iter_mut()
            .find(|b| b.user_id == user_id && b.badge_id == badge_id);
        Ok(badge.map(|b| {
            b.is_showcased = !b.is_showcased;
            b.is_showcased
        }))
    }

    async fn active_achievements(&self) -> Result<Vec<AchievementDefinition>> {
        self.check("active_achievements")?;
        Ok(self
            .tables()
            .achievements
            .iter()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>> {
        self.check("user_achievements")?;
        Ok(self
            .tables()
            .user_achievements
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_achievement_progress(
        &self,
        user_id: Uuid,
        achievement_id: &str,
        progress: f64,
    ) -> Result<()> {
        self.check("save_achievement_progress")?;
        let mut tables = self.tables();
        let entry = tables
            .user_achievements
            .entry((user_id, achievement_id.to_string()))
            .or_insert_with(|| UserAchievement {
                user_id,
                achievement_id: achievement_id.to_string(),
                progress: 0.0,
                is_completed: false,
                completed_at: None,
            });
        if !entry.is_completed {
            entry.progress = progress;
        }
        Ok(())
    }

    async fn complete_achievement(
        &self,
        user_id: Uuid,
        achievement_id: &str,
        progress: f64,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool> {
        self.check("complete_achievement")?;
        let mut tables = self.tables();
        let entry = tables
            .user_achievements
            .entry((user_id, achievement_id.to_string()))
            .or_insert_with(|| UserAchievement {
                user_id,
                achievement_id: achievement_id.to_string(),
                progress: 0.0,
                is_completed: false,
                completed_at: None,
            });
        if entry.is_completed {
            return Ok(false);
        }
        entry.progress = progress;
        entry.is_completed = true;
        entry.completed_at = Some(at);
        tables.save_progression(progression);
        Ok(true)
    }

    async fn challenge(&self, challenge_id: Uuid) -> Result<Option<Challenge>> {
        self.check("challenge")?;
        Ok(self
            .tables()
            .challenges
            .iter()
            .find(|c| c.id == challenge_id)
            .cloned())
    }

    async fn participation(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ChallengeParticipation>> {
        self.check("participation")?;
        Ok(self
            .tables()
            .participations
            .iter()
            .find(|p| p.challenge_id == challenge_id && p.user_id == user_id)
            .cloned())
    }

    async fn join_challenge(&self, participation: &ChallengeParticipation) -> Result<bool> {
        self.check("join_challenge")?;
        let mut tables = self.tables();
        if tables.participations.iter().any(|p| {
            p.challenge_id == participation.challenge_id && p.user_id == participation.user_id
        }) {
            return Ok(false);
        }
        tables.participations.push(participation.clone());
        Ok(true)
    }

    async fn leave_challenge(&self, challenge_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.check("leave_challenge")?;
        let mut tables = self.tables();
        let before = tables.participations.len();
        tables.participations.retain(|p| {
            !(p.challenge_id == challenge_id && p.user_id == user_id && !p.is_completed)
        });
        Ok(tables.participations.len() < before)
    }

    async fn save_challenge_progress(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        progress: f64,
    ) -> Result<()> {
        self.check("save_challenge_progress")?;
        let mut tables = self.tables();
        if let Some(p) = tables
            .participations
            .iter_mut()
            .find(|p| p.challenge_id == challenge_id && p.user_id == user_id && !p.is_completed)
        {
            p.progress = p.progress.max(progress);
        }
        Ok(())
    }

    async fn complete_challenge(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
        progression: &ProgressionRecord,
    ) -> Result<bool> {
        self.check("complete_challenge")?;
        let mut tables = self.tables();
        match tables
            .participations
            .iter_mut()
            .find(|p| p.challenge_id == challenge_id && p.user_id == user_id && !p.is_completed)
        {
            Some(p) => {
                p.progress = 100.0;
                p.is_completed = true;
                p.completed_at = Some(at);
            }
            None => return Ok(false),
        }
        tables.save_progression(progression);
        Ok(true)
    }

    async fn user_challenges(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Challenge, ChallengeParticipation)>> {
        self.check("user_challenges")?;
        let tables = self.tables();
        let mut joined: Vec<(Challenge, ChallengeParticipation)> = tables
            .participations
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                tables
                    .challenges
                    .iter()
                    .find(|c| c.id == p.challenge_id)
                    .map(|c| (c.clone(), p.clone()))
            })
            .collect();
        joined.sort_by(|a, b| b.1.joined_at.cmp(&a.1.joined_at));
        Ok(joined)
    }

    async fn open_challenges(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<(Challenge, ChallengeParticipation)>> {
        self.check("open_challenges")?;
        Ok(self
            .user_challenges(user_id)
            .await?
            .into_iter()
            .filter(|(c, p)| c.is_active && !p.is_completed && c.covers(today))
            .collect())
    }

    async fn challenge_participants(
        &self,
        challenge_id: Uuid,
    ) -> Result<Vec<ChallengeParticipation>> {
        self.check("challenge_participants")?;
        let mut participants: Vec<ChallengeParticipation> = self
            .tables()
            .participations
            .iter()
            .filter(|p| p.challenge_id == challenge_id)
            .cloned()
            .collect();
        participants.sort_by(|a, b| {
            b.progress
                .total_cmp(&a.progress)
                .then(a.joined_at.cmp(&b.joined_at))
        });
        Ok(participants)
    }
}
