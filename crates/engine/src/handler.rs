//! Per-user orchestration of activity logging and reward evaluation

use common::ledger::{ProgressionState, StreakChange};
use common::models::{
    Activity, Challenge, ChallengeParticipation, DailyStreak, LeaderboardMetric, NotificationKind,
    UserBadge,
};
use common::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::challenges::{ChallengeStats, ChallengeStanding, ChallengeTracker};
use crate::clock::Clock;
use crate::evaluator::{AchievementProgress, Award, RewardEvaluator};
use crate::impact;
use crate::leaderboard::{self, GlobalLeaderboard};
use crate::locks::UserLocks;
use crate::notifier::{Notifier, RewardNotifier};
use crate::store::Store;
use crate::summary::{self, ActivityStats, PeriodSummary};
use crate::validate::{self, ActivityInput};

/// Streak lengths that trigger a milestone notification
const STREAK_MILESTONES: [i32; 4] = [7, 30, 100, 365];

/// Number of streak history days returned by default
pub const STREAK_HISTORY_DAYS: i64 = 30;

/// Outcome of logging one activity
#[derive(Debug, Clone, Serialize)]
pub struct ActivityLogged {
    pub activity: Activity,
    pub progression: ProgressionState,
    pub streak: StreakChange,
    pub leveled_up: bool,
    pub awards: Vec<Award>,
}

/// Outcome of an operation that may have credited reward points
#[derive(Debug, Clone, Serialize)]
pub struct Rewarded<T> {
    #[serde(flatten)]
    pub value: T,
    pub awards: Vec<Award>,
    pub leveled_up: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionProgress {
    pub total: usize,
    pub earned: usize,
    pub percentage: f64,
}

impl CollectionProgress {
    fn new(total: usize, earned: usize) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            (earned as f64 / total as f64 * 1000.0).round() / 10.0
        };
        Self {
            total,
            earned,
            percentage,
        }
    }
}

/// Level, badge, achievement and streak overview for one user
#[derive(Debug, Clone, Serialize)]
pub struct ProgressionSummary {
    pub progression: ProgressionState,
    pub points_to_next_level: i64,
    pub level_progress: f64,
    pub badges: CollectionProgress,
    pub recent_badges: Vec<UserBadge>,
    pub achievements: CollectionProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakHistory {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub history: Vec<DailyStreak>,
}

/// Entry point for every state-changing operation.
///
/// Operations on the same user run one at a time; different users never wait on each other.
pub struct ProgressionEngine {
    store: Arc<dyn Store>,
    notifier: RewardNotifier,
    clock: Arc<dyn Clock>,
    locks: UserLocks,
    evaluator: RewardEvaluator,
    tracker: ChallengeTracker,
}

impl ProgressionEngine {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        let notifier = RewardNotifier::new(notifier);
        Self {
            evaluator: RewardEvaluator::new(store.clone(), notifier.clone(), clock.clone()),
            tracker: ChallengeTracker::new(store.clone(), notifier.clone(), clock.clone()),
            store,
            notifier,
            clock,
            locks: UserLocks::new(),
        }
    }

    /// Validate, score and record an activity, then evaluate rewards
    pub async fn log_activity(&self, user_id: Uuid, input: ActivityInput) -> Result<ActivityLogged> {
        let now = self.clock.now();
        let validated = validate::validate(input, now)?;

        let _guard = self.locks.acquire(user_id).await;
        let mut state = self.load_state(user_id).await?;
        let level_before = state.level();

        let assessed = impact::assess(&validated.details);
        let activity = Activity {
            id: Uuid::new_v4(),
            user_id,
            details: validated.details,
            description: validated.description,
            location: validated.location,
            notes: validated.notes,
            co2_impact: assessed.co2_kg,
            points_earned: assessed.points,
            logged_at: validated.occurred_at.unwrap_or(now),
        };
        let applied = state.apply_activity(assessed.co2_kg, assessed.points, activity.date());
        let day = self.streak_row(&state, &activity).await?;
        self.store
            .record_activity(&activity, &day, &state.to_record())
            .await?;
        info!(
            "🌱 Activity logged for {}: {} ({:+.3} kg CO2, +{} points)",
            user_id,
            activity.category(),
            activity.co2_impact,
            activity.points_earned
        );
        if applied.streak == StreakChange::Extended
            && STREAK_MILESTONES.contains(&state.current_streak())
        {
            self.notifier
                .notify(
                    user_id,
                    NotificationKind::Streak,
                    format!("{}-Day Streak!", state.current_streak()),
                    format!(
                        "You have logged activities {} days in a row. Keep it up!",
                        state.current_streak()
                    ),
                    None,
                )
                .await;
        }

        let awards = self.evaluate(&mut state, true).await?;
        let leveled_up = self.finish(&state, level_before).await;

        Ok(ActivityLogged {
            activity,
            progression: state,
            streak: applied.streak,
            leveled_up,
            awards,
        })
    }

    /// Log one of the predefined quick-log templates
    pub async fn quick_log(&self, user_id: Uuid, template: &str) -> Result<ActivityLogged> {
        let input = validate::quick_log_template(template)?;
        self.log_activity(user_id, input).await
    }

    /// Run the badge and achievement evaluator outside of activity logging
    pub async fn check_rewards(&self, user_id: Uuid) -> Result<Rewarded<ProgressionState>> {
        let _guard = self.locks.acquire(user_id).await;
        let mut state = self.load_state(user_id).await?;
        let level_before = state.level();

        let awards = self.evaluate(&mut state, false).await?;
        let leveled_up = self.finish(&state, level_before).await;

        Ok(Rewarded {
            value: state,
            awards,
            leveled_up,
        })
    }

    pub async fn join_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Rewarded<ChallengeParticipation>> {
        let _guard = self.locks.acquire(user_id).await;
        let mut state = self.load_state(user_id).await?;
        let level_before = state.level();

        let (participation, award) = self.tracker.join(&mut state, challenge_id).await?;
        self.after_challenge(state, level_before, participation, award)
            .await
    }

    pub async fn refresh_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Rewarded<ChallengeParticipation>> {
        let _guard = self.locks.acquire(user_id).await;
        let mut state = self.load_state(user_id).await?;
        let level_before = state.level();

        let (participation, award) = self.tracker.refresh(&mut state, challenge_id).await?;
        self.after_challenge(state, level_before, participation, award)
            .await
    }

    pub async fn leave_challenge(&self, user_id: Uuid, challenge_id: Uuid) -> Result<()> {
        let _guard = self.locks.acquire(user_id).await;
        self.tracker.leave(user_id, challenge_id).await
    }

    pub async fn user_challenges(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Challenge, ChallengeParticipation)>> {
        self.store.user_challenges(user_id).await
    }

    pub async fn challenge_leaderboard(&self, challenge_id: Uuid) -> Result<Vec<ChallengeStanding>> {
        self.tracker.leaderboard(challenge_id).await
    }

    pub async fn challenge_stats(&self, user_id: Uuid) -> Result<ChallengeStats> {
        self.tracker.stats(user_id).await
    }

    /// Global ranking by `metric`, with the user's own position
    pub async fn leaderboard(
        &self,
        user_id: Uuid,
        metric: LeaderboardMetric,
        limit: i64,
    ) -> Result<GlobalLeaderboard> {
        let state = self.load_state(user_id).await?;
        leaderboard::global(self.store.as_ref(), &state.to_record(), metric, limit).await
    }

    pub async fn progression(&self, user_id: Uuid) -> Result<ProgressionState> {
        self.load_state(user_id).await
    }

    pub async fn progression_summary(&self, user_id: Uuid) -> Result<ProgressionSummary> {
        let state = self.load_state(user_id).await?;

        let total_badges = self.store.active_badges().await?.len();
        let mut earned = self.store.user_badges(user_id).await?;
        earned.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));

        let achievements = self.evaluator.achievement_progress(user_id).await?;
        let completed = achievements.iter().filter(|a| a.is_completed).count();

        Ok(ProgressionSummary {
            points_to_next_level: state.points_to_next_level(),
            level_progress: state.level_progress(),
            badges: CollectionProgress::new(total_badges, earned.len()),
            recent_badges: earned.into_iter().take(5).collect(),
            achievements: CollectionProgress::new(achievements.len(), completed),
            progression: state,
        })
    }

    pub async fn achievements(&self, user_id: Uuid) -> Result<Vec<AchievementProgress>> {
        self.evaluator.achievement_progress(user_id).await
    }

    pub async fn user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadge>> {
        self.store.user_badges(user_id).await
    }

    /// Flip whether an earned badge is showcased. Returns the new value.
    pub async fn toggle_badge_showcase(&self, user_id: Uuid, badge_id: &str) -> Result<bool> {
        self.store
            .toggle_badge_showcase(user_id, badge_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Badge {} not earned", badge_id)))
    }

    pub async fn recent_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<Activity>> {
        self.store.recent_activities(user_id, limit).await
    }

    pub async fn weekly_summary(&self, user_id: Uuid) -> Result<PeriodSummary> {
        let today = self.clock.today();
        let (start, end) = summary::week_bounds(today);
        let activities = self.store.activities_between(user_id, start, end).await?;
        Ok(summary::weekly_summary(&activities, today))
    }

    pub async fn monthly_summary(
        &self,
        user_id: Uuid,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<PeriodSummary> {
        let today = self.clock.today();
        let year = year.unwrap_or(chrono::Datelike::year(&today));
        let month = month.unwrap_or(chrono::Datelike::month(&today));
        let (start, end) = summary::month_bounds(year, month)?;
        let activities = self.store.activities_between(user_id, start, end).await?;
        summary::monthly_summary(&activities, year, month)
    }

    pub async fn activity_stats(&self, user_id: Uuid) -> Result<ActivityStats> {
        let state = self.load_state(user_id).await?;
        let activities = self.store.all_activities(user_id).await?;
        Ok(summary::activity_stats(&state, &activities))
    }

    pub async fn streak_history(&self, user_id: Uuid) -> Result<StreakHistory> {
        let state = self.load_state(user_id).await?;
        let history = self
            .store
            .streak_history(user_id, STREAK_HISTORY_DAYS)
            .await?;
        Ok(StreakHistory {
            current_streak: state.current_streak(),
            longest_streak: state.longest_streak(),
            history,
        })
    }

    async fn load_state(&self, user_id: Uuid) -> Result<ProgressionState> {
        Ok(match self.store.load_progression(user_id).await? {
            Some(record) => ProgressionState::restore(record),
            None => ProgressionState::new(user_id),
        })
    }

    /// Evaluator pass, optional challenge refresh, then one more pass if anything was granted
    async fn evaluate(&self, state: &mut ProgressionState, challenges: bool) -> Result<Vec<Award>> {
        let mut awards = self.evaluator.run_pass(state).await?;
        if challenges {
            awards.extend(self.tracker.refresh_open(state).await?);
        }
        if !awards.is_empty() {
            debug!("Reward feedback pass for {}", state.user_id());
            awards.extend(self.evaluator.run_pass(state).await?);
        }
        Ok(awards)
    }

    async fn after_challenge(
        &self,
        mut state: ProgressionState,
        level_before: i32,
        participation: ChallengeParticipation,
        award: Option<Award>,
    ) -> Result<Rewarded<ChallengeParticipation>> {
        let mut awards: Vec<Award> = award.into_iter().collect();
        if !awards.is_empty() {
            awards.extend(self.evaluate(&mut state, false).await?);
        }
        let leveled_up = self.finish(&state, level_before).await;

        Ok(Rewarded {
            value: participation,
            awards,
            leveled_up,
        })
    }

    /// Announce a level change once. The ledger was stored with each write that changed it.
    async fn finish(&self, state: &ProgressionState, level_before: i32) -> bool {
        let leveled_up = state.level() > level_before;
        if leveled_up {
            info!(
                "⬆️ User {} reached level {} ({} points)",
                state.user_id(),
                state.level(),
                state.carbon_points()
            );
            self.notifier
                .notify(
                    state.user_id(),
                    NotificationKind::LevelUp,
                    format!("Level Up! You reached level {}", state.level()),
                    format!(
                        "You now have {} carbon points. {} more to the next level.",
                        state.carbon_points(),
                        state.points_to_next_level()
                    ),
                    None,
                )
                .await;
        }
        leveled_up
    }

    /// The day's history row with `activity` counted in
    async fn streak_row(&self, state: &ProgressionState, activity: &Activity) -> Result<DailyStreak> {
        let date = activity.date();
        let existing = self.store.streak_day(activity.user_id, date).await?;
        let (count, saved) = existing
            .map(|d| (d.activities_count, d.co2_saved))
            .unwrap_or((0, 0.0));

        Ok(DailyStreak {
            user_id: activity.user_id,
            date,
            activities_count: count + 1,
            co2_saved: common::ledger::round3(saved + activity.co2_impact.max(0.0)),
            streak_day: state.current_streak(),
        })
    }
}
