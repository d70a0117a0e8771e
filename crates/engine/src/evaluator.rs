//! Badge and achievement evaluation

use common::ledger::ProgressionState;
use common::models::{
    AchievementDefinition, BadgeDefinition, Metric, NotificationKind, UserAchievement,
};
use common::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::notifier::RewardNotifier;
use crate::store::Store;

/// A reward granted during evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Award {
    Badge {
        badge_id: String,
        name: String,
        points: u32,
    },
    Achievement {
        achievement_id: String,
        title: String,
        points: u32,
    },
    Challenge {
        challenge_id: Uuid,
        name: String,
        points: u32,
    },
}

impl Award {
    pub fn points(&self) -> u32 {
        match self {
            Award::Badge { points, .. }
            | Award::Achievement { points, .. }
            | Award::Challenge { points, .. } => *points,
        }
    }
}

/// Current value of a metric for a progression snapshot
pub fn metric_value(state: &ProgressionState, metric: Metric) -> f64 {
    match metric {
        Metric::Streak => state.longest_streak() as f64,
        Metric::Co2Saved => state.total_co2_saved(),
        Metric::ActivitiesCount => state.total_activities() as f64,
        Metric::Level => state.level() as f64,
        Metric::Points => state.carbon_points() as f64,
    }
}

/// `min(value / target * 100, 100)`; 0 when the target is not positive
pub fn percent(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (value / target * 100.0).clamp(0.0, 100.0)
}

/// An achievement with the user's progress toward it
#[derive(Debug, Clone, Serialize)]
pub struct AchievementProgress {
    #[serde(flatten)]
    pub definition: AchievementDefinition,
    pub progress: f64,
    pub progress_percentage: f64,
    pub is_completed: bool,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Evaluates badge requirements and achievement triggers against a progression snapshot
#[derive(Clone)]
pub struct RewardEvaluator {
    store: Arc<dyn Store>,
    notifier: RewardNotifier,
    clock: Arc<dyn Clock>,
}

impl RewardEvaluator {
    pub fn new(store: Arc<dyn Store>, notifier: RewardNotifier, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// One evaluation pass. Reward points are credited to `state` as they are granted,
    /// and each grant is stored together with the credited ledger.
    ///
    /// Awards already held are never granted again, so repeated passes with an
    /// unchanged snapshot return nothing.
    pub async fn run_pass(&self, state: &mut ProgressionState) -> Result<Vec<Award>> {
        let user_id = state.user_id();
        let mut awards = Vec::new();

        let badges = self.store.active_badges().await?;
        let mut earned: HashSet<String> = self
            .store
            .user_badges(user_id)
            .await?
            .into_iter()
            .map(|b| b.badge_id)
            .collect();

        for badge in &badges {
            if earned.contains(&badge.id) {
                continue;
            }
            if metric_value(state, badge.requirement) >= badge.requirement_value {
                if let Some(award) = self.grant_badge(state, badge).await? {
                    awards.push(award);
                }
                earned.insert(badge.id.clone());
            }
        }

        let achievements = self.store.active_achievements().await?;
        let mut existing: HashMap<String, UserAchievement> = self
            .store
            .user_achievements(user_id)
            .await?
            .into_iter()
            .map(|a| (a.achievement_id.clone(), a))
            .collect();

        for achievement in &achievements {
            let previous = existing.remove(&achievement.id);
            if previous.as_ref().is_some_and(|p| p.is_completed) {
                continue;
            }

            let value = metric_value(state, achievement.trigger);
            let progress = value.min(achievement.trigger_value).max(0.0);
            if percent(value, achievement.trigger_value) < 100.0 {
                if previous.map(|p| p.progress) != Some(progress) {
                    self.store
                        .save_achievement_progress(user_id, &achievement.id, progress)
                        .await?;
                }
                continue;
            }

            let mut credited = state.clone();
            credited.add_points(achievement.points_reward);
            let now = self.clock.now();
            if !self
                .store
                .complete_achievement(
                    user_id,
                    &achievement.id,
                    progress,
                    now,
                    &credited.to_record(),
                )
                .await?
            {
                continue;
            }
            *state = credited;
            info!(
                "🏆 Achievement completed: {} for user {} (+{} points)",
                achievement.id, user_id, achievement.points_reward
            );
            self.notifier
                .notify(
                    user_id,
                    NotificationKind::Achievement,
                    format!("Achievement Unlocked: {}", achievement.title),
                    format!(
                        "{} You earned {} points.",
                        achievement.description, achievement.points_reward
                    ),
                    Some(achievement.id.clone()),
                )
                .await;
            awards.push(Award::Achievement {
                achievement_id: achievement.id.clone(),
                title: achievement.title.clone(),
                points: achievement.points_reward,
            });

            if let Some(badge_id) = &achievement.badge_id {
                if earned.contains(badge_id) {
                    continue;
                }
                match badges.iter().find(|b| &b.id == badge_id) {
                    Some(badge) => {
                        if let Some(award) = self.grant_badge(state, badge).await? {
                            awards.push(award);
                        }
                        earned.insert(badge_id.clone());
                    }
                    None => debug!(
                        "Achievement {} links to unknown or inactive badge {}",
                        achievement.id, badge_id
                    ),
                }
            }
        }

        Ok(awards)
    }

    /// Grant a badge. Returns None when the user already holds it.
    async fn grant_badge(
        &self,
        state: &mut ProgressionState,
        badge: &BadgeDefinition,
    ) -> Result<Option<Award>> {
        let user_id = state.user_id();
        let mut credited = state.clone();
        credited.add_points(badge.points_reward);
        if !self
            .store
            .award_badge(user_id, &badge.id, self.clock.now(), &credited.to_record())
            .await?
        {
            debug!("Badge {} already held by {}", badge.id, user_id);
            return Ok(None);
        }
        *state = credited;
        info!(
            "🎖️ Badge earned: {} for user {} (+{} points)",
            badge.id, user_id, badge.points_reward
        );
        self.notifier
            .notify(
                user_id,
                NotificationKind::Badge,
                format!("Badge Unlocked: {}", badge.name),
                format!(
                    "{} You earned {} points.",
                    badge.description, badge.points_reward
                ),
                Some(badge.id.clone()),
            )
            .await;

        Ok(Some(Award::Badge {
            badge_id: badge.id.clone(),
            name: badge.name.clone(),
            points: badge.points_reward,
        }))
    }

    /// Every active achievement with the user's stored progress
    pub async fn achievement_progress(&self, user_id: Uuid) -> Result<Vec<AchievementProgress>> {
        let mut stored: HashMap<String, UserAchievement> = self
            .store
            .user_achievements(user_id)
            .await?
            .into_iter()
            .map(|a| (a.achievement_id.clone(), a))
            .collect();

        Ok(self
            .store
            .active_achievements()
            .await?
            .into_iter()
            .map(|definition| {
                let user = stored.remove(&definition.id);
                let progress = user.as_ref().map(|u| u.progress).unwrap_or_default();
                let is_completed = user.as_ref().is_some_and(|u| u.is_completed);
                AchievementProgress {
                    progress_percentage: if is_completed {
                        100.0
                    } else {
                        percent(progress, definition.trigger_value)
                    },
                    progress,
                    is_completed,
                    completed_at: user.and_then(|u| u.completed_at),
                    definition,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_caps_at_100() {
        assert_eq!(percent(150.0, 100.0), 100.0);
        assert_eq!(percent(25.0, 100.0), 25.0);
    }

    #[test]
    fn test_percent_non_positive_target() {
        assert_eq!(percent(10.0, 0.0), 0.0);
        assert_eq!(percent(10.0, -5.0), 0.0);
    }

    #[test]
    fn test_streak_metric_uses_longest_streak() {
        let mut state = ProgressionState::new(Uuid::new_v4());
        let d = |day| chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        state.update_streak(d(1));
        state.update_streak(d(2));
        state.update_streak(d(3));
        state.update_streak(d(9));

        assert_eq!(state.current_streak(), 1);
        assert_eq!(metric_value(&state, Metric::Streak), 3.0);
    }

    #[test]
    fn test_award_serializes_with_type_tag() {
        let award = Award::Badge {
            badge_id: "first_step".to_string(),
            name: "First Step".to_string(),
            points: 10,
        };
        let json = serde_json::to_value(&award).unwrap();
        assert_eq!(json["type"], "badge");
        assert_eq!(json["badge_id"], "first_step");
        assert_eq!(award.points(), 10);
    }
}
