//! Challenge participation and progress tracking

use common::ledger::ProgressionState;
use common::models::{
    Activity, Challenge, ChallengeParticipation, ChallengeTarget, NotificationKind,
};
use common::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::evaluator::{percent, Award};
use crate::notifier::RewardNotifier;
use crate::store::Store;

/// Progress toward a challenge target, derived from the activities in its window
pub fn window_progress(
    challenge: &Challenge,
    activities: &[Activity],
    state: &ProgressionState,
) -> f64 {
    let in_window = activities.iter().filter(|a| challenge.covers(a.date()));
    let value = match challenge.target {
        ChallengeTarget::Co2Saved => in_window
            .map(|a| a.co2_impact)
            .filter(|impact| *impact > 0.0)
            .sum(),
        ChallengeTarget::ActivitiesCount => in_window.count() as f64,
        ChallengeTarget::Streak => state.current_streak() as f64,
    };
    percent(value, challenge.target_value)
}

/// A participant's position on a challenge leaderboard
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeStanding {
    pub rank: usize,
    #[serde(flatten)]
    pub participation: ChallengeParticipation,
}

/// A user's challenge totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeStats {
    pub joined: usize,
    pub completed: usize,
    pub active: usize,
    /// Percent of joined challenges completed, one decimal
    pub completion_rate: f64,
    pub total_reward_points: u64,
}

/// Drives participations through joined → in progress → completed
#[derive(Clone)]
pub struct ChallengeTracker {
    store: Arc<dyn Store>,
    notifier: RewardNotifier,
    clock: Arc<dyn Clock>,
}

impl ChallengeTracker {
    pub fn new(store: Arc<dyn Store>, notifier: RewardNotifier, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// Recompute one participation. Completion credits the reward to `state`.
    ///
    /// Completed participations and challenges outside their window are left alone.
    /// Progress never moves backwards.
    pub async fn recompute(
        &self,
        state: &mut ProgressionState,
        challenge: &Challenge,
        participation: &ChallengeParticipation,
    ) -> Result<Option<Award>> {
        let today = self.clock.today();
        if participation.is_completed || !challenge.is_ongoing(today) {
            return Ok(None);
        }

        let user_id = state.user_id();
        let activities = match challenge.target {
            ChallengeTarget::Streak => Vec::new(),
            _ => {
                self.store
                    .activities_between(user_id, challenge.start_date, challenge.end_date)
                    .await?
            }
        };
        let progress = window_progress(challenge, &activities, state).max(participation.progress);

        if progress < 100.0 {
            if progress > participation.progress {
                debug!(
                    "Challenge {} progress for {}: {:.1}%",
                    challenge.id, user_id, progress
                );
                self.store
                    .save_challenge_progress(challenge.id, user_id, progress)
                    .await?;
            }
            return Ok(None);
        }

        let mut credited = state.clone();
        credited.add_points(challenge.reward_points);
        if !self
            .store
            .complete_challenge(
                challenge.id,
                user_id,
                self.clock.now(),
                &credited.to_record(),
            )
            .await?
        {
            return Ok(None);
        }
        *state = credited;
        info!(
            "🏁 Challenge completed: {} by user {} (+{} points)",
            challenge.name, user_id, challenge.reward_points
        );
        self.notifier
            .notify(
                user_id,
                NotificationKind::Challenge,
                format!("Challenge Completed: {}", challenge.name),
                format!(
                    "You completed {} and earned {} points.",
                    challenge.name, challenge.reward_points
                ),
                Some(challenge.id.to_string()),
            )
            .await;

        Ok(Some(Award::Challenge {
            challenge_id: challenge.id,
            name: challenge.name.clone(),
            points: challenge.reward_points,
        }))
    }

    /// Recompute every open participation for the user
    pub async fn refresh_open(&self, state: &mut ProgressionState) -> Result<Vec<Award>> {
        let open = self
            .store
            .open_challenges(state.user_id(), self.clock.today())
            .await?;

        let mut awards = Vec::new();
        for (challenge, participation) in &open {
            if let Some(award) = self.recompute(state, challenge, participation).await? {
                awards.push(award);
            }
        }
        Ok(awards)
    }

    /// Recompute a single participation on demand
    pub async fn refresh(
        &self,
        state: &mut ProgressionState,
        challenge_id: Uuid,
    ) -> Result<(ChallengeParticipation, Option<Award>)> {
        let challenge = self.challenge(challenge_id).await?;
        let participation = self.participation(challenge_id, state.user_id()).await?;

        let award = self.recompute(state, &challenge, &participation).await?;
        let participation = self.participation(challenge_id, state.user_id()).await?;
        Ok((participation, award))
    }

    /// Enrol the user. Challenges already underway are evaluated immediately.
    pub async fn join(
        &self,
        state: &mut ProgressionState,
        challenge_id: Uuid,
    ) -> Result<(ChallengeParticipation, Option<Award>)> {
        let challenge = self.challenge(challenge_id).await?;
        if !challenge.is_active {
            return Err(Error::NotFound(format!(
                "Challenge {} is not active",
                challenge_id
            )));
        }

        let today = self.clock.today();
        if challenge.has_ended(today) {
            return Err(Error::Conflict(format!(
                "Challenge {} ended on {}",
                challenge.name, challenge.end_date
            )));
        }

        let user_id = state.user_id();
        let participation = ChallengeParticipation {
            challenge_id,
            user_id,
            progress: 0.0,
            is_completed: false,
            completed_at: None,
            joined_at: self.clock.now(),
        };
        if !self.store.join_challenge(&participation).await? {
            return Err(Error::Conflict(format!(
                "Already joined challenge {}",
                challenge.name
            )));
        }
        info!("User {} joined challenge {}", user_id, challenge.name);

        let award = if challenge.has_started(today) {
            self.recompute(state, &challenge, &participation).await?
        } else {
            None
        };
        let participation = self.participation(challenge_id, user_id).await?;
        Ok((participation, award))
    }

    /// Withdraw from a challenge that has not been completed
    pub async fn leave(&self, user_id: Uuid, challenge_id: Uuid) -> Result<()> {
        let participation = self.participation(challenge_id, user_id).await?;
        if participation.is_completed {
            return Err(Error::Conflict(
                "Cannot leave a completed challenge".to_string(),
            ));
        }

        if !self.store.leave_challenge(challenge_id, user_id).await? {
            return Err(Error::Conflict(
                "Cannot leave a completed challenge".to_string(),
            ));
        }
        info!("User {} left challenge {}", user_id, challenge_id);
        Ok(())
    }

    /// Participants ranked by progress, earliest joiner first on ties
    pub async fn leaderboard(&self, challenge_id: Uuid) -> Result<Vec<ChallengeStanding>> {
        self.challenge(challenge_id).await?;
        let participants = self.store.challenge_participants(challenge_id).await?;

        Ok(participants
            .into_iter()
            .enumerate()
            .map(|(i, participation)| ChallengeStanding {
                rank: i + 1,
                participation,
            })
            .collect())
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<ChallengeStats> {
        let today = self.clock.today();
        let joined = self.store.user_challenges(user_id).await?;

        let completed: Vec<&Challenge> = joined
            .iter()
            .filter(|(_, p)| p.is_completed)
            .map(|(c, _)| c)
            .collect();
        let active = joined
            .iter()
            .filter(|(c, p)| !p.is_completed && c.is_active && c.is_ongoing(today))
            .count();
        let completion_rate = if joined.is_empty() {
            0.0
        } else {
            (completed.len() as f64 / joined.len() as f64 * 1000.0).round() / 10.0
        };

        Ok(ChallengeStats {
            joined: joined.len(),
            completed: completed.len(),
            active,
            completion_rate,
            total_reward_points: completed.iter().map(|c| u64::from(c.reward_points)).sum(),
        })
    }

    async fn challenge(&self, challenge_id: Uuid) -> Result<Challenge> {
        self.store
            .challenge(challenge_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Challenge {} not found", challenge_id)))
    }

    async fn participation(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
    ) -> Result<ChallengeParticipation> {
        self.store
            .participation(challenge_id, user_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "User {} has not joined challenge {}",
                    user_id, challenge_id
                ))
            })
    }
}
