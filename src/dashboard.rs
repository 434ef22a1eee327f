// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Weekly dashboard statistics

use crate::api::{Fetched, ProfileApiClient, RemoteUserProfile, RequestSequencer, RequestTicket};
use crate::constants::fallback;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub weekly_steps: u64,
    pub weekly_step_goal: u64,
    pub workouts_this_week: u32,
    pub calories_burned: u32,
    /// Beats per minute
    pub heart_rate: u32,
}

impl DashboardStats {
    /// Stats from an API payload; missing sections use the demo values
    pub fn from_remote(profile: &RemoteUserProfile) -> Self {
        let defaults = Self::fallback();

        let (weekly_steps, workouts_this_week, calories_burned) = match &profile.weekly_activity {
            Some(activity) => (
                activity.total_steps,
                activity.exercise_sessions,
                activity.calories_burned,
            ),
            None => (
                defaults.weekly_steps,
                defaults.workouts_this_week,
                defaults.calories_burned,
            ),
        };

        let weekly_step_goal = profile
            .goals
            .as_ref()
            .map(|g| g.weekly_step_goal)
            .filter(|goal| *goal > 0)
            .unwrap_or(defaults.weekly_step_goal);

        let heart_rate = profile
            .health_metrics
            .as_ref()
            .map(|m| m.resting_heart_rate)
            .filter(|hr| *hr > 0)
            .unwrap_or(defaults.heart_rate);

        Self {
            weekly_steps,
            weekly_step_goal,
            workouts_this_week,
            calories_burned,
            heart_rate,
        }
    }

    pub fn fallback() -> Self {
        Self {
            weekly_steps: fallback::WEEKLY_STEPS,
            weekly_step_goal: fallback::WEEKLY_STEP_GOAL,
            workouts_this_week: fallback::WORKOUTS_THIS_WEEK,
            calories_burned: fallback::CALORIES_BURNED,
            heart_rate: fallback::AVG_HEART_RATE,
        }
    }

    /// Progress toward the weekly step goal, capped at 100
    pub fn goal_percentage(&self) -> f64 {
        if self.weekly_step_goal == 0 {
            return 0.0;
        }
        (self.weekly_steps as f64 / self.weekly_step_goal as f64 * 100.0).min(100.0)
    }
}

/// Greeting for a local hour of day
pub fn greeting(hour: u32) -> &'static str {
    match hour {
        h if h < 12 => "Good morning",
        h if h < 18 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Latest dashboard stats for one user, refreshed from the profile API.
///
/// Overlapping refreshes are ordered by [`RequestSequencer`]; a response that
/// arrives after a newer one has been applied is dropped.
pub struct StatsFeed {
    client: ProfileApiClient,
    sequencer: RequestSequencer,
    latest: RwLock<Option<Fetched<DashboardStats>>>,
}

impl StatsFeed {
    pub fn new(client: ProfileApiClient) -> Self {
        Self {
            client,
            sequencer: RequestSequencer::new(),
            latest: RwLock::new(None),
        }
    }

    /// Fetch and apply fresh stats. Returns whether the result was applied.
    pub async fn refresh(&self, user_id: &str) -> bool {
        let ticket = self.sequencer.issue();
        let stats = self
            .client
            .user_profile_or_default(user_id)
            .await
            .map(|profile| DashboardStats::from_remote(&profile));
        self.apply(ticket, stats).await
    }

    /// Store `stats` unless a newer response was already applied
    pub async fn apply(&self, ticket: RequestTicket, stats: Fetched<DashboardStats>) -> bool {
        let mut latest = self.latest.write().await;
        if !self.sequencer.try_apply(ticket) {
            debug!(?ticket, "Discarding stale dashboard response");
            return false;
        }
        *latest = Some(stats);
        true
    }

    /// Ticket for a refresh driven by the caller
    pub fn begin(&self) -> RequestTicket {
        self.sequencer.issue()
    }

    pub async fn latest(&self) -> Option<Fetched<DashboardStats>> {
        self.latest.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Goals, WeeklyActivity};
    use crate::config::ApiConfig;

    #[test]
    fn test_greeting_boundaries() {
        assert_eq!(greeting(0), "Good morning");
        assert_eq!(greeting(11), "Good morning");
        assert_eq!(greeting(12), "Good afternoon");
        assert_eq!(greeting(17), "Good afternoon");
        assert_eq!(greeting(18), "Good evening");
        assert_eq!(greeting(23), "Good evening");
    }

    #[test]
    fn test_fallback_values() {
        let stats = DashboardStats::fallback();
        assert_eq!(stats.weekly_steps, 67_400);
        assert_eq!(stats.weekly_step_goal, 70_000);
        assert_eq!(stats.workouts_this_week, 6);
        assert_eq!(stats.calories_burned, 2_250);
        assert_eq!(stats.heart_rate, 145);
        assert!((stats.goal_percentage() - 96.285).abs() < 0.01);
    }

    #[test]
    fn test_goal_percentage_is_capped() {
        let stats = DashboardStats {
            weekly_steps: 91_000,
            ..DashboardStats::fallback()
        };
        assert_eq!(stats.goal_percentage(), 100.0);
    }

    #[test]
    fn test_from_remote_prefers_payload() {
        let profile = RemoteUserProfile {
            user_id: "USR042".to_string(),
            weekly_activity: Some(WeeklyActivity {
                total_steps: 41_000,
                exercise_sessions: 3,
                calories_burned: 1_800,
                active_minutes: 210,
            }),
            goals: Some(Goals {
                weekly_step_goal: 50_000,
                ..Goals::default()
            }),
            ..RemoteUserProfile::default()
        };

        let stats = DashboardStats::from_remote(&profile);
        assert_eq!(stats.weekly_steps, 41_000);
        assert_eq!(stats.weekly_step_goal, 50_000);
        assert_eq!(stats.workouts_this_week, 3);
        assert_eq!(stats.heart_rate, 145);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let feed = StatsFeed::new(ProfileApiClient::new(&ApiConfig::default()).unwrap());
        let older = feed.begin();
        let newer = feed.begin();

        let fresh = DashboardStats {
            weekly_steps: 12_000,
            ..DashboardStats::fallback()
        };
        assert!(feed.apply(newer, Fetched::Live(fresh.clone())).await);
        assert!(
            !feed
                .apply(older, Fetched::Live(DashboardStats::fallback()))
                .await
        );

        assert_eq!(feed.latest().await, Some(Fetched::Live(fresh)));
    }
}
