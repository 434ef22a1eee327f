// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Rewards and Gamification
//!
//! Experience points, the calendar-day streak and badges. The reward engine
//! is invoked by the caller after a tracker mutation; it never touches the
//! plan itself.

pub mod streak;

pub use streak::StreakChange;

use crate::config::fitness_config::RewardConfig;
use crate::constants::badges::{EARLY_BIRD, FIVE_WORKOUTS, SEVEN_DAY_STREAK};
use crate::constants::storage_keys::USER_DATA;
use crate::logging::AppLogger;
use crate::models::{Badge, GamificationUser, LeaderboardEntry, Reward, RewardType};
use crate::storage::{Repository, StorageError};
use chrono::{DateTime, Local, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Badges every user starts with, all locked
pub fn default_badges() -> Vec<Badge> {
    vec![
        Badge::locked(FIVE_WORKOUTS, "5 Workouts", "Complete 5 workouts", "💪"),
        Badge::locked(SEVEN_DAY_STREAK, "7-Day Streak", "Maintain a 7-day streak", "🔥"),
        Badge::locked(EARLY_BIRD, "Early Bird", "Complete a workout before 8am", "🌅"),
    ]
}

impl GamificationUser {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            xp: 0,
            calendar_day_streak: 0,
            last_activity_date: None,
            badges: default_badges(),
            workouts_completed: 0,
        }
    }
}

/// Everything granted for one completed workout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutReward {
    pub base: Reward,
    /// Reported separately from the base reward
    pub bonus: Option<Reward>,
    pub badges: Vec<Reward>,
    pub streak_change: StreakChange,
}

impl WorkoutReward {
    pub fn total_xp(&self) -> u64 {
        self.base.xp + self.bonus.as_ref().map_or(0, |b| b.xp)
    }
}

/// Applies rewards to one [`GamificationUser`] and persists after each change
pub struct RewardEngine {
    repository: Repository,
    config: RewardConfig,
    user: GamificationUser,
}

impl RewardEngine {
    /// Load the stored user, or start a fresh one with the default badges
    pub async fn load(
        repository: Repository,
        config: RewardConfig,
        id: &str,
        name: &str,
    ) -> Result<Self, StorageError> {
        let mut user = match repository.load::<GamificationUser>(USER_DATA).await? {
            Some(user) => user,
            None => GamificationUser::new(id, name),
        };

        // Older stored users may predate some badges
        for badge in default_badges() {
            if user.badge(&badge.id).is_none() {
                user.badges.push(badge);
            }
        }

        Ok(Self {
            repository,
            config,
            user,
        })
    }

    pub fn user(&self) -> &GamificationUser {
        &self.user
    }

    pub fn level(&self) -> u64 {
        self.user.level()
    }

    /// Reward a workout completed now
    pub async fn reward_workout(&mut self) -> Result<WorkoutReward, StorageError> {
        let mut rng = StdRng::from_entropy();
        self.reward_workout_at(Local::now(), &mut rng).await
    }

    pub async fn reward_workout_at(
        &mut self,
        now: DateTime<Local>,
        rng: &mut StdRng,
    ) -> Result<WorkoutReward, StorageError> {
        let previous = self.user.clone();
        let reward = self.apply_workout(now, rng);
        if let Err(e) = self.persist().await {
            self.user = previous;
            return Err(e);
        }

        AppLogger::log_reward(&self.user.id, "workout", reward.base.xp);
        if let Some(bonus) = &reward.bonus {
            AppLogger::log_reward(&self.user.id, "bonus", bonus.xp);
        }
        for badge in reward.badges.iter().filter_map(|b| b.badge_id.as_deref()) {
            AppLogger::log_badge_unlocked(&self.user.id, badge);
        }
        Ok(reward)
    }

    /// Grant the streak bonus: streak times the per-day XP, capped
    pub async fn reward_streak(&mut self) -> Result<Reward, StorageError> {
        let xp = (u64::from(self.user.calendar_day_streak) * self.config.streak_xp_per_day)
            .min(self.config.streak_xp_cap);
        let previous_xp = self.user.xp;
        self.add_xp(xp);
        if let Err(e) = self.persist().await {
            self.user.xp = previous_xp;
            return Err(e);
        }

        AppLogger::log_reward(&self.user.id, "streak", xp);
        Ok(Reward {
            kind: RewardType::Streak,
            message: format!("🔥 Streak Bonus! +{} XP", xp),
            xp,
            badge_id: None,
        })
    }

    /// Current user merged into `others`, highest XP first
    pub fn leaderboard(&self, others: &[LeaderboardEntry]) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = others
            .iter()
            .filter(|e| e.user_id != self.user.id)
            .cloned()
            .collect();
        entries.push(LeaderboardEntry {
            user_id: self.user.id.clone(),
            name: self.user.name.clone(),
            xp: self.user.xp,
            streak: self.user.calendar_day_streak,
        });
        entries.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.name.cmp(&b.name)));
        entries
    }

    fn apply_workout<R: Rng>(&mut self, now: DateTime<Local>, rng: &mut R) -> WorkoutReward {
        let config = self.config.clone();

        self.add_xp(config.workout_xp);

        let (streak, last, streak_change) = streak::advance(
            self.user.calendar_day_streak,
            self.user.last_activity_date,
            now.date_naive(),
        );
        self.user.calendar_day_streak = streak;
        self.user.last_activity_date = Some(last);
        self.user.workouts_completed += 1;

        let unlocked_at = now.with_timezone(&Utc);
        let mut badges = Vec::new();
        if self.user.workouts_completed >= config.five_workouts_threshold {
            badges.extend(self.unlock_badge(FIVE_WORKOUTS, unlocked_at));
        }
        if self.user.calendar_day_streak >= config.seven_day_streak_threshold {
            badges.extend(self.unlock_badge(SEVEN_DAY_STREAK, unlocked_at));
        }
        if now.hour() < config.early_bird_hour {
            badges.extend(self.unlock_badge(EARLY_BIRD, unlocked_at));
        }

        let bonus = if rng.gen_bool(config.bonus_chance) {
            let xp = rng.gen_range(config.bonus_xp_min..=config.bonus_xp_max);
            self.add_xp(xp);
            Some(Reward {
                kind: RewardType::Bonus,
                message: format!("🎉 Bonus XP! +{} XP", xp),
                xp,
                badge_id: None,
            })
        } else {
            None
        };

        WorkoutReward {
            base: Reward {
                kind: RewardType::Workout,
                message: format!("Workout completed! +{} XP", config.workout_xp),
                xp: config.workout_xp,
                badge_id: None,
            },
            bonus,
            badges,
            streak_change,
        }
    }

    fn add_xp(&mut self, amount: u64) {
        self.user.xp = self.user.xp.saturating_add(amount);
    }

    /// Unlock a locked badge; already-unlocked and unknown badges yield nothing
    fn unlock_badge(&mut self, badge_id: &str, at: DateTime<Utc>) -> Option<Reward> {
        let badge = self
            .user
            .badges
            .iter_mut()
            .find(|b| b.id == badge_id && !b.unlocked)?;
        badge.unlocked = true;
        badge.unlocked_at = Some(at);

        Some(Reward {
            kind: RewardType::Badge,
            message: format!("{} Badge unlocked: {}", badge.icon, badge.name),
            xp: 0,
            badge_id: Some(badge_id.to_string()),
        })
    }

    async fn persist(&self) -> Result<(), StorageError> {
        self.repository.save(USER_DATA, &self.user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FlakyStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(day: u32, hour: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, day, hour, 30, 0)
            .single()
            .unwrap()
    }

    fn no_bonus_config() -> RewardConfig {
        RewardConfig {
            bonus_chance: 0.0,
            ..RewardConfig::default()
        }
    }

    async fn engine(config: RewardConfig) -> RewardEngine {
        RewardEngine::load(Repository::in_memory(), config, "1", "John Doe")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_workout_reward_grants_base_xp() {
        let mut engine = engine(no_bonus_config()).await;
        let mut rng = StdRng::seed_from_u64(7);

        let reward = engine.reward_workout_at(at(4, 12), &mut rng).await.unwrap();
        assert_eq!(reward.base.xp, 25);
        assert_eq!(reward.bonus, None);
        assert_eq!(reward.streak_change, StreakChange::Started);
        assert_eq!(engine.user().xp, 25);
        assert_eq!(engine.user().calendar_day_streak, 1);
        assert_eq!(engine.level(), 1);
    }

    #[tokio::test]
    async fn test_five_workouts_badge_requires_five_workouts() {
        let mut engine = engine(no_bonus_config()).await;
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..4 {
            engine.reward_workout_at(at(4, 12), &mut rng).await.unwrap();
        }
        assert!(!engine.user().has_badge(FIVE_WORKOUTS));

        let reward = engine.reward_workout_at(at(4, 12), &mut rng).await.unwrap();
        assert!(engine.user().has_badge(FIVE_WORKOUTS));
        assert_eq!(reward.badges.len(), 1);
        assert_eq!(reward.badges[0].badge_id.as_deref(), Some(FIVE_WORKOUTS));

        // Unlocking is idempotent
        let reward = engine.reward_workout_at(at(4, 12), &mut rng).await.unwrap();
        assert!(reward.badges.is_empty());
    }

    #[tokio::test]
    async fn test_seven_day_streak_badge() {
        let mut engine = engine(no_bonus_config()).await;
        let mut rng = StdRng::seed_from_u64(3);

        for day in 1..=6 {
            engine.reward_workout_at(at(day, 12), &mut rng).await.unwrap();
        }
        assert!(!engine.user().has_badge(SEVEN_DAY_STREAK));

        engine.reward_workout_at(at(7, 12), &mut rng).await.unwrap();
        assert_eq!(engine.user().calendar_day_streak, 7);
        assert!(engine.user().has_badge(SEVEN_DAY_STREAK));
    }

    #[tokio::test]
    async fn test_early_bird_badge_before_eight() {
        let mut engine = engine(no_bonus_config()).await;
        let mut rng = StdRng::seed_from_u64(5);

        engine.reward_workout_at(at(4, 8), &mut rng).await.unwrap();
        assert!(!engine.user().has_badge(EARLY_BIRD));

        let reward = engine.reward_workout_at(at(5, 7), &mut rng).await.unwrap();
        assert!(engine.user().has_badge(EARLY_BIRD));
        assert!(reward.badges.iter().any(|b| b.badge_id.as_deref() == Some(EARLY_BIRD)));
    }

    #[tokio::test]
    async fn test_bonus_reported_separately() {
        let config = RewardConfig {
            bonus_chance: 1.0,
            ..RewardConfig::default()
        };
        let mut engine = engine(config).await;
        let mut rng = StdRng::seed_from_u64(11);

        let reward = engine.reward_workout_at(at(4, 12), &mut rng).await.unwrap();
        let bonus = reward.bonus.clone().expect("bonus should be granted");
        assert_eq!(bonus.kind, RewardType::Bonus);
        assert!((5..=15).contains(&bonus.xp));
        assert_eq!(reward.base.xp, 25);
        assert_eq!(engine.user().xp, reward.total_xp());
    }

    #[tokio::test]
    async fn test_streak_reward_is_capped() {
        let mut engine = engine(no_bonus_config()).await;
        let mut rng = StdRng::seed_from_u64(2);

        for day in 1..=3 {
            engine.reward_workout_at(at(day, 12), &mut rng).await.unwrap();
        }
        let reward = engine.reward_streak().await.unwrap();
        assert_eq!(reward.xp, 15);

        for day in 4..=15 {
            engine.reward_workout_at(at(day, 12), &mut rng).await.unwrap();
        }
        let reward = engine.reward_streak().await.unwrap();
        assert_eq!(engine.user().calendar_day_streak, 15);
        assert_eq!(reward.xp, 50);
    }

    #[tokio::test]
    async fn test_xp_monotonic_and_level_derived() {
        let mut engine = engine(RewardConfig::default()).await;
        let mut rng = StdRng::seed_from_u64(42);
        let mut previous = 0;

        for i in 0..40u32 {
            if i % 3 == 0 {
                engine.reward_streak().await.unwrap();
            } else {
                engine.reward_workout_at(at(1 + i % 28, 12), &mut rng).await.unwrap();
            }
            let xp = engine.user().xp;
            assert!(xp >= previous);
            assert_eq!(engine.level(), xp / 100 + 1);
            previous = xp;
        }
    }

    #[tokio::test]
    async fn test_state_persists_across_loads() {
        let repository = Repository::in_memory();
        let mut engine =
            RewardEngine::load(repository.clone(), no_bonus_config(), "1", "John Doe")
                .await
                .unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        engine.reward_workout_at(at(4, 12), &mut rng).await.unwrap();

        let reloaded = RewardEngine::load(repository, no_bonus_config(), "ignored", "ignored")
            .await
            .unwrap();
        assert_eq!(reloaded.user(), engine.user());
        assert_eq!(reloaded.user().badges.len(), 3);
    }

    #[tokio::test]
    async fn test_leaderboard_sorted_by_xp() {
        let mut engine = engine(no_bonus_config()).await;
        let mut rng = StdRng::seed_from_u64(4);
        for day in 1..=4 {
            engine.reward_workout_at(at(day, 12), &mut rng).await.unwrap();
        }

        let entry = |user_id: &str, name: &str, xp: u64, streak: u32| LeaderboardEntry {
            user_id: user_id.into(),
            name: name.into(),
            xp,
            streak,
        };
        let others = vec![
            entry("2", "Jane Smith", 850, 3),
            entry("3", "Mike Johnson", 50, 5),
            entry("1", "Stale Self", 9999, 0),
        ];
        let board = engine.leaderboard(&others);

        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Jane Smith", "John Doe", "Mike Johnson"]);
        assert_eq!(board[1].xp, 100);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_user_unchanged() {
        let store = Arc::new(FlakyStore::default());
        let repository = Repository::new(store.clone());
        let mut engine = RewardEngine::load(repository.clone(), no_bonus_config(), "1", "John Doe")
            .await
            .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        engine.reward_workout_at(at(4, 12), &mut rng).await.unwrap();
        let before = engine.user().clone();

        store.set_failing(true);
        assert!(engine.reward_workout_at(at(5, 12), &mut rng).await.is_err());
        assert!(engine.reward_streak().await.is_err());
        assert_eq!(engine.user(), &before);

        store.set_failing(false);
        let reward = engine.reward_workout_at(at(5, 12), &mut rng).await.unwrap();
        assert_eq!(reward.streak_change, StreakChange::Extended);
        assert_eq!(engine.user().xp, 50);
        assert_eq!(engine.user().workouts_completed, 2);

        let stored: GamificationUser = repository.load(USER_DATA).await.unwrap().unwrap();
        assert_eq!(&stored, engine.user());
    }
}
