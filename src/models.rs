// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Core data structures shared by the plan generator, the plan tracker and the
//! reward layer. Everything here serializes to the camelCase JSON shapes that
//! the web front end keeps in client storage.
//!
//! ## Core Models
//!
//! - [`UserProfile`]: demographic and preference record driving generation
//! - [`ActivityTemplate`]: immutable catalog entry
//! - [`WorkoutActivity`]: one scheduled occurrence within a plan
//! - [`WorkoutPlan`]: one generated week plus aggregate progress
//! - [`GamificationUser`]: experience points, calendar streak and badges

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of scheduled days in a generated plan
pub const DAYS_PER_PLAN: usize = 7;

/// Error returned when a closed vocabulary value is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! closed_vocabulary {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// All accepted values, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name used in storage and catalog keys
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

closed_vocabulary!(Gender, "gender", {
    Male => "male",
    Female => "female",
    Other => "other",
    PreferNotToSay => "prefer_not_to_say",
});

/// Self-reported fitness level; first half of the catalog lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

closed_vocabulary!(FitnessLevel, "fitness level", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

/// Primary fitness goal; second half of the catalog lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    GetActive,
    LoseWeight,
    BuildStrength,
    MaintainFitness,
}

closed_vocabulary!(FitnessGoal, "fitness goal", {
    GetActive => "get_active",
    LoseWeight => "lose_weight",
    BuildStrength => "build_strength",
    MaintainFitness => "maintain_fitness",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

closed_vocabulary!(Intensity, "intensity", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Stored profile that drives plan generation
///
/// # Examples
///
/// ```rust
/// use bewegungsliga::models::{FitnessGoal, FitnessLevel, Gender, UserProfile};
///
/// let profile = UserProfile::new(
///     34,
///     Gender::Female,
///     FitnessLevel::Beginner,
///     FitnessGoal::GetActive,
///     vec!["knee pain".to_string()],
/// );
/// assert_eq!(profile.limitations.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub age: u8,
    pub gender: Gender,
    pub fitness_level: FitnessLevel,
    pub fitness_goal: FitnessGoal,
    #[serde(default)]
    pub limitations: Vec<String>,
    /// Identifier of the matching record in the local profile API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        age: u8,
        gender: Gender,
        fitness_level: FitnessLevel,
        fitness_goal: FitnessGoal,
        limitations: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            age,
            gender,
            fitness_level,
            fitness_goal,
            limitations,
            csv_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable activity description from the template catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTemplate {
    pub title: String,
    pub description: String,
    /// Planned duration in minutes
    pub duration: u32,
    pub intensity: Intensity,
}

impl ActivityTemplate {
    pub fn new(title: &str, description: &str, duration: u32, intensity: Intensity) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            duration,
            intensity,
        }
    }
}

/// A single scheduled activity inside a [`WorkoutPlan`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutActivity {
    pub id: String,
    /// Day of the plan, 1 through 7
    pub day: u8,
    pub title: String,
    pub description: String,
    /// Duration in minutes after derating
    pub duration: u32,
    pub intensity: Intensity,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkoutActivity {
    /// Mark the activity completed. Returns `false` when it already was.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.completed_at = Some(at);
        true
    }
}

/// Aggregate progress over a plan's activities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanProgress {
    pub completed: u32,
    pub total: u32,
    /// Highest completed count reached within this plan, carried forward
    /// into the next generated plan. Not a calendar streak.
    #[serde(default, alias = "streak")]
    pub plan_best_completion_count: u32,
}

/// One generated week of activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start_date: DateTime<Utc>,
    pub activities: Vec<WorkoutActivity>,
    pub progress: PlanProgress,
}

impl WorkoutPlan {
    /// Number of activities not yet completed
    pub fn missed_days(&self) -> usize {
        self.activities.iter().filter(|a| !a.completed).count()
    }

    pub fn activity(&self, activity_id: &str) -> Option<&WorkoutActivity> {
        self.activities.iter().find(|a| a.id == activity_id)
    }

    /// Recompute `completed` and `total` from the activities.
    ///
    /// The best completion count only ever grows.
    pub fn recompute_progress(&mut self) {
        let completed = self.activities.iter().filter(|a| a.completed).count() as u32;
        self.progress.completed = completed;
        self.progress.total = self.activities.len() as u32;
        self.progress.plan_best_completion_count =
            self.progress.plan_best_completion_count.max(completed);
    }

    /// Whether the plan has a full week and its aggregates agree with the
    /// per-activity state
    pub fn is_consistent(&self) -> bool {
        let completed = self.activities.iter().filter(|a| a.completed).count() as u32;
        self.activities.len() == DAYS_PER_PLAN
            && self.progress.completed == completed
            && self.progress.total == self.activities.len() as u32
    }

    /// Completion ratio in percent, 0 to 100
    pub fn completion_percentage(&self) -> f64 {
        if self.progress.total == 0 {
            return 0.0;
        }
        f64::from(self.progress.completed) / f64::from(self.progress.total) * 100.0
    }
}

/// Badge that can be unlocked by the reward layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl Badge {
    pub fn locked(id: &str, name: &str, description: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            unlocked: false,
            unlocked_at: None,
        }
    }
}

/// Gamification state of the signed-in user
///
/// The level is derived from XP on every read; a `level` field found in
/// older stored data is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub xp: u64,
    /// Consecutive calendar days with at least one rewarded workout
    #[serde(default, alias = "streak")]
    pub calendar_day_streak: u32,
    #[serde(default)]
    pub last_activity_date: Option<NaiveDate>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    /// Cumulative number of rewarded workouts
    #[serde(default)]
    pub workouts_completed: u32,
}

impl GamificationUser {
    pub fn level(&self) -> u64 {
        self.xp / 100 + 1
    }

    pub fn badge(&self, badge_id: &str) -> Option<&Badge> {
        self.badges.iter().find(|b| b.id == badge_id)
    }

    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.badge(badge_id).is_some_and(|b| b.unlocked)
    }
}

/// Kind of reward reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    Workout,
    Streak,
    Bonus,
    Badge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(rename = "type")]
    pub kind: RewardType,
    pub message: String,
    pub xp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_id: Option<String>,
}

/// Entry in the completed-workout history
///
/// Older entries carry the finished workout under `workout` instead of a
/// title, with the elapsed time in seconds; they are normalized on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredWorkoutRecord")]
pub struct WorkoutRecord {
    pub date: DateTime<Utc>,
    pub activity_id: Option<String>,
    pub title: String,
    /// Duration in minutes
    pub duration: u32,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWorkoutRecord {
    date: DateTime<Utc>,
    #[serde(default)]
    activity_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    workout: Option<LegacyWorkout>,
    #[serde(default)]
    duration: f64,
    #[serde(default = "default_true")]
    completed: bool,
    #[serde(default)]
    calories: Option<f64>,
}

#[derive(Deserialize)]
struct LegacyWorkout {
    #[serde(default)]
    name: Option<String>,
}

impl From<StoredWorkoutRecord> for WorkoutRecord {
    fn from(stored: StoredWorkoutRecord) -> Self {
        let duration = match (&stored.title, &stored.workout) {
            // Legacy entries recorded elapsed seconds
            (None, Some(_)) => (stored.duration / 60.0).round(),
            _ => stored.duration,
        };
        let title = stored
            .title
            .or_else(|| stored.workout.and_then(|w| w.name))
            .unwrap_or_else(|| "Workout".to_string());

        Self {
            date: stored.date,
            activity_id: stored.activity_id,
            title,
            duration: duration.max(0.0) as u32,
            completed: stored.completed,
            calories: stored.calories.map(|c| c.max(0.0).round() as u32),
        }
    }
}

impl WorkoutRecord {
    pub fn from_activity(activity: &WorkoutActivity, at: DateTime<Utc>) -> Self {
        Self {
            date: at,
            activity_id: Some(activity.id.clone()),
            title: activity.title.clone(),
            duration: activity.duration,
            completed: true,
            calories: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub xp: u64,
    pub streak: u32,
}
