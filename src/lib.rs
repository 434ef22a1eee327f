// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # BewegungsLiga+
//!
//! Domain core of the BewegungsLiga+ fitness league: adaptive weekly workout
//! plans, completion tracking, and the reward layer that turns completed
//! workouts into experience points, streaks and badges.
//!
//! ## Features
//!
//! - **Plan generation**: seven-day plans from a template catalog keyed by
//!   fitness level and goal, annotated for physical limitations and derated
//!   after missed days
//! - **Plan tracking**: idempotent completion events, persisted after every
//!   change together with a completed-workout history
//! - **Rewards**: XP, levels, a calendar-day streak and unlockable badges
//! - **Profile API**: typed client for the local profile service with
//!   explicit degraded fallbacks
//!
//! ## Architecture
//!
//! - **Models**: shared data structures and their storage shapes
//! - **Planner**: catalog, generator and tracker
//! - **Gamification**: reward engine and streak rules
//! - **Storage**: versioned key-value repository over memory or SQLite
//! - **Config**: service settings and fitness tuning from TOML or environment
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bewegungsliga::gamification::RewardEngine;
//! use bewegungsliga::config::FitnessConfig;
//! use bewegungsliga::models::{FitnessGoal, FitnessLevel, Gender, UserProfile};
//! use bewegungsliga::planner::{PlanGenerator, PlanTracker};
//! use bewegungsliga::storage::Repository;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(FitnessConfig::load(None)?);
//!     let repository = Repository::in_memory();
//!     let profile = UserProfile::new(
//!         34,
//!         Gender::Female,
//!         FitnessLevel::Beginner,
//!         FitnessGoal::GetActive,
//!         vec!["knee pain".to_string()],
//!     );
//!
//!     let mut tracker = PlanTracker::start(
//!         PlanGenerator::new(config.clone()),
//!         repository.clone(),
//!         profile,
//!     )
//!     .await?;
//!     let first = tracker.plan().activities[0].id.clone();
//!     tracker.complete_activity(&first).await?;
//!
//!     let mut rewards =
//!         RewardEngine::load(repository, config.rewards.clone(), "1", "Anna").await?;
//!     let reward = rewards.reward_workout().await?;
//!     println!("+{} XP, level {}", reward.total_xp(), rewards.level());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bonus;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod gamification;
pub mod health;
pub mod logging;
pub mod models;
pub mod planner;
pub mod profile;
pub mod session;
pub mod storage;
