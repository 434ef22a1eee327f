// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Fitness-specific configuration: template catalog, plan adaptation and reward tuning

use crate::planner::TemplateCatalog;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main fitness configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    pub catalog: TemplateCatalog,
    pub adaptation: AdaptationConfig,
    pub limitations: Vec<LimitationRule>,
    pub rewards: RewardConfig,
    pub bonus: BonusScoreConfig,
}

/// Duration derating applied after missed activities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Missed activities in the previous plan that trigger derating
    pub missed_days_threshold: usize,
    /// Duration multiplier applied when derating
    pub derated_multiplier: f64,
}

/// Keyword matched against profile limitations, case-insensitively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitationRule {
    pub keyword: String,
    pub modification: String,
}

/// Experience point and badge tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub workout_xp: u64,
    pub streak_xp_per_day: u64,
    pub streak_xp_cap: u64,
    /// Probability of a bonus on a rewarded workout
    pub bonus_chance: f64,
    pub bonus_xp_min: u64,
    pub bonus_xp_max: u64,
    /// Workouts finished before this local hour count as early
    pub early_bird_hour: u32,
    pub five_workouts_threshold: u32,
    pub seven_day_streak_threshold: u32,
}

/// Health insurance bonus rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusScoreConfig {
    pub daily_step_goal: u64,
    pub days_required: u32,
    pub days_tracked: u32,
}

impl FitnessConfig {
    /// Load fitness configuration from file or use defaults
    pub fn load(path: Option<String>) -> Result<Self> {
        // Try explicit path first
        if let Some(config_path) = path {
            return Self::load_from_file(&config_path);
        }

        if Path::new("fitness_config.toml").exists() {
            return Self::load_from_file("fitness_config.toml");
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fitness config file: {}", path))?;

        let config: FitnessConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse fitness config file: {}", path))?;

        config
            .validate()
            .with_context(|| format!("Invalid fitness config file: {}", path))?;

        Ok(config)
    }

    /// Reject configurations the generator or reward layer cannot honor
    pub fn validate(&self) -> Result<()> {
        self.catalog.validate()?;

        let multiplier = self.adaptation.derated_multiplier;
        if !(multiplier > 0.0 && multiplier <= 1.0) {
            anyhow::bail!("derated_multiplier must be in (0, 1], got {}", multiplier);
        }
        if !(0.0..=1.0).contains(&self.rewards.bonus_chance) {
            anyhow::bail!("bonus_chance must be in [0, 1], got {}", self.rewards.bonus_chance);
        }
        if self.rewards.bonus_xp_min > self.rewards.bonus_xp_max {
            anyhow::bail!(
                "bonus_xp_min ({}) exceeds bonus_xp_max ({})",
                self.rewards.bonus_xp_min,
                self.rewards.bonus_xp_max
            );
        }
        if self.limitations.iter().any(|rule| rule.keyword.trim().is_empty()) {
            anyhow::bail!("limitation rules need a non-empty keyword");
        }
        if self.bonus.days_required == 0 {
            anyhow::bail!("bonus days_required must be positive");
        }
        Ok(())
    }

    /// Modification notes for every rule whose keyword appears in any limitation
    pub fn modifications_for(&self, limitations: &[String]) -> Vec<&str> {
        let lowered: Vec<String> = limitations.iter().map(|l| l.to_lowercase()).collect();
        self.limitations
            .iter()
            .filter(|rule| {
                let keyword = rule.keyword.to_lowercase();
                lowered.iter().any(|l| l.contains(&keyword))
            })
            .map(|rule| rule.modification.as_str())
            .collect()
    }
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            catalog: TemplateCatalog::default(),
            adaptation: AdaptationConfig::default(),
            limitations: default_limitation_rules(),
            rewards: RewardConfig::default(),
            bonus: BonusScoreConfig::default(),
        }
    }
}

fn default_limitation_rules() -> Vec<LimitationRule> {
    [
        ("knee", "Low-impact alternatives for knee exercises"),
        ("back", "Core-focused, back-friendly movements"),
        ("shoulder", "Shoulder-friendly exercise modifications"),
    ]
    .into_iter()
    .map(|(keyword, modification)| LimitationRule {
        keyword: keyword.to_string(),
        modification: modification.to_string(),
    })
    .collect()
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            missed_days_threshold: 2,
            derated_multiplier: 0.8,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            workout_xp: 25,
            streak_xp_per_day: 5,
            streak_xp_cap: 50,
            bonus_chance: 0.1,
            bonus_xp_min: 5,
            bonus_xp_max: 15,
            early_bird_hour: 8,
            five_workouts_threshold: 5,
            seven_day_streak_threshold: 7,
        }
    }
}

impl Default for BonusScoreConfig {
    fn default() -> Self {
        Self {
            daily_step_goal: 8000,
            days_required: 20,
            days_tracked: 30,
        }
    }
}
