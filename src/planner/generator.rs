// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Rule-based weekly plan generation

use super::PlanError;
use crate::config::FitnessConfig;
use crate::logging::AppLogger;
use crate::models::{PlanProgress, UserProfile, WorkoutActivity, WorkoutPlan, DAYS_PER_PLAN};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Identifiers and timestamps a generated plan is stamped with.
///
/// Keeping these outside the generator makes generation a pure function of
/// (catalog, profile, previous plan, context).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationContext {
    pub plan_id: Uuid,
    pub week_start: DateTime<Utc>,
}

impl GenerationContext {
    /// Fresh plan id, week starting now
    pub fn fresh() -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            week_start: Utc::now(),
        }
    }
}

/// Plan generator over a fitness configuration
#[derive(Debug, Clone)]
pub struct PlanGenerator {
    config: Arc<FitnessConfig>,
}

impl PlanGenerator {
    pub fn new(config: Arc<FitnessConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    /// Generate a plan with a fresh id starting now
    pub fn generate(
        &self,
        profile: &UserProfile,
        previous_plan: Option<&WorkoutPlan>,
    ) -> Result<WorkoutPlan, PlanError> {
        self.generate_with_context(profile, previous_plan, GenerationContext::fresh())
    }

    /// Deterministic generation given an explicit context
    pub fn generate_with_context(
        &self,
        profile: &UserProfile,
        previous_plan: Option<&WorkoutPlan>,
        context: GenerationContext,
    ) -> Result<WorkoutPlan, PlanError> {
        let templates = self
            .config
            .catalog
            .templates_for(profile.fitness_level, profile.fitness_goal)?;

        let missed_days = previous_plan.map_or(0, WorkoutPlan::missed_days);
        let multiplier = self.intensity_multiplier(missed_days);
        let note = self.modification_note(&profile.limitations);

        let activities: Vec<WorkoutActivity> = (0..DAYS_PER_PLAN)
            .map(|index| {
                let template = &templates[index % templates.len()];
                let day = (index + 1) as u8;
                WorkoutActivity {
                    id: format!("{}-{}", context.plan_id, day),
                    day,
                    title: template.title.clone(),
                    description: match &note {
                        Some(note) => format!("{} {}", template.description, note),
                        None => template.description.clone(),
                    },
                    duration: derate(template.duration, multiplier),
                    intensity: template.intensity,
                    completed: false,
                    completed_at: None,
                }
            })
            .collect();

        let plan = WorkoutPlan {
            id: context.plan_id,
            user_id: profile.id,
            week_start_date: context.week_start,
            progress: PlanProgress {
                completed: 0,
                total: activities.len() as u32,
                plan_best_completion_count: previous_plan
                    .map_or(0, |p| p.progress.plan_best_completion_count),
            },
            activities,
        };

        AppLogger::log_plan_generated(
            &profile.id.to_string(),
            &plan.id.to_string(),
            missed_days,
            multiplier < 1.0,
        );

        Ok(plan)
    }

    /// 1.0, or the derated multiplier once enough days were missed
    pub fn intensity_multiplier(&self, missed_days: usize) -> f64 {
        let adaptation = &self.config.adaptation;
        if missed_days >= adaptation.missed_days_threshold {
            adaptation.derated_multiplier
        } else {
            1.0
        }
    }

    /// Single parenthetical listing every matched limitation modification
    fn modification_note(&self, limitations: &[String]) -> Option<String> {
        let modifications = self.config.modifications_for(limitations);
        if modifications.is_empty() {
            None
        } else {
            Some(format!("({})", modifications.join(", ")))
        }
    }
}

impl Default for PlanGenerator {
    fn default() -> Self {
        Self::new(Arc::new(FitnessConfig::default()))
    }
}

/// Scale a duration, rounding to the nearest minute and never below one
fn derate(duration: u32, multiplier: f64) -> u32 {
    if multiplier == 1.0 {
        return duration;
    }
    ((f64::from(duration) * multiplier).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FitnessGoal, FitnessLevel, Gender};
    use crate::planner::TemplateCatalog;
    use std::collections::HashSet;

    fn profile(level: FitnessLevel, goal: FitnessGoal, limitations: &[&str]) -> UserProfile {
        UserProfile::new(
            30,
            Gender::Other,
            level,
            goal,
            limitations.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn context() -> GenerationContext {
        GenerationContext {
            plan_id: Uuid::nil(),
            week_start: DateTime::parse_from_rfc3339("2024-03-04T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn with_completed(mut plan: WorkoutPlan, count: usize) -> WorkoutPlan {
        for activity in plan.activities.iter_mut().take(count) {
            activity.completed = true;
        }
        plan.recompute_progress();
        plan
    }

    #[test]
    fn test_every_combination_yields_seven_distinct_days() {
        let generator = PlanGenerator::default();
        for level in FitnessLevel::ALL {
            for goal in FitnessGoal::ALL {
                let plan = generator
                    .generate(&profile(*level, *goal, &[]), None)
                    .unwrap();
                assert_eq!(plan.activities.len(), 7);
                let days: HashSet<u8> = plan.activities.iter().map(|a| a.day).collect();
                assert_eq!(days, (1..=7).collect::<HashSet<u8>>());
                assert!(plan.activities.iter().all(|a| !a.completed));
            }
        }
    }

    #[test]
    fn test_templates_cycle_in_catalog_order() {
        let generator = PlanGenerator::default();
        let plan = generator
            .generate(&profile(FitnessLevel::Beginner, FitnessGoal::GetActive, &[]), None)
            .unwrap();

        let titles: Vec<&str> = plan.activities.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Morning Stretch",
                "Brisk Walk",
                "Chair Exercises",
                "Morning Stretch",
                "Brisk Walk",
                "Chair Exercises",
                "Morning Stretch"
            ]
        );
    }

    #[test]
    fn test_knee_limitation_annotates_description() {
        let generator = PlanGenerator::default();
        let plan = generator
            .generate(
                &profile(FitnessLevel::Beginner, FitnessGoal::GetActive, &["knee pain"]),
                None,
            )
            .unwrap();

        assert_eq!(
            plan.activities[0].description,
            "10-minute gentle stretching routine (Low-impact alternatives for knee exercises)"
        );
        assert_eq!(
            plan.progress,
            PlanProgress {
                completed: 0,
                total: 7,
                plan_best_completion_count: 0
            }
        );
    }

    #[test]
    fn test_multiple_limitations_share_one_parenthetical() {
        let generator = PlanGenerator::default();
        let plan = generator
            .generate(
                &profile(
                    FitnessLevel::Advanced,
                    FitnessGoal::BuildStrength,
                    &["Shoulder impingement", "bad knee", "knee surgery"],
                ),
                None,
            )
            .unwrap();

        let description = &plan.activities[0].description;
        assert_eq!(
            description,
            "45-minute strength workout (Low-impact alternatives for knee exercises, Shoulder-friendly exercise modifications)"
        );
        assert_eq!(description.matches('(').count(), 1);
    }

    #[test]
    fn test_two_missed_days_derate_durations() {
        let generator = PlanGenerator::default();
        let user = profile(FitnessLevel::Intermediate, FitnessGoal::LoseWeight, &[]);
        let previous = with_completed(generator.generate(&user, None).unwrap(), 3);
        assert_eq!(previous.missed_days(), 4);

        let plan = generator.generate(&user, Some(&previous)).unwrap();
        let expected = [28, 24, 16, 28, 24, 16, 28]; // round(35|30|20 * 0.8)
        let durations: Vec<u32> = plan.activities.iter().map(|a| a.duration).collect();
        assert_eq!(durations, expected);
    }

    #[test]
    fn test_fewer_than_two_missed_days_keep_durations() {
        let generator = PlanGenerator::default();
        let user = profile(FitnessLevel::Intermediate, FitnessGoal::LoseWeight, &[]);
        let previous = with_completed(generator.generate(&user, None).unwrap(), 6);

        let plan = generator.generate(&user, Some(&previous)).unwrap();
        let durations: Vec<u32> = plan.activities.iter().map(|a| a.duration).collect();
        assert_eq!(durations, vec![35, 30, 20, 35, 30, 20, 35]);
    }

    #[test]
    fn test_best_completion_count_carries_forward() {
        let generator = PlanGenerator::default();
        let user = profile(FitnessLevel::Beginner, FitnessGoal::MaintainFitness, &[]);
        let previous = with_completed(generator.generate(&user, None).unwrap(), 5);
        let snapshot = previous.clone();

        let plan = generator.generate(&user, Some(&previous)).unwrap();
        assert_eq!(plan.progress.plan_best_completion_count, 5);
        assert_eq!(plan.progress.completed, 0);
        assert_eq!(previous, snapshot);
    }

    #[test]
    fn test_generation_is_deterministic_for_a_context() {
        let generator = PlanGenerator::default();
        let user = profile(FitnessLevel::Advanced, FitnessGoal::GetActive, &["back"]);

        let first = generator.generate_with_context(&user, None, context()).unwrap();
        let second = generator.generate_with_context(&user, None, context()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.activities[2].id, format!("{}-3", Uuid::nil()));
    }

    #[test]
    fn test_unmatched_catalog_key_fails() {
        let mut config = FitnessConfig::default();
        config.catalog = TemplateCatalog::empty();
        let generator = PlanGenerator::new(Arc::new(config));

        let result = generator.generate(
            &profile(FitnessLevel::Beginner, FitnessGoal::GetActive, &[]),
            None,
        );
        assert!(matches!(result, Err(PlanError::NoMatchingTemplateSet { .. })));
    }

    #[test]
    fn test_derate_rounding() {
        assert_eq!(derate(25, 0.8), 20);
        assert_eq!(derate(15, 0.8), 12);
        assert_eq!(derate(10, 0.8), 8);
        assert_eq!(derate(1, 0.3), 1);
        assert_eq!(derate(33, 1.0), 33);
    }
}
