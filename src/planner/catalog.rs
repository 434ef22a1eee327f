// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Activity template catalog keyed by fitness level and fitness goal

use super::PlanError;
use crate::models::{ActivityTemplate, FitnessGoal, FitnessLevel, Intensity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static table of activity templates.
///
/// Keys are the wire names of [`FitnessLevel`] and [`FitnessGoal`]. The
/// catalog is configuration, so a file-loaded catalog may omit combinations;
/// lookups for those fail instead of falling back to another set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateCatalog {
    sets: BTreeMap<String, BTreeMap<String, Vec<ActivityTemplate>>>,
}

impl TemplateCatalog {
    pub fn empty() -> Self {
        Self {
            sets: BTreeMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        level: FitnessLevel,
        goal: FitnessGoal,
        templates: Vec<ActivityTemplate>,
    ) {
        self.sets
            .entry(level.as_str().to_string())
            .or_default()
            .insert(goal.as_str().to_string(), templates);
    }

    /// Ordered template list for a (level, goal) pair
    pub fn templates_for(
        &self,
        level: FitnessLevel,
        goal: FitnessGoal,
    ) -> Result<&[ActivityTemplate], PlanError> {
        self.sets
            .get(level.as_str())
            .and_then(|goals| goals.get(goal.as_str()))
            .filter(|templates| !templates.is_empty())
            .map(Vec::as_slice)
            .ok_or(PlanError::NoMatchingTemplateSet { level, goal })
    }

    /// Number of (level, goal) combinations with at least one template
    pub fn set_count(&self) -> usize {
        self.sets
            .values()
            .flat_map(|goals| goals.values())
            .filter(|templates| !templates.is_empty())
            .count()
    }

    /// Check that every catalogued set is usable by the generator
    pub fn validate(&self) -> Result<(), PlanError> {
        for (level, goals) in &self.sets {
            level
                .parse::<FitnessLevel>()
                .map_err(|e| PlanError::InvalidCatalog(e.to_string()))?;
            for (goal, templates) in goals {
                goal.parse::<FitnessGoal>()
                    .map_err(|e| PlanError::InvalidCatalog(e.to_string()))?;
                if templates.is_empty() {
                    return Err(PlanError::InvalidCatalog(format!(
                        "empty template set for {level}/{goal}"
                    )));
                }
                if let Some(bad) = templates.iter().find(|t| t.duration == 0) {
                    return Err(PlanError::InvalidCatalog(format!(
                        "template '{}' in {level}/{goal} has zero duration",
                        bad.title
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        use FitnessGoal::*;
        use FitnessLevel::*;
        use Intensity::{High, Low, Medium};

        let t = ActivityTemplate::new;
        let mut catalog = Self::empty();

        catalog.insert(Beginner, GetActive, vec![
            t("Morning Stretch", "10-minute gentle stretching routine", 10, Low),
            t("Brisk Walk", "20-minute walk at a comfortable pace", 20, Low),
            t("Chair Exercises", "15-minute seated workout", 15, Low),
        ]);
        catalog.insert(Beginner, LoseWeight, vec![
            t("Power Walk", "25-minute walk with intervals", 25, Low),
            t("Bodyweight Basics", "20-minute basic exercises", 20, Low),
            t("Active Recovery", "15-minute light movement", 15, Low),
        ]);
        catalog.insert(Beginner, BuildStrength, vec![
            t("Basic Strength", "20-minute bodyweight exercises", 20, Low),
            t("Core Basics", "15-minute core workout", 15, Low),
            t("Rest Day", "Light stretching and mobility", 10, Low),
        ]);
        catalog.insert(Beginner, MaintainFitness, vec![
            t("Mixed Cardio", "20-minute varied cardio", 20, Low),
            t("Full Body Light", "25-minute full body workout", 25, Low),
            t("Active Rest", "15-minute light activity", 15, Low),
        ]);

        catalog.insert(Intermediate, GetActive, vec![
            t("HIIT Cardio", "30-minute high-intensity intervals", 30, Medium),
            t("Strength Circuit", "25-minute strength training", 25, Medium),
            t("Active Recovery", "20-minute mobility work", 20, Low),
        ]);
        catalog.insert(Intermediate, LoseWeight, vec![
            t("Fat Burn", "35-minute cardio workout", 35, Medium),
            t("Strength & Cardio", "30-minute mixed workout", 30, Medium),
            t("Active Recovery", "20-minute light cardio", 20, Low),
        ]);
        catalog.insert(Intermediate, BuildStrength, vec![
            t("Upper Body", "35-minute strength training", 35, Medium),
            t("Lower Body", "35-minute leg workout", 35, Medium),
            t("Core Power", "25-minute core workout", 25, Medium),
        ]);
        catalog.insert(Intermediate, MaintainFitness, vec![
            t("Mixed Training", "30-minute varied workout", 30, Medium),
            t("Strength Focus", "35-minute strength training", 35, Medium),
            t("Cardio Mix", "30-minute cardio workout", 30, Medium),
        ]);

        catalog.insert(Advanced, GetActive, vec![
            t("Power HIIT", "45-minute high-intensity workout", 45, High),
            t("Strength Complex", "40-minute complex training", 40, High),
            t("Active Recovery", "25-minute mobility work", 25, Medium),
        ]);
        catalog.insert(Advanced, LoseWeight, vec![
            t("Metabolic Conditioning", "45-minute intense cardio", 45, High),
            t("Strength & Cardio", "40-minute mixed workout", 40, High),
            t("Active Recovery", "25-minute light cardio", 25, Medium),
        ]);
        catalog.insert(Advanced, BuildStrength, vec![
            t("Power Training", "45-minute strength workout", 45, High),
            t("Hypertrophy", "40-minute muscle building", 40, High),
            t("Strength Endurance", "35-minute endurance work", 35, High),
        ]);
        catalog.insert(Advanced, MaintainFitness, vec![
            t("Performance Training", "45-minute varied workout", 45, High),
            t("Strength & Power", "40-minute strength training", 40, High),
            t("Cardio Power", "35-minute intense cardio", 35, High),
        ]);

        catalog
    }
}
