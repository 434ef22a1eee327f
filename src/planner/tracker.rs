// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Session-scoped plan tracking

use super::{PlanError, PlanGenerator};
use crate::constants::storage_keys::{WORKOUT_HISTORY, WORKOUT_PLAN};
use crate::logging::AppLogger;
use crate::models::{UserProfile, WorkoutPlan, WorkoutRecord, DAYS_PER_PLAN};
use crate::storage::{Repository, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Result of a completion event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// The activity flipped to completed and the plan was persisted
    Completed { completed: u32, total: u32 },
    AlreadyCompleted,
    /// No activity with that id in the current plan
    UnknownActivity,
}

/// Holds the active plan for one profile and mediates completion events
pub struct PlanTracker {
    generator: PlanGenerator,
    repository: Repository,
    profile: UserProfile,
    plan: WorkoutPlan,
}

impl PlanTracker {
    /// Resume the stored plan for `profile`, or generate and persist a first one
    pub async fn start(
        generator: PlanGenerator,
        repository: Repository,
        profile: UserProfile,
    ) -> Result<Self, PlanError> {
        let stored: Option<WorkoutPlan> = repository.load(WORKOUT_PLAN).await?;

        let plan = match stored {
            Some(mut plan)
                if plan.user_id == profile.id && plan.activities.len() == DAYS_PER_PLAN =>
            {
                if !plan.is_consistent() {
                    warn!(
                        plan.id = %plan.id,
                        "Stored plan progress disagrees with activities, recomputing"
                    );
                    plan.recompute_progress();
                    repository.save(WORKOUT_PLAN, &plan).await?;
                }
                plan
            }
            other => {
                if let Some(stale) = other {
                    if stale.user_id == profile.id {
                        warn!(
                            plan.id = %stale.id,
                            activities = stale.activities.len(),
                            "Stored plan has the wrong number of activities, regenerating"
                        );
                    } else {
                        debug!(
                            user.id = %profile.id,
                            "Stored plan belongs to another profile, replacing"
                        );
                    }
                }
                let plan = generator.generate(&profile, None)?;
                repository.save(WORKOUT_PLAN, &plan).await?;
                plan
            }
        };

        Ok(Self {
            generator,
            repository,
            profile,
            plan,
        })
    }

    pub fn plan(&self) -> &WorkoutPlan {
        &self.plan
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Mark an activity completed now
    pub async fn complete_activity(
        &mut self,
        activity_id: &str,
    ) -> Result<CompletionOutcome, PlanError> {
        self.complete_activity_at(activity_id, Utc::now()).await
    }

    /// Mark an activity completed at `at`.
    ///
    /// Repeated and unknown ids are no-ops and do not touch storage. The
    /// held plan only changes once the plan and the history record are both
    /// stored, so a failed write can be retried.
    pub async fn complete_activity_at(
        &mut self,
        activity_id: &str,
        at: DateTime<Utc>,
    ) -> Result<CompletionOutcome, PlanError> {
        let mut updated = self.plan.clone();
        let Some(activity) = updated.activities.iter_mut().find(|a| a.id == activity_id) else {
            debug!(activity.id = %activity_id, "Ignoring completion for unknown activity");
            return Ok(CompletionOutcome::UnknownActivity);
        };

        if !activity.mark_completed(at) {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }
        let record = WorkoutRecord::from_activity(activity, at);

        updated.recompute_progress();
        self.repository.save(WORKOUT_PLAN, &updated).await?;
        self.append_history(&record).await?;
        self.plan = updated;

        let progress = self.plan.progress;
        AppLogger::log_activity_completed(
            &self.profile.id.to_string(),
            activity_id,
            progress.completed,
            progress.total,
        );

        Ok(CompletionOutcome::Completed {
            completed: progress.completed,
            total: progress.total,
        })
    }

    /// Replace the held plan with one generated from the current plan
    pub async fn generate_new_plan(&mut self) -> Result<&WorkoutPlan, PlanError> {
        let plan = self.generator.generate(&self.profile, Some(&self.plan))?;
        self.repository.save(WORKOUT_PLAN, &plan).await?;
        self.plan = plan;
        Ok(&self.plan)
    }

    /// Completed-workout history, oldest first
    ///
    /// Entries that no longer decode are skipped but stay in storage.
    pub async fn history(&self) -> Result<Vec<WorkoutRecord>, PlanError> {
        let entries: Vec<Value> = self
            .repository
            .load(WORKOUT_HISTORY)
            .await?
            .unwrap_or_default();

        Ok(entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<WorkoutRecord>(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(history.index = index, error = %e, "Skipping unreadable history entry");
                    None
                }
            })
            .collect())
    }

    /// Append to the stored history without rewriting existing entries.
    ///
    /// A stored value that is not a list is left alone and reported.
    async fn append_history(&self, record: &WorkoutRecord) -> Result<(), PlanError> {
        let mut entries: Vec<Value> = match self.repository.store().get(WORKOUT_HISTORY).await? {
            Some(raw) => Repository::decode(WORKOUT_HISTORY, &raw)?,
            None => Vec::new(),
        };
        entries.push(serde_json::to_value(record).map_err(StorageError::from)?);
        self.repository.save(WORKOUT_HISTORY, &entries).await?;
        Ok(())
    }
}
