// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Workout Planning
//!
//! Weekly plan generation from the template catalog and in-session tracking
//! of activity completion.
//!
//! - [`catalog`]: static activity templates keyed by fitness level and goal
//! - [`generator`]: pure mapping from a profile and optional previous plan to
//!   a new seven-day plan, with duration derating after missed days
//! - [`tracker`]: holds the current plan, applies completion events and
//!   persists the plan after every mutation

pub mod catalog;
pub mod generator;
pub mod tracker;

pub use catalog::TemplateCatalog;
pub use generator::{GenerationContext, PlanGenerator};
pub use tracker::{CompletionOutcome, PlanTracker};

use crate::models::{FitnessGoal, FitnessLevel};
use crate::storage::StorageError;

/// Planning errors
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("No matching template set for fitness level '{level}' and goal '{goal}'")]
    NoMatchingTemplateSet {
        level: FitnessLevel,
        goal: FitnessGoal,
    },

    #[error("Invalid template catalog: {0}")]
    InvalidCatalog(String),

    #[error("Plan storage failed: {0}")]
    Storage(#[from] StorageError),
}
