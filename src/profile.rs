// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Profile Capture
//!
//! Validation of the profile form and persistence of the resulting
//! [`UserProfile`]. A resubmitted form replaces the whole stored profile but
//! keeps its identity and creation time.

use crate::constants::storage_keys::USER_PROFILE;
use crate::models::{FitnessGoal, FitnessLevel, Gender, UserProfile};
use crate::storage::{Repository, StorageError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub const MIN_AGE: i64 = 13;
pub const MAX_AGE: i64 = 100;

/// A single rejected form field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("age must be between {min} and {max}, got {value}")]
    AgeOutOfRange { value: i64, min: i64, max: i64 },

    #[error("{field}: {message}")]
    InvalidChoice { field: &'static str, message: String },

    #[error("{field} must not be blank")]
    BlankField { field: &'static str },
}

/// Every problem found in one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Invalid profile: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("Profile storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Raw profile form submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    pub age: i64,
    pub gender: String,
    pub fitness_level: String,
    pub fitness_goal: String,
    /// Comma-separated free text
    #[serde(default)]
    pub limitations: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
}

/// Validated form fields, before identity is assigned
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidFields {
    age: u8,
    gender: Gender,
    fitness_level: FitnessLevel,
    fitness_goal: FitnessGoal,
    limitations: Vec<String>,
}

/// Split a comma-separated limitation list, dropping blank entries
pub fn parse_limitations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ProfileDraft {
    /// Pre-fill a draft from a stored profile
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            age: i64::from(profile.age),
            gender: profile.gender.to_string(),
            fitness_level: profile.fitness_level.to_string(),
            fitness_goal: profile.fitness_goal.to_string(),
            limitations: profile.limitations.join(", "),
            ..Self::default()
        }
    }

    /// Validate into a new profile with a fresh id
    pub fn validate(&self) -> Result<UserProfile, ValidationErrors> {
        let fields = self.check()?;
        Ok(UserProfile::new(
            fields.age,
            fields.gender,
            fields.fitness_level,
            fields.fitness_goal,
            fields.limitations,
        ))
    }

    /// Validate as a resubmission of `existing`
    pub fn apply_to(&self, existing: &UserProfile) -> Result<UserProfile, ValidationErrors> {
        let fields = self.check()?;
        Ok(UserProfile {
            id: existing.id,
            age: fields.age,
            gender: fields.gender,
            fitness_level: fields.fitness_level,
            fitness_goal: fields.fitness_goal,
            limitations: fields.limitations,
            csv_user_id: existing.csv_user_id.clone(),
            created_at: existing.created_at,
            updated_at: Utc::now(),
        })
    }

    fn check(&self) -> Result<ValidFields, ValidationErrors> {
        let mut errors = Vec::new();

        let age = if (MIN_AGE..=MAX_AGE).contains(&self.age) {
            Some(self.age as u8)
        } else {
            errors.push(ValidationError::AgeOutOfRange {
                value: self.age,
                min: MIN_AGE,
                max: MAX_AGE,
            });
            None
        };

        let gender = choice::<Gender>("gender", &self.gender, &mut errors);
        let fitness_level =
            choice::<FitnessLevel>("fitnessLevel", &self.fitness_level, &mut errors);
        let fitness_goal = choice::<FitnessGoal>("fitnessGoal", &self.fitness_goal, &mut errors);

        for (field, value) in [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                errors.push(ValidationError::BlankField { field });
            }
        }

        match (age, gender, fitness_level, fitness_goal) {
            (Some(age), Some(gender), Some(fitness_level), Some(fitness_goal))
                if errors.is_empty() =>
            {
                Ok(ValidFields {
                    age,
                    gender,
                    fitness_level,
                    fitness_goal,
                    limitations: parse_limitations(&self.limitations),
                })
            }
            _ => Err(ValidationErrors(errors)),
        }
    }

    /// "First Last", when either part is present
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.first_name, &self.last_name]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

fn choice<T>(field: &'static str, raw: &str, errors: &mut Vec<ValidationError>) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(ValidationError::InvalidChoice {
                field,
                message: e.to_string(),
            });
            None
        }
    }
}

pub async fn load_profile(repository: &Repository) -> Result<Option<UserProfile>, StorageError> {
    repository.load(USER_PROFILE).await
}

pub async fn save_profile(
    repository: &Repository,
    profile: &UserProfile,
) -> Result<(), StorageError> {
    repository.save(USER_PROFILE, profile).await
}

/// Validate a submission and store it, replacing any existing profile
pub async fn submit_profile(
    repository: &Repository,
    draft: &ProfileDraft,
) -> Result<UserProfile, ProfileError> {
    let profile = match load_profile(repository).await? {
        Some(existing) => draft.apply_to(&existing)?,
        None => draft.validate()?,
    };
    save_profile(repository, &profile).await?;

    info!(user.id = %profile.id, "Profile saved");
    Ok(profile)
}
