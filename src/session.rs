// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reactions to identity-provider session changes

use crate::constants::storage_keys::SESSION_SCOPED;
use crate::models::UserProfile;
use crate::profile::load_profile;
use crate::storage::{Repository, StorageError};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// `user_id` is the identity provider's subject
    SignedIn { user_id: String },
    SignedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Ready(UserProfile),
    /// No usable stored profile; the caller routes to the profile form
    NeedsProfileSetup,
    Cleared,
}

pub async fn handle_session_event(
    repository: &Repository,
    event: &SessionEvent,
) -> Result<SessionOutcome, StorageError> {
    match event {
        SessionEvent::SignedIn { user_id } => match load_profile(repository).await? {
            Some(profile) => {
                info!(
                    auth.user = %user_id,
                    user.id = %profile.id,
                    "Session started with stored profile"
                );
                Ok(SessionOutcome::Ready(profile))
            }
            None => {
                info!(auth.user = %user_id, "Session started without a profile");
                Ok(SessionOutcome::NeedsProfileSetup)
            }
        },
        SessionEvent::SignedOut => {
            for key in SESSION_SCOPED {
                repository.delete(key).await?;
            }
            info!("Session ended, cleared profile and plan");
            Ok(SessionOutcome::Cleared)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::storage_keys::{USER_DATA, USER_PROFILE, WORKOUT_HISTORY, WORKOUT_PLAN};
    use crate::models::{FitnessGoal, FitnessLevel, Gender};
    use crate::profile::save_profile;

    fn signed_in() -> SessionEvent {
        SessionEvent::SignedIn {
            user_id: "auth|42".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_in_with_stored_profile() {
        let repository = Repository::in_memory();
        let profile = UserProfile::new(
            52,
            Gender::Male,
            FitnessLevel::Beginner,
            FitnessGoal::LoseWeight,
            vec![],
        );
        save_profile(&repository, &profile).await.unwrap();

        let outcome = handle_session_event(&repository, &signed_in()).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Ready(profile));
    }

    #[tokio::test]
    async fn test_sign_in_with_garbled_profile_needs_setup() {
        let repository = Repository::in_memory();
        repository.store().set(USER_PROFILE, "{\"age\": \"old\"").await.unwrap();

        let outcome = handle_session_event(&repository, &signed_in()).await.unwrap();
        assert_eq!(outcome, SessionOutcome::NeedsProfileSetup);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_keys_only() {
        let repository = Repository::in_memory();
        for key in [USER_PROFILE, WORKOUT_PLAN, WORKOUT_HISTORY, USER_DATA] {
            repository.store().set(key, "{}").await.unwrap();
        }

        let outcome = handle_session_event(&repository, &SessionEvent::SignedOut).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Cleared);

        for key in [USER_PROFILE, WORKOUT_PLAN, WORKOUT_HISTORY] {
            assert_eq!(repository.store().get(key).await.unwrap(), None);
        }
        assert!(repository.store().get(USER_DATA).await.unwrap().is_some());
    }
}
