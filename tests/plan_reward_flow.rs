// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end flow over an on-disk SQLite store: profile capture, plan
//! generation, completions, rewards, restart and sign-out.

use anyhow::Result;
use bewegungsliga::config::FitnessConfig;
use bewegungsliga::constants::storage_keys::{USER_DATA, WORKOUT_PLAN};
use bewegungsliga::gamification::{RewardEngine, StreakChange};
use bewegungsliga::models::WorkoutPlan;
use bewegungsliga::planner::{CompletionOutcome, PlanGenerator, PlanTracker};
use bewegungsliga::profile::{submit_profile, ProfileDraft};
use bewegungsliga::session::{handle_session_event, SessionEvent, SessionOutcome};
use bewegungsliga::storage::{open_store, Repository};
use chrono::{Local, TimeZone};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tempfile::TempDir;

async fn sqlite_repository(dir: &TempDir) -> Result<Repository> {
    let url = format!("sqlite:{}", dir.path().join("storage.db").display());
    Ok(Repository::new(open_store(&url).await?))
}

fn draft() -> ProfileDraft {
    ProfileDraft {
        age: 45,
        gender: "female".to_string(),
        fitness_level: "beginner".to_string(),
        fitness_goal: "lose_weight".to_string(),
        limitations: "knee pain".to_string(),
        ..ProfileDraft::default()
    }
}

fn no_bonus() -> FitnessConfig {
    let mut config = FitnessConfig::default();
    config.rewards.bonus_chance = 0.0;
    config
}

#[tokio::test]
async fn test_week_of_workouts_survives_restart() -> Result<()> {
    let dir = TempDir::new()?;
    let config = Arc::new(no_bonus());

    let (plan_id, completed_ids) = {
        let repository = sqlite_repository(&dir).await?;
        let profile = submit_profile(&repository, &draft()).await?;

        let mut tracker = PlanTracker::start(
            PlanGenerator::new(config.clone()),
            repository.clone(),
            profile,
        )
        .await?;
        assert!(tracker.plan().activities[0]
            .description
            .ends_with("(Low-impact alternatives for knee exercises)"));

        let mut rewards =
            RewardEngine::load(repository.clone(), config.rewards.clone(), "1", "Erika").await?;
        let mut rng = StdRng::seed_from_u64(17);

        let ids: Vec<String> = tracker.plan().activities.iter().map(|a| a.id.clone()).collect();
        for (offset, id) in ids.iter().take(5).enumerate() {
            let outcome = tracker.complete_activity(id).await?;
            assert!(matches!(outcome, CompletionOutcome::Completed { .. }));

            let now = Local
                .with_ymd_and_hms(2024, 5, 6 + offset as u32, 18, 0, 0)
                .single()
                .unwrap();
            let reward = rewards.reward_workout_at(now, &mut rng).await?;
            let expected = if offset == 0 { StreakChange::Started } else { StreakChange::Extended };
            assert_eq!(reward.streak_change, expected);
        }

        assert_eq!(rewards.user().xp, 125);
        assert_eq!(rewards.user().calendar_day_streak, 5);
        assert!(rewards.user().has_badge("five_workouts"));
        assert_eq!(tracker.history().await?.len(), 5);

        (tracker.plan().id, ids.into_iter().take(5).collect::<Vec<_>>())
    };

    // Fresh handles over the same file
    let repository = sqlite_repository(&dir).await?;
    let profile = bewegungsliga::profile::load_profile(&repository).await?.unwrap();
    let mut tracker = PlanTracker::start(
        PlanGenerator::new(config.clone()),
        repository.clone(),
        profile,
    )
    .await?;

    assert_eq!(tracker.plan().id, plan_id);
    assert_eq!(tracker.plan().progress.completed, 5);
    for id in &completed_ids {
        assert!(tracker.plan().activity(id).unwrap().completed);
    }

    let next = tracker.generate_new_plan().await?.clone();
    assert_eq!(next.progress.plan_best_completion_count, 5);
    assert_eq!(next.progress.completed, 0);
    // Two missed activities reach the derating threshold: 25 min * 0.8
    assert_eq!(next.activities[0].duration, 20);

    let stored: WorkoutPlan = repository.load(WORKOUT_PLAN).await?.unwrap();
    assert_eq!(stored, next);

    let rewards = RewardEngine::load(repository, config.rewards.clone(), "1", "Erika").await?;
    assert_eq!(rewards.user().xp, 125);
    assert_eq!(rewards.level(), 2);
    Ok(())
}

#[tokio::test]
async fn test_sign_out_then_sign_in_requires_profile_setup() -> Result<()> {
    let dir = TempDir::new()?;
    let repository = sqlite_repository(&dir).await?;
    let config = Arc::new(no_bonus());

    let profile = submit_profile(&repository, &draft()).await?;
    let mut tracker = PlanTracker::start(
        PlanGenerator::new(config.clone()),
        repository.clone(),
        profile,
    )
    .await?;
    let first = tracker.plan().activities[0].id.clone();
    tracker.complete_activity(&first).await?;

    let mut rewards =
        RewardEngine::load(repository.clone(), config.rewards.clone(), "1", "Erika").await?;
    rewards.reward_workout().await?;

    let outcome = handle_session_event(&repository, &SessionEvent::SignedOut).await?;
    assert_eq!(outcome, SessionOutcome::Cleared);
    assert!(repository.load::<WorkoutPlan>(WORKOUT_PLAN).await?.is_none());
    // Gamification state outlives the session
    assert!(repository.store().get(USER_DATA).await?.is_some());

    let outcome = handle_session_event(
        &repository,
        &SessionEvent::SignedIn {
            user_id: "auth|erika".to_string(),
        },
    )
    .await?;
    assert_eq!(outcome, SessionOutcome::NeedsProfileSetup);
    Ok(())
}

#[tokio::test]
async fn test_legacy_plan_without_envelope_is_resumed() -> Result<()> {
    let repository = Repository::in_memory();
    let profile = submit_profile(&repository, &draft()).await?;
    let generator = PlanGenerator::default();

    let plan = generator.generate(&profile, None)?;
    let mut legacy = serde_json::to_value(&plan)?;
    let progress = legacy["progress"].as_object_mut().unwrap();
    let best = progress.remove("planBestCompletionCount").unwrap();
    progress.insert("streak".to_string(), best);
    repository.store().set(WORKOUT_PLAN, &legacy.to_string()).await?;

    let tracker = PlanTracker::start(generator, repository, profile).await?;
    assert_eq!(tracker.plan().id, plan.id);
    Ok(())
}
