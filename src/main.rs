// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{Context, Result};
use bewegungsliga::api::{GenerateCsvRequest, ProfileApiClient};
use bewegungsliga::bonus;
use bewegungsliga::config::{Config, FitnessConfig};
use bewegungsliga::constants::fallback;
use bewegungsliga::dashboard::{greeting, StatsFeed};
use bewegungsliga::gamification::RewardEngine;
use bewegungsliga::health::HealthChecker;
use bewegungsliga::logging::LoggingConfig;
use bewegungsliga::models::{UserProfile, WorkoutPlan};
use bewegungsliga::planner::{CompletionOutcome, PlanGenerator, PlanTracker};
use bewegungsliga::profile::{self, ProfileDraft};
use bewegungsliga::session::{handle_session_event, SessionEvent, SessionOutcome};
use bewegungsliga::storage::{open_store, Repository};
use chrono::{Local, Timelike};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Catalog and reward tuning file
    #[arg(long)]
    fitness_config: Option<String>,

    /// Storage URL override (`sqlite:...` or `memory`)
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update the fitness profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Inspect and work through the weekly plan
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
    /// Experience points, streak and badges
    Rewards {
        #[command(subcommand)]
        action: RewardsAction,
    },
    /// Weekly dashboard from the profile API
    Stats,
    /// Insurance bonus progress from daily step counts
    Bonus {
        /// Comma-separated daily step counts, oldest first
        #[arg(long, value_delimiter = ',')]
        steps: Vec<u64>,
    },
    /// React to an identity provider session change
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Check storage and profile API health
    Health,
    /// Write the effective service configuration to a TOML file
    InitConfig {
        /// Target file; defaults to the user config directory
        #[arg(long)]
        path: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    Set {
        #[arg(long)]
        age: i64,
        #[arg(long)]
        gender: String,
        #[arg(long)]
        level: String,
        #[arg(long)]
        goal: String,
        /// Comma-separated list, e.g. "knee pain, lower back"
        #[arg(long, default_value = "")]
        limitations: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        occupation: Option<String>,
        /// Also register the profile with the profile API under this id
        #[arg(long)]
        sync_as: Option<String>,
    },
    Show,
}

#[derive(Subcommand, Debug)]
enum PlanAction {
    Show,
    /// Replace the current plan with the next week's plan
    Generate,
    /// Mark an activity completed and collect the reward
    Complete { activity_id: String },
    /// Completed-workout history
    History,
}

#[derive(Subcommand, Debug)]
enum RewardsAction {
    Show,
    /// Claim the streak bonus
    Streak,
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    SignIn { user_id: String },
    SignOut,
}

struct App {
    config: Config,
    fitness: Arc<FitnessConfig>,
    repository: Repository,
}

impl App {
    async fn tracker(&self) -> Result<PlanTracker> {
        let profile = self.require_profile().await?;
        Ok(PlanTracker::start(
            PlanGenerator::new(self.fitness.clone()),
            self.repository.clone(),
            profile,
        )
        .await?)
    }

    async fn require_profile(&self) -> Result<UserProfile> {
        profile::load_profile(&self.repository)
            .await?
            .context("No profile stored yet; run `bewegungsliga profile set` first")
    }

    async fn rewards(&self) -> Result<RewardEngine> {
        Ok(RewardEngine::load(
            self.repository.clone(),
            self.fitness.rewards.clone(),
            "local",
            "You",
        )
        .await?)
    }

    fn api(&self) -> Result<ProfileApiClient> {
        Ok(ProfileApiClient::new(&self.config.api)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::from_env().init()?;

    let args = Args::parse();

    let mut config = Config::load(args.config)?;
    if let Some(url) = args.database_url {
        config.storage.database_url = url;
    }
    let fitness = Arc::new(FitnessConfig::load(args.fitness_config)?);

    info!(storage.url = %config.storage.database_url, "Opening storage");
    let store = open_store(&config.storage.database_url)
        .await
        .context("Failed to open storage")?;

    let app = App {
        config,
        fitness,
        repository: Repository::new(store),
    };

    match args.command {
        Command::Profile { action } => run_profile(&app, action).await,
        Command::Plan { action } => run_plan(&app, action).await,
        Command::Rewards { action } => run_rewards(&app, action).await,
        Command::Stats => run_stats(&app).await,
        Command::Bonus { steps } => {
            let score = bonus::score(&steps, &app.fitness.bonus);
            println!(
                "Days with {}+ steps: {}/{} ({:.0}%), current streak {} days",
                app.fitness.bonus.daily_step_goal,
                score.qualifying_days,
                score.days_required,
                score.percent,
                score.current_streak
            );
            if score.eligible {
                println!("🎉 Bonus goal reached");
            }
            Ok(())
        }
        Command::Session { action } => {
            let event = match action {
                SessionAction::SignIn { user_id } => SessionEvent::SignedIn { user_id },
                SessionAction::SignOut => SessionEvent::SignedOut,
            };
            match handle_session_event(&app.repository, &event).await? {
                SessionOutcome::Ready(profile) => println!("Welcome back ({})", profile.id),
                SessionOutcome::NeedsProfileSetup => println!("Please set up your profile"),
                SessionOutcome::Cleared => println!("Signed out"),
            }
            Ok(())
        }
        Command::InitConfig { path } => {
            app.config.save(path)?;
            println!("Configuration written");
            Ok(())
        }
        Command::Health => {
            let checker = HealthChecker::new(app.repository.store().clone(), Some(app.api()?));
            let response = checker.check().await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

async fn run_profile(app: &App, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Set {
            age,
            gender,
            level,
            goal,
            limitations,
            first_name,
            last_name,
            city,
            occupation,
            sync_as,
        } => {
            let draft = ProfileDraft {
                age,
                gender,
                fitness_level: level,
                fitness_goal: goal,
                limitations,
                first_name,
                last_name,
                city,
                occupation,
            };
            let mut saved = profile::submit_profile(&app.repository, &draft).await?;

            if let Some(csv_user_id) = sync_as {
                let request = GenerateCsvRequest::new(&csv_user_id, &saved, &draft);
                let response = app.api()?.generate_user_data(&request).await?;
                println!("{}", response.message);
                saved.csv_user_id = Some(csv_user_id);
                profile::save_profile(&app.repository, &saved).await?;
            }

            print_profile(&saved);
            Ok(())
        }
        ProfileAction::Show => {
            print_profile(&app.require_profile().await?);
            Ok(())
        }
    }
}

async fn run_plan(app: &App, action: PlanAction) -> Result<()> {
    let mut tracker = app.tracker().await?;
    match action {
        PlanAction::Show => print_plan(tracker.plan()),
        PlanAction::Generate => print_plan(tracker.generate_new_plan().await?),
        PlanAction::Complete { activity_id } => {
            match tracker.complete_activity(&activity_id).await? {
                CompletionOutcome::Completed { completed, total } => {
                    println!("✅ {}/{} activities done", completed, total);
                    let mut rewards = app.rewards().await?;
                    let reward = rewards.reward_workout().await?;
                    println!("{}", reward.base.message);
                    for extra in reward.bonus.iter().chain(reward.badges.iter()) {
                        println!("{}", extra.message);
                    }
                }
                CompletionOutcome::AlreadyCompleted => println!("Activity already completed"),
                CompletionOutcome::UnknownActivity => {
                    println!("No activity '{}' in this plan", activity_id)
                }
            }
        }
        PlanAction::History => {
            for record in tracker.history().await? {
                println!(
                    "{}  {:<24} {:>3} min",
                    record.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    record.title,
                    record.duration
                );
            }
        }
    }
    Ok(())
}

async fn run_rewards(app: &App, action: RewardsAction) -> Result<()> {
    let mut rewards = app.rewards().await?;
    match action {
        RewardsAction::Show => {
            let user = rewards.user();
            println!(
                "Level {} · {} XP · {}-day streak · {} workouts",
                user.level(),
                user.xp,
                user.calendar_day_streak,
                user.workouts_completed
            );
            for badge in &user.badges {
                let state = if badge.unlocked { "unlocked" } else { "locked" };
                println!("  {} {} ({}): {}", badge.icon, badge.name, state, badge.description);
            }
        }
        RewardsAction::Streak => {
            let reward = rewards.reward_streak().await?;
            println!("{}", reward.message);
        }
    }
    Ok(())
}

async fn run_stats(app: &App) -> Result<()> {
    let csv_user_id = profile::load_profile(&app.repository)
        .await?
        .and_then(|p| p.csv_user_id)
        .unwrap_or_else(|| fallback::CSV_USER_ID.to_string());

    let feed = StatsFeed::new(app.api()?);
    feed.refresh(&csv_user_id).await;
    let Some(fetched) = feed.latest().await else {
        return Ok(());
    };

    println!("{}!", greeting(Local::now().hour()));
    if let bewegungsliga::api::Fetched::Degraded { reason, .. } = &fetched {
        println!("(showing demo values: {})", reason);
    }
    let stats = fetched.value();
    println!(
        "Steps: {} / {} ({:.0}%)",
        stats.weekly_steps,
        stats.weekly_step_goal,
        stats.goal_percentage()
    );
    println!("Workouts this week: {}", stats.workouts_this_week);
    println!("Calories burned: {} kcal", stats.calories_burned);
    println!("Heart rate: {} bpm", stats.heart_rate);
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    println!(
        "{}: age {}, {}, {} / {}",
        profile.id, profile.age, profile.gender, profile.fitness_level, profile.fitness_goal
    );
    if !profile.limitations.is_empty() {
        println!("Limitations: {}", profile.limitations.join(", "));
    }
}

fn print_plan(plan: &WorkoutPlan) {
    println!(
        "Week of {} · {}/{} done ({:.0}%) · best {}",
        plan.week_start_date.with_timezone(&Local).format("%Y-%m-%d"),
        plan.progress.completed,
        plan.progress.total,
        plan.completion_percentage(),
        plan.progress.plan_best_completion_count
    );
    for activity in &plan.activities {
        let mark = if activity.completed { "x" } else { " " };
        println!(
            "[{}] Day {} {} ({} min, {}) {}\n      {}",
            mark,
            activity.day,
            activity.title,
            activity.duration,
            activity.intensity,
            activity.id,
            activity.description
        );
    }
}
