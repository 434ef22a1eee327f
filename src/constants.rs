// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Application constants and environment-based configuration values.

/// Keys used in durable client storage
pub mod storage_keys {
    /// JSON-encoded `UserProfile`
    pub const USER_PROFILE: &str = "userProfile";

    /// JSON-encoded `WorkoutPlan`
    pub const WORKOUT_PLAN: &str = "workoutPlan";

    /// JSON-encoded array of completed-workout records
    pub const WORKOUT_HISTORY: &str = "workoutHistory";

    /// JSON-encoded `GamificationUser`
    pub const USER_DATA: &str = "userData";

    /// Keys cleared when the session signs out
    pub const SESSION_SCOPED: &[&str] = &[USER_PROFILE, WORKOUT_PLAN, WORKOUT_HISTORY];

    /// Current envelope schema version
    pub const SCHEMA_VERSION: u32 = 1;
}

/// Badge identifiers
pub mod badges {
    pub const FIVE_WORKOUTS: &str = "five_workouts";
    pub const SEVEN_DAY_STREAK: &str = "seven_day_streak";
    pub const EARLY_BIRD: &str = "early_bird";
}

/// Local profile API routes
pub mod routes {
    pub const USER: &str = "user";
    pub const GENERATE_CSV: &str = "generate-csv";
    pub const HEALTH: &str = "health";
}

/// Defaults used when the profile API is unreachable
pub mod fallback {
    pub const CSV_USER_ID: &str = "USR001";
    pub const WEEKLY_STEP_GOAL: u64 = 70_000;
    pub const WEEKLY_STEPS: u64 = 67_400;
    pub const WORKOUTS_THIS_WEEK: u32 = 6;
    pub const CALORIES_BURNED: u32 = 2_250;
    pub const AVG_HEART_RATE: u32 = 145;
}

/// Environment-based configuration
pub mod env_config {
    use std::env;

    pub const API_URL_VAR: &str = "BEWEGUNGSLIGA_API_URL";
    pub const DATABASE_URL_VAR: &str = "BEWEGUNGSLIGA_DATABASE_URL";
    pub const REQUEST_TIMEOUT_VAR: &str = "BEWEGUNGSLIGA_REQUEST_TIMEOUT_SECS";

    pub const DEFAULT_API_URL: &str = "http://localhost:5000";

    /// Profile API base URL override
    pub fn api_url() -> Option<String> {
        env::var(API_URL_VAR).ok()
    }

    /// Storage URL override
    pub fn database_url() -> Option<String> {
        env::var(DATABASE_URL_VAR).ok()
    }

    pub fn request_timeout_secs() -> Option<String> {
        env::var(REQUEST_TIMEOUT_VAR).ok()
    }

    /// SQLite file in the platform data directory
    pub fn default_database_url() -> String {
        let path = dirs::data_dir()
            .map(|p| p.join("bewegungsliga/storage.db"))
            .unwrap_or_else(|| "./data/storage.db".into());
        format!("sqlite:{}", path.to_string_lossy())
    }
}
