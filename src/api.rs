// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Profile API Client
//!
//! Typed client for the local CSV-backed REST service:
//!
//! - `GET /user/{id}`: synthesized health and activity profile
//! - `POST /generate-csv`: create the synthetic records for a new user
//! - `GET /health`: liveness
//!
//! Plain calls return [`ApiError`] on failure. [`ProfileApiClient::with_fallback`]
//! retries up to the configured attempt count and then hands back a default
//! value marked [`Fetched::Degraded`], so callers can always render while
//! knowing the data is not live.

use crate::config::ApiConfig;
use crate::constants::{fallback, routes};
use crate::logging::AppLogger;
use crate::models::UserProfile;
use crate::profile::ProfileDraft;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Profile API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Profile API reported an error: {0}")]
    Service(String),

    #[error("Invalid profile API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unexpected profile API payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyActivity {
    pub total_steps: u64,
    pub exercise_sessions: u32,
    pub calories_burned: u32,
    pub active_minutes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthMetrics {
    pub resting_heart_rate: u32,
    pub max_heart_rate: u32,
    pub sleep_hours: f64,
    pub stress_level: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Goals {
    pub weekly_step_goal: u64,
    pub weekly_workout_goal: u32,
    pub target_weight: f64,
}

/// Profile record served by `GET /user/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteUserProfile {
    pub user_id: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub fitness_level: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub weekly_activity: Option<WeeklyActivity>,
    #[serde(default)]
    pub health_metrics: Option<HealthMetrics>,
    #[serde(default)]
    pub goals: Option<Goals>,
}

impl RemoteUserProfile {
    /// Demo record shown when the service cannot be reached
    pub fn fallback(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            weekly_activity: Some(WeeklyActivity {
                total_steps: fallback::WEEKLY_STEPS,
                exercise_sessions: fallback::WORKOUTS_THIS_WEEK,
                calories_burned: fallback::CALORIES_BURNED,
                active_minutes: 0,
            }),
            health_metrics: Some(HealthMetrics {
                resting_heart_rate: fallback::AVG_HEART_RATE,
                ..HealthMetrics::default()
            }),
            goals: Some(Goals {
                weekly_step_goal: fallback::WEEKLY_STEP_GOAL,
                ..Goals::default()
            }),
            ..Self::default()
        }
    }
}

/// Body of `POST /generate-csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCsvRequest {
    pub user_id: String,
    pub age: u8,
    pub gender: String,
    pub fitness_level: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub occupation: String,
}

impl GenerateCsvRequest {
    /// Request for a saved profile plus the free-text fields of its form
    pub fn new(user_id: &str, profile: &UserProfile, draft: &ProfileDraft) -> Self {
        let text = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or_default().to_string();
        Self {
            user_id: user_id.to_string(),
            age: profile.age,
            gender: profile.gender.to_string(),
            fitness_level: profile.fitness_level.to_string(),
            first_name: text(&draft.first_name),
            last_name: text(&draft.last_name),
            city: text(&draft.city),
            occupation: text(&draft.occupation),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateCsvResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<RemoteUserProfile>,
    pub csv_files_updated: Vec<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiHealth {
    pub status: String,
    pub message: Option<String>,
    pub users_in_memory: Option<u64>,
}

impl ApiHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Value from the API, or a default used because the API failed
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Live(T),
    Degraded { value: T, reason: String },
}

impl<T> Fetched<T> {
    pub fn value(&self) -> &T {
        match self {
            Fetched::Live(value) | Fetched::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Fetched::Degraded { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Live(value) => Fetched::Live(f(value)),
            Fetched::Degraded { value, reason } => Fetched::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}

/// Sequence number handed out per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

/// Orders overlapping requests so that a slow, older response never
/// overwrites a newer one.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a request about to be sent
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Claim the right to apply a response. Returns `false` when a response
    /// with the same or a newer ticket was already applied.
    pub fn try_apply(&self, ticket: RequestTicket) -> bool {
        let previous = self.applied.fetch_max(ticket.0, Ordering::SeqCst);
        ticket.0 > previous
    }

    /// Whether no request was issued after `ticket`
    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }
}

/// Client for the local profile API
#[derive(Debug, Clone)]
pub struct ProfileApiClient {
    client: Client,
    base_url: Url,
    max_attempts: u32,
}

impl ProfileApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        // Relative joins drop the last path segment unless it ends in '/'
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            max_attempts: config.max_attempts.max(1),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_user_profile(&self, user_id: &str) -> Result<RemoteUserProfile, ApiError> {
        let path = format!("{}/{}", routes::USER, urlencoding::encode(user_id));
        self.request(Method::GET, &path, None::<&()>).await
    }

    pub async fn generate_user_data(
        &self,
        request: &GenerateCsvRequest,
    ) -> Result<GenerateCsvResponse, ApiError> {
        let response: GenerateCsvResponse = self
            .request(Method::POST, routes::GENERATE_CSV, Some(request))
            .await?;
        if !response.success {
            return Err(ApiError::Service(response.message));
        }
        Ok(response)
    }

    pub async fn health_check(&self) -> Result<ApiHealth, ApiError> {
        self.request(Method::GET, routes::HEALTH, None::<&()>).await
    }

    /// Profile for the dashboard, falling back to the demo record
    pub async fn user_profile_or_default(&self, user_id: &str) -> Fetched<RemoteUserProfile> {
        self.with_fallback("get_user_profile", RemoteUserProfile::fallback(user_id), || {
            self.get_user_profile(user_id)
        })
        .await
    }

    /// Run `call` up to the configured number of attempts, then settle for
    /// `default` marked as degraded
    pub async fn with_fallback<T, F, Fut>(&self, operation: &str, default: T, call: F) -> Fetched<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match call().await {
                Ok(value) => return Fetched::Live(value),
                Err(e) => {
                    debug!(
                        api.operation = %operation,
                        attempt,
                        error = %e,
                        "Profile API call failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        AppLogger::log_degraded_fallback(operation, &last_error);
        Fetched::Degraded {
            value: default,
            reason: last_error,
        }
    }

    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        let start = Instant::now();

        let mut builder = self.client.request(method.clone(), url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                AppLogger::log_api_request(method.as_str(), path, None, elapsed_ms(start));
                return Err(e.into());
            }
        };

        let status = response.status();
        let payload: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        AppLogger::log_api_request(method.as_str(), path, Some(status.as_u16()), elapsed_ms(start));

        let reported_error = payload
            .get("error")
            .map(|e| e.as_str().map_or_else(|| e.to_string(), str::to_string));

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: reported_error.unwrap_or_else(|| status.to_string()),
            });
        }
        if let Some(message) = reported_error {
            return Err(ApiError::Service(message));
        }

        Ok(serde_json::from_value(payload)?)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
