// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structured logging setup and domain event helpers

use anyhow::Result;
use serde_json::json;
use std::env;
use std::io;
use tracing::{debug, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const SERVICE_NAME: &str = "bewegungsliga";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    pub include_spans: bool,
    pub service_name: String,
    pub service_version: String,
    /// development, staging or production
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_spans: false,
            service_name: SERVICE_NAME.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG`, `LOG_FORMAT` and `ENVIRONMENT`
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        };

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        Self {
            level,
            format,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
        }
    }

    /// Install the global tracing subscriber.
    ///
    /// Output goes to stderr so that command output on stdout stays clean.
    pub fn init(&self) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(env_filter);
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        match self.format {
            LogFormat::Json => {
                let layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_target(true)
                    .with_writer(io::stderr)
                    .with_span_events(span_events)
                    .json();
                registry.with(layer).try_init()?;
            }
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .pretty()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_writer(io::stderr)
                    .with_span_events(span_events);
                registry.with(layer).try_init()?;
            }
            LogFormat::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(io::stderr)
                    .with_span_events(FmtSpan::NONE);
                registry.with(layer).try_init()?;
            }
        }

        self.log_startup_info();
        Ok(())
    }

    fn log_startup_info(&self) {
        let summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
                "environment": self.environment
            },
            "logging": {
                "level": self.level,
                "format": format!("{:?}", self.format),
            }
        });
        debug!(config = %summary, "Logging initialized");
    }
}

/// Domain event logging
pub struct AppLogger;

impl AppLogger {
    pub fn log_plan_generated(user_id: &str, plan_id: &str, missed_days: usize, derated: bool) {
        info!(
            user.id = %user_id,
            plan.id = %plan_id,
            plan.previous_missed_days = missed_days,
            plan.derated = derated,
            "Workout plan generated"
        );
    }

    pub fn log_activity_completed(user_id: &str, activity_id: &str, completed: u32, total: u32) {
        info!(
            user.id = %user_id,
            activity.id = %activity_id,
            plan.completed = completed,
            plan.total = total,
            "Activity completed"
        );
    }

    pub fn log_reward(user_id: &str, kind: &str, xp: u64) {
        info!(
            user.id = %user_id,
            reward.kind = %kind,
            reward.xp = xp,
            "Reward granted"
        );
    }

    pub fn log_badge_unlocked(user_id: &str, badge_id: &str) {
        info!(user.id = %user_id, badge.id = %badge_id, "Badge unlocked");
    }

    /// Storage calls are chatty, so they log at debug
    pub fn log_storage_operation(operation: &str, key: &str, success: bool, duration_ms: u64) {
        debug!(
            storage.operation = %operation,
            storage.key = %key,
            storage.success = success,
            storage.duration_ms = duration_ms,
            "Storage operation"
        );
    }

    pub fn log_api_request(method: &str, path: &str, status: Option<u16>, duration_ms: u64) {
        info!(
            http.method = %method,
            http.path = %path,
            http.status = status.unwrap_or(0),
            http.duration_ms = duration_ms,
            "Profile API request"
        );
    }

    pub fn log_degraded_fallback(operation: &str, reason: &str) {
        warn!(
            fallback.operation = %operation,
            fallback.reason = %reason,
            "Using degraded default values"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();

        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.service_name, "bewegungsliga");
        assert!(!config.include_location);
    }

    #[test]
    fn test_logging_config_from_env() {
        env::set_var("LOG_FORMAT", "json");
        env::set_var("ENVIRONMENT", "production");

        let config = LoggingConfig::from_env();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.environment, "production");
        assert!(config.include_location);

        env::remove_var("LOG_FORMAT");
        env::remove_var("ENVIRONMENT");
    }
}
