// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Health checks for the storage backend and the profile API

use crate::api::ProfileApiClient;
use crate::storage::{KeyValueStore, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

const PROBE_KEY: &str = "__health_probe";

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: ServiceInfo,
    pub checks: Vec<ComponentHealth>,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub duration_ms: u64,
    pub metadata: Option<serde_json::Value>,
}

pub struct HealthChecker {
    start_time: Instant,
    store: Arc<dyn KeyValueStore>,
    api: Option<ProfileApiClient>,
}

impl HealthChecker {
    pub fn new(store: Arc<dyn KeyValueStore>, api: Option<ProfileApiClient>) -> Self {
        Self {
            start_time: Instant::now(),
            store,
            api,
        }
    }

    /// Check every component.
    ///
    /// Storage failures make the whole service unhealthy. The profile API
    /// only degrades it, since every API read has a fallback.
    pub async fn check(&self) -> HealthResponse {
        let start = Instant::now();
        info!("Performing health check");

        let mut checks = vec![self.check_storage().await];
        if let Some(api) = &self.api {
            checks.push(Self::check_api(api).await);
        }

        let status = checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthResponse {
            status,
            service: ServiceInfo {
                name: "bewegungsliga".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: self.start_time.elapsed().as_secs(),
            },
            checks,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            response_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_storage(&self) -> ComponentHealth {
        let start = Instant::now();

        match self.probe_storage().await {
            Ok(()) => ComponentHealth {
                name: "storage".to_string(),
                status: HealthStatus::Healthy,
                message: "Storage is readable and writable".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
                metadata: Some(serde_json::json!({ "backend": self.store.backend_name() })),
            },
            Err(e) => {
                error!("Storage health check failed: {}", e);
                ComponentHealth {
                    name: "storage".to_string(),
                    status: HealthStatus::Unhealthy,
                    message: format!("Storage check failed: {}", e),
                    duration_ms: start.elapsed().as_millis() as u64,
                    metadata: Some(serde_json::json!({ "backend": self.store.backend_name() })),
                }
            }
        }
    }

    /// Write, read back and remove a probe value
    async fn probe_storage(&self) -> Result<(), StorageError> {
        let marker = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .to_string();

        self.store.set(PROBE_KEY, &marker).await?;
        let read_back = self.store.get(PROBE_KEY).await?;
        self.store.remove(PROBE_KEY).await?;

        if read_back.as_deref() != Some(marker.as_str()) {
            return Err(StorageError::Integrity(
                "probe value did not round-trip".to_string(),
            ));
        }
        Ok(())
    }

    async fn check_api(api: &ProfileApiClient) -> ComponentHealth {
        let start = Instant::now();
        let base_url = api.base_url().to_string();

        let (status, message) = match api.health_check().await {
            Ok(health) if health.is_healthy() => (
                HealthStatus::Healthy,
                health.message.unwrap_or_else(|| "Profile API is running".to_string()),
            ),
            Ok(health) => (
                HealthStatus::Degraded,
                format!("Profile API reports status '{}'", health.status),
            ),
            Err(e) => {
                warn!("Profile API health check failed: {}", e);
                (HealthStatus::Degraded, format!("Profile API unreachable: {}", e))
            }
        };

        ComponentHealth {
            name: "profile_api".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
            metadata: Some(serde_json::json!({ "base_url": base_url })),
        }
    }
}
