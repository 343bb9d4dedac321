//! System health and notification types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Overall health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    #[default]
    Unknown,
}

/// Health of an individual backend component (database, cache, exchange...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub response_time_ms: Option<f64>,
}

/// System status as reported by the monitoring endpoint or pushed on the
/// `system_status` topic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemHealth {
    #[serde(default)]
    pub status: HealthStatus,
    #[serde(default)]
    pub components: HashMap<String, ComponentHealth>,
    #[serde(default)]
    pub cpu_percent: Option<f64>,
    #[serde(default)]
    pub memory_percent: Option<f64>,
    #[serde(default)]
    pub disk_percent: Option<f64>,
    #[serde(default)]
    pub uptime_seconds: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SystemHealth {
    /// Names of components that are not healthy, sorted.
    pub fn degraded_components(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .components
            .iter()
            .filter(|(_, health)| health.status != HealthStatus::Healthy)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}
