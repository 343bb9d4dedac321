//! System monitoring endpoints.

use crate::client::{ApiClient, RequestOptions};
use crate::error::ClientResult;
use chrono::{DateTime, Utc};
use robot_core::{NotificationLevel, SystemHealth};
use serde::{Deserialize, Serialize};

/// Alert raised by the backend monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringAlert {
    pub id: String,
    pub level: NotificationLevel,
    pub message: String,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ApiClient {
    pub async fn system_health(&self) -> ClientResult<SystemHealth> {
        self.get("/monitoring/system", RequestOptions::new()).await
    }

    pub async fn alerts(&self) -> ClientResult<Vec<MonitoringAlert>> {
        self.get("/monitoring/alerts", RequestOptions::new()).await
    }
}
