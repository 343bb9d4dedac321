//! Strategy management endpoints.

use crate::client::{segment, ApiClient, RequestOptions};
use crate::error::ClientResult;
use robot_core::{Strategy, StrategyStatus};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

/// Body of `POST /strategies/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStrategy {
    pub name: String,
    #[serde(rename = "type")]
    pub strategy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub symbols: Vec<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// Runtime status from `GET /strategies/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStatusReport {
    #[serde(alias = "strategy_id")]
    pub id: String,
    pub status: StrategyStatus,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub total_pnl: Decimal,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiClient {
    pub async fn list_strategies(&self) -> ClientResult<Vec<Strategy>> {
        self.get("/strategies/", RequestOptions::new()).await
    }

    pub async fn get_strategy(&self, id: &str) -> ClientResult<Strategy> {
        self.get(&format!("/strategies/{}", segment(id)), RequestOptions::new())
            .await
    }

    pub async fn create_strategy(&self, strategy: &NewStrategy) -> ClientResult<Strategy> {
        self.post("/strategies/", strategy, RequestOptions::new()).await
    }

    /// Partial update; `changes` carries only the fields to modify.
    pub async fn update_strategy(
        &self,
        id: &str,
        changes: &serde_json::Value,
    ) -> ClientResult<Strategy> {
        self.put(
            &format!("/strategies/{}", segment(id)),
            changes,
            RequestOptions::new(),
        )
        .await
    }

    pub async fn delete_strategy(&self, id: &str) -> ClientResult<()> {
        let _: IgnoredAny = self
            .delete(&format!("/strategies/{}", segment(id)), RequestOptions::new())
            .await?;
        Ok(())
    }

    pub async fn start_strategy(&self, id: &str) -> ClientResult<()> {
        self.strategy_action(id, "start").await
    }

    pub async fn stop_strategy(&self, id: &str) -> ClientResult<()> {
        self.strategy_action(id, "stop").await
    }

    pub async fn pause_strategy(&self, id: &str) -> ClientResult<()> {
        self.strategy_action(id, "pause").await
    }

    pub async fn resume_strategy(&self, id: &str) -> ClientResult<()> {
        self.strategy_action(id, "resume").await
    }

    pub async fn strategy_status(&self, id: &str) -> ClientResult<StrategyStatusReport> {
        self.get(
            &format!("/strategies/{}/status", segment(id)),
            RequestOptions::new(),
        )
        .await
    }

    async fn strategy_action(&self, id: &str, action: &str) -> ClientResult<()> {
        let path = format!("/strategies/{}/{action}", segment(id));
        let _: IgnoredAny = self
            .post(&path, &serde_json::json!({}), RequestOptions::new())
            .await?;
        Ok(())
    }
}
