//! User settings endpoints.

use crate::client::{ApiClient, RequestOptions};
use crate::error::ClientResult;
use robot_core::UserSettings;

impl ApiClient {
    pub async fn settings(&self) -> ClientResult<UserSettings> {
        self.get("/settings/", RequestOptions::new()).await
    }

    pub async fn update_settings(&self, settings: &UserSettings) -> ClientResult<UserSettings> {
        self.put("/settings/", settings, RequestOptions::new()).await
    }
}
