//! Account endpoints.

use crate::client::{segment, ApiClient, RequestOptions};
use crate::error::ClientResult;
use robot_core::AccountBalance;

impl ApiClient {
    /// Per-currency balances of one exchange account.
    pub async fn account_balances(&self, account_id: &str) -> ClientResult<Vec<AccountBalance>> {
        self.get(
            &format!("/accounts/{}/balance", segment(account_id)),
            RequestOptions::new(),
        )
        .await
    }
}
