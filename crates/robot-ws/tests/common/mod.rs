pub mod mock_ws;

use std::time::Duration;

/// Poll `condition` every 20ms for up to 3s.
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    tokio::time::timeout(Duration::from_secs(3), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok()
}
