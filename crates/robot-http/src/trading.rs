//! Order, position and trade endpoints.

use crate::client::{segment, ApiClient, RequestOptions};
use crate::error::ClientResult;
use robot_core::{Order, OrderRequest, OrderStatus, Position, Trade};
use serde::de::IgnoredAny;

/// Filter for `GET /trading/orders` and `GET /trading/trades`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub symbol: Option<String>,
    pub status: Option<OrderStatus>,
    pub order_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl OrderFilter {
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn into_options(self) -> RequestOptions {
        RequestOptions::new()
            .query_opt("symbol", self.symbol)
            .query_opt("status", self.status)
            .query_opt("order_id", self.order_id)
            .query_opt("limit", self.limit)
            .query_opt("offset", self.offset)
    }
}

impl ApiClient {
    pub async fn place_order(&self, order: &OrderRequest) -> ClientResult<Order> {
        self.post("/trading/orders", order, RequestOptions::new()).await
    }

    pub async fn list_orders(&self, filter: OrderFilter) -> ClientResult<Vec<Order>> {
        self.get("/trading/orders", filter.into_options()).await
    }

    pub async fn get_order(&self, order_id: &str) -> ClientResult<Order> {
        self.get(
            &format!("/trading/orders/{}", segment(order_id)),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn cancel_order(&self, order_id: &str) -> ClientResult<()> {
        let _: IgnoredAny = self
            .delete(
                &format!("/trading/orders/{}", segment(order_id)),
                RequestOptions::new(),
            )
            .await?;
        Ok(())
    }

    pub async fn positions(&self) -> ClientResult<Vec<Position>> {
        self.get("/trading/positions", RequestOptions::new()).await
    }

    pub async fn position(&self, symbol: &str) -> ClientResult<Position> {
        self.get(
            &format!("/trading/positions/{}", segment(symbol)),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn trades(&self, filter: OrderFilter) -> ClientResult<Vec<Trade>> {
        self.get("/trading/trades", filter.into_options()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_query() {
        let options = OrderFilter::default()
            .symbol("BTC/USDT")
            .status(OrderStatus::PartialFilled)
            .limit(20)
            .into_options();
        assert_eq!(
            options.query,
            vec![
                ("symbol".to_string(), "BTC/USDT".to_string()),
                ("status".to_string(), "partial_filled".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_filter_has_no_query() {
        assert!(OrderFilter::default().into_options().query.is_empty());
    }
}
