//! Market data and collected-data endpoints.

use crate::client::{segment, ApiClient, RequestOptions};
use crate::error::ClientResult;
use robot_core::{Kline, MarketTick, NewsItem, OrderBook, Ticker, WhaleAlert};

impl ApiClient {
    pub async fn tickers(&self) -> ClientResult<Vec<Ticker>> {
        self.get("/market/tickers", RequestOptions::new()).await
    }

    /// Candles for `symbol`, e.g. `interval = "1m"`.
    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<u32>,
    ) -> ClientResult<Vec<Kline>> {
        let options = RequestOptions::new()
            .query("interval", interval)
            .query_opt("limit", limit);
        self.get(&format!("/market/klines/{}", segment(symbol)), options)
            .await
    }

    pub async fn order_book(&self, symbol: &str) -> ClientResult<OrderBook> {
        self.get(
            &format!("/market/orderbook/{}", segment(symbol)),
            RequestOptions::new(),
        )
        .await
    }

    /// Latest `count` collected ticks for `symbol`.
    pub async fn market_snapshot(&self, symbol: &str, count: u32) -> ClientResult<Vec<MarketTick>> {
        self.get(
            &format!("/data/market/{}", segment(symbol)),
            RequestOptions::new().query("count", count),
        )
        .await
    }

    pub async fn news(&self, count: u32) -> ClientResult<Vec<NewsItem>> {
        self.get("/data/news", RequestOptions::new().query("count", count))
            .await
    }

    pub async fn whale_alerts(&self, count: u32) -> ClientResult<Vec<WhaleAlert>> {
        self.get("/data/whale-alerts", RequestOptions::new().query("count", count))
            .await
    }

    /// Collection summary; shape varies by backend version.
    pub async fn data_summary(&self) -> ClientResult<serde_json::Value> {
        self.get("/data/summary", RequestOptions::new()).await
    }
}
