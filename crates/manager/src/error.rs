use candlewick_core::common::FeedKind;
use candlewick_core::market::error::FeedError;
use candlewick_core::predict::port::PredictError;
use candlewick_core::series::error::SeriesError;
use candlewick_core::store::error::StoreError;
use candlewick_core::trade::port::TradeError;
use chrono::NaiveDate;
use thiserror::Error;

/// # Summary
/// Manager 层的统一错误类型，任何一个变体都会让本次运行失败。
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Series error: {0}")]
    Series(#[from] SeriesError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Predict error: {0}")]
    Predict(#[from] PredictError),
    #[error("Trade error: {0}")]
    Trade(#[from] TradeError),
    // 对账后最新日期仍早于昨天，说明数据源中断
    #[error("Stale series for {market}: newest {newest}, expected at least {expected}")]
    StaleSeries {
        market: String,
        newest: NaiveDate,
        expected: NaiveDate,
    },
    #[error("No feed registered for {0}")]
    NoFeed(FeedKind),
    #[error("Market not configured: {0}")]
    UnknownMarket(String),
}
