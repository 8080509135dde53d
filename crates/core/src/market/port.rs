use crate::market::error::FeedError;
use crate::series::entity::CandleRecord;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 日线行情数据源接口（原始数据源）。
///
/// # Invariants
/// - 返回的记录日期已按数据源的参考时区截断到天。
/// - 不保证返回顺序，调用方在写入前自行按日期排序。
/// - 可能包含尚未收盘的“今天”，由写入逻辑负责排除。
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// # Summary
    /// 获取指定标的在日期区间内的日线数据。
    ///
    /// # Logic
    /// 1. 将日期区间转换为数据源需要的时间参数。
    /// 2. 执行网络请求并把响应解析为 `CandleRecord`。
    ///
    /// # Arguments
    /// * `symbol`: 数据源侧的标的代码 (例如 `BTC-USD`、`TBT`)。
    /// * `start`: 开始日期（包含）。
    /// * `end`: 结束日期（包含）。
    ///
    /// # Returns
    /// 成功返回日线列表，失败返回 `FeedError`。
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CandleRecord>, FeedError>;
}
