use crate::error::ManagerError;
use candlewick_core::common::FeedKind;
use candlewick_core::common::time::TimeProvider;
use candlewick_core::config::MarketProfile;
use candlewick_core::market::port::MarketDataFeed;
use candlewick_core::predict::entity::SeriesSnapshot;
use candlewick_core::store::error::StoreError;
use candlewick_core::store::port::BlobStore;
use candlewick_series::reconcile::reconcile;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// # Summary
/// 单个市场一次对账的对外结果。
#[derive(Debug, Clone, PartialEq)]
pub struct MarketReport {
    pub market: String,
    pub rows_written: u64,
    // 对账之后序列中的最新日期
    pub most_recent_written: NaiveDate,
    // 对账之前序列中的最新收盘价
    pub newest_close: Decimal,
    pub synthesized: usize,
    // 该市场参考时区下的“昨天”
    pub expected: NaiveDate,
    // 对账后的完整序列，交给预测程序
    pub series: Vec<u8>,
}

impl MarketReport {
    /// 序列是否已经更新到昨天
    pub fn is_fresh(&self) -> bool {
        self.most_recent_written >= self.expected
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            market: self.market.clone(),
            csv: self.series.clone(),
        }
    }
}

/// # Summary
/// 多市场对账流水线：同一套逻辑按 {市场, 行情源, 对象键} 参数化。
///
/// # Invariants
/// - 市场之间按顺序对账，互不共享可变状态。
/// - 只有追加了新行时才回写对象存储。
pub struct ReconciliationPipeline {
    store: Arc<dyn BlobStore>,
    feeds: HashMap<FeedKind, Arc<dyn MarketDataFeed>>,
    clock: Arc<dyn TimeProvider>,
    bucket: String,
}

impl ReconciliationPipeline {
    pub fn new(store: Arc<dyn BlobStore>, clock: Arc<dyn TimeProvider>, bucket: &str) -> Self {
        Self {
            store,
            feeds: HashMap::new(),
            clock,
            bucket: bucket.to_string(),
        }
    }

    /// 为某类行情源注册实现
    pub fn with_feed(mut self, kind: FeedKind, feed: Arc<dyn MarketDataFeed>) -> Self {
        self.feeds.insert(kind, feed);
        self
    }

    /// # Summary
    /// 读取持久化序列；对象不存在视为空序列 (首次运行)。
    async fn load(&self, market: &MarketProfile) -> Result<Vec<u8>, ManagerError> {
        match self.store.get(&self.bucket, &market.blob_key).await {
            Ok(bytes) => Ok(bytes),
            Err(StoreError::NotFound(_)) => {
                warn!(market = %market.name, key = %market.blob_key, "no persisted series, bootstrapping from empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// # Summary
    /// 对账单个市场。
    ///
    /// # Logic
    /// 1. 读取持久化序列。
    /// 2. 按市场参考时区计算今天，抓取最近 `lookback_days` 天的日线。
    /// 3. 调用纯函数 `reconcile` 完成解析、游标计算、前向填充与增量写入。
    /// 4. 有新行时整体回写对象。
    ///
    /// # Arguments
    /// * `market`: 市场配置。
    ///
    /// # Returns
    /// 成功返回 `MarketReport`；任何一步失败都会终止该市场。
    pub async fn reconcile_market(
        &self,
        market: &MarketProfile,
    ) -> Result<MarketReport, ManagerError> {
        let persisted = self.load(market).await?;
        let feed = self
            .feeds
            .get(&market.feed)
            .ok_or(ManagerError::NoFeed(market.feed))?;

        let now = self.clock.now();
        let today = market.zone.today(now);
        let start = today
            .checked_sub_days(Days::new(u64::from(market.lookback_days)))
            .unwrap_or(today);
        let fetched = feed.fetch(&market.symbol, start, today).await?;
        if fetched.is_empty() {
            warn!(market = %market.name, %start, %today, "feed returned no candles");
        }

        let result = reconcile(market, &persisted, fetched, now)?;
        if result.records_written > 0 {
            self.store
                .put(&self.bucket, &market.blob_key, result.updated.clone())
                .await?;
        }

        info!(
            market = %market.name,
            rows = result.records_written,
            synthesized = result.synthesized,
            newest = %result.most_recent_written,
            close = %result.newest_close(),
            "market reconciled"
        );

        Ok(MarketReport {
            market: market.name.clone(),
            rows_written: result.records_written,
            most_recent_written: result.most_recent_written,
            newest_close: result.newest_close(),
            synthesized: result.synthesized,
            expected: market.zone.yesterday(now),
            series: result.updated,
        })
    }

    /// # Summary
    /// 按配置顺序依次对账所有市场，遇到第一个错误即停止。
    pub async fn reconcile_all(
        &self,
        markets: &[MarketProfile],
    ) -> Result<Vec<MarketReport>, ManagerError> {
        let mut reports = Vec::with_capacity(markets.len());
        for market in markets {
            reports.push(self.reconcile_market(market).await?);
        }
        Ok(reports)
    }
}
