use super::error::StoreError;
use crate::predict::entity::TradingAction;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 对象存储接口，历史 CSV 序列以整块字节的形式存取。
///
/// # Invariants
/// - 实现必须可被多个市场的对账任务并发调用。
/// - `get` 在对象不存在时返回 `StoreError::NotFound`，而不是空字节。
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// # Summary
    /// 读取对象的完整内容。
    ///
    /// # Arguments
    /// * `bucket`: 存储桶名称。
    /// * `key`: 对象键 (例如 `data/btc.csv`)。
    ///
    /// # Returns
    /// 成功返回对象字节；不存在返回 `NotFound`，其它失败返回 `Io`。
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// # Summary
    /// 以整体覆盖的方式写入对象。
    ///
    /// # Arguments
    /// * `bucket`: 存储桶名称。
    /// * `key`: 对象键。
    /// * `bytes`: 新的完整内容。
    ///
    /// # Returns
    /// 成功返回 Ok，失败返回 `StoreError::Io`。
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}

/// # Summary
/// 单个市场在一次调度运行中的对账与交易结果，写入运行台账用于审计。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    // 运行批次标识，同一次调度内所有市场共享
    pub run_id: String,
    // 市场名称 (例如 btc)
    pub market: String,
    // 运行时间
    pub run_at: DateTime<Utc>,
    // 本次追加的行数
    pub rows_written: u64,
    // 本次之后序列中的最新日期
    pub most_recent_date: NaiveDate,
    // 对账前序列中的最新收盘价
    pub newest_close: Decimal,
    // 预测程序给出的动作；未参与交易的市场为空
    pub action: Option<TradingAction>,
}

/// # Summary
/// 运行台账接口，记录每次调度的对账与交易结果。
///
/// # Invariants
/// - 只追加，不修改历史记录。
#[async_trait]
pub trait RunLedger: Send + Sync {
    /// 追加一条运行记录
    async fn record(&self, record: &RunRecord) -> Result<(), StoreError>;

    /// # Summary
    /// 查询某个市场最近的若干条运行记录。
    ///
    /// # Returns
    /// 按运行时间倒序排列的记录列表。
    async fn recent(&self, market: &str, limit: u32) -> Result<Vec<RunRecord>, StoreError>;
}
