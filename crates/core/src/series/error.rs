use thiserror::Error;

/// # Summary
/// 历史序列对账错误枚举，覆盖解析、写入与前置条件失败。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 任何一种错误都会终止对应市场的本次对账，不做自动恢复。
#[derive(Error, Debug)]
pub enum SeriesError {
    /// 持久化文件中某一行无法解析 (字段数错误、日期或数值非法)
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// 目标序列无法打开或写入
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// 抓取结果为空，无法作为前向填充的模板
    #[error("Cannot fill gaps for {0}: fetched sequence is empty")]
    EmptyFetch(String),
}
