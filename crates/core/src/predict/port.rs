use super::entity::{SeriesSnapshot, TradingAction};
use async_trait::async_trait;
use thiserror::Error;

/// # Summary
/// 预测环节错误枚举。
///
/// # Invariants
/// - 超时与非零退出必须能被区分，便于告警信息定位。
#[derive(Error, Debug)]
pub enum PredictError {
    /// 无法启动预测程序或准备输入
    #[error("Failed to launch predictor: {0}")]
    Spawn(String),
    /// 预测程序运行超时并已被终止
    #[error("Predictor timed out after {0}s")]
    Timeout(u64),
    /// 预测程序以失败状态退出
    #[error("Predictor failed: {0}")]
    Failed(String),
    /// 输出无法识别为交易动作
    #[error("Unknown action from predictor: {0}")]
    UnknownAction(String),
}

/// # Summary
/// 预测能力接口，把对账后的历史序列转换为交易动作。
///
/// # Invariants
/// - 实现必须自行保证有界的执行时间 (显式超时)。
/// - 失败时返回错误，不得默认返回任何交易动作。
#[async_trait]
pub trait Predictor: Send + Sync {
    /// # Summary
    /// 为目标市场给出交易动作。
    ///
    /// # Arguments
    /// * `market`: 需要决策的市场名称。
    /// * `snapshots`: 所有已对账市场的序列快照 (包括目标市场，其它市场作为辅助特征)。
    ///
    /// # Returns
    /// 成功返回 `TradingAction`，失败返回 `PredictError`。
    async fn predict(
        &self,
        market: &str,
        snapshots: &[SeriesSnapshot],
    ) -> Result<TradingAction, PredictError>;
}
