use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 预测程序给出的交易状态迁移，形如 “当前状态_to_目标状态”。
///
/// # Invariants
/// - 文本形式与预测程序输出的令牌一一对应 (snake_case)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingAction {
    // 无动作
    None,
    // 空仓保持空仓
    NoneToNone,
    // 平掉多头
    BuyToNone,
    // 平掉空头
    ShortToNone,
    // 空仓开多
    NoneToBuy,
    // 空仓开空
    NoneToShort,
    // 多头持有
    BuyToContinueBuy,
    // 空头持有
    ShortToContinueShort,
}

impl FromStr for TradingAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(TradingAction::None),
            "none_to_none" => Ok(TradingAction::NoneToNone),
            "buy_to_none" => Ok(TradingAction::BuyToNone),
            "short_to_none" => Ok(TradingAction::ShortToNone),
            "none_to_buy" => Ok(TradingAction::NoneToBuy),
            "none_to_short" => Ok(TradingAction::NoneToShort),
            "buy_to_continue_buy" => Ok(TradingAction::BuyToContinueBuy),
            "short_to_continue_short" => Ok(TradingAction::ShortToContinueShort),
            _ => Err(format!("Unknown TradingAction: {}", s)),
        }
    }
}

impl std::fmt::Display for TradingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            TradingAction::None => "none",
            TradingAction::NoneToNone => "none_to_none",
            TradingAction::BuyToNone => "buy_to_none",
            TradingAction::ShortToNone => "short_to_none",
            TradingAction::NoneToBuy => "none_to_buy",
            TradingAction::NoneToShort => "none_to_short",
            TradingAction::BuyToContinueBuy => "buy_to_continue_buy",
            TradingAction::ShortToContinueShort => "short_to_continue_short",
        };
        write!(f, "{}", token)
    }
}

/// # Summary
/// 交给预测程序的单个市场历史序列快照 (CSV 原始字节)。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSnapshot {
    // 市场名称 (例如 btc)
    pub market: String,
    // 对账完成后的完整 CSV 内容
    pub csv: Vec<u8>,
}
