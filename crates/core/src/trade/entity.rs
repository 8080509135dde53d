use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 券商侧订单的唯一标识。
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// # Summary
/// 订单的交易方向定义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// 买入
    Buy,
    /// 卖出
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// # Summary
/// 订单在券商侧的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// 已受理，尚未完全成交
    New,
    /// 部分成交
    PartiallyFilled,
    /// 完全成交
    Filled,
    /// 已撤销
    Canceled,
    /// 被拒绝
    Rejected,
}

/// # Summary
/// 单一资产的余额。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// 资产代码 (例如 BTC、USDT)
    pub coin: String,
    /// 可用数量
    pub free: Decimal,
    /// 总数量 (可用 + 冻结)
    pub total: Decimal,
}

/// # Summary
/// 账户概况快照。
///
/// # Invariants
/// - `total_account_value` 以计价资产 (`quote_asset`) 表示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// 计价资产
    pub quote_asset: String,
    /// 账户总价值 (计价资产 + 其它资产按最新价折算)
    pub total_account_value: Decimal,
    /// 可用于下单的计价资产数量
    pub free_collateral: Decimal,
    /// 非零余额明细
    pub balances: Vec<Balance>,
}

/// # Summary
/// 下单回执。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub id: OrderId,
    /// 交易市场 (例如 BTCUSDT)
    pub symbol: String,
    pub side: OrderSide,
    /// 委托数量 (基础资产)
    pub size: Decimal,
    /// 已成交数量
    pub filled: Decimal,
    pub status: OrderStatus,
}
