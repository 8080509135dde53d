use super::entity::{AccountInfo, Balance, OrderId, OrderReceipt, OrderSide};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// # Summary
/// 交易执行环节中可能发生的错误。
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("可用资产不足. 需要: {required}, 实际: {actual}")]
    InsufficientFunds { required: Decimal, actual: Decimal },
    #[error("订单未找到或不存在: {0}")]
    OrderNotFound(String),
    #[error("非法订单: {0}")]
    InvalidOrder(String),
    #[error("券商拒绝: {0}")]
    Rejected(String),
    #[error("底层券商通道错误: {0}")]
    BrokerIntegrationError(String),
}

/// # Summary
/// 券商/交易所账户抽象接口。
/// 交易决策阶段通过此端口查询账户并下达市价单；对账核心不依赖它。
///
/// # Invariants
/// - 此接口必须是异步且线程安全的 (`Send + Sync`)。
/// - 只支持市价单，数量以基础资产计。
#[async_trait]
pub trait Broker: Send + Sync {
    /// 查询账户概况
    async fn account_info(&self) -> Result<AccountInfo, TradeError>;

    /// 查询全部非零余额
    async fn balances(&self) -> Result<Vec<Balance>, TradeError>;

    /// 提交一笔市价单
    ///
    /// # Arguments
    /// * `symbol` - 交易市场，例如 `BTCUSDT`
    /// * `side` - 买卖方向
    /// * `size` - 基础资产数量，必须为正
    ///
    /// # Returns
    /// * `Ok(OrderReceipt)` - 券商受理后的回执
    /// * `Err(TradeError)` - 资金不足、参数非法或通道错误
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: Decimal,
    ) -> Result<OrderReceipt, TradeError>;

    /// 撤销一笔尚未完全成交的委托单
    async fn cancel_order(&self, symbol: &str, order_id: &OrderId) -> Result<(), TradeError>;

    /// 告知券商最新对账得到的参考价格。
    /// 模拟账户以此价格撮合；真实交易所自行定价，默认忽略。
    async fn update_reference_price(&self, _symbol: &str, _price: Decimal) {}
}
