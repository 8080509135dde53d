//! 供各 crate 集成测试使用的内存替身实现。

use crate::market::error::FeedError;
use crate::market::port::MarketDataFeed;
use crate::notify::error::NotifyError;
use crate::notify::port::Notifier;
use crate::predict::entity::{SeriesSnapshot, TradingAction};
use crate::predict::port::{PredictError, Predictor};
use crate::series::entity::CandleRecord;
use crate::trade::entity::{
    AccountInfo, Balance, OrderId, OrderReceipt, OrderSide, OrderStatus,
};
use crate::trade::port::{Broker, TradeError};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

/// # Summary
/// 预置数据的行情源，按标的返回固定的日线列表 (原样顺序)。
#[derive(Default)]
pub struct StaticFeed {
    records: DashMap<String, Vec<CandleRecord>>,
    // 记录每次请求的 (symbol, start, end)
    requests: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, symbol: &str, records: Vec<CandleRecord>) -> Self {
        self.records.insert(symbol.to_string(), records);
        self
    }

    pub async fn requests(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl MarketDataFeed for StaticFeed {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CandleRecord>, FeedError> {
        self.requests
            .lock()
            .await
            .push((symbol.to_string(), start, end));
        self.records
            .get(symbol)
            .map(|r| r.value().clone())
            .ok_or_else(|| FeedError::NotFound(symbol.to_string()))
    }
}

/// # Summary
/// 记录所有下单请求的券商替身，订单一律立即全部成交。
pub struct RecordingBroker {
    info: AccountInfo,
    orders: Mutex<Vec<OrderReceipt>>,
    prices: Mutex<Vec<(String, Decimal)>>,
}

impl RecordingBroker {
    pub fn new(total_account_value: Decimal, balances: Vec<Balance>) -> Self {
        Self {
            info: AccountInfo {
                quote_asset: "USDT".to_string(),
                total_account_value,
                free_collateral: total_account_value,
                balances,
            },
            orders: Mutex::new(Vec::new()),
            prices: Mutex::new(Vec::new()),
        }
    }

    pub async fn orders(&self) -> Vec<OrderReceipt> {
        self.orders.lock().await.clone()
    }

    /// 收到的参考价格，按调用顺序
    pub async fn prices(&self) -> Vec<(String, Decimal)> {
        self.prices.lock().await.clone()
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn account_info(&self) -> Result<AccountInfo, TradeError> {
        Ok(self.info.clone())
    }

    async fn balances(&self) -> Result<Vec<Balance>, TradeError> {
        Ok(self.info.balances.clone())
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: Decimal,
    ) -> Result<OrderReceipt, TradeError> {
        let receipt = OrderReceipt {
            id: OrderId(uuid::Uuid::new_v4().to_string()),
            symbol: symbol.to_string(),
            side,
            size,
            filled: size,
            status: OrderStatus::Filled,
        };
        self.orders.lock().await.push(receipt.clone());
        Ok(receipt)
    }

    async fn cancel_order(&self, _symbol: &str, order_id: &OrderId) -> Result<(), TradeError> {
        Err(TradeError::OrderNotFound(order_id.0.clone()))
    }

    async fn update_reference_price(&self, symbol: &str, price: Decimal) {
        self.prices.lock().await.push((symbol.to_string(), price));
    }
}

/// # Summary
/// 返回预设结果的预测替身，并保存收到的快照。
pub struct ScriptedPredictor {
    action: Option<TradingAction>,
    seen: Mutex<Vec<(String, Vec<SeriesSnapshot>)>>,
}

impl ScriptedPredictor {
    pub fn returning(action: TradingAction) -> Self {
        Self {
            action: Some(action),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用都以非零退出失败
    pub fn failing() -> Self {
        Self {
            action: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> Vec<(String, Vec<SeriesSnapshot>)> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    async fn predict(
        &self,
        market: &str,
        snapshots: &[SeriesSnapshot],
    ) -> Result<TradingAction, PredictError> {
        self.seen
            .lock()
            .await
            .push((market.to_string(), snapshots.to_vec()));
        self.action
            .ok_or_else(|| PredictError::Failed("scripted failure".to_string()))
    }
}

/// # Summary
/// 把通知保存在内存中的替身。
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, content: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .await
            .push((subject.to_string(), content.to_string()));
        Ok(())
    }
}
