use async_trait::async_trait;
use candlewick_core::trade::entity::{
    AccountInfo, Balance, OrderId, OrderReceipt, OrderSide, OrderStatus,
};
use candlewick_core::trade::port::{Broker, TradeError};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// # Summary
/// 模拟账户的内部状态：计价资产现金与各基础资产持仓。
struct PaperAccount {
    cash: Decimal,
    holdings: HashMap<String, Decimal>,
}

impl PaperAccount {
    /// # Logic
    /// 买入扣款，现金不足时拒绝且不修改任何状态。
    fn debit(&mut self, amount: Decimal) -> Result<(), TradeError> {
        if self.cash < amount {
            return Err(TradeError::InsufficientFunds {
                required: amount,
                actual: self.cash,
            });
        }
        self.cash -= amount;
        Ok(())
    }

    /// # Logic
    /// 调整持仓数量，卖出时持仓不足拒绝；清零的持仓直接移除。
    fn adjust(&mut self, coin: &str, delta: Decimal) -> Result<(), TradeError> {
        let held = self.holdings.get(coin).copied().unwrap_or(Decimal::ZERO);
        let next = held + delta;
        if next.is_sign_negative() && !next.is_zero() {
            return Err(TradeError::InsufficientFunds {
                required: delta.abs(),
                actual: held,
            });
        }
        if next.is_zero() {
            self.holdings.remove(coin);
        } else {
            self.holdings.insert(coin.to_string(), next);
        }
        Ok(())
    }
}

/// # Summary
/// 本地模拟券商，市价单按最近一次登记的参考价立即全部成交。
///
/// # Invariants
/// - 只支持以 `quote_asset` 结尾的交易对 (例如 `BTCUSDT`)。
/// - 没有参考价的交易对无法下单。
/// - 账户状态只存在于内存中。
pub struct PaperBroker {
    quote_asset: String,
    account: RwLock<PaperAccount>,
    // 交易对 -> 参考成交价
    prices: DashMap<String, Decimal>,
    // 已成交订单，用于撤单时区分“已成交”与“不存在”
    filled: DashMap<OrderId, OrderReceipt>,
}

impl PaperBroker {
    pub fn new(quote_asset: &str, initial_cash: Decimal) -> Self {
        Self {
            quote_asset: quote_asset.to_string(),
            account: RwLock::new(PaperAccount {
                cash: initial_cash,
                holdings: HashMap::new(),
            }),
            prices: DashMap::new(),
            filled: DashMap::new(),
        }
    }

    /// 预置一笔基础资产持仓
    pub async fn with_holding(self, coin: &str, amount: Decimal) -> Self {
        self.account
            .write()
            .await
            .holdings
            .insert(coin.to_string(), amount);
        self
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.insert(symbol.to_string(), price);
    }

    fn base_asset<'a>(&self, symbol: &'a str) -> Result<&'a str, TradeError> {
        symbol
            .strip_suffix(self.quote_asset.as_str())
            .filter(|base| !base.is_empty())
            .ok_or_else(|| {
                TradeError::InvalidOrder(format!(
                    "{} is not quoted in {}",
                    symbol, self.quote_asset
                ))
            })
    }

    fn price_of(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).map(|p| *p.value())
    }
}

#[async_trait]
impl Broker for PaperBroker {
    /// # Summary
    /// 账户概况。
    ///
    /// # Logic
    /// 总价值 = 现金 + Σ 持仓 × 参考价；没有参考价的持仓不计入。
    async fn account_info(&self) -> Result<AccountInfo, TradeError> {
        let account = self.account.read().await;
        let holdings_value: Decimal = account
            .holdings
            .iter()
            .filter_map(|(coin, amount)| {
                self.price_of(&format!("{}{}", coin, self.quote_asset))
                    .map(|price| price * amount)
            })
            .sum();

        Ok(AccountInfo {
            quote_asset: self.quote_asset.clone(),
            total_account_value: account.cash + holdings_value,
            free_collateral: account.cash,
            balances: balances_of(&self.quote_asset, &account),
        })
    }

    async fn balances(&self) -> Result<Vec<Balance>, TradeError> {
        let account = self.account.read().await;
        Ok(balances_of(&self.quote_asset, &account))
    }

    /// # Summary
    /// 按参考价立即成交一笔市价单。
    ///
    /// # Logic
    /// 1. 校验数量为正、交易对合法且存在参考价。
    /// 2. 买入：扣减现金 `size * price`，增加基础资产。
    /// 3. 卖出：减少基础资产，增加现金。
    /// 4. 任一步失败都不改变账户状态。
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: Decimal,
    ) -> Result<OrderReceipt, TradeError> {
        if size <= Decimal::ZERO {
            return Err(TradeError::InvalidOrder(format!("size must be positive, got {}", size)));
        }
        let base = self.base_asset(symbol)?;
        let price = self
            .price_of(symbol)
            .ok_or_else(|| TradeError::InvalidOrder(format!("no reference price for {}", symbol)))?;
        let notional = size * price;

        let mut account = self.account.write().await;
        match side {
            OrderSide::Buy => {
                account.debit(notional)?;
                account.adjust(base, size)?;
            }
            OrderSide::Sell => {
                account.adjust(base, -size)?;
                account.cash += notional;
            }
        }

        let receipt = OrderReceipt {
            id: OrderId(uuid::Uuid::new_v4().to_string()),
            symbol: symbol.to_string(),
            side,
            size,
            filled: size,
            status: OrderStatus::Filled,
        };
        info!(symbol, %side, %size, %price, cash = %account.cash, "paper order filled");
        self.filled.insert(receipt.id.clone(), receipt.clone());
        Ok(receipt)
    }

    async fn cancel_order(&self, _symbol: &str, order_id: &OrderId) -> Result<(), TradeError> {
        if self.filled.contains_key(order_id) {
            return Err(TradeError::InvalidOrder(format!(
                "order {} is already filled",
                order_id.0
            )));
        }
        Err(TradeError::OrderNotFound(order_id.0.clone()))
    }

    async fn update_reference_price(&self, symbol: &str, price: Decimal) {
        self.set_price(symbol, price);
    }
}

fn balances_of(quote_asset: &str, account: &PaperAccount) -> Vec<Balance> {
    let mut balances: Vec<Balance> = account
        .holdings
        .iter()
        .map(|(coin, amount)| Balance {
            coin: coin.clone(),
            free: *amount,
            total: *amount,
        })
        .collect();
    balances.sort_by(|a, b| a.coin.cmp(&b.coin));
    if !account.cash.is_zero() {
        balances.insert(
            0,
            Balance {
                coin: quote_asset.to_string(),
                free: account.cash,
                total: account.cash,
            },
        );
    }
    balances
}
