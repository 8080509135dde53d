use crate::error::ManagerError;
use crate::pipeline::{MarketReport, ReconciliationPipeline};
use candlewick_core::common::time::TimeProvider;
use candlewick_core::config::{MarketProfile, TradingConfig};
use candlewick_core::notify::port::Notifier;
use candlewick_core::predict::entity::{SeriesSnapshot, TradingAction};
use candlewick_core::predict::port::Predictor;
use candlewick_core::store::port::{RunLedger, RunRecord};
use candlewick_core::trade::entity::{AccountInfo, OrderReceipt, OrderSide};
use candlewick_core::trade::port::Broker;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tracing::{error, info, warn};

/// # Summary
/// 交易动作映射出的订单意图。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedOrder {
    pub side: OrderSide,
    pub size: Decimal,
}

/// # Summary
/// 把交易动作映射为订单。
///
/// # Logic
/// - `buy_to_none`：卖出全部可用的基础资产。
/// - `none_to_buy`：买入 `账户总价值 * position_fraction / newest_close`。
/// - 其它动作不下单。
/// - 数量按 `lot_scale` 向零截断，截断后为 0 的订单跳过。
///
/// # Arguments
/// * `action`: 预测程序给出的动作。
/// * `trading`: 交易参数。
/// * `account`: 当前账户概况。
/// * `newest_close`: 目标市场对账前的最新收盘价。
pub fn plan_order(
    action: TradingAction,
    trading: &TradingConfig,
    account: &AccountInfo,
    newest_close: Decimal,
) -> Option<PlannedOrder> {
    let (side, raw) = match action {
        TradingAction::BuyToNone => {
            let held = account
                .balances
                .iter()
                .find(|b| b.coin == trading.base_asset)
                .map(|b| b.free)
                .unwrap_or(Decimal::ZERO);
            (OrderSide::Sell, Some(held))
        }
        TradingAction::NoneToBuy => {
            let budget = account
                .total_account_value
                .checked_mul(trading.position_fraction);
            let size = budget.and_then(|b| b.checked_div(newest_close));
            (OrderSide::Buy, size)
        }
        _ => return None,
    };

    let size = raw?.round_dp_with_strategy(trading.lot_scale, RoundingStrategy::ToZero);
    (size > Decimal::ZERO).then_some(PlannedOrder { side, size })
}

/// # Summary
/// 一次成功运行的摘要，用于日志、台账与通知。
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub reports: Vec<MarketReport>,
    pub action: TradingAction,
    pub planned: Option<PlannedOrder>,
    // 演练模式或没有订单时为空
    pub receipt: Option<OrderReceipt>,
    pub dry_run: bool,
}

impl RunSummary {
    /// 纯文本通知正文
    pub fn render(&self) -> String {
        let mut body = String::new();
        for r in &self.reports {
            body.push_str(&format!(
                "{}: wrote {} rows ({} synthesized), newest {}, close {}\n",
                r.market, r.rows_written, r.synthesized, r.most_recent_written, r.newest_close
            ));
        }
        body.push_str(&format!("action: {}\n", self.action));
        let order = match (&self.planned, &self.receipt) {
            (Some(p), Some(receipt)) => format!(
                "order: {} {} -> {} ({:?}, filled {})",
                p.side, p.size, receipt.id.0, receipt.status, receipt.filled
            ),
            (Some(p), None) if self.dry_run => {
                format!("order: {} {} (dry run, not placed)", p.side, p.size)
            }
            _ => "order: none".to_string(),
        };
        body.push_str(&order);
        body
    }
}

/// # Summary
/// 一次完整的调度运行：对账全部市场、检查新鲜度、预测、下单、记账、通知。
///
/// # Invariants
/// - 所有协作者通过构造函数注入，本类型不读取环境变量。
/// - 通知失败只记录日志，不改变运行结果。
pub struct TradingJob {
    pipeline: ReconciliationPipeline,
    markets: Vec<MarketProfile>,
    trading: TradingConfig,
    dry_run: bool,
    predictor: Arc<dyn Predictor>,
    broker: Arc<dyn Broker>,
    ledger: Arc<dyn RunLedger>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Arc<dyn TimeProvider>,
}

/// 构造 `TradingJob` 所需的协作者
pub struct JobParts {
    pub pipeline: ReconciliationPipeline,
    pub markets: Vec<MarketProfile>,
    pub trading: TradingConfig,
    pub dry_run: bool,
    pub predictor: Arc<dyn Predictor>,
    pub broker: Arc<dyn Broker>,
    pub ledger: Arc<dyn RunLedger>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub clock: Arc<dyn TimeProvider>,
}

impl TradingJob {
    pub fn new(parts: JobParts) -> Self {
        Self {
            pipeline: parts.pipeline,
            markets: parts.markets,
            trading: parts.trading,
            dry_run: parts.dry_run,
            predictor: parts.predictor,
            broker: parts.broker,
            ledger: parts.ledger,
            notifier: parts.notifier,
            clock: parts.clock,
        }
    }

    /// # Summary
    /// 执行一次运行并发送结果通知。
    ///
    /// # Logic
    /// 1. 生成本次运行的 ID。
    /// 2. 执行全部步骤。
    /// 3. 成功发送摘要，失败发送告警，然后原样返回结果。
    pub async fn run(&self) -> Result<RunSummary, ManagerError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        info!(%run_id, markets = self.markets.len(), dry_run = self.dry_run, "run started");

        match self.execute(&run_id).await {
            Ok(summary) => {
                let subject = format!("candlewick {}: {}", self.trading.market, summary.action);
                self.send(&subject, &summary.render()).await;
                info!(%run_id, action = %summary.action, "run finished");
                Ok(summary)
            }
            Err(e) => {
                error!(%run_id, error = %e, "run failed");
                let subject = format!("candlewick {} run failed", self.trading.market);
                self.send(&subject, &format!("run {}\n{}", run_id, e)).await;
                Err(e)
            }
        }
    }

    async fn send(&self, subject: &str, content: &str) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(subject, content).await {
                warn!(error = %e, subject, "failed to send notification");
            }
        }
    }

    async fn execute(&self, run_id: &str) -> Result<RunSummary, ManagerError> {
        let reports = self.pipeline.reconcile_all(&self.markets).await?;

        if let Some(stale) = reports.iter().find(|r| !r.is_fresh()) {
            return Err(ManagerError::StaleSeries {
                market: stale.market.clone(),
                newest: stale.most_recent_written,
                expected: stale.expected,
            });
        }

        let target = reports
            .iter()
            .find(|r| r.market == self.trading.market)
            .ok_or_else(|| ManagerError::UnknownMarket(self.trading.market.clone()))?;

        let snapshots: Vec<SeriesSnapshot> = reports.iter().map(MarketReport::snapshot).collect();
        let action = self.predictor.predict(&self.trading.market, &snapshots).await?;
        info!(market = %self.trading.market, %action, "prediction received");

        let (planned, receipt) = self.trade(action, target.newest_close).await?;

        let run_at = self.clock.now();
        for report in &reports {
            self.ledger
                .record(&RunRecord {
                    run_id: run_id.to_string(),
                    market: report.market.clone(),
                    run_at,
                    rows_written: report.rows_written,
                    most_recent_date: report.most_recent_written,
                    newest_close: report.newest_close,
                    action: (report.market == self.trading.market).then_some(action),
                })
                .await?;
        }

        Ok(RunSummary {
            run_id: run_id.to_string(),
            reports,
            action,
            planned,
            receipt,
            dry_run: self.dry_run,
        })
    }

    /// # Summary
    /// 根据交易动作下单。
    ///
    /// # Logic
    /// 1. 不需要下单的动作直接返回，不查询账户。
    /// 2. 把最新收盘价登记为参考价，再查询账户并计算订单。
    /// 3. 演练模式只记录订单意图。
    async fn trade(
        &self,
        action: TradingAction,
        newest_close: Decimal,
    ) -> Result<(Option<PlannedOrder>, Option<OrderReceipt>), ManagerError> {
        if !matches!(action, TradingAction::BuyToNone | TradingAction::NoneToBuy) {
            info!(%action, "no order for this action");
            return Ok((None, None));
        }

        let symbol = &self.trading.order_symbol;
        self.broker.update_reference_price(symbol, newest_close).await;
        let account = self.broker.account_info().await?;

        let Some(planned) = plan_order(action, &self.trading, &account, newest_close) else {
            warn!(%action, symbol, "order size rounds to zero, skipping");
            return Ok((None, None));
        };

        if self.dry_run {
            info!(symbol, side = %planned.side, size = %planned.size, "dry run, order not placed");
            return Ok((Some(planned), None));
        }

        let receipt = self
            .broker
            .place_market_order(symbol, planned.side, planned.size)
            .await?;
        Ok((Some(planned), Some(receipt)))
    }
}
