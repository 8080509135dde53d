mod settings;

use std::sync::Arc;

use candlewick_core::common::FeedKind;
use candlewick_core::common::time::{RealTimeProvider, TimeProvider};
use candlewick_core::config::{AppConfig, BrokerKind};
use candlewick_core::notify::port::Notifier;
use candlewick_core::trade::port::Broker;
use candlewick_feed::coinbase::CoinbaseFeed;
use candlewick_feed::yahoo::YahooFeed;
use candlewick_manager::job::{JobParts, TradingJob};
use candlewick_manager::pipeline::ReconciliationPipeline;
use candlewick_notify::email::EmailNotifier;
use candlewick_predict::command::CommandPredictor;
use candlewick_store::blob::FsBlobStore;
use candlewick_store::ledger::SqliteRunLedger;
use candlewick_trade::paper::PaperBroker;
use candlewick_trade::rest::RestBroker;
use tracing::info;

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 TradingJob，执行一次后退出。
///
/// # Logic
/// 1. 读取配置并初始化全局日志。
/// 2. 安装 TLS 加密实现。
/// 3. 实例化基础设施层（Feed、Store、Broker、Predictor、Notifier）。
/// 4. 构造应用服务层并运行一次；失败时以非零状态退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置与日志
    let path = std::env::var("CANDLEWICK_CONFIG")
        .unwrap_or_else(|_| settings::DEFAULT_CONFIG_PATH.to_string());
    let config = settings::load(&path)?;
    let _guard = settings::init_tracing(&config.logging)?;
    info!(config = %path, markets = config.markets.len(), "Candlewick starting...");

    // 2. reqwest 与 lettre 共用 ring
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "rustls crypto provider already installed")?;

    // 3. 组装并运行
    let job = build_job(&config).await?;
    let summary = job.run().await?;

    info!(run_id = %summary.run_id, action = %summary.action, "Candlewick finished");
    Ok(())
}

async fn build_job(config: &AppConfig) -> Result<TradingJob, Box<dyn std::error::Error>> {
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);

    let store = Arc::new(FsBlobStore::new(config.storage.data_dir.clone()));
    let pipeline = ReconciliationPipeline::new(store, clock.clone(), &config.storage.bucket)
        .with_feed(FeedKind::Coinbase, Arc::new(CoinbaseFeed::new()?))
        .with_feed(FeedKind::Yahoo, Arc::new(YahooFeed::new()?));

    let broker: Arc<dyn Broker> = match config.broker.kind {
        BrokerKind::Paper => Arc::new(PaperBroker::new(
            &config.broker.quote_asset,
            config.broker.paper_cash,
        )),
        BrokerKind::Rest => Arc::new(RestBroker::new(&config.broker)?),
    };

    let notifier: Option<Arc<dyn Notifier>> = match &config.notify {
        Some(email) => Some(Arc::new(EmailNotifier::new(email)?)),
        None => None,
    };

    let ledger = Arc::new(SqliteRunLedger::open(&config.ledger.path).await?);

    Ok(TradingJob::new(JobParts {
        pipeline,
        markets: config.markets.clone(),
        trading: config.trading.clone(),
        dry_run: config.broker.dry_run,
        predictor: Arc::new(CommandPredictor::new(&config.predictor)),
        broker,
        ledger,
        notifier,
        clock,
    }))
}
