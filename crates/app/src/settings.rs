use candlewick_core::common::FeedKind;
use candlewick_core::config::{AppConfig, LoggingConfig};
use candlewick_feed::coinbase::MAX_CANDLES_PER_REQUEST;
use config::{Config, ConfigError, Environment, File, Source};
use std::collections::HashSet;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// 未设置 `CANDLEWICK_CONFIG` 时读取的配置文件
pub const DEFAULT_CONFIG_PATH: &str = "config/candlewick.yaml";

/// # Summary
/// 读取配置文件并叠加环境变量覆盖。
///
/// # Logic
/// 1. 读取 YAML 配置文件 (必须存在)。
/// 2. 叠加 `CANDLEWICK__` 前缀的环境变量，层级以 `__` 分隔，
///    例如 `CANDLEWICK__BROKER__API_SECRET`。
/// 3. 反序列化后校验。
pub fn load(path: &str) -> Result<AppConfig, ConfigError> {
    from_source(File::with_name(path).required(true))
}

fn from_source<S>(file: S) -> Result<AppConfig, ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    let config: AppConfig = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("CANDLEWICK")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

/// # Summary
/// 校验配置的跨字段约束。
///
/// # Invariants
/// - 市场名称唯一且非空。
/// - 交易市场必须出现在 markets 中。
/// - 开仓比例在 (0, 1] 之间。
/// - Coinbase 市场的回看窗口 (含今天) 不超过单次请求的 K 线上限。
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.markets.is_empty() {
        return Err(ConfigError::Message("no markets configured".into()));
    }
    let mut seen = HashSet::new();
    for market in &config.markets {
        if market.name.is_empty() || !seen.insert(market.name.as_str()) {
            return Err(ConfigError::Message(format!(
                "market name must be unique and non-empty: {:?}",
                market.name
            )));
        }
        // 抓取区间为 [today - lookback_days, today]，共 lookback_days + 1 根
        if market.feed == FeedKind::Coinbase && market.lookback_days >= MAX_CANDLES_PER_REQUEST {
            return Err(ConfigError::Message(format!(
                "lookback_days for {} must be below {}, got {}",
                market.name, MAX_CANDLES_PER_REQUEST, market.lookback_days
            )));
        }
    }
    if config.market(&config.trading.market).is_none() {
        return Err(ConfigError::Message(format!(
            "trading market {} is not in markets",
            config.trading.market
        )));
    }
    let fraction = config.trading.position_fraction;
    if fraction <= rust_decimal::Decimal::ZERO || fraction > rust_decimal::Decimal::ONE {
        return Err(ConfigError::Message(format!(
            "position_fraction must be in (0, 1], got {}",
            fraction
        )));
    }
    Ok(())
}

/// # Summary
/// 初始化全局日志：标准输出，外加可选的按天滚动文件。
///
/// # Returns
/// 写文件时返回后台写线程的守卫，调用方需持有到进程退出。
pub fn init_tracing(
    logging: &LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?;

    let (file_layer, guard) = match &logging.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "candlewick.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlewick_core::config::BrokerKind;
    use config::FileFormat;

    const SAMPLE: &str = include_str!("../../../config/candlewick.yaml");

    fn parse(yaml: &str) -> Result<AppConfig, ConfigError> {
        from_source(File::from_str(yaml, FileFormat::Yaml))
    }

    #[test]
    fn test_sample_config_loads() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.trading.market, "btc");
        assert_eq!(config.broker.kind, BrokerKind::Paper);
        assert!(config.broker.dry_run);

        let spy = config.market("spy").unwrap();
        assert_eq!(spy.feed, FeedKind::Yahoo);
        assert!(spy.gap_fill);
        assert_eq!(spy.zone.name(), "America/New_York");
        assert_eq!(config.market("btc").unwrap().zone.name(), "UTC");
    }

    #[test]
    fn test_unknown_trading_market_is_rejected() {
        let yaml = SAMPLE.replace("market: btc", "market: doge");
        assert!(matches!(parse(&yaml), Err(ConfigError::Message(m)) if m.contains("doge")));
    }

    #[test]
    fn test_duplicate_market_is_rejected() {
        let mut config = AppConfig::default();
        let dup = config.markets[0].clone();
        config.markets.push(dup);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_position_fraction_bounds() {
        let mut config = AppConfig::default();
        assert!(validate(&config).is_ok());
        config.trading.position_fraction = rust_decimal::Decimal::new(15, 1);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_coinbase_lookback_is_capped() {
        let mut config = AppConfig::default();
        config.markets[0].lookback_days = 299;
        assert!(validate(&config).is_ok());

        config.markets[0].lookback_days = 300;
        assert!(matches!(validate(&config), Err(ConfigError::Message(m)) if m.contains("btc")));

        // Yahoo 图表接口一次返回整个区间，不受此限制
        let yaml = SAMPLE.replace("lookback_days: 21", "lookback_days: 400");
        assert_eq!(parse(&yaml).unwrap().market("spy").unwrap().lookback_days, 400);
    }

    #[test]
    fn test_invalid_zone_fails_to_load() {
        let yaml = SAMPLE.replace("America/New_York", "Mars/Olympus");
        assert!(parse(&yaml).is_err());
    }
}
