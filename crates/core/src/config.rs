use crate::common::{FeedKind, FeedZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 全局应用配置，启动时构造一次并显式传给各组件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub markets: Vec<MarketProfile>,
    pub trading: TradingConfig,
    pub broker: BrokerConfig,
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub notify: Option<EmailConfig>,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    // 历史序列所在的存储桶
    pub bucket: String,
    // 本地文件存储的根目录
    pub data_dir: String,
}

/// # Summary
/// 单个被跟踪市场的对账参数，一个市场对应一个历史序列对象。
///
/// # Invariants
/// - `name` 在配置中唯一。
/// - `lookback_days` 应大于两次成功运行之间可能间隔的天数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketProfile {
    // 市场名称，同时作为预测程序的参数 (例如 btc)
    pub name: String,
    // 行情源侧的标的代码 (例如 BTC-USD)
    pub symbol: String,
    pub feed: FeedKind,
    // 历史序列的对象键
    pub blob_key: String,
    // 判断“今天”所使用的参考时区
    #[serde(default)]
    pub zone: FeedZone,
    // 行情源是否会缺失非交易日，需要前向填充
    #[serde(default)]
    pub gap_fill: bool,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_lookback_days() -> u32 {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    // 参与交易决策的市场名称，必须出现在 markets 中
    pub market: String,
    // 券商侧的交易对 (例如 BTCUSDT)
    pub order_symbol: String,
    // 交易对的基础资产 (例如 BTC)
    pub base_asset: String,
    // 开仓时使用的账户价值比例
    pub position_fraction: Decimal,
    // 下单数量保留的小数位
    pub lot_scale: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    Paper,
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub kind: BrokerKind,
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    pub quote_asset: String,
    // 只记录意图而不真正下单
    #[serde(default)]
    pub dry_run: bool,
    // 模拟账户的初始计价资产
    #[serde(default)]
    pub paper_cash: Decimal,
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
}

fn default_recv_window_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    // 写入序列快照供预测程序读取的目录
    pub work_dir: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    // SQLite 台账文件路径
    pub path: String,
}

/// # Summary
/// 日志配置。`RUST_LOG` 存在时优先于 `level`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    // 按天滚动的日志文件目录；为空时只输出到标准输出
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 按名称查找市场配置。
    pub fn market(&self, name: &str) -> Option<&MarketProfile> {
        self.markets.iter().find(|m| m.name == name)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                bucket: "candlewick".to_string(),
                data_dir: "data".to_string(),
            },
            markets: vec![
                MarketProfile {
                    name: "btc".to_string(),
                    symbol: "BTC-USD".to_string(),
                    feed: FeedKind::Coinbase,
                    blob_key: "data/btc.csv".to_string(),
                    zone: FeedZone::UTC,
                    gap_fill: false,
                    lookback_days: default_lookback_days(),
                },
                MarketProfile {
                    name: "eth".to_string(),
                    symbol: "ETH-USD".to_string(),
                    feed: FeedKind::Coinbase,
                    blob_key: "data/eth.csv".to_string(),
                    zone: FeedZone::UTC,
                    gap_fill: false,
                    lookback_days: default_lookback_days(),
                },
            ],
            trading: TradingConfig {
                market: "btc".to_string(),
                order_symbol: "BTCUSDT".to_string(),
                base_asset: "BTC".to_string(),
                position_fraction: Decimal::new(95, 2),
                lot_scale: 5,
            },
            broker: BrokerConfig {
                kind: BrokerKind::Paper,
                base_url: "https://api.binance.us".to_string(),
                api_key: String::new(),
                api_secret: String::new(),
                quote_asset: "USDT".to_string(),
                dry_run: true,
                paper_cash: Decimal::new(10_000, 0),
                recv_window_ms: default_recv_window_ms(),
            },
            predictor: PredictorConfig {
                program: "python".to_string(),
                args: vec!["mlcode/main.py".to_string()],
                work_dir: "/tmp/candlewick".to_string(),
                timeout_secs: 600,
            },
            notify: None,
            ledger: LedgerConfig {
                path: "data/ledger.db".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.storage.bucket, "candlewick");
        assert_eq!(config.markets.len(), 2);
        assert_eq!(config.trading.market, "btc");
        assert!(config.market("btc").is_some());
        assert!(config.market("doge").is_none());
        assert!(config.broker.dry_run);
    }

    #[test]
    fn test_market_profile_defaults_from_json() {
        let json = r#"{
            "name": "tbt",
            "symbol": "TBT",
            "feed": "yahoo",
            "blob_key": "data/tbt.csv",
            "zone": "America/Los_Angeles",
            "gap_fill": true
        }"#;
        let profile: MarketProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.feed, FeedKind::Yahoo);
        assert_eq!(profile.zone.name(), "America/Los_Angeles");
        assert!(profile.gap_fill);
        assert_eq!(profile.lookback_days, 14);
    }
}
