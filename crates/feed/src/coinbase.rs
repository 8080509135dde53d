use crate::http;
use async_trait::async_trait;
use candlewick_core::common::FeedZone;
use candlewick_core::market::error::FeedError;
use candlewick_core::market::port::MarketDataFeed;
use candlewick_core::series::entity::CandleRecord;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Number;
use tracing::debug;

const COINBASE_URL: &str = "https://api.exchange.coinbase.com";

// 日线粒度 (秒)
const DAILY_GRANULARITY: &str = "86400";

/// 单次请求最多返回的 K 线数量，超出的区间会被接口拒绝
pub const MAX_CANDLES_PER_REQUEST: u32 = 300;

/// # Summary
/// Coinbase Exchange 日线行情源 (加密货币，7x24 不休市)。
///
/// # Invariants
/// - K 线按 UTC 零点切分，日期使用 UTC。
/// - 接口按时间倒序返回，本实现统一转换为正序。
#[derive(Clone)]
pub struct CoinbaseFeed {
    client: Client,
    base_url: String,
}

impl CoinbaseFeed {
    pub fn new() -> Result<Self, FeedError> {
        Self::with_base_url(COINBASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, FeedError> {
        Ok(Self {
            client: http::client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Deserialize, Debug)]
struct CoinbaseMessage {
    message: String,
}

/// # Summary
/// 解析 candles 接口的响应正文。
///
/// # Logic
/// 1. 每一行的格式为 `[time, low, high, open, close, volume]`。
/// 2. 字段数不足的行视为解析错误。
/// 3. 结果按日期升序返回。
pub fn parse_candles(body: &str) -> Result<Vec<CandleRecord>, FeedError> {
    let rows: Vec<Vec<Number>> =
        serde_json::from_str(body).map_err(|e| FeedError::Parse(e.to_string()))?;

    let mut records = rows
        .iter()
        .map(|row| {
            let [time, low, high, open, close, volume] = row.as_slice() else {
                return Err(FeedError::Parse(format!(
                    "Expected 6 fields per candle, got {}",
                    row.len()
                )));
            };
            let start = time
                .as_i64()
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
                .ok_or_else(|| FeedError::Parse(format!("Invalid candle time {}", time)))?;

            Ok(CandleRecord::at_instant(
                start,
                FeedZone::UTC,
                http::decimal(open)?,
                http::decimal(high)?,
                http::decimal(low)?,
                http::decimal(close)?,
                http::decimal(volume)?,
            ))
        })
        .collect::<Result<Vec<_>, FeedError>>()?;

    records.sort_by_key(|r| r.date);
    Ok(records)
}

fn iso_midnight(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl MarketDataFeed for CoinbaseFeed {
    /// # Summary
    /// 抓取 `[start, end]` 区间内的日线。
    ///
    /// # Logic
    /// 1. `end` 参数取结束日期的次日零点，保证结束日期当天的 K 线被包含。
    /// 2. 非 2xx 响应尝试读取 `message` 字段作为错误描述。
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CandleRecord>, FeedError> {
        let end_exclusive = end.checked_add_days(Days::new(1)).unwrap_or(end);
        let url = format!("{}/products/{}/candles", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("granularity", DAILY_GRANULARITY.to_string()),
                ("start", iso_midnight(start)),
                ("end", iso_midnight(end_exclusive)),
            ])
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound(symbol.to_string()));
        }
        if !status.is_success() {
            let reason = serde_json::from_str::<CoinbaseMessage>(&body)
                .map(|m| m.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            return Err(FeedError::Provider(reason));
        }

        let records = parse_candles(&body)?;
        debug!(symbol, count = records.len(), "fetched coinbase candles");
        Ok(records)
    }
}
