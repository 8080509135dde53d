use crate::http;
use async_trait::async_trait;
use candlewick_core::common::FeedZone;
use candlewick_core::market::error::FeedError;
use candlewick_core::market::port::MarketDataFeed;
use candlewick_core::series::entity::CandleRecord;
use chrono::{DateTime, Days, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Number;
use tracing::{debug, warn};

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// # Summary
/// Yahoo Finance 日线行情源。
///
/// # Invariants
/// - 日期按响应中交易所的时区截断。
/// - 只返回交易日，周末与节假日需要由对账流程前向填充。
#[derive(Clone)]
pub struct YahooFeed {
    client: Client,
    base_url: String,
}

impl YahooFeed {
    /// # Summary
    /// 创建使用官方接口地址的 YahooFeed。
    ///
    /// # Returns
    /// HTTP 客户端初始化失败时返回 `FeedError::Network`。
    pub fn new() -> Result<Self, FeedError> {
        Self::with_base_url(YAHOO_CHART_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, FeedError> {
        Ok(Self {
            client: http::client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    description: String,
}

#[derive(Deserialize, Debug)]
struct YahooResult {
    meta: YahooMeta,
    // 没有任何成交的区间会缺失该字段
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    exchange_timezone_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

/// # Summary
/// Yahoo API 原始报价数据，各列表按下标与 `timestamp` 对齐。
#[derive(Deserialize, Debug)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<Number>>,
    #[serde(default)]
    high: Vec<Option<Number>>,
    #[serde(default)]
    low: Vec<Option<Number>>,
    #[serde(default)]
    close: Vec<Option<Number>>,
    #[serde(default)]
    volume: Vec<Option<Number>>,
}

fn column(values: &[Option<Number>], i: usize) -> Option<&Number> {
    values.get(i).and_then(|v| v.as_ref())
}

/// # Summary
/// 解析 chart 接口的响应正文。
///
/// # Logic
/// 1. 接口返回业务错误时转换为 `FeedError::Provider`。
/// 2. 读取交易所时区，无法识别时退回 UTC。
/// 3. 逐个时间戳组装记录，任一字段为 null 的行直接丢弃 (停牌或盘中未结算)。
///
/// # Arguments
/// * `symbol`: 标的代码，仅用于错误信息。
/// * `body`: 响应正文。
///
/// # Returns
/// 按时间戳顺序排列的日线记录。
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<CandleRecord>, FeedError> {
    let json: YahooResponse =
        serde_json::from_str(body).map_err(|e| FeedError::Parse(e.to_string()))?;

    if let Some(err) = json.chart.error {
        return Err(FeedError::Provider(err.description));
    }

    let result = json
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| FeedError::NotFound(symbol.to_string()))?;

    let zone = match result.meta.exchange_timezone_name.as_deref() {
        Some(name) => name.parse::<FeedZone>().unwrap_or_else(|e| {
            warn!(symbol, zone = name, error = %e, "unknown exchange timezone, falling back to UTC");
            FeedZone::UTC
        }),
        None => FeedZone::UTC,
    };

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| FeedError::Parse("No quote data".into()))?;

    let mut records = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(o), Some(h), Some(l), Some(c), Some(v)) = (
            column(&quote.open, i),
            column(&quote.high, i),
            column(&quote.low, i),
            column(&quote.close, i),
            column(&quote.volume, i),
        ) else {
            debug!(symbol, ts, "dropping incomplete row");
            continue;
        };

        let start = DateTime::<Utc>::from_timestamp(ts, 0)
            .ok_or_else(|| FeedError::Parse(format!("Invalid timestamp {}", ts)))?;

        records.push(CandleRecord::at_instant(
            start,
            zone,
            http::decimal(o)?,
            http::decimal(h)?,
            http::decimal(l)?,
            http::decimal(c)?,
            http::decimal(v)?,
        ));
    }

    Ok(records)
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

#[async_trait]
impl MarketDataFeed for YahooFeed {
    /// # Summary
    /// 从 Yahoo Finance 抓取日线历史数据。
    ///
    /// # Logic
    /// 1. `period1` 取开始日期零点，`period2` 取结束日期次日零点，保证结束日期被包含。
    /// 2. 发起请求并解析嵌套的 JSON 数据。
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CandleRecord>, FeedError> {
        let period2 = end.checked_add_days(Days::new(1)).unwrap_or(end);
        let url = format!("{}/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", unix_midnight(start).to_string()),
                ("period2", unix_midnight(period2).to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FeedError::NotFound(symbol.to_string()));
        }
        if !resp.status().is_success() {
            return Err(FeedError::Network(format!("HTTP {}", resp.status())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;
        let records = parse_chart(symbol, &body)?;
        debug!(symbol, count = records.len(), "fetched yahoo candles");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "TBT", "exchangeTimezoneName": "America/New_York"},
                "timestamp": [1686317400, 1686576600, 1686663000],
                "indicators": {
                    "quote": [{
                        "open":   [20.1, 20.4, null],
                        "high":   [20.5, 20.9, 21.0],
                        "low":    [19.9, 20.2, 20.6],
                        "close":  [20.3, 20.84, 20.7],
                        "volume": [120000, 98000, 87000]
                    }],
                    "adjclose": [{"adjclose": [20.3, 20.84, 20.7]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_drops_null_rows_and_uses_exchange_date() {
        let records = parse_chart("TBT", CHART).unwrap();
        assert_eq!(records.len(), 2);
        // 2023-06-09 13:30 UTC 开盘，纽约时间仍是 06-09
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2023, 6, 9).unwrap());
        assert_eq!(records[0].close, dec!(20.3));
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2023, 6, 12).unwrap());
        assert_eq!(records[1].close, dec!(20.84));
        assert_eq!(records[1].volume, dec!(98000));
    }

    #[test]
    fn test_parse_chart_provider_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse_chart("ZZZZ", body), Err(FeedError::Provider(_))));
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart("TBT", body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_chart_rejects_garbage() {
        assert!(matches!(parse_chart("TBT", "<html>"), Err(FeedError::Parse(_))));
    }
}
