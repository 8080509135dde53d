use candlewick_core::market::error::FeedError;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// # Summary
/// 构建行情源共用的 HTTP 客户端。
///
/// # Logic
/// 1. 配置 10 秒超时。
/// 2. 设置浏览器 User-Agent，部分数据源会拒绝没有 UA 的请求。
///
/// # Returns
/// 客户端构建失败时返回 `FeedError::Network`。
pub fn client() -> Result<Client, FeedError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));

    Client::builder()
        .timeout(Duration::from_secs(10))
        .default_headers(headers)
        .build()
        .map_err(|e| FeedError::Network(e.to_string()))
}

/// # Summary
/// 把 JSON 数值转换为十进制定点数。
///
/// # Logic
/// `serde_json::Number` 的文本形式是最短的往返表示 (例如 `225.04`)，
/// 直接按十进制解析即可避免二进制浮点带来的尾数；科学计数法单独处理。
pub fn decimal(number: &serde_json::Number) -> Result<Decimal, FeedError> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(|d| d.normalize())
        .map_err(|e| FeedError::Parse(format!("{}: {}", text, e)))
}
