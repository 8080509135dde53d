use thiserror::Error;

/// # Summary
/// 行情抓取错误枚举，处理网络、解析及数据缺失等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 核心流程不做重试，错误直接上抛给调度层。
#[derive(Error, Debug)]
pub enum FeedError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 数据解析错误，如 JSON 格式不匹配或数值不是合法十进制
    #[error("Parse error: {0}")]
    Parse(String),
    // 请求的数据未找到 (404 或内容为空)
    #[error("No candles returned for {0}")]
    NotFound(String),
    // 数据源返回的业务错误
    #[error("Provider error: {0}")]
    Provider(String),
}
