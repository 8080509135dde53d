use thiserror::Error;

/// # Summary
/// 通知服务错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 通知失败只记录日志，不影响交易运行本身的结果。
#[derive(Error, Debug)]
pub enum NotifyError {
    /// 网络连接或 SMTP 传输错误
    #[error("Network error: {0}")]
    Network(String),

    /// 配置错误 (如邮箱地址非法)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 邮件构建失败
    #[error("Message error: {0}")]
    Message(String),
}
