use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 运行结果通知接口，每次调度结束后发送成功摘要或失败告警。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync`。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// 发送带有主题和正文的通知。
    ///
    /// # Arguments
    /// * `subject` - 通知主题。
    /// * `content` - 纯文本正文。
    ///
    /// # Returns
    /// * 成功返回 `Ok(())`，失败返回 `Err(NotifyError)`。
    async fn notify(&self, subject: &str, content: &str) -> Result<(), NotifyError>;
}
