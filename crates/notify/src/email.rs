use async_trait::async_trait;
use candlewick_core::config::EmailConfig;
use candlewick_core::notify::error::NotifyError;
use candlewick_core::notify::port::Notifier;
use lettre::message::{Mailbox, Mailboxes, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::info;

/// # Summary
/// 通过 SMTP 发送运行摘要与失败告警的通知实现。
///
/// # Invariants
/// - 发件人与收件人地址在构造时校验，运行期不再因地址格式失败。
/// - `AsyncSmtpTransport` 在多次通知之间复用。
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    // 收件人列表，配置中以逗号分隔
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// # Summary
    /// 根据邮件配置创建 `EmailNotifier`。
    ///
    /// # Logic
    /// 1. 解析发件人与 (逗号分隔的) 收件人列表。
    /// 2. 配置 587 端口 STARTTLS 中继并附带认证信息。
    ///
    /// # Returns
    /// * 地址非法或主机无效时返回 `NotifyError::Config`。
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let (from, to) = parse_addresses(&config.from, &config.to)?;
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotifyError::Config(format!("Invalid SMTP host: {}", e)))?
            .credentials(creds)
            .build();

        Ok(Self { mailer, from, to })
    }
}

fn parse_addresses(from: &str, to: &str) -> Result<(Mailbox, Vec<Mailbox>), NotifyError> {
    let from: Mailbox = from
        .parse()
        .map_err(|e| NotifyError::Config(format!("Invalid from address: {}", e)))?;
    let to: Mailboxes = to
        .parse()
        .map_err(|e| NotifyError::Config(format!("Invalid to address: {}", e)))?;
    let to: Vec<Mailbox> = to.into_iter().collect();
    if to.is_empty() {
        return Err(NotifyError::Config("No recipients configured".into()));
    }
    Ok((from, to))
}

/// # Summary
/// 构造纯文本邮件。
fn build_message(
    from: &Mailbox,
    to: &[Mailbox],
    subject: &str,
    content: &str,
) -> Result<Message, NotifyError> {
    let builder = to.iter().fold(
        Message::builder().from(from.clone()).subject(subject),
        |b, mailbox| b.to(mailbox.clone()),
    );
    builder
        .header(ContentType::TEXT_PLAIN)
        .body(content.to_string())
        .map_err(|e| NotifyError::Message(format!("Failed to build email: {}", e)))
}

#[async_trait]
impl Notifier for EmailNotifier {
    /// # Summary
    /// 发送一封通知邮件。
    ///
    /// # Returns
    /// * SMTP 传输失败返回 `NotifyError::Network`。
    async fn notify(&self, subject: &str, content: &str) -> Result<(), NotifyError> {
        let email = build_message(&self.from, &self.to, subject, content)?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Network(format!("SMTP error: {}", e)))?;

        info!(subject, recipients = self.to.len(), "notification email sent");
        Ok(())
    }
}
