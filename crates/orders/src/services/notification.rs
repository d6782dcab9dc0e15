//! Order status notifications.
//!
//! Delivery is best-effort: the [`NotificationDispatcher`] runs after the
//! status change has committed, bounds each attempt with a timeout, and logs
//! failures instead of returning them.

use std::future::Future;
use std::time::Duration;

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use stitchworks_core::{Email, OrderId, OrderStatus};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::Customer;

/// What a customer is told when their order changes status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotice {
    pub email: Email,
    pub name: String,
    pub order_id: OrderId,
    pub status: OrderStatus,
}

impl StatusNotice {
    /// Build a notice for `customer`.
    #[must_use]
    pub fn for_customer(customer: &Customer, order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            email: customer.email.clone(),
            name: customer.name.clone(),
            order_id,
            status,
        }
    }

    /// E-mail subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("Update on your order #{}", self.order_id)
    }

    /// Status as shown to customers, e.g. `SHIPPED`.
    #[must_use]
    pub fn status_label(&self) -> String {
        self.status.as_str().to_uppercase()
    }
}

/// Errors that can occur when delivering a notice.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// The delivery channel refused or is down.
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Delivers [`StatusNotice`]s.
pub trait Notifier: Send + Sync + 'static {
    /// Deliver one notice.
    fn notify(&self, notice: &StatusNotice) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

// =============================================================================
// E-mail
// =============================================================================

/// HTML template for order status email.
#[derive(Template)]
#[template(path = "email/order_status.html")]
struct OrderStatusEmailHtml<'a> {
    name: &'a str,
    order_id: OrderId,
    status: &'a str,
    shipped: bool,
    cancelled: bool,
}

/// Plain text template for order status email.
#[derive(Template)]
#[template(path = "email/order_status.txt")]
struct OrderStatusEmailText<'a> {
    name: &'a str,
    order_id: OrderId,
    status: &'a str,
    shipped: bool,
    cancelled: bool,
}

/// Sends notices as multipart e-mails over SMTP.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailNotifier {
    /// Create a notifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Render both bodies of a status e-mail as `(text, html)`.
    fn render(notice: &StatusNotice) -> Result<(String, String), NotifyError> {
        let status = notice.status_label();
        let shipped = notice.status == OrderStatus::Shipped;
        let cancelled = notice.status == OrderStatus::Cancelled;

        let text = OrderStatusEmailText {
            name: &notice.name,
            order_id: notice.order_id,
            status: &status,
            shipped,
            cancelled,
        }
        .render()?;
        let html = OrderStatusEmailHtml {
            name: &notice.name,
            order_id: notice.order_id,
            status: &status,
            shipped,
            cancelled,
        }
        .render()?;

        Ok((text, html))
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

impl Notifier for EmailNotifier {
    async fn notify(&self, notice: &StatusNotice) -> Result<(), NotifyError> {
        let (text, html) = Self::render(notice)?;
        self.send_multipart_email(notice.email.as_str(), &notice.subject(), text, html)
            .await
    }
}

// =============================================================================
// Log only
// =============================================================================

/// Records notices in the log. Used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, notice: &StatusNotice) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notice.email,
            order_id = %notice.order_id,
            status = %notice.status,
            subject = %notice.subject(),
            "Status notice (e-mail delivery disabled)"
        );
        Ok(())
    }
}

/// Notifier chosen from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredNotifier {
    Email(EmailNotifier),
    Log(LogNotifier),
}

impl ConfiguredNotifier {
    /// E-mail when SMTP is configured, log-only otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn from_config(email: Option<&EmailConfig>) -> Result<Self, NotifyError> {
        match email {
            Some(config) => Ok(Self::Email(EmailNotifier::new(config)?)),
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for ConfiguredNotifier {
    async fn notify(&self, notice: &StatusNotice) -> Result<(), NotifyError> {
        match self {
            Self::Email(notifier) => notifier.notify(notice).await,
            Self::Log(notifier) => notifier.notify(notice).await,
        }
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Fires notices after committed status changes and swallows failures.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher<N> {
    notifier: N,
    timeout: Duration,
}

impl<N: Notifier> NotificationDispatcher<N> {
    /// Wrap `notifier`, giving each attempt at most `timeout`.
    #[must_use]
    pub const fn new(notifier: N, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    /// The wrapped notifier.
    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Notify `customer` that `order_id` is now `status`.
    ///
    /// Returns whether the notice was delivered. Never fails.
    pub async fn dispatch(
        &self,
        customer: Option<&Customer>,
        order_id: OrderId,
        status: OrderStatus,
    ) -> bool {
        let Some(customer) = customer else {
            tracing::warn!(
                order_id = %order_id,
                status = %status,
                "Order customer not found, skipping status notice"
            );
            return false;
        };

        let notice = StatusNotice::for_customer(customer, order_id, status);
        match tokio::time::timeout(self.timeout, self.notifier.notify(&notice)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(
                    order_id = %order_id,
                    status = %status,
                    error = %e,
                    "Failed to deliver status notice"
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    order_id = %order_id,
                    status = %status,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Status notice timed out"
                );
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stitchworks_core::{CustomerId, Role};

    use super::*;

    fn notice(status: OrderStatus) -> StatusNotice {
        StatusNotice {
            email: Email::parse("ana@example.com").unwrap(),
            name: "Ana <Admin>".to_string(),
            order_id: OrderId::new(42),
            status,
        }
    }

    struct SlowNotifier;

    impl Notifier for SlowNotifier {
        async fn notify(&self, _notice: &StatusNotice) -> Result<(), NotifyError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    struct BrokenNotifier;

    impl Notifier for BrokenNotifier {
        async fn notify(&self, _notice: &StatusNotice) -> Result<(), NotifyError> {
            Err(NotifyError::Unavailable("relay down".to_string()))
        }
    }

    fn customer() -> Customer {
        Customer {
            id: CustomerId::new(1),
            email: Email::parse("ana@example.com").unwrap(),
            name: "Ana".to_string(),
            role: Role::Customer,
        }
    }

    #[test]
    fn test_subject_and_label() {
        let notice = notice(OrderStatus::Shipped);
        assert_eq!(notice.subject(), "Update on your order #42");
        assert_eq!(notice.status_label(), "SHIPPED");
    }

    #[test]
    fn test_render_escapes_html_only() {
        let (text, html) = EmailNotifier::render(&notice(OrderStatus::Shipped)).unwrap();
        assert!(text.contains("Hi Ana <Admin>,"));
        assert!(text.contains("#42"));
        assert!(text.contains("SHIPPED"));
        assert!(text.contains("on their way"));
        assert!(html.contains("Ana &#60;Admin&#62;") || html.contains("Ana &lt;Admin&gt;"));
        assert!(!html.contains("released"));
    }

    #[test]
    fn test_render_cancelled_message() {
        let (text, _) = EmailNotifier::render(&notice(OrderStatus::Cancelled)).unwrap();
        assert!(text.contains("CANCELLED"));
        assert!(text.contains("released"));
        assert!(!text.contains("on their way"));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.notify(&notice(OrderStatus::Paid)).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let dispatcher = NotificationDispatcher::new(BrokenNotifier, Duration::from_secs(1));
        let delivered = dispatcher
            .dispatch(Some(&customer()), OrderId::new(1), OrderStatus::Paid)
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_dispatch_times_out() {
        let dispatcher = NotificationDispatcher::new(SlowNotifier, Duration::from_millis(50));
        let delivered = dispatcher
            .dispatch(Some(&customer()), OrderId::new(1), OrderStatus::Paid)
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_dispatch_skips_missing_customer() {
        let dispatcher = NotificationDispatcher::new(LogNotifier, Duration::from_secs(1));
        assert!(
            !dispatcher
                .dispatch(None, OrderId::new(1), OrderStatus::Shipped)
                .await
        );
        assert!(
            dispatcher
                .dispatch(Some(&customer()), OrderId::new(1), OrderStatus::Shipped)
                .await
        );
    }

    #[test]
    fn test_from_config_without_smtp_logs() {
        assert!(matches!(
            ConfiguredNotifier::from_config(None).unwrap(),
            ConfiguredNotifier::Log(_)
        ));
    }
}
