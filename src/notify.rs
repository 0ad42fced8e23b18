use lettre::message::header::ContentType;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::model::SmtpConfig;
use crate::error::{BackupError, Result};

pub trait Notifier: Send + Sync {
    fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Sends a notification, logging rather than returning any delivery failure.
pub fn notify(notifier: &dyn Notifier, subject: &str, body: &str) {
    if let Err(err) = notifier.send(subject, body) {
        eprintln!("{}", err);
        warn!(subject, error = %err, "notification not delivered");
    }
}

/// Prints `subject` and `body` to stderr and emails them.
pub fn report_failure(notifier: &dyn Notifier, subject: &str, body: &str) {
    eprintln!("{}", subject);
    eprintln!("{}", body);
    notify(notifier, subject, body);
}

/// Plain-text mail over unauthenticated SMTP relay.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|e| BackupError::Notify(format!("from address: {}", e)))?,
            )
            .to(self
                .config
                .to
                .parse()
                .map_err(|e| BackupError::Notify(format!("to address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| BackupError::Notify(format!("build message: {}", e)))?;

        let mailer = SmtpTransport::builder_dangerous(&self.config.host)
            .port(self.config.port.unwrap_or(25))
            .build();
        mailer
            .send(&email)
            .map_err(|e| BackupError::Notify(e.to_string()))?;
        info!(subject, to = %self.config.to, "notification sent");
        Ok(())
    }
}

/// Used when SMTP is not configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, subject: &str, _body: &str) -> Result<()> {
        info!(subject, "smtp not configured; notification skipped");
        Ok(())
    }
}

pub fn notifier_for(smtp: Option<&SmtpConfig>) -> Box<dyn Notifier> {
    match smtp {
        Some(config) => Box::new(SmtpNotifier::new(config.clone())),
        None => Box::new(NullNotifier),
    }
}
