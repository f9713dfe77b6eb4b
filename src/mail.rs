use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::{AppConfig, SmtpConfig, SmtpSecurity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from: &str, timeout: Duration) -> Result<Self> {
        let mut builder = match smtp.security {
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                .with_context(|| format!("invalid SMTP relay {}", smtp.host))?,
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                .with_context(|| format!("invalid SMTP relay {}", smtp.host))?,
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host),
        };
        builder = builder.port(smtp.port).timeout(Some(timeout));
        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = from
            .parse::<Mailbox>()
            .with_context(|| format!("MAIL_FROM `{from}` is not a valid mailbox"))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient `{}`", mail.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .context("failed to build message")?;
        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        info!(
            to = %mail.to,
            subject = %mail.subject,
            body_len = mail.body.len(),
            "mail transport not configured; message logged"
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(recipient.to_ascii_lowercase());
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let refused = self
            .failing
            .lock()
            .map_err(|_| anyhow!("mailer lock poisoned"))?
            .contains(&mail.to.to_ascii_lowercase());
        if refused {
            return Err(anyhow!("recipient {} refused", mail.to));
        }
        self.sent
            .lock()
            .map_err(|_| anyhow!("mailer lock poisoned"))?
            .push(mail);
        Ok(())
    }
}

pub fn build_mailer(config: &AppConfig) -> Result<Arc<dyn Mailer>> {
    match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "using SMTP mail transport");
            Ok(Arc::new(SmtpMailer::new(
                smtp,
                &config.mail_from,
                config.mail_timeout,
            )?))
        }
        None => Ok(Arc::new(LogMailer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            to: to.to_string(),
            subject: "Subject".to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn memory_mailer_records_and_refuses() {
        let mailer = MemoryMailer::new();
        mailer.fail_for("Broken@Example.com");

        mailer.send(mail("ok@example.com")).await.unwrap();
        assert!(mailer.send(mail("broken@example.com")).await.is_err());

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ok@example.com");
    }

    #[tokio::test]
    async fn smtp_mailer_rejects_invalid_sender() {
        let smtp = SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            security: SmtpSecurity::None,
            username: None,
            password: None,
        };
        assert!(SmtpMailer::new(&smtp, "not a mailbox", Duration::from_secs(1)).is_err());
        assert!(SmtpMailer::new(&smtp, "InternHub <no-reply@internhub.local>", Duration::from_secs(1)).is_ok());
    }
}
