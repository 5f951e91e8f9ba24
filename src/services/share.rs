//! Recommend a post by email
//!
//! A reader fills in their name and address, a recipient and an optional
//! comment; the recipient gets a plain-text mail linking to the post.
//! Delivery goes through a [`Mailer`]: SMTP when a host is configured,
//! otherwise the message is written to the log.

use crate::config::EmailConfig;
use crate::models::Post;
use crate::services::validation::{FieldErrors, EMAIL_MAX_LENGTH};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SHARE_NAME_MAX_LENGTH: usize = 25;

/// Share form as submitted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareForm {
    #[serde(default)]
    pub name: String,
    /// Sender's address
    #[serde(default)]
    pub email: String,
    /// Recipient's address
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareServiceError {
    #[error("Invalid form: {0}")]
    ValidationError(FieldErrors),

    #[error("Failed to send mail: {0}")]
    DeliveryError(String),
}

/// Outgoing mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Delivers through an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, config: &EmailConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(config.smtp_port);

        if let Some(username) = &config.smtp_username {
            let password = config.smtp_password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        let from = config
            .from_address
            .parse()
            .map_err(|e| anyhow!("Invalid from address {}: {}", config.from_address, e))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail
                .to
                .parse()
                .map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;
        Ok(())
    }
}

/// Writes mail to the log instead of sending it
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            "Outgoing mail (console delivery)\n{}",
            mail.body
        );
        Ok(())
    }
}

/// SMTP when a host is configured, console delivery otherwise
pub fn create_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    match config.smtp_host.as_deref().filter(|h| !h.trim().is_empty()) {
        Some(host) => {
            tracing::info!("Sending mail through SMTP relay {}:{}", host, config.smtp_port);
            Ok(Arc::new(SmtpMailer::new(host, config)?))
        }
        None => {
            tracing::info!("No SMTP host configured, mail will be logged");
            Ok(Arc::new(ConsoleMailer))
        }
    }
}

pub struct ShareService {
    mailer: Arc<dyn Mailer>,
}

impl ShareService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub fn validate(&self, form: &ShareForm) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.require("name", &form.name, Some(SHARE_NAME_MAX_LENGTH));
        for (field, value) in [("email", &form.email), ("to", &form.to)] {
            errors.require(field, value, Some(EMAIL_MAX_LENGTH));
            if !errors.has(field) {
                errors.require_email(field, value);
            }
        }
        errors
    }

    /// Validate the form and mail the recommendation for `post`.
    ///
    /// `post_url` is the absolute URL of the post.
    pub async fn share(
        &self,
        post: &Post,
        form: &ShareForm,
        post_url: &str,
    ) -> Result<OutgoingMail, ShareServiceError> {
        let errors = self.validate(form);
        if !errors.is_empty() {
            return Err(ShareServiceError::ValidationError(errors));
        }

        let mail = compose(post, form, post_url);
        if let Err(e) = self.mailer.send(&mail).await {
            tracing::error!("Failed to share post {} with {}: {:#}", post.id, mail.to, e);
            return Err(ShareServiceError::DeliveryError(e.to_string()));
        }

        tracing::info!("Post {} shared with {}", post.id, mail.to);
        Ok(mail)
    }
}

fn compose(post: &Post, form: &ShareForm, post_url: &str) -> OutgoingMail {
    let name = form.name.trim();
    OutgoingMail {
        to: form.to.trim().to_string(),
        subject: format!("{} recommends you read {}", name, post.title),
        body: format!(
            "Read {} at {}\n\n{}'s comments: {}",
            post.title,
            post_url,
            name,
            form.comments.trim()
        ),
    }
}
