//! Outbound mail transport.
//!
//! [`Mailer`] is the seam between the engine and SMTP. Production code uses
//! [`SmtpMailer`], an implicit-TLS `lettre` transport; tests substitute a
//! recording fake.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::campaign::SmtpIdentity;
use crate::error::MailError;

/// How long one SMTP conversation may take.
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A file attached to every message of a campaign.
#[derive(Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("bytes", &self.content.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MailBody {
    Html(String),
    Text(String),
}

/// A fully rendered message ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: MailBody,
    pub attachment: Option<Attachment>,
}

impl OutboundEmail {
    /// Assemble the MIME message.
    pub fn to_message(&self) -> Result<Message, MailError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| MailError::Build(format!("from address: {e}")))?;
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|e| MailError::Build(format!("to address: {e}")))?;

        let builder = Message::builder().from(from).to(to).subject(&self.subject);

        let body = match &self.body {
            MailBody::Html(html) => SinglePart::html(html.clone()),
            MailBody::Text(text) => SinglePart::plain(text.clone()),
        };

        let message = match &self.attachment {
            None => builder.singlepart(body),
            Some(attachment) => {
                let content_type = ContentType::parse("application/pdf")
                    .map_err(|e| MailError::Build(e.to_string()))?;
                let part = MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type);
                builder.multipart(MultiPart::mixed().singlepart(body).singlepart(part))
            }
        };

        message.map_err(|e| MailError::Build(e.to_string()))
    }
}

/// Something that can deliver an [`OutboundEmail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// SMTP delivery through one sender identity.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
}

impl SmtpMailer {
    /// Build a transport for `identity`. No connection is made until the first send.
    pub fn new(identity: &SmtpIdentity, password: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&identity.server)
            .map_err(|e| MailError::Build(format!("smtp relay {}: {e}", identity.server)))?
            .port(identity.port)
            .credentials(Credentials::new(
                identity.username.clone(),
                password.to_string(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            server: identity.server.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = email.to_message()?;
        let response = self.transport.send(message).await.map_err(classify)?;
        debug!(
            server = %self.server,
            code = %response.code(),
            "smtp_message_accepted"
        );
        Ok(())
    }
}

/// Split SMTP failures into "server said no" and "could not talk to the server".
fn classify(err: lettre::transport::smtp::Error) -> MailError {
    if err.is_transient() || err.is_permanent() {
        MailError::Rejected(err.to_string())
    } else {
        MailError::Connection(err.to_string())
    }
}
