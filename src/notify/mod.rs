//! Email delivery of the report workbook.
//!
//! Builds a plain-text message with an optional attachment and sends it
//! over SMTP with STARTTLS and login.

use crate::error::LipaError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

/// MIME type of xlsx attachments.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    /// Login user, also used as the sender address.
    pub sender: String,
    pub password: Option<String>,
}

/// A file attached to the message.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// An outbound message.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<EmailAttachment>,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, LipaError> {
    address.parse().map_err(|e: lettre::address::AddressError| LipaError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Build the MIME message without sending it.
pub fn build_message(sender: &str, email: &OutgoingEmail) -> Result<Message, LipaError> {
    let builder = Message::builder()
        .from(parse_mailbox(sender)?)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.clone());

    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));

    if let Some(attachment) = &email.attachment {
        let content_type = ContentType::parse(XLSX_CONTENT_TYPE)
            .map_err(|e| LipaError::Transmission(e.to_string()))?;
        parts = parts.singlepart(
            Attachment::new(attachment.filename.clone())
                .body(attachment.bytes.clone(), content_type),
        );
    }

    builder
        .multipart(parts)
        .map_err(|e| LipaError::Transmission(e.to_string()))
}

/// Sends messages through one SMTP relay.
pub struct Mailer {
    settings: SmtpSettings,
}

impl Mailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    /// Send one message. Any failure is reported once; there are no retries.
    pub fn send(&self, email: &OutgoingEmail) -> Result<(), LipaError> {
        let message = build_message(&self.settings.sender, email)?;

        let password = self.settings.password.clone().ok_or_else(|| {
            LipaError::Transmission("SMTP password is not configured".to_string())
        })?;

        debug!(
            "Connecting to {}:{} as {}",
            self.settings.server, self.settings.port, self.settings.sender
        );
        let transport = SmtpTransport::starttls_relay(&self.settings.server)
            .map_err(|e| LipaError::Transmission(e.to_string()))?
            .port(self.settings.port)
            .credentials(Credentials::new(self.settings.sender.clone(), password))
            .build();

        transport
            .send(&message)
            .map_err(|e| LipaError::Transmission(e.to_string()))?;

        info!("Email sent to {}", email.to);
        Ok(())
    }
}
