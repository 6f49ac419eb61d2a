use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart};
use lettre::Message;
use serde_json::json;
use sheetmail_types::{ComposedMessage, Result, SheetMailError};

use crate::http::{endpoint, GoogleHttp};
use crate::{CredentialProvider, MailGateway};

/// Gmail v1 adapter sending as the authenticated user.
#[derive(Clone)]
pub struct GmailClient {
    http: GoogleHttp,
    base_url: String,
    from: String,
}

impl GmailClient {
    /// `from` must be the authenticated account (or one of its aliases);
    /// Gmail rewrites anything else.
    pub fn new(credentials: Arc<dyn CredentialProvider>, from: impl Into<String>) -> Self {
        Self {
            http: GoogleHttp::new("gmail", credentials),
            base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
            from: from.into(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

fn send_error(message: impl std::fmt::Display) -> SheetMailError {
    SheetMailError::SendError {
        message: message.to_string(),
    }
}

/// Render `message` as an RFC 5322 `multipart/mixed` mail: a
/// `multipart/alternative` text/html body followed by one part per attachment.
pub fn render_message(from: &str, message: &ComposedMessage) -> Result<Vec<u8>> {
    let from: Mailbox = from
        .parse()
        .map_err(|e| send_error(format!("Invalid from address '{from}': {e}")))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| send_error(format!("Invalid to address '{}': {e}", message.to)))?;

    let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
        message.text.clone(),
        message.html.clone(),
    ));
    for attachment in &message.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .or_else(|_| ContentType::parse("application/octet-stream"))
            .map_err(send_error)?;
        body = body.singlepart(
            MailAttachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), content_type),
        );
    }

    let email = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .multipart(body)
        .map_err(|e| send_error(format!("Failed to build email: {e}")))?;
    Ok(email.formatted())
}

#[async_trait]
impl MailGateway for GmailClient {
    async fn send(&self, message: &ComposedMessage) -> Result<()> {
        let rendered = render_message(&self.from, message)?;
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&rendered);
        let url = endpoint(&self.base_url, &["users", "me", "messages", "send"])?;

        let json = self
            .http
            .json(self.http.client().post(url).json(&json!({ "raw": raw })))
            .await
            .map_err(|e| match e {
                SheetMailError::AuthError { .. } => e,
                other => send_error(other),
            })?;

        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            id = json["id"].as_str().unwrap_or_default(),
            "Mail sent"
        );
        Ok(())
    }
}
