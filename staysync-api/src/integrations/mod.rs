pub mod eml_directory;
pub mod imap_client;
pub mod mail_query;

pub use eml_directory::EmlDirectorySource;
pub use imap_client::ImapMailSource;
pub use mail_query::MailQuery;

use async_trait::async_trait;
use mail_parser::MessageParser;
use shared_types::{MessageRef, RawMessage};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse message: {0}")]
    Parse(String),

    #[error("Invalid mail query: {0}")]
    Query(String),

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Message {0} not found")]
    NotFound(String),

    #[error("Mail task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Where booking mail comes from.
#[async_trait]
pub trait MailSource: Send + Sync {
    async fn search(&self, query: &MailQuery) -> Result<Vec<MessageRef>, MailError>;

    async fn get_content(&self, id: &str) -> Result<RawMessage, MailError>;
}

/// Parses an RFC 822 message. `fallback_id` is used when the message has
/// no `Message-ID` header.
pub fn parse_message(bytes: &[u8], fallback_id: &str) -> Result<RawMessage, MailError> {
    let parsed = MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| MailError::Parse(format!("{fallback_id}: not an RFC 822 message")))?;

    let from = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .map(|addr| match (addr.name(), addr.address()) {
            (Some(name), Some(address)) => format!("{name} <{address}>"),
            (None, Some(address)) => address.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => String::new(),
        })
        .unwrap_or_default();

    let body = parsed
        .body_text(0)
        .map(|s| s.to_string())
        .or_else(|| parsed.body_html(0).map(|s| s.to_string()))
        .unwrap_or_default();

    let id = parsed
        .message_id()
        .map(|s| s.to_string())
        .unwrap_or_else(|| fallback_id.to_string());

    let thread_id = parsed
        .references()
        .as_text_list()
        .and_then(|refs| refs.first().map(|r| r.to_string()))
        .or_else(|| parsed.in_reply_to().as_text().map(|s| s.to_string()));

    Ok(RawMessage {
        id,
        thread_id,
        from,
        subject: parsed.subject().map(|s| s.to_string()).unwrap_or_default(),
        body,
        date: parsed.date().map(|d| d.to_rfc3339()),
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::eml;
    use super::*;

    #[test]
    fn test_parse_message_headers_and_body() {
        let raw = eml(
            "abc@airbnb.com",
            "Airbnb <automated@airbnb.com>",
            "Reservation confirmed - Maria Lopez arrives Sep 4",
            "Fri, 01 Aug 2025 09:15:00 -0700",
            "Confirmation code\nHMABC12345",
        );
        let message = parse_message(raw.as_bytes(), "fallback").unwrap();

        assert_eq!(message.id, "abc@airbnb.com");
        assert_eq!(message.sender_domain().as_deref(), Some("airbnb.com"));
        assert_eq!(
            message.subject,
            "Reservation confirmed - Maria Lopez arrives Sep 4"
        );
        assert!(message.body.contains("HMABC12345"));
        assert!(message.date.is_some());
        assert!(message.thread_id.is_none());
    }
}
