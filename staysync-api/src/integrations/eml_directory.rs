use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use shared_types::{MessageRef, RawMessage};
use std::path::{Path, PathBuf};

use super::{parse_message, MailError, MailQuery, MailSource};

/// Mail source over a directory of exported `.eml` files.
pub struct EmlDirectorySource {
    messages: Vec<RawMessage>,
    today: Option<NaiveDate>,
}

impl EmlDirectorySource {
    /// Reads and parses every `*.eml` file in `dir`. Files that fail to
    /// parse are logged and left out.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, MailError> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
            })
            .collect();
        paths.sort();

        let mut messages = Vec::with_capacity(paths.len());
        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let bytes = std::fs::read(&path)?;
            match parse_message(&bytes, &stem) {
                Ok(message) => messages.push(message),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable .eml file"),
            }
        }

        tracing::info!(dir = %dir.display(), count = messages.len(), "Loaded .eml messages");
        Ok(Self {
            messages,
            today: None,
        })
    }

    /// Pins the date recency windows are measured from.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

#[async_trait]
impl MailSource for EmlDirectorySource {
    async fn search(&self, query: &MailQuery) -> Result<Vec<MessageRef>, MailError> {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        Ok(self
            .messages
            .iter()
            .filter(|message| query.matches(message, today))
            .map(|message| MessageRef {
                id: message.id.clone(),
                thread_id: message.thread_id.clone(),
            })
            .collect())
    }

    async fn get_content(&self, id: &str) -> Result<RawMessage, MailError> {
        self.messages
            .iter()
            .find(|message| message.id == id)
            .cloned()
            .ok_or_else(|| MailError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::test_support::eml;

    #[tokio::test]
    async fn test_directory_search_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.eml"),
            eml(
                "a@airbnb.com",
                "Airbnb <automated@airbnb.com>",
                "Reservation confirmed - Maria Lopez arrives Sep 4",
                "Fri, 01 Aug 2025 09:15:00 -0700",
                "Confirmation code HMABC12345",
            ),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.eml"),
            eml(
                "b@lodgify.com",
                "Lodgify <bookings@lodgify.com>",
                "New Confirmed Booking: Sarai (3 Nights, Arrival: Oct 24 2025) - #B16138101",
                "Sat, 02 Aug 2025 10:00:00 +0000",
                "Booking details",
            ),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not mail").unwrap();

        let source = EmlDirectorySource::open(dir.path())
            .unwrap()
            .with_today(NaiveDate::from_ymd_opt(2025, 8, 10).unwrap());

        let query = MailQuery::parse(r#"subject:"Reservation confirmed" newer_than:30d"#).unwrap();
        let hits = source.search(&query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a@airbnb.com");

        assert!(matches!(
            source.get_content("notes").await,
            Err(MailError::NotFound(_))
        ));
        let message = source.get_content("b@lodgify.com").await.unwrap();
        assert!(message.subject.starts_with("New Confirmed Booking"));
        assert!(matches!(
            source.get_content("missing").await,
            Err(MailError::NotFound(_))
        ));
    }
}
