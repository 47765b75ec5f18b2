use async_trait::async_trait;
use chrono::Local;
use imap::ClientBuilder;
use shared_types::{MessageRef, RawMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{parse_message, MailError, MailQuery, MailSource};
use crate::config::ImapConfig;

type ImapSession = imap::Session<imap::Connection>;

/// Mail source over an IMAP mailbox with password (or app-password) login.
///
/// `search` fetches the matching messages in one round trip and caches them,
/// so `get_content` usually does not reconnect.
pub struct ImapMailSource {
    config: ImapConfig,
    max_messages: usize,
    cache: Arc<Mutex<HashMap<String, RawMessage>>>,
}

fn connect(config: &ImapConfig) -> Result<ImapSession, MailError> {
    let client = ClientBuilder::new(config.host.as_str(), config.port)
        .connect()
        .map_err(|e| MailError::Imap(format!("Failed to connect to IMAP server: {e}")))?;

    let mut session = client
        .login(&config.username, &config.password)
        .map_err(|(e, _)| MailError::Imap(format!("IMAP login failed: {e}")))?;

    session
        .select(&config.mailbox)
        .map_err(|e| MailError::Imap(format!("Failed to select {}: {e}", config.mailbox)))?;

    Ok(session)
}

/// Fetches `RFC822` for the given UIDs and parses each message.
fn fetch_messages(session: &mut ImapSession, uids: &[u32]) -> Result<Vec<(u32, RawMessage)>, MailError> {
    if uids.is_empty() {
        return Ok(Vec::new());
    }
    let sequence = uids
        .iter()
        .map(|uid| uid.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let fetches = session
        .uid_fetch(sequence, "RFC822")
        .map_err(|e| MailError::Imap(format!("UID FETCH failed: {e}")))?;

    let mut messages = Vec::new();
    for fetch in fetches.iter() {
        let (Some(uid), Some(body)) = (fetch.uid, fetch.body()) else {
            continue;
        };
        match parse_message(body, &uid.to_string()) {
            Ok(message) => messages.push((uid, message)),
            Err(e) => tracing::warn!(uid, error = %e, "Skipping unparseable IMAP message"),
        }
    }
    Ok(messages)
}

impl ImapMailSource {
    pub fn new(config: ImapConfig, max_messages: usize) -> Self {
        Self {
            config,
            max_messages,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn cache_messages(&self, messages: &[RawMessage]) {
        if let Ok(mut cache) = self.cache.lock() {
            for message in messages {
                cache.insert(message.id.clone(), message.clone());
            }
        }
    }

    fn cached(&self, id: &str) -> Option<RawMessage> {
        self.cache.lock().ok().and_then(|cache| cache.get(id).cloned())
    }
}

#[async_trait]
impl MailSource for ImapMailSource {
    async fn search(&self, query: &MailQuery) -> Result<Vec<MessageRef>, MailError> {
        let criteria = query.imap_criteria(Local::now().date_naive());
        let config = self.config.clone();
        let limit = self.max_messages;

        tracing::info!("IMAP SEARCH query: {}", criteria);

        let messages = tokio::task::spawn_blocking(move || -> Result<Vec<RawMessage>, MailError> {
            let mut session = connect(&config)?;
            let found = session
                .uid_search(&criteria)
                .map_err(|e| MailError::Imap(format!("UID SEARCH failed: {e}")))?;

            // Newest first, capped
            let mut uids: Vec<u32> = found.into_iter().collect();
            uids.sort_unstable_by(|a, b| b.cmp(a));
            uids.truncate(limit);

            let fetched = fetch_messages(&mut session, &uids)?;
            let _ = session.logout();
            Ok(fetched.into_iter().map(|(_, message)| message).collect())
        })
        .await??;

        // Servers differ in how they apply SUBJECT/TEXT; re-check locally
        let today = Local::now().date_naive();
        let matching: Vec<RawMessage> = messages
            .into_iter()
            .filter(|message| query.matches(message, today))
            .collect();
        self.cache_messages(&matching);

        Ok(matching
            .into_iter()
            .map(|message| MessageRef {
                id: message.id,
                thread_id: message.thread_id,
            })
            .collect())
    }

    async fn get_content(&self, id: &str) -> Result<RawMessage, MailError> {
        if let Some(message) = self.cached(id) {
            return Ok(message);
        }

        let config = self.config.clone();
        let wanted = id.to_string();
        let message = tokio::task::spawn_blocking(move || -> Result<Option<RawMessage>, MailError> {
            let mut session = connect(&config)?;
            let criteria = format!("HEADER Message-ID \"{}\"", wanted.replace('"', ""));
            let uids: Vec<u32> = session
                .uid_search(&criteria)
                .map_err(|e| MailError::Imap(format!("UID SEARCH failed: {e}")))?
                .into_iter()
                .collect();
            let fetched = fetch_messages(&mut session, &uids)?;
            let _ = session.logout();
            Ok(fetched.into_iter().map(|(_, message)| message).next())
        })
        .await??;

        let message = message.ok_or_else(|| MailError::NotFound(id.to_string()))?;
        self.cache_messages(std::slice::from_ref(&message));
        Ok(message)
    }
}
