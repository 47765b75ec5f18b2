use config::{Config, ConfigError, File};
use extractors::ReviewThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_MESSAGES: usize = 300;
pub const DEFAULT_NEWER_THAN_DAYS: u32 = 30;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiConfig {
    pub api_keys: Option<ApiKeysConfig>,
    pub llm: Option<LlmConfig>,
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub mail: MailConfig,
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub review: ReviewThresholds,
    pub cors: Option<CorsConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiKeysConfig {
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LlmConfig {
    pub model: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MailSourceKind {
    #[default]
    EmlDir,
    Imap,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub source: MailSourceKind,
    pub eml_dir: Option<String>,
    pub imap: Option<ImapConfig>,
    pub max_messages: usize,
    pub newer_than_days: u32,
    pub queries: MailQueries,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            source: MailSourceKind::EmlDir,
            eml_dir: None,
            imap: None,
            max_messages: DEFAULT_MAX_MESSAGES,
            newer_than_days: DEFAULT_NEWER_THAN_DAYS,
            queries: MailQueries::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImapConfig {
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
}

fn default_imap_port() -> u16 {
    993
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

/// Search strings per channel, in the mail query syntax
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MailQueries {
    pub airbnb: String,
    pub vrbo: String,
    pub lodgify: String,
}

impl Default for MailQueries {
    fn default() -> Self {
        Self {
            airbnb: r#"subject:"Reservation confirmed""#.to_string(),
            vrbo: r#"subject:"Instant Booking from""#.to_string(),
            lodgify: r#"subject:"New Confirmed Booking""#.to_string(),
        }
    }
}

impl MailQueries {
    /// Queries in processing order: canonical channel first.
    pub fn ordered(&self) -> Vec<&str> {
        vec![
            self.airbnb.as_str(),
            self.vrbo.as_str(),
            self.lodgify.as_str(),
        ]
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

const DEFAULT_CONFIG: &str = r#"
[api_keys]
# gemini_api_key = "your-gemini-key"

[llm]
# model = "gemini-2.0-flash"
# endpoint = "https://generativelanguage.googleapis.com/v1beta"

[database]
# path = "/path/to/staysync.sqlite"

[mail]
source = "eml_dir"
# eml_dir = "/path/to/exported/mail"
max_messages = 300
newer_than_days = 30

# [mail.imap]
# host = "imap.gmail.com"
# port = 993
# username = "host@example.com"
# password = "app-password"
# mailbox = "INBOX"

[mail.queries]
airbnb = 'subject:"Reservation confirmed"'
vrbo = 'subject:"Instant Booking from"'
lodgify = 'subject:"New Confirmed Booking"'

[catalog]
# path = "/path/to/properties.toml"

[review]
max_stay_nights = 60
manual_review_days_ahead = 180
suspect_year_offset = 2

[cors]
allowed_origins = ["http://localhost:3030"]

[server]
host = "127.0.0.1"
port = 8080
"#;

impl ApiConfig {
    /// Loads the config at `path`, or at the default location when `None`.
    /// The default location is seeded with a commented template on first run.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let config_path = get_config_path();
                ensure_default_config(&config_path)?;
                config_path
            }
        };

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .build()?;

        let config: ApiConfig = builder.try_deserialize()?;

        Ok((config, config_path))
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.api_keys
            .as_ref()
            .and_then(|keys| keys.gemini_api_key.as_deref())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn server_address(&self) -> (String, u16) {
        match &self.server {
            Some(server) => (server.host.clone(), server.port),
            None => ("127.0.0.1".to_string(), 8080),
        }
    }
}

fn ensure_default_config(config_path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::Message(format!("Failed to create config directory: {e}"))
        })?;
    }

    if !config_path.exists() {
        std::fs::write(config_path, DEFAULT_CONFIG).map_err(|e| {
            ConfigError::Message(format!("Failed to write default config: {e}"))
        })?;
    }
    Ok(())
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("staysync").join("api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.toml");
        std::fs::write(&path, DEFAULT_CONFIG).unwrap();

        let (config, _) = ApiConfig::load(Some(&path)).unwrap();
        assert_eq!(config.mail.source, MailSourceKind::EmlDir);
        assert_eq!(config.mail.max_messages, DEFAULT_MAX_MESSAGES);
        assert_eq!(config.review, ReviewThresholds::default());
        assert!(config.gemini_api_key().is_none());
        assert_eq!(config.server_address(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(
            config.mail.queries.ordered()[0],
            r#"subject:"Reservation confirmed""#
        );
    }

    #[test]
    fn test_sections_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.toml");
        std::fs::write(
            &path,
            r#"
[api_keys]
gemini_api_key = "abc"

[mail]
source = "imap"
newer_than_days = 7

[mail.imap]
host = "imap.example.com"
username = "host@example.com"
password = "secret"

[review]
manual_review_days_ahead = 330
"#,
        )
        .unwrap();

        let (config, _) = ApiConfig::load(Some(&path)).unwrap();
        assert_eq!(config.gemini_api_key(), Some("abc"));
        assert_eq!(config.mail.source, MailSourceKind::Imap);
        assert_eq!(config.mail.newer_than_days, 7);
        assert_eq!(config.mail.max_messages, DEFAULT_MAX_MESSAGES);
        let imap = config.mail.imap.unwrap();
        assert_eq!(imap.port, 993);
        assert_eq!(imap.mailbox, "INBOX");
        assert_eq!(config.review.manual_review_days_ahead, 330);
        assert_eq!(config.review.max_stay_nights, 60);
    }
}
