//! Property catalog and the per-platform property normalizer.
//!
//! The catalog is read-only reference data built once at startup. It holds
//! free-text aliases (matched by case-insensitive containment, first match
//! wins) and platform property codes (matched exactly, leading `#` ignored).

use regex::Regex;
use serde::{Deserialize, Serialize};
use shared_types::{MailChannel, Platform};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::ExtractionError;

/// Property name written when nothing in the catalog matches.
pub const UNASSIGNED_PROPERTY: &str = "Unassigned";

const DEFAULT_CATALOG: &str = include_str!("default_catalog.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub alias: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCatalog {
    #[serde(default, rename = "alias")]
    aliases: Vec<AliasEntry>,
    #[serde(default, rename = "code")]
    codes: Vec<CodeEntry>,
}

fn code_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#?\b([A-Za-z0-9]{3,})\b").expect("invalid code token regex"))
}

fn strip_hash(code: &str) -> &str {
    code.trim().trim_start_matches('#').trim()
}

impl PropertyCatalog {
    pub fn new(aliases: Vec<AliasEntry>, codes: Vec<CodeEntry>) -> Result<Self, ExtractionError> {
        let catalog = Self { aliases, codes };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog bundled with the binary.
    pub fn builtin() -> Result<Self, ExtractionError> {
        Self::from_toml_str(DEFAULT_CATALOG)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ExtractionError> {
        let catalog: PropertyCatalog = toml::from_str(content)
            .map_err(|e| ExtractionError::ConfigError(format!("Invalid property catalog: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, ExtractionError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ExtractionError> {
        for entry in &self.aliases {
            if entry.alias.trim().is_empty() || entry.name.trim().is_empty() {
                return Err(ExtractionError::ConfigError(format!(
                    "Alias entry with empty alias or name: {:?}",
                    entry
                )));
            }
        }
        for entry in &self.codes {
            if strip_hash(&entry.code).is_empty() || entry.name.trim().is_empty() {
                return Err(ExtractionError::ConfigError(format!(
                    "Code entry with empty code or name: {:?}",
                    entry
                )));
            }
        }
        Ok(())
    }

    pub fn aliases(&self) -> &[AliasEntry] {
        &self.aliases
    }

    pub fn codes(&self) -> &[CodeEntry] {
        &self.codes
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty() && self.codes.is_empty()
    }

    /// Exact code match after stripping a leading `#` on both sides.
    pub fn lookup_code(&self, code: &str) -> Option<&str> {
        let wanted = strip_hash(code);
        self.codes
            .iter()
            .find(|entry| strip_hash(&entry.code).eq_ignore_ascii_case(wanted))
            .map(|entry| entry.name.as_str())
    }

    /// First alias contained in `text`, in catalog order.
    pub fn match_alias(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.aliases
            .iter()
            .find(|entry| haystack.contains(&entry.alias.trim().to_lowercase()))
            .map(|entry| entry.name.as_str())
    }

    /// Alias containment, then containment of any canonical name in the catalog.
    fn match_combined(&self, text: &str) -> Option<&str> {
        if let Some(name) = self.match_alias(text) {
            return Some(name);
        }
        let haystack = text.to_lowercase();
        self.codes
            .iter()
            .map(|entry| entry.name.as_str())
            .chain(self.aliases.iter().map(|entry| entry.name.as_str()))
            .find(|name| haystack.contains(&name.to_lowercase()))
    }

    /// Whole text as a code, then any code-shaped token inside it.
    fn match_code_in_text(&self, text: &str) -> Option<&str> {
        if let Some(name) = self.lookup_code(text) {
            return Some(name);
        }
        code_token_re()
            .captures_iter(text)
            .find_map(|caps| self.lookup_code(&caps[1]))
    }
}

/// Resolves raw property text to a canonical name. Always returns a name.
#[derive(Debug, Clone)]
pub struct PropertyNormalizer {
    catalog: PropertyCatalog,
}

impl PropertyNormalizer {
    pub fn new(catalog: PropertyCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PropertyCatalog {
        &self.catalog
    }

    pub fn normalize(&self, channel: MailChannel, platform: Platform, raw: Option<&str>) -> String {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return UNASSIGNED_PROPERTY.to_string();
        };

        let matched = if channel.is_intermediary() || platform.uses_two_tier_fees() {
            self.catalog
                .match_code_in_text(raw)
                .or_else(|| self.catalog.match_alias(raw))
        } else if platform == Platform::Airbnb {
            self.catalog.match_alias(raw)
        } else {
            self.catalog.match_combined(raw)
        };

        matched.unwrap_or(UNASSIGNED_PROPERTY).to_string()
    }
}
