use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The mail channel a booking email arrived through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum MailChannel {
    Airbnb,
    Vrbo,
    /// Forwarding service that re-sends confirmations on behalf of another platform
    Lodgify,
    #[default]
    Unknown,
}

impl MailChannel {
    pub fn is_intermediary(self) -> bool {
        matches!(self, MailChannel::Lodgify)
    }

    pub fn label(self) -> &'static str {
        match self {
            MailChannel::Airbnb => "Airbnb",
            MailChannel::Vrbo => "Vrbo",
            MailChannel::Lodgify => "Lodgify",
            MailChannel::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "airbnb" => MailChannel::Airbnb,
            "vrbo" | "homeaway" => MailChannel::Vrbo,
            "lodgify" => MailChannel::Lodgify,
            _ => MailChannel::Unknown,
        }
    }

    /// Canonical-channel mail sorts first so later intermediary copies can be suppressed.
    pub fn processing_rank(self) -> u8 {
        match self {
            MailChannel::Airbnb => 0,
            MailChannel::Vrbo => 1,
            MailChannel::Lodgify => 2,
            MailChannel::Unknown => 3,
        }
    }
}

/// The booking platform a reservation belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Airbnb,
    Vrbo,
    /// Legacy HomeAway mail, stored and billed as Vrbo
    HomeAway,
    #[default]
    Unknown,
}

impl Platform {
    /// Label written to the `platform` column. HomeAway collapses into Vrbo.
    pub fn storage_label(self) -> &'static str {
        match self {
            Platform::Airbnb => "Airbnb",
            Platform::Vrbo | Platform::HomeAway => "Vrbo",
            Platform::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "airbnb" => Platform::Airbnb,
            "vrbo" => Platform::Vrbo,
            "homeaway" | "home away" => Platform::HomeAway,
            _ => Platform::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Platform::Unknown)
    }

    pub fn is_canonical(self) -> bool {
        matches!(self, Platform::Airbnb)
    }

    /// Vrbo and HomeAway bill with the two-tier commission formula.
    pub fn uses_two_tier_fees(self) -> bool {
        matches!(self, Platform::Vrbo | Platform::HomeAway)
    }
}
