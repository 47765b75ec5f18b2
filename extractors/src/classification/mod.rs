//! Platform classification and noise filtering for inbound mail.

mod noise;

pub use noise::{NoiseFilter, NoiseVerdict};

use regex::Regex;
use shared_types::{MailChannel, Platform, RawMessage};
use std::sync::OnceLock;

use crate::booking_email::subject::strip_reply_prefixes;

const SENDER_DOMAINS: &[(&str, MailChannel)] = &[
    ("airbnb.com", MailChannel::Airbnb),
    ("vrbo.com", MailChannel::Vrbo),
    ("homeaway.com", MailChannel::Vrbo),
    ("lodgify.com", MailChannel::Lodgify),
];

fn platform_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(airbnb|vrbo|homeaway|lodgify)\b").expect("invalid platform regex")
    })
}

fn domain_matches(domain: &str, known: &str) -> bool {
    domain == known || domain.ends_with(&format!(".{}", known))
}

/// Channel from the sender domain, then subject templates, then a platform
/// name mentioned in the subject.
pub fn classify_channel(from_domain: Option<&str>, subject: &str) -> MailChannel {
    if let Some(domain) = from_domain {
        let domain = domain.to_lowercase();
        if let Some((_, channel)) = SENDER_DOMAINS
            .iter()
            .find(|(known, _)| domain_matches(&domain, known))
        {
            return *channel;
        }
    }

    let subject = strip_reply_prefixes(subject).to_lowercase();
    if subject.contains("reservation confirmed") && subject.contains("arrives") {
        return MailChannel::Airbnb;
    }
    if subject.contains("new confirmed booking") {
        return MailChannel::Lodgify;
    }
    if subject.contains("instant booking from") {
        return MailChannel::Vrbo;
    }

    platform_mention_re()
        .captures(&subject)
        .map(|caps| MailChannel::from_label(&caps[1]))
        .unwrap_or(MailChannel::Unknown)
}

/// Booking platform behind a channel. The intermediary defaults to Vrbo
/// unless its text names another platform.
pub fn effective_platform(channel: MailChannel, subject: &str, body: &str) -> Platform {
    let mentions = |needle: &str| {
        subject.to_lowercase().contains(needle) || body.to_lowercase().contains(needle)
    };

    match channel {
        MailChannel::Airbnb => Platform::Airbnb,
        MailChannel::Vrbo => {
            if mentions("homeaway") && !mentions("vrbo") {
                Platform::HomeAway
            } else {
                Platform::Vrbo
            }
        }
        MailChannel::Lodgify => {
            if mentions("airbnb") {
                Platform::Airbnb
            } else if mentions("homeaway") {
                Platform::HomeAway
            } else {
                Platform::Vrbo
            }
        }
        MailChannel::Unknown => Platform::Unknown,
    }
}

/// Classifies a message into its mail channel and booking platform.
#[derive(Debug, Clone, Default)]
pub struct PlatformClassifier;

impl PlatformClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, message: &RawMessage) -> (MailChannel, Platform) {
        let domain = message.sender_domain();
        let channel = classify_channel(domain.as_deref(), &message.subject);
        let platform = effective_platform(channel, &message.subject, &message.body);
        (channel, platform)
    }
}
