use regex::Regex;
use shared_types::RawMessage;
use std::sync::OnceLock;

use crate::booking_email::subject::{
    find_direct_reservation_number, find_intermediary_reservation_number, is_reply_or_forward,
};

/// Mailboxes that only ever send support or marketing mail.
const SUPPORT_LOCAL_PARTS: &[&str] = &[
    "support",
    "help",
    "community",
    "marketing",
    "news",
    "newsletter",
    "feedback",
];

const SUPPORT_SENDERS: &[&str] = &[
    "noreply@support.airbnb.com",
    "express@airbnb.com",
    "reviews@vrbo.com",
];

fn noise_subject_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            support\s+ticket | \bcase\s*\# | \[ticket | \bticket\s*\#
            | account\s+activity | new\s+(?:sign|log)-?\s*in | password | security\s+alert
            | verify\s+your | confirm\s+your\s+(?:email|account)
            | \breview\b | left\s+a\s+review
            | checked\s+(?:in|out) | check-?\s*(?:in|out)\s+(?:is\s+)?complete
            | \bpayout\b | payment\s+sent
            | cancel(?:l)?ed | cancellation
            | \binquiry\b | request\s+to\s+book | pre-?approv
            | sent\s+you\s+a\s+message | message\s+from
            | alteration | \baltered\b | newsletter | tips\s+for",
        )
        .expect("invalid noise subject regex")
    })
}

fn confirmation_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bconfirmed\b|instant\s+booking|\bconfirmation\b")
            .expect("invalid confirmation keyword regex")
    })
}

fn booking_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\breservation\b|\bbooking\b|\bbooked\b|\barrives\b")
            .expect("invalid booking keyword regex")
    })
}

fn reply_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*re\s*:").expect("invalid reply regex"))
}

/// Outcome of a single predicate in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseVerdict {
    pub skip: bool,
    pub reason: &'static str,
}

impl NoiseVerdict {
    fn keep() -> Self {
        Self {
            skip: false,
            reason: "",
        }
    }

    fn skip(reason: &'static str) -> Self {
        Self { skip: true, reason }
    }
}

type NoisePredicate = fn(&RawMessage) -> NoiseVerdict;

/// Short-circuiting chain of noise predicates, cheapest and most certain first.
pub struct NoiseFilter {
    predicates: Vec<(&'static str, NoisePredicate)>,
}

impl NoiseFilter {
    pub fn new() -> Self {
        Self {
            predicates: vec![
                ("support-sender", support_sender),
                ("noise-subject", noise_subject),
                ("reply-or-forward", reply_or_forward_without_booking),
                ("forwarded-reference", forwarded_reference_without_confirmation),
            ],
        }
    }

    /// First skip verdict in the chain, or `None` when the message passes.
    pub fn check(&self, message: &RawMessage) -> Option<&'static str> {
        for (name, predicate) in &self.predicates {
            let verdict = predicate(message);
            if verdict.skip {
                tracing::debug!(message_id = %message.id, predicate = *name, "Noise filter matched");
                return Some(verdict.reason);
            }
        }
        None
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn support_sender(message: &RawMessage) -> NoiseVerdict {
    let address = message.sender_address();
    if SUPPORT_SENDERS.contains(&address.as_str()) {
        return NoiseVerdict::skip("sender is a support address");
    }

    let local = address.split('@').next().unwrap_or_default();
    if SUPPORT_LOCAL_PARTS.contains(&local) {
        return NoiseVerdict::skip("sender is a support address");
    }
    NoiseVerdict::keep()
}

fn noise_subject(message: &RawMessage) -> NoiseVerdict {
    if noise_subject_re().is_match(&message.subject) {
        NoiseVerdict::skip("subject matches a non-booking pattern")
    } else {
        NoiseVerdict::keep()
    }
}

/// Replies are always conversation threads. Forwards pass only when they
/// still talk about a booking.
fn reply_or_forward_without_booking(message: &RawMessage) -> NoiseVerdict {
    let subject = &message.subject;
    if reply_prefix_re().is_match(subject) {
        return NoiseVerdict::skip("reply thread");
    }
    if is_reply_or_forward(subject) && !booking_keyword_re().is_match(subject) {
        return NoiseVerdict::skip("forward of a non-confirmation thread");
    }
    NoiseVerdict::keep()
}

fn forwarded_reference_without_confirmation(message: &RawMessage) -> NoiseVerdict {
    let subject = &message.subject;
    if !is_reply_or_forward(subject) || confirmation_keyword_re().is_match(subject) {
        return NoiseVerdict::keep();
    }

    let has_token = find_direct_reservation_number(subject).is_some()
        || find_intermediary_reservation_number(subject).is_some();
    if has_token {
        NoiseVerdict::skip("forwarded reservation reference without confirmation")
    } else {
        NoiseVerdict::keep()
    }
}
