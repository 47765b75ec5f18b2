use regex::Regex;
use shared_types::{MailChannel, PartialDate};
use std::sync::OnceLock;

use super::date_parser::{find_dates, parse_date_text};

/// Fields recoverable from a subject line alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFields {
    pub guest_name: Option<String>,
    pub check_in: Option<PartialDate>,
    pub check_out: Option<PartialDate>,
    pub nights: Option<u32>,
    pub reservation_number: Option<String>,
    pub property_code: Option<String>,
}

impl SubjectFields {
    pub fn is_empty(&self) -> bool {
        *self == SubjectFields::default()
    }
}

fn reply_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(?:re|fwd?|fw)\s*:\s*").expect("invalid prefix regex"))
}

fn airbnb_confirmed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)reservation confirmed\s*[-–:]\s*(?P<name>.+?)\s+arrives\s+(?P<date>.+)$")
            .expect("invalid airbnb subject regex")
    })
}

fn lodgify_confirmed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)new confirmed booking:\s*(?P<name>[^(]+?)\s*\((?P<nights>\d+)\s+nights?,\s*arrival:\s*(?P<date>[^)]+)\)(?:\s*-\s*(?P<rest>.+))?",
        )
        .expect("invalid lodgify subject regex")
    })
}

fn vrbo_instant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)instant booking from\s+(?P<name>[^:]+?)\s*:\s*(?P<rest>.+)$")
            .expect("invalid vrbo subject regex")
    })
}

fn direct_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z0-9]{6,10}\b").expect("invalid reservation regex"))
}

fn intermediary_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(?#?\b([A-Z]\d{6,})\b\)?").expect("invalid intermediary reservation regex")
    })
}

fn property_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\d{4,})\b").expect("invalid property code regex"))
}

/// Removes any stack of `Re:` / `Fwd:` / `Fw:` prefixes.
pub fn strip_reply_prefixes(subject: &str) -> &str {
    let mut rest = subject.trim();
    while let Some(found) = reply_prefix_re().find(rest) {
        rest = &rest[found.end()..];
    }
    rest
}

pub fn is_reply_or_forward(subject: &str) -> bool {
    reply_prefix_re().is_match(subject)
}

/// Bare 6-10 character uppercase alphanumeric code containing a digit.
/// `#`-prefixed tokens are property codes, not reservation numbers.
pub fn find_direct_reservation_number(text: &str) -> Option<String> {
    direct_number_re()
        .find_iter(text)
        .filter(|m| !text[..m.start()].ends_with('#'))
        .map(|m| m.as_str())
        .find(|token| token.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

/// Letter followed by 6+ digits, optionally parenthesized or `#`-prefixed.
pub fn find_intermediary_reservation_number(text: &str) -> Option<String> {
    intermediary_number_re()
        .captures(text)
        .map(|caps| caps[1].to_string())
}

fn find_reservation_number(channel: MailChannel, text: &str) -> Option<String> {
    match channel {
        MailChannel::Lodgify => find_intermediary_reservation_number(text),
        _ => find_direct_reservation_number(text),
    }
}

fn clean_name(raw: &str) -> Option<String> {
    let name = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '-')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

/// Parses the known confirmation subject templates, then falls back to a
/// reservation-number scan of the whole subject.
pub fn parse_subject(channel: MailChannel, subject: &str) -> SubjectFields {
    let subject = strip_reply_prefixes(subject);
    let mut fields = SubjectFields::default();

    if let Some(caps) = airbnb_confirmed_re().captures(subject) {
        fields.guest_name = clean_name(&caps["name"]);
        fields.check_in = parse_date_text(&caps["date"]);
    } else if let Some(caps) = lodgify_confirmed_re().captures(subject) {
        fields.guest_name = clean_name(&caps["name"]);
        fields.nights = caps["nights"].parse().ok();
        fields.check_in = parse_date_text(&caps["date"]);
        if let Some(rest) = caps.name("rest") {
            fields.reservation_number = find_intermediary_reservation_number(rest.as_str());
        }
    } else if let Some(caps) = vrbo_instant_re().captures(subject) {
        fields.guest_name = clean_name(&caps["name"]);
        let rest = &caps["rest"];
        let (check_in, check_out) = date_range(rest);
        fields.check_in = check_in;
        fields.check_out = check_out;
        fields.reservation_number = find_direct_reservation_number(rest);
    }

    if fields.reservation_number.is_none() {
        fields.reservation_number = find_reservation_number(channel, subject);
    }
    fields.property_code = property_code_re()
        .captures(subject)
        .map(|caps| caps[1].to_string());

    fields
}

/// `Nov 3 - Nov 5, 2025` style ranges. A year printed only on the second
/// date is carried back to the first.
fn date_range(text: &str) -> (Option<PartialDate>, Option<PartialDate>) {
    let dates = find_dates(text);
    let mut check_in = dates.first().copied();
    let check_out = dates.get(1).copied();

    if let (Some(start), Some(end)) = (check_in.as_mut(), check_out) {
        if let (None, Some(year)) = (start.year, end.year) {
            let wraps = (start.month, start.day) > (end.month, end.day);
            start.year = Some(if wraps { year - 1 } else { year });
        }
    }

    (check_in, check_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_airbnb_confirmed_subject() {
        let fields = parse_subject(
            MailChannel::Airbnb,
            "Reservation confirmed - Maria Lopez arrives Sep 4",
        );
        assert_eq!(fields.guest_name.as_deref(), Some("Maria Lopez"));
        assert_eq!(fields.check_in, Some(PartialDate::month_day(9, 4)));
        assert!(fields.reservation_number.is_none());
    }

    #[test]
    fn test_forwarded_airbnb_subject() {
        let fields = parse_subject(
            MailChannel::Airbnb,
            "Fwd: FW: Reservation confirmed - Ana arrives Oct 1st",
        );
        assert_eq!(fields.guest_name.as_deref(), Some("Ana"));
        assert_eq!(fields.check_in, Some(PartialDate::month_day(10, 1)));
    }

    #[test]
    fn test_lodgify_subject() {
        let fields = parse_subject(
            MailChannel::Lodgify,
            "New Confirmed Booking: Sarai (3 Nights, Arrival: Oct 24 2025) - #B16138101",
        );
        assert_eq!(fields.guest_name.as_deref(), Some("Sarai"));
        assert_eq!(fields.nights, Some(3));
        assert_eq!(
            fields.check_in.and_then(|d| d.to_date()),
            NaiveDate::from_ymd_opt(2025, 10, 24)
        );
        assert_eq!(fields.reservation_number.as_deref(), Some("B16138101"));
    }

    #[test]
    fn test_lodgify_parenthesized_code() {
        assert_eq!(
            find_intermediary_reservation_number("Booking (B1234567) updated").as_deref(),
            Some("B1234567")
        );
    }

    #[test]
    fn test_vrbo_instant_booking_range() {
        let fields = parse_subject(
            MailChannel::Vrbo,
            "Instant Booking from Jane Doe: Dec 30 - Jan 2, 2026 - #3456633",
        );
        assert_eq!(fields.guest_name.as_deref(), Some("Jane Doe"));
        assert_eq!(
            fields.check_in.and_then(|d| d.to_date()),
            NaiveDate::from_ymd_opt(2025, 12, 30)
        );
        assert_eq!(
            fields.check_out.and_then(|d| d.to_date()),
            NaiveDate::from_ymd_opt(2026, 1, 2)
        );
        assert_eq!(fields.property_code.as_deref(), Some("3456633"));
        assert!(fields.reservation_number.is_none());
    }

    #[test]
    fn test_direct_number_requires_digit() {
        assert_eq!(
            find_direct_reservation_number("CONFIRMED booking HMABC12345").as_deref(),
            Some("HMABC12345")
        );
        assert!(find_direct_reservation_number("RESERVATION CONFIRMED").is_none());
    }

    #[test]
    fn test_unknown_template_is_empty() {
        let fields = parse_subject(MailChannel::Airbnb, "Your weekly digest");
        assert!(fields.is_empty());
    }
}
