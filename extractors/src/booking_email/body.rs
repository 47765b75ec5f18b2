//! Line-anchored field lookup over cleaned body text.
//!
//! Each field is a pure `text -> Option<value>` function that walks an ordered
//! list of label variants; the first variant that yields a parseable value wins.
//! A value is read from the label's own line or, when that is empty or
//! unparseable, from the next non-empty line.

use chrono::NaiveDate;
use regex::Regex;
use shared_types::{Money, PartialDate};
use std::sync::OnceLock;

use super::date_parser::parse_plausible_date;
use super::subject::find_direct_reservation_number;
use crate::fees::sanitize_money;

const GUEST_NAME_LABELS: &[&str] = &["Guest name", "Guest", "Traveler name", "Traveler", "Name"];
const PHONE_LABELS: &[&str] = &["Guest phone", "Phone number", "Phone", "Mobile"];
const EMAIL_LABELS: &[&str] = &["Guest email", "Email address", "Email"];
const RESERVATION_LABELS: &[&str] = &[
    "Confirmation code",
    "Reservation ID",
    "Reservation number",
    "Reservation code",
    "Booking ID",
    "Booking number",
    "Booking reference",
];
const CHECK_IN_LABELS: &[&str] = &["Check-in", "Check in", "Arrival date", "Arrival", "Arrive"];
const CHECK_OUT_LABELS: &[&str] = &[
    "Check-out",
    "Checkout",
    "Check out",
    "Departure date",
    "Departure",
    "Depart",
];
const BOOKING_DATE_LABELS: &[&str] = &["Booking date", "Booked on", "Date booked", "Reservation date"];
const PROPERTY_LABELS: &[&str] = &[
    "Property name",
    "Property ID",
    "Property",
    "Listing name",
    "Listing",
    "Rental",
];
const ADULT_LABELS: &[&str] = &["Adults"];
const CHILD_LABELS: &[&str] = &["Children", "Kids"];

const ACCOMMODATION_LABELS: &[&str] = &[
    "Accommodation",
    "Rent",
    "Base rate",
    "Room rate",
    "Nightly rate total",
];
const CLEANING_LABELS: &[&str] = &["Cleaning fee", "Cleaning"];
const GUEST_SERVICE_LABELS: &[&str] = &["Guest service fee", "Traveler service fee", "Service fee"];
const TAX_LABELS: &[&str] = &["Taxes", "Occupancy taxes", "Lodging tax", "Tax"];
const DAMAGE_LABELS: &[&str] = &[
    "Damage protection",
    "Property damage protection",
    "Refundable damage deposit",
    "Damage deposit",
];
const DISCOUNT_LABELS: &[&str] = &["Discount", "Weekly discount", "Monthly discount", "Promotion"];
const RESORT_LABELS: &[&str] = &["Resort fee", "Club fee"];
const HOST_SERVICE_LABELS: &[&str] = &["Host service fee", "Host fee"];
const PROCESSING_LABELS: &[&str] = &["Payment processing fees", "Payment processing fee"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyFields {
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub reservation_number: Option<String>,
    pub check_in: Option<PartialDate>,
    pub check_out: Option<PartialDate>,
    pub booking_date: Option<NaiveDate>,
    pub nights: Option<u32>,
    pub property: Option<String>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub accommodation: Option<Money>,
    pub cleaning_fee: Option<Money>,
    pub guest_service_fee: Option<Money>,
    pub taxes: Option<Money>,
    pub damage_protection_fee: Option<Money>,
    pub discount: Option<Money>,
    pub resort_fee: Option<Money>,
    pub host_service_fee: Option<Money>,
    pub payment_processing_fee: Option<Money>,
}

fn dollar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\$\s*(TBD|[\d,]+(?:\.\d+)?)").expect("invalid dollar regex"))
}

fn bare_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d[\d,]*\.\d{2}\b").expect("invalid amount regex"))
}

fn nightly_total_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\$[\d,]+(?:\.\d{2})?\s*x\s*\d+\s*nights?\s+\$([\d,]+(?:\.\d{2})?)")
            .expect("invalid nightly total regex")
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\d[\d\s().-]{6,}\d").expect("invalid phone regex"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("invalid email regex")
    })
}

fn count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,2}\b").expect("invalid count regex"))
}

fn adults_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})\s+adults?\b").expect("invalid adults regex"))
}

fn children_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})\s+(?:children|child|kids?)\b").expect("invalid children regex")
    })
}

fn nights_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,3})\s+nights?\b").expect("invalid nights regex"))
}

struct LabelHit<'a> {
    inline: &'a str,
    next: Option<&'a str>,
}

impl<'a> LabelHit<'a> {
    /// Label directly followed by `:` or nothing at all.
    fn is_separated(&self) -> bool {
        let rest = self.inline.trim_start();
        rest.is_empty() || rest.starts_with(':')
    }

    fn inline_value(&self) -> &'a str {
        self.inline
            .trim_start_matches(|c: char| c == ':' || c == '-' || c == '*' || c.is_whitespace())
            .trim()
    }
}

/// Lines starting with one of `labels` (case-insensitive, whole word), label order first.
fn label_hits<'a>(text: &'a str, labels: &[&str]) -> Vec<LabelHit<'a>> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut hits = Vec::new();

    for label in labels {
        for (idx, line) in lines.iter().enumerate() {
            let Some(head) = line.get(..label.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(label) {
                continue;
            }
            let inline = &line[label.len()..];
            if inline.chars().next().is_some_and(char::is_alphanumeric) {
                continue;
            }
            let next = lines[idx + 1..].iter().copied().find(|l| !l.is_empty());
            hits.push(LabelHit { inline, next });
        }
    }

    hits
}

fn lookup<T>(text: &str, labels: &[&str], parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    label_hits(text, labels).into_iter().find_map(|hit| {
        let inline = hit.inline_value();
        let same_line = if inline.is_empty() { None } else { parse(inline) };
        same_line.or_else(|| hit.next.and_then(&parse))
    })
}

/// Text-valued labels need a `:` or a line break after them, so `Guest`
/// never captures the `Guest service fee` line.
fn lookup_text<T>(text: &str, labels: &[&str], parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    label_hits(text, labels)
        .into_iter()
        .filter(LabelHit::is_separated)
        .find_map(|hit| {
            let inline = hit.inline_value();
            if inline.is_empty() {
                hit.next.and_then(&parse)
            } else {
                parse(inline)
            }
        })
}

/// `$TBD` is the pending sentinel; otherwise the first dollar amount, then
/// the first bare two-decimal amount.
pub fn parse_money(value: &str) -> Option<Money> {
    if let Some(caps) = dollar_re().captures(value) {
        let amount = &caps[1];
        if amount.eq_ignore_ascii_case(Money::PENDING_SENTINEL) {
            return Some(Money::Pending);
        }
        return Some(Money::Amount(sanitize_money(amount)));
    }
    if let Some(found) = bare_amount_re().find(value) {
        return Some(Money::Amount(sanitize_money(found.as_str())));
    }
    if value.trim().eq_ignore_ascii_case(Money::PENDING_SENTINEL) {
        return Some(Money::Pending);
    }
    None
}

fn parse_person_name(value: &str) -> Option<String> {
    let name = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let valid = !name.is_empty()
        && name.len() <= 60
        && name
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.'));
    valid.then_some(name)
}

fn parse_count(value: &str) -> Option<u32> {
    count_re().find(value)?.as_str().parse().ok()
}

pub fn guest_name(text: &str) -> Option<String> {
    lookup_text(text, GUEST_NAME_LABELS, parse_person_name)
}

pub fn guest_phone(text: &str) -> Option<String> {
    lookup(text, PHONE_LABELS, |v| {
        phone_re().find(v).map(|m| m.as_str().trim().to_string())
    })
}

pub fn guest_email(text: &str) -> Option<String> {
    lookup(text, EMAIL_LABELS, |v| {
        email_re().find(v).map(|m| m.as_str().to_lowercase())
    })
}

pub fn reservation_number(text: &str) -> Option<String> {
    lookup(text, RESERVATION_LABELS, find_direct_reservation_number)
}

pub fn check_in(text: &str, reference: NaiveDate) -> Option<PartialDate> {
    lookup(text, CHECK_IN_LABELS, |v| parse_plausible_date(v, reference))
}

pub fn check_out(text: &str, reference: NaiveDate) -> Option<PartialDate> {
    lookup(text, CHECK_OUT_LABELS, |v| parse_plausible_date(v, reference))
}

/// Only fully dated booking dates are useful downstream.
pub fn booking_date(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    lookup(text, BOOKING_DATE_LABELS, |v| {
        parse_plausible_date(v, reference).and_then(|d| d.to_date())
    })
}

pub fn property(text: &str) -> Option<String> {
    lookup_text(text, PROPERTY_LABELS, |v| {
        let value = v.trim();
        (!value.is_empty() && value.len() <= 120).then(|| value.to_string())
    })
}

pub fn adults(text: &str) -> Option<u32> {
    lookup(text, ADULT_LABELS, parse_count).or_else(|| {
        adults_re()
            .captures(text)
            .and_then(|caps| caps[1].parse().ok())
    })
}

pub fn children(text: &str) -> Option<u32> {
    lookup(text, CHILD_LABELS, parse_count).or_else(|| {
        children_re()
            .captures(text)
            .and_then(|caps| caps[1].parse().ok())
    })
}

pub fn nights(text: &str) -> Option<u32> {
    nights_re()
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Labelled accommodation line, else the `$X x N nights $Y` total.
pub fn accommodation(text: &str) -> Option<Money> {
    lookup(text, ACCOMMODATION_LABELS, parse_money).or_else(|| {
        nightly_total_re()
            .captures(text)
            .map(|caps| Money::Amount(sanitize_money(&caps[1])))
    })
}

pub fn parse_body(text: &str, reference: NaiveDate) -> BodyFields {
    BodyFields {
        guest_name: guest_name(text),
        guest_phone: guest_phone(text),
        guest_email: guest_email(text),
        reservation_number: reservation_number(text),
        check_in: check_in(text, reference),
        check_out: check_out(text, reference),
        booking_date: booking_date(text, reference),
        nights: nights(text),
        property: property(text),
        adults: adults(text),
        children: children(text),
        accommodation: accommodation(text),
        cleaning_fee: lookup(text, CLEANING_LABELS, parse_money),
        guest_service_fee: lookup(text, GUEST_SERVICE_LABELS, parse_money),
        taxes: lookup(text, TAX_LABELS, parse_money),
        damage_protection_fee: lookup(text, DAMAGE_LABELS, parse_money),
        discount: lookup(text, DISCOUNT_LABELS, parse_money),
        resort_fee: lookup(text, RESORT_LABELS, parse_money),
        host_service_fee: lookup(text, HOST_SERVICE_LABELS, parse_money),
        payment_processing_fee: lookup(text, PROCESSING_LABELS, parse_money),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    const VRBO_BODY: &str = "\
Traveler name: Jane Doe
Phone: +1 (555) 123-4567
Email: Jane.Doe@example.com
Reservation ID: HA1234567
Property: #3456633
Arrival: Nov 3, 2025
Departure: Nov 5, 2025
2 adults, 1 child
Rent $400.00
Resort fee $25.00
Cleaning fee $80.00
Taxes $50.50
Guest service fee $33.00
Payment processing fees* ... $TBD";

    #[test]
    fn test_vrbo_body_fields() {
        let fields = parse_body(VRBO_BODY, reference());
        assert_eq!(fields.guest_name.as_deref(), Some("Jane Doe"));
        assert_eq!(fields.guest_phone.as_deref(), Some("+1 (555) 123-4567"));
        assert_eq!(fields.guest_email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(fields.reservation_number.as_deref(), Some("HA1234567"));
        assert_eq!(fields.property.as_deref(), Some("#3456633"));
        assert_eq!(
            fields.check_in.and_then(|d| d.to_date()),
            NaiveDate::from_ymd_opt(2025, 11, 3)
        );
        assert_eq!(
            fields.check_out.and_then(|d| d.to_date()),
            NaiveDate::from_ymd_opt(2025, 11, 5)
        );
        assert_eq!(fields.adults, Some(2));
        assert_eq!(fields.children, Some(1));
        assert_eq!(fields.accommodation, Some(Money::Amount(400.0)));
        assert_eq!(fields.resort_fee, Some(Money::Amount(25.0)));
        assert_eq!(fields.cleaning_fee, Some(Money::Amount(80.0)));
        assert_eq!(fields.taxes, Some(Money::Amount(50.5)));
        assert_eq!(fields.guest_service_fee, Some(Money::Amount(33.0)));
        assert_eq!(fields.payment_processing_fee, Some(Money::Pending));
    }

    #[test]
    fn test_value_on_next_line() {
        let text = "Confirmation code\nHMABC12345\nCheck-in\nThu, Sep 4\n3:00 PM\n\
                    Host service fee (3.0%)\n-$30.00";
        assert_eq!(reservation_number(text).as_deref(), Some("HMABC12345"));
        assert_eq!(check_in(text, reference()), Some(PartialDate::month_day(9, 4)));
        assert_eq!(
            lookup(text, HOST_SERVICE_LABELS, parse_money),
            Some(Money::Amount(30.0))
        );
    }

    #[test]
    fn test_guest_label_does_not_capture_fee_line() {
        let text = "Guest service fee $12.00\nGuest: Ana Perez";
        assert_eq!(guest_name(text).as_deref(), Some("Ana Perez"));
    }

    #[test]
    fn test_nightly_total_fallback() {
        let text = "$150.00 x 3 nights   $450.00";
        assert_eq!(accommodation(text), Some(Money::Amount(450.0)));
        assert_eq!(nights(text), Some(3));
    }

    #[test]
    fn test_implausible_dates_are_dropped() {
        assert!(check_in("Check-in: Jan 2, 2035", reference()).is_none());
    }

    #[test]
    fn test_missing_labels_yield_empty_fields() {
        let fields = parse_body("Thanks for hosting!", reference());
        assert_eq!(fields, BodyFields::default());
    }
}
