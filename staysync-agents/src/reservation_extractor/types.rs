use chrono::NaiveDate;
use extractors::booking_email::date_parser::parse_plausible_date;
use extractors::{sanitize_amount, sanitize_money};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::{CandidateReservation, MailChannel, Money, Platform, Provenance, Sourced};

/// Platform value used when the model omits the field.
pub const UNKNOWN_PLATFORM: &str = "Unknown";

/// A money field as answered by the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AiMoney {
    Amount(f64),
    Pending(PendingMarker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingMarker {
    #[serde(rename = "TBD")]
    Tbd,
}

impl From<AiMoney> for Money {
    fn from(value: AiMoney) -> Self {
        match value {
            AiMoney::Amount(amount) => Money::Amount(sanitize_amount(amount)),
            AiMoney::Pending(_) => Money::Pending,
        }
    }
}

/// The flat field set requested from the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiReservationFields {
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub reservation_number: Option<String>,
    pub platform: Vec<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub booking_date: Option<String>,
    pub property: Option<String>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub accommodation: Option<AiMoney>,
    pub cleaning_fee: Option<AiMoney>,
    pub guest_service_fee: Option<AiMoney>,
    pub taxes: Option<AiMoney>,
    pub damage_protection_fee: Option<AiMoney>,
    pub discount: Option<AiMoney>,
    pub resort_fee: Option<AiMoney>,
    pub host_service_fee: Option<AiMoney>,
    pub payment_processing_fee: Option<AiMoney>,
}

/// Strips a Markdown code fence the model sometimes wraps around JSON.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match object.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let lowered = value.to_lowercase();
    if value.is_empty() || matches!(lowered.as_str(), "null" | "none" | "n/a" | "unknown") {
        return None;
    }
    Some(value)
}

fn count_field(object: &Map<String, Value>, key: &str) -> Option<u32> {
    match object.get(key)? {
        Value::Number(n) => n.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numbers and numeric-looking strings go through the money sanitizer;
/// the `TBD` sentinel is kept as pending.
fn money_field(object: &Map<String, Value>, key: &str) -> Option<AiMoney> {
    match object.get(key)? {
        Value::Number(n) => n.as_f64().map(|v| AiMoney::Amount(sanitize_amount(v))),
        Value::String(s) if s.trim().eq_ignore_ascii_case(Money::PENDING_SENTINEL) => {
            Some(AiMoney::Pending(PendingMarker::Tbd))
        }
        Value::String(s) => Some(AiMoney::Amount(sanitize_money(s))),
        _ => None,
    }
}

/// Arrays pass through, a bare value becomes a one-element array, and a
/// missing field becomes `["Unknown"]`.
fn platform_field(object: &Map<String, Value>) -> Vec<String> {
    let platforms: Vec<String> = match object.get("platform") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    };

    if platforms.is_empty() {
        vec![UNKNOWN_PLATFORM.to_string()]
    } else {
        platforms
    }
}

impl AiReservationFields {
    /// Defensive parse of an untrusted model answer. Anything that is not a
    /// JSON object, or that carries an `error` key, is "no data".
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(strip_code_fence(raw)).ok()?;
        let object = match value {
            Value::Object(object) => object,
            // Some models wrap the object in a one-element array
            Value::Array(mut items) if items.len() == 1 => match items.remove(0) {
                Value::Object(object) => object,
                _ => return None,
            },
            _ => return None,
        };

        if object.get("error").is_some_and(|e| !e.is_null()) {
            return None;
        }

        Some(Self {
            guest_name: text_field(&object, "guest_name"),
            guest_phone: text_field(&object, "guest_phone"),
            guest_email: text_field(&object, "guest_email"),
            reservation_number: text_field(&object, "reservation_number"),
            platform: platform_field(&object),
            check_in: text_field(&object, "check_in"),
            check_out: text_field(&object, "check_out"),
            booking_date: text_field(&object, "booking_date"),
            property: text_field(&object, "property"),
            adults: count_field(&object, "adults"),
            children: count_field(&object, "children"),
            accommodation: money_field(&object, "accommodation"),
            cleaning_fee: money_field(&object, "cleaning_fee"),
            guest_service_fee: money_field(&object, "guest_service_fee"),
            taxes: money_field(&object, "taxes"),
            damage_protection_fee: money_field(&object, "damage_protection_fee"),
            discount: money_field(&object, "discount"),
            resort_fee: money_field(&object, "resort_fee"),
            host_service_fee: money_field(&object, "host_service_fee"),
            payment_processing_fee: money_field(&object, "payment_processing_fee"),
        })
    }

    /// First platform label that maps to a known platform.
    pub fn resolved_platform(&self) -> Platform {
        self.platform
            .iter()
            .map(|label| Platform::from_label(label))
            .find(|p| p.is_known())
            .unwrap_or(Platform::Unknown)
    }

    /// Converts to a candidate carrying AI provenance. Dates outside the
    /// plausible window around `reference` are dropped.
    pub fn into_candidate(self, channel: MailChannel, reference: NaiveDate) -> CandidateReservation {
        let platform = self.resolved_platform();
        let date = |value: &Option<String>| {
            value
                .as_deref()
                .and_then(|v| parse_plausible_date(v, reference))
        };

        CandidateReservation {
            guest_name: self
                .guest_name
                .clone()
                .map(|n| Sourced::new(n, Provenance::Ai)),
            guest_phone: self.guest_phone.clone(),
            guest_email: self.guest_email.as_ref().map(|e| e.to_lowercase()),
            reservation_number: self.reservation_number.clone(),
            check_in: date(&self.check_in),
            check_out: date(&self.check_out),
            booking_date: date(&self.booking_date)
                .and_then(|d| d.to_date())
                .map(|d| Sourced::new(d, Provenance::Ai)),
            property_raw: self.property.clone(),
            adults: self.adults,
            children: self.children,
            accommodation: self.accommodation.map(Money::from),
            cleaning_fee: self.cleaning_fee.map(Money::from),
            guest_service_fee: self.guest_service_fee.map(Money::from),
            taxes: self.taxes.map(Money::from),
            damage_protection_fee: self.damage_protection_fee.map(Money::from),
            discount: self.discount.map(Money::from),
            resort_fee: self.resort_fee.map(Money::from),
            host_service_fee: self.host_service_fee.map(Money::from),
            payment_processing_fee: self.payment_processing_fee.map(Money::from),
            ..CandidateReservation::new(channel, platform)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PartialDate;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    #[test]
    fn test_parse_full_answer() {
        let raw = r#"```json
{
  "guest_name": "Maria Lopez",
  "reservation_number": "HMABC12345",
  "platform": ["Airbnb"],
  "check_in": "2025-09-04",
  "check_out": null,
  "adults": 2,
  "accommodation": "$1,250.00",
  "host_service_fee": 37.5,
  "payment_processing_fee": "TBD"
}
```"#;
        let fields = AiReservationFields::parse(raw).unwrap();
        assert_eq!(fields.guest_name.as_deref(), Some("Maria Lopez"));
        assert_eq!(fields.platform, vec!["Airbnb".to_string()]);
        assert_eq!(fields.check_out, None);
        assert_eq!(fields.adults, Some(2));
        assert_eq!(fields.accommodation, Some(AiMoney::Amount(1250.0)));
        assert_eq!(fields.host_service_fee, Some(AiMoney::Amount(37.5)));
        assert_eq!(
            fields.payment_processing_fee,
            Some(AiMoney::Pending(PendingMarker::Tbd))
        );
    }

    #[test]
    fn test_untrusted_answers_are_no_data() {
        assert!(AiReservationFields::parse("not json").is_none());
        assert!(AiReservationFields::parse("[1, 2]").is_none());
        assert!(AiReservationFields::parse("\"text\"").is_none());
        assert!(AiReservationFields::parse(r#"{"error": "cannot extract"}"#).is_none());
    }

    #[test]
    fn test_platform_coercion() {
        let single = AiReservationFields::parse(r#"{"platform": "Vrbo"}"#).unwrap();
        assert_eq!(single.platform, vec!["Vrbo".to_string()]);

        let missing = AiReservationFields::parse(r#"{"guest_name": "Ana"}"#).unwrap();
        assert_eq!(missing.platform, vec![UNKNOWN_PLATFORM.to_string()]);
        assert_eq!(missing.resolved_platform(), Platform::Unknown);
    }

    #[test]
    fn test_unparseable_money_is_zero_and_cents_guarded() {
        let fields =
            AiReservationFields::parse(r#"{"cleaning_fee": "free", "taxes": 125000}"#).unwrap();
        assert_eq!(fields.cleaning_fee, Some(AiMoney::Amount(0.0)));
        assert_eq!(fields.taxes, Some(AiMoney::Amount(1250.0)));
    }

    #[test]
    fn test_into_candidate_marks_ai_provenance() {
        let fields = AiReservationFields::parse(
            r#"{"guest_name": "Maria Lopez", "platform": ["airbnb"], "check_in": "Sep 4",
                "booking_date": "2031-01-01", "payment_processing_fee": "TBD"}"#,
        )
        .unwrap();
        let candidate = fields.into_candidate(MailChannel::Airbnb, reference());

        assert_eq!(candidate.platform, Platform::Airbnb);
        assert_eq!(candidate.guest_name.map(|n| n.source), Some(Provenance::Ai));
        assert_eq!(candidate.check_in, Some(PartialDate::month_day(9, 4)));
        assert!(candidate.booking_date.is_none());
        assert_eq!(candidate.payment_processing_fee, Some(Money::Pending));
    }
}
