//! Regex heuristics over booking confirmation subjects and bodies.

pub mod body;
pub mod cleaner;
pub mod date_parser;
pub mod subject;

use chrono::NaiveDate;
use shared_types::{CandidateReservation, MailChannel, Platform, Provenance, RawMessage, Sourced};

pub use body::BodyFields;
pub use cleaner::CleanedBody;
pub use subject::SubjectFields;

/// Output of the heuristic pass. Body-derived values live on the candidate;
/// subject-derived values are kept apart so the reconciler can weigh them.
#[derive(Debug, Clone)]
pub struct HeuristicExtraction {
    pub candidate: CandidateReservation,
    pub subject: SubjectFields,
    pub forwarded_date: Option<NaiveDate>,
    pub cleaned_text: String,
}

impl HeuristicExtraction {
    /// Reservation number, guest name and arrival are available from body or subject.
    pub fn is_sufficient(&self) -> bool {
        let number = self
            .candidate
            .reservation_number
            .as_ref()
            .or(self.subject.reservation_number.as_ref())
            .is_some();
        let name = self.candidate.guest_name.is_some() || self.subject.guest_name.is_some();
        let arrival = self.candidate.check_in.is_some() || self.subject.check_in.is_some();
        number && name && arrival
    }

    /// Names the first missing required field, for skip logging.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.candidate.reservation_number.is_none() && self.subject.reservation_number.is_none() {
            Some("reservation number")
        } else if self.candidate.guest_name.is_none() && self.subject.guest_name.is_none() {
            Some("guest name")
        } else if self.candidate.check_in.is_none() && self.subject.check_in.is_none() {
            Some("check-in date")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Never fails; missing fields are simply left empty.
    pub fn extract(
        &self,
        message: &RawMessage,
        channel: MailChannel,
        platform: Platform,
        reference: NaiveDate,
    ) -> HeuristicExtraction {
        let cleaned = cleaner::clean_body(&message.body);
        let subject_fields = subject::parse_subject(channel, &message.subject);
        let fields = body::parse_body(&cleaned.text, reference);

        let forwarded_date = cleaned
            .forwarded_date
            .as_deref()
            .and_then(|d| date_parser::parse_plausible_date(d, reference))
            .and_then(|d| d.to_date());

        let property_raw = fields.property.or_else(|| {
            subject_fields
                .property_code
                .as_ref()
                .map(|code| format!("#{}", code))
        });

        let candidate = CandidateReservation {
            guest_name: fields
                .guest_name
                .map(|n| Sourced::new(n, Provenance::Heuristic)),
            guest_phone: fields.guest_phone,
            guest_email: fields.guest_email,
            reservation_number: fields.reservation_number,
            check_in: fields.check_in,
            check_out: fields.check_out,
            nights: fields.nights,
            booking_date: fields
                .booking_date
                .map(|d| Sourced::new(d, Provenance::Heuristic)),
            property_raw,
            adults: fields.adults,
            children: fields.children,
            accommodation: fields.accommodation,
            cleaning_fee: fields.cleaning_fee,
            guest_service_fee: fields.guest_service_fee,
            taxes: fields.taxes,
            damage_protection_fee: fields.damage_protection_fee,
            discount: fields.discount,
            resort_fee: fields.resort_fee,
            host_service_fee: fields.host_service_fee,
            payment_processing_fee: fields.payment_processing_fee,
            ..CandidateReservation::new(channel, platform)
        };

        HeuristicExtraction {
            candidate,
            subject: subject_fields,
            forwarded_date,
            cleaned_text: cleaned.text,
        }
    }
}
