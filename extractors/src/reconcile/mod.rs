//! Merges heuristic, AI and header signals into one candidate reservation.

use chrono::{DateTime, Duration, NaiveDate};
use shared_types::{
    CandidateReservation, MailChannel, PartialDate, Provenance, Sourced, ValidationError,
};

use crate::booking_email::date_parser::parse_date_text;
use crate::booking_email::HeuristicExtraction;

/// Calendar date of a mail `Date` header. RFC 2822 first, then RFC 3339,
/// then any date the loose parser can find. The time part is discarded.
pub fn parse_header_date(header: &str) -> Option<NaiveDate> {
    let header = header.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(header) {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(header) {
        return Some(parsed.date_naive());
    }
    parse_date_text(header).and_then(|d| d.to_date())
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// Applies the merge rules in order. Fails only when no reservation
    /// number survives.
    ///
    /// `reference` anchors year resolution when no booking date is known.
    pub fn reconcile(
        &self,
        extraction: HeuristicExtraction,
        ai: Option<CandidateReservation>,
        header_date: Option<NaiveDate>,
        reference: NaiveDate,
    ) -> Result<CandidateReservation, ValidationError> {
        let HeuristicExtraction {
            mut candidate,
            subject,
            forwarded_date,
            ..
        } = extraction;

        if let Some(ai) = ai {
            candidate.fill_missing_from(ai);
        }

        if let Some(subject_name) = subject.guest_name.as_deref() {
            if prefer_subject_name(candidate.channel, candidate.guest_name_str(), subject_name) {
                candidate.guest_name = Some(Sourced::new(
                    subject_name.to_string(),
                    Provenance::Heuristic,
                ));
            }
        }

        if candidate.reservation_number.is_none() {
            candidate.reservation_number = subject.reservation_number;
        }
        if candidate.check_in.is_none() {
            candidate.check_in = subject.check_in;
        }
        if candidate.check_out.is_none() {
            candidate.check_out = subject.check_out;
        }
        if candidate.nights.is_none() {
            candidate.nights = subject.nights;
        }

        // Intermediary booking dates are unreliable; the header always wins.
        if candidate.channel.is_intermediary() {
            if let Some(date) = header_date {
                candidate.booking_date = Some(Sourced::new(date, Provenance::HeaderFallback));
            }
        }
        if candidate.booking_date.is_none() {
            candidate.booking_date = header_date
                .or(forwarded_date)
                .map(|date| Sourced::new(date, Provenance::HeaderFallback));
        }

        resolve_stay_dates(&mut candidate, reference);

        let has_number = candidate
            .reservation_number
            .as_deref()
            .map(str::trim)
            .is_some_and(|n| !n.is_empty() && !n.chars().all(|c| c == '0'));
        if !has_number {
            return Err(ValidationError::MissingReservationNumber);
        }

        Ok(candidate)
    }
}

/// Name precedence between an extracted name and the subject-line name.
fn prefer_subject_name(channel: MailChannel, extracted: Option<&str>, subject: &str) -> bool {
    let Some(extracted) = extracted.map(str::trim).filter(|n| !n.is_empty()) else {
        return true;
    };

    let extracted_single = !extracted.contains(' ');
    let subject_full = subject.contains(' ');

    if extracted_single
        && subject_full
        && subject
            .to_lowercase()
            .starts_with(&extracted.to_lowercase())
    {
        return true;
    }

    if channel == MailChannel::Airbnb {
        return (subject_full && extracted_single) || subject.len() > extracted.len();
    }

    false
}

/// Injects missing years and derives check-out from a night count.
fn resolve_stay_dates(candidate: &mut CandidateReservation, reference: NaiveDate) {
    let anchor = candidate
        .booking_date
        .as_ref()
        .map(|d| d.value)
        .unwrap_or(reference);

    let check_in = candidate
        .check_in
        .and_then(|partial| partial.resolve_on_or_after(anchor));
    if let Some(check_in) = check_in {
        candidate.check_in = Some(PartialDate::full(check_in));
    }

    let Some(check_in) = check_in else {
        return;
    };

    if candidate.check_out.is_none() {
        if let Some(nights) = candidate.nights.filter(|n| *n > 0) {
            candidate.check_out = Some(PartialDate::full(
                check_in + Duration::days(i64::from(nights)),
            ));
        }
    }

    if let Some(check_out) = candidate
        .check_out
        .and_then(|partial| partial.resolve_on_or_after(check_in))
    {
        candidate.check_out = Some(PartialDate::full(check_out));
    }
}
