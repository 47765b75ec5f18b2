use chrono::{Datelike, NaiveDate};

use crate::platform::{MailChannel, Platform};

/// A calendar date whose year may still be unknown.
///
/// Booking mail often prints arrival dates as `Sep 4`; the year is injected
/// later from the booking date or the run's reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
}

impl PartialDate {
    pub fn full(date: NaiveDate) -> Self {
        Self {
            year: Some(date.year()),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn month_day(month: u32, day: u32) -> Self {
        Self {
            year: None,
            month,
            day,
        }
    }

    pub fn has_year(&self) -> bool {
        self.year.is_some()
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month, self.day)
    }

    /// Resolves to a concrete date that never precedes `anchor` when the year
    /// is missing: the anchor's year is tried first, then rolled forward one
    /// year. A leap day with no Feb 29 in either year stays unresolved.
    /// Dates that already carry a year are returned as-is.
    pub fn resolve_on_or_after(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        if self.has_year() {
            return self.to_date();
        }

        (anchor.year()..=anchor.year() + 1)
            .filter_map(|year| NaiveDate::from_ymd_opt(year, self.month, self.day))
            .find(|date| *date >= anchor)
    }
}

/// A monetary line item. `Pending` is the "TBD" sentinel some platforms print
/// before the value is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Money {
    Amount(f64),
    Pending,
}

impl Money {
    pub const PENDING_SENTINEL: &'static str = "TBD";

    /// Pending values are stored as zero.
    pub fn amount_or_zero(&self) -> f64 {
        match self {
            Money::Amount(value) => *value,
            Money::Pending => 0.0,
        }
    }
}

/// Where a field value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Heuristic,
    Ai,
    HeaderFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub value: T,
    pub source: Provenance,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: Provenance) -> Self {
        Self { value, source }
    }
}

/// Working record that accrues fields through extraction and reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateReservation {
    pub channel: MailChannel,
    pub platform: Platform,

    pub guest_name: Option<Sourced<String>>,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub reservation_number: Option<String>,

    pub check_in: Option<PartialDate>,
    pub check_out: Option<PartialDate>,
    pub nights: Option<u32>,
    pub booking_date: Option<Sourced<NaiveDate>>,

    pub property_raw: Option<String>,
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

impl CandidateReservation {
    pub fn new(channel: MailChannel, platform: Platform) -> Self {
        Self {
            channel,
            platform,
            ..Default::default()
        }
    }

    pub fn guest_name_str(&self) -> Option<&str> {
        self.guest_name.as_ref().map(|n| n.value.as_str())
    }

    /// Reservation number, guest name and arrival date are all present.
    pub fn is_sufficient(&self) -> bool {
        has_reservation_number(self.reservation_number.as_deref())
            && self.guest_name.is_some()
            && self.check_in.is_some()
    }

    /// Fills every empty field from `other`, leaving populated fields alone.
    pub fn fill_missing_from(&mut self, other: CandidateReservation) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        if !self.platform.is_known() {
            self.platform = other.platform;
        }
        fill(&mut self.guest_name, other.guest_name);
        fill(&mut self.guest_phone, other.guest_phone);
        fill(&mut self.guest_email, other.guest_email);
        if !has_reservation_number(self.reservation_number.as_deref()) {
            self.reservation_number = other.reservation_number;
        }
        fill(&mut self.check_in, other.check_in);
        fill(&mut self.check_out, other.check_out);
        fill(&mut self.nights, other.nights);
        fill(&mut self.booking_date, other.booking_date);
        fill(&mut self.property_raw, other.property_raw);
        fill(&mut self.adults, other.adults);
        fill(&mut self.children, other.children);
        fill(&mut self.accommodation, other.accommodation);
        fill(&mut self.cleaning_fee, other.cleaning_fee);
        fill(&mut self.guest_service_fee, other.guest_service_fee);
        fill(&mut self.taxes, other.taxes);
        fill(&mut self.damage_protection_fee, other.damage_protection_fee);
        fill(&mut self.discount, other.discount);
        fill(&mut self.resort_fee, other.resort_fee);
        fill(&mut self.host_service_fee, other.host_service_fee);
        fill(&mut self.payment_processing_fee, other.payment_processing_fee);
    }

    /// Validation gate between reconciliation and enrichment.
    pub fn finalize(self) -> Result<Reservation, ValidationError> {
        let reservation_number = self
            .reservation_number
            .as_deref()
            .map(str::trim)
            .filter(|n| has_reservation_number(Some(n)))
            .map(str::to_string)
            .ok_or(ValidationError::MissingReservationNumber)?;

        if !self.platform.is_known() {
            return Err(ValidationError::UnknownPlatform);
        }

        let guest_name = self
            .guest_name
            .as_ref()
            .map(|n| normalize_guest_name(&n.value))
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::MissingGuestName)?;

        let check_in = self
            .check_in
            .ok_or(ValidationError::MissingCheckIn)?
            .to_date()
            .ok_or(ValidationError::UnresolvedCheckIn)?;

        Ok(Reservation {
            channel: self.channel,
            platform: self.platform,
            reservation_number,
            guest_name,
            guest_phone: self.guest_phone,
            guest_email: self.guest_email,
            check_in,
            check_out: self.check_out.and_then(|d| d.to_date()),
            booking_date: self.booking_date.map(|d| d.value),
            property_raw: self.property_raw,
            property: String::new(),
            adults: self.adults,
            children: self.children,
            accommodation: self.accommodation,
            cleaning_fee: self.cleaning_fee,
            guest_service_fee: self.guest_service_fee,
            taxes: self.taxes,
            damage_protection_fee: self.damage_protection_fee,
            discount: self.discount,
            resort_fee: self.resort_fee,
            host_service_fee: self.host_service_fee,
            payment_processing_fee: self.payment_processing_fee,
            fees: FeeBreakdown::default(),
            needs_date_review: false,
        })
    }
}

/// Derived commission values written alongside the extracted line items
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeeBreakdown {
    /// Accommodation shown to storage; Vrbo folds the resort fee in
    pub accommodation_total: f64,
    /// Airbnb: host service fee. Vrbo: 3% of the stay total.
    pub service_commission: f64,
    /// Airbnb: always 0. Vrbo: 5% of stay total without cleaning.
    pub base_commission: f64,
}

/// A validated reservation ready for enrichment and persistence
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub channel: MailChannel,
    pub platform: Platform,
    pub reservation_number: String,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,

    pub check_in: NaiveDate,
    pub check_out: Option<NaiveDate>,
    pub booking_date: Option<NaiveDate>,

    pub property_raw: Option<String>,
    /// Canonical property name, filled by the property normalizer
    pub property: String,
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

    pub fees: FeeBreakdown,
    pub needs_date_review: bool,
}

impl Reservation {
    /// Arrived through the intermediary channel; may later be upgraded in place.
    pub fn is_provisional(&self) -> bool {
        self.channel.is_intermediary()
    }

    /// Authoritative for the physical stay it describes.
    pub fn is_canonical(&self) -> bool {
        self.platform.is_canonical() && !self.is_provisional()
    }

    /// `reservationNumber::platform`
    pub fn reservation_key(&self) -> String {
        format!(
            "{}::{}",
            self.reservation_number,
            self.platform.storage_label()
        )
    }

    /// `guestName::checkIn::checkOut`, name lower-cased
    pub fn stay_key(&self) -> String {
        format!(
            "{}::{}::{}",
            self.guest_name.to_lowercase(),
            self.check_in.format("%Y-%m-%d"),
            self.check_out
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("reservation number is empty or zero")]
    MissingReservationNumber,

    #[error("platform could not be resolved")]
    UnknownPlatform,

    #[error("guest name is missing")]
    MissingGuestName,

    #[error("check-in date is missing")]
    MissingCheckIn,

    #[error("check-in date has no year")]
    UnresolvedCheckIn,
}

/// Trims and collapses inner whitespace.
pub fn normalize_guest_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_reservation_number(number: Option<&str>) -> bool {
    match number.map(str::trim) {
        Some(n) => !n.is_empty() && !n.chars().all(|c| c == '0'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sufficient_candidate() -> CandidateReservation {
        CandidateReservation {
            reservation_number: Some("HMABC12345".to_string()),
            guest_name: Some(Sourced::new("  Maria   Lopez ".to_string(), Provenance::Heuristic)),
            check_in: Some(PartialDate::full(date(2025, 9, 4))),
            ..CandidateReservation::new(MailChannel::Airbnb, Platform::Airbnb)
        }
    }

    #[test]
    fn test_resolve_keeps_anchor_year_when_not_before() {
        let resolved = PartialDate::month_day(9, 4).resolve_on_or_after(date(2025, 3, 1));
        assert_eq!(resolved, Some(date(2025, 9, 4)));
    }

    #[test]
    fn test_resolve_rolls_forward_past_anchor() {
        let resolved = PartialDate::month_day(1, 15).resolve_on_or_after(date(2025, 11, 20));
        assert_eq!(resolved, Some(date(2026, 1, 15)));
    }

    #[test]
    fn test_resolve_never_precedes_anchor() {
        let anchor = date(2025, 6, 30);
        for month in 1..=12 {
            for day in [1, 15, 28] {
                let resolved = PartialDate::month_day(month, day)
                    .resolve_on_or_after(anchor)
                    .unwrap();
                assert!(resolved >= anchor, "{resolved} precedes {anchor}");
            }
        }
    }

    #[test]
    fn test_resolve_leap_day_rolls_at_most_one_year() {
        let leap_day = PartialDate::month_day(2, 29);
        assert_eq!(leap_day.resolve_on_or_after(date(2025, 1, 10)), None);
        assert_eq!(
            leap_day.resolve_on_or_after(date(2027, 3, 1)),
            Some(date(2028, 2, 29))
        );
        assert_eq!(
            leap_day.resolve_on_or_after(date(2028, 1, 5)),
            Some(date(2028, 2, 29))
        );
    }

    #[test]
    fn test_explicit_year_is_not_rolled() {
        let partial = PartialDate::full(date(2024, 1, 2));
        assert_eq!(partial.resolve_on_or_after(date(2025, 1, 1)), Some(date(2024, 1, 2)));
    }

    #[test]
    fn test_finalize_normalizes_name() {
        let reservation = sufficient_candidate().finalize().unwrap();
        assert_eq!(reservation.guest_name, "Maria Lopez");
        assert_eq!(reservation.reservation_key(), "HMABC12345::Airbnb");
        assert_eq!(reservation.stay_key(), "maria lopez::2025-09-04::");
        assert!(reservation.is_canonical());
    }

    #[test]
    fn test_finalize_rejects_zero_reservation_number() {
        let mut candidate = sufficient_candidate();
        candidate.reservation_number = Some("000".to_string());
        assert_eq!(
            candidate.finalize().unwrap_err(),
            ValidationError::MissingReservationNumber
        );
    }

    #[test]
    fn test_finalize_rejects_unknown_platform() {
        let mut candidate = sufficient_candidate();
        candidate.platform = Platform::Unknown;
        assert_eq!(candidate.finalize().unwrap_err(), ValidationError::UnknownPlatform);
    }

    #[test]
    fn test_finalize_rejects_unresolved_check_in() {
        let mut candidate = sufficient_candidate();
        candidate.check_in = Some(PartialDate::month_day(9, 4));
        assert_eq!(candidate.finalize().unwrap_err(), ValidationError::UnresolvedCheckIn);
    }

    #[test]
    fn test_fill_missing_keeps_existing_values() {
        let mut candidate = sufficient_candidate();
        let other = CandidateReservation {
            guest_name: Some(Sourced::new("Someone Else".to_string(), Provenance::Ai)),
            cleaning_fee: Some(Money::Amount(80.0)),
            ..Default::default()
        };
        candidate.fill_missing_from(other);
        assert_eq!(candidate.guest_name_str(), Some("  Maria   Lopez "));
        assert_eq!(candidate.cleaning_fee, Some(Money::Amount(80.0)));
    }

    #[test]
    fn test_provisional_reservation_is_not_canonical() {
        let mut candidate = sufficient_candidate();
        candidate.channel = MailChannel::Lodgify;
        let reservation = candidate.finalize().unwrap();
        assert!(reservation.is_provisional());
        assert!(!reservation.is_canonical());
    }

    #[test]
    fn test_pending_money_is_zero() {
        assert_eq!(Money::Pending.amount_or_zero(), 0.0);
        assert_eq!(Money::Amount(12.5).amount_or_zero(), 12.5);
    }
}
