//! Money sanitizing and platform-specific commission fields.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use shared_types::{FeeBreakdown, Money, Platform, Reservation};

/// Values at or above this are suspected to be cents reported as dollars.
const CENTS_GUARD_THRESHOLD: f64 = 100_000.0;

const TWO_TIER_SERVICE_RATE: f64 = 0.03;
const TWO_TIER_BASE_RATE: f64 = 0.05;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Non-negative, rounded to cents, with the cents/dollars guard applied once.
pub fn sanitize_amount(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }

    let mut amount = value.abs();
    if amount >= CENTS_GUARD_THRESHOLD && amount / 100.0 < CENTS_GUARD_THRESHOLD {
        amount /= 100.0;
    }
    round2(amount)
}

/// Strips everything but digits and the decimal point; unparseable input is 0.
pub fn sanitize_money(raw: &str) -> f64 {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    sanitize_amount(digits.parse().unwrap_or(0.0))
}

pub fn sanitize(money: Option<Money>) -> Option<Money> {
    money.map(|m| match m {
        Money::Amount(value) => Money::Amount(sanitize_amount(value)),
        Money::Pending => Money::Pending,
    })
}

/// Thresholds for the Airbnb-only `needs_date_review` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewThresholds {
    pub max_stay_nights: i64,
    pub manual_review_days_ahead: i64,
    /// Check-in this many calendar years past the booking year is flagged
    pub suspect_year_offset: i32,
}

impl Default for ReviewThresholds {
    fn default() -> Self {
        Self {
            max_stay_nights: 60,
            manual_review_days_ahead: 180,
            suspect_year_offset: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    thresholds: ReviewThresholds,
}

impl FeeCalculator {
    pub fn new(thresholds: ReviewThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ReviewThresholds {
        &self.thresholds
    }

    pub fn breakdown(&self, reservation: &Reservation) -> FeeBreakdown {
        let amount = |m: Option<Money>| m.map(|m| m.amount_or_zero()).unwrap_or(0.0);

        let accommodation = amount(reservation.accommodation);
        let resort = amount(reservation.resort_fee);
        let cleaning = amount(reservation.cleaning_fee);
        let taxes = amount(reservation.taxes);

        if reservation.platform.uses_two_tier_fees() {
            FeeBreakdown {
                accommodation_total: sanitize_amount(accommodation + resort),
                service_commission: sanitize_amount(
                    (accommodation + resort + cleaning + taxes) * TWO_TIER_SERVICE_RATE,
                ),
                base_commission: sanitize_amount(
                    (accommodation + resort + taxes) * TWO_TIER_BASE_RATE,
                ),
            }
        } else {
            FeeBreakdown {
                accommodation_total: sanitize_amount(accommodation),
                service_commission: sanitize_amount(amount(reservation.host_service_fee)),
                base_commission: 0.0,
            }
        }
    }

    /// Airbnb only. Flags broken stay lengths, far-future check-ins and
    /// check-ins landing in a suspicious later year.
    pub fn needs_date_review(&self, reservation: &Reservation, today: NaiveDate) -> bool {
        if reservation.platform != Platform::Airbnb {
            return false;
        }

        if let Some(check_out) = reservation.check_out {
            let nights = (check_out - reservation.check_in).num_days();
            if nights <= 0 || nights > self.thresholds.max_stay_nights {
                return true;
            }
        }

        let anchor = reservation.booking_date.unwrap_or(today);
        let days_ahead = (reservation.check_in - anchor).num_days();
        if days_ahead > self.thresholds.manual_review_days_ahead {
            return true;
        }

        reservation.check_in.year() >= anchor.year() + self.thresholds.suspect_year_offset
    }

    /// Sanitizes every line item and fills the derived fields in place.
    pub fn apply(&self, reservation: &mut Reservation, today: NaiveDate) {
        reservation.accommodation = sanitize(reservation.accommodation);
        reservation.cleaning_fee = sanitize(reservation.cleaning_fee);
        reservation.guest_service_fee = sanitize(reservation.guest_service_fee);
        reservation.taxes = sanitize(reservation.taxes);
        reservation.damage_protection_fee = sanitize(reservation.damage_protection_fee);
        reservation.discount = sanitize(reservation.discount);
        reservation.resort_fee = sanitize(reservation.resort_fee);
        reservation.host_service_fee = sanitize(reservation.host_service_fee);
        reservation.payment_processing_fee = sanitize(reservation.payment_processing_fee);

        reservation.fees = self.breakdown(reservation);
        reservation.needs_date_review = self.needs_date_review(reservation, today);
    }
}
