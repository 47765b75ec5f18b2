use extractors::sanitize_amount;
use shared_types::{Money, Reservation};
use std::sync::Arc;

use crate::storage::{Column, FieldMap, FieldValue, ReservationStore, StoreError, StoredRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update { row_id: i64 },
}

/// Pending amounts are stored as 0.
fn money_value(money: Option<Money>) -> Option<FieldValue> {
    money.map(|m| FieldValue::Number(sanitize_amount(m.amount_or_zero())))
}

/// Column values for a reservation. Absent values are left out so an
/// update never blanks a stored column.
pub fn build_field_map(reservation: &Reservation, message_id: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    let mut put = |column: Column, value: Option<FieldValue>| {
        if let Some(value) = value {
            fields.insert(column, value);
        }
    };

    put(
        Column::ReservationNumber,
        Some(FieldValue::text(&reservation.reservation_number)),
    );
    put(
        Column::Platform,
        Some(FieldValue::text(reservation.platform.storage_label())),
    );
    put(Column::Channel, Some(FieldValue::text(reservation.channel.label())));
    put(Column::GuestName, Some(FieldValue::text(&reservation.guest_name)));
    put(
        Column::GuestPhone,
        reservation.guest_phone.as_deref().map(FieldValue::text),
    );
    put(
        Column::GuestEmail,
        reservation.guest_email.as_deref().map(FieldValue::text),
    );
    put(Column::CheckIn, Some(FieldValue::Date(reservation.check_in)));
    put(Column::CheckOut, reservation.check_out.map(FieldValue::Date));
    put(Column::BookingDate, reservation.booking_date.map(FieldValue::Date));
    put(Column::Property, Some(FieldValue::text(&reservation.property)));
    put(
        Column::RawProperty,
        reservation.property_raw.as_deref().map(FieldValue::text),
    );
    put(
        Column::Adults,
        reservation.adults.map(|n| FieldValue::Integer(i64::from(n))),
    );
    put(
        Column::Children,
        reservation.children.map(|n| FieldValue::Integer(i64::from(n))),
    );

    // Vrbo folds the resort fee into the accommodation total
    let has_accommodation =
        reservation.accommodation.is_some() || reservation.resort_fee.is_some();
    put(
        Column::Accommodation,
        has_accommodation
            .then(|| FieldValue::Number(sanitize_amount(reservation.fees.accommodation_total))),
    );
    put(Column::CleaningFee, money_value(reservation.cleaning_fee));
    put(Column::GuestServiceFee, money_value(reservation.guest_service_fee));
    put(Column::Taxes, money_value(reservation.taxes));
    put(
        Column::DamageProtection,
        money_value(reservation.damage_protection_fee),
    );
    put(Column::Discount, money_value(reservation.discount));
    put(Column::ResortFee, money_value(reservation.resort_fee));
    put(
        Column::ServiceCommission,
        Some(FieldValue::Number(sanitize_amount(
            reservation.fees.service_commission,
        ))),
    );
    put(
        Column::BaseCommission,
        Some(FieldValue::Number(sanitize_amount(
            reservation.fees.base_commission,
        ))),
    );
    put(
        Column::PaymentProcessingFee,
        money_value(reservation.payment_processing_fee),
    );
    put(
        Column::NeedsDateReview,
        Some(FieldValue::Bool(reservation.needs_date_review)),
    );
    put(Column::MailMessageId, Some(FieldValue::text(message_id)));

    fields
}

/// Issues exactly one create or update per reservation. The store records
/// the message as processed in the same write.
pub struct UpsertExecutor {
    store: Arc<dyn ReservationStore>,
}

impl UpsertExecutor {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        reservation: &Reservation,
        message_id: &str,
        mode: WriteMode,
    ) -> Result<StoredRow, StoreError> {
        let fields = build_field_map(reservation, message_id);
        match mode {
            WriteMode::Create => self.store.create(&fields, message_id).await,
            WriteMode::Update { row_id } => self.store.update(row_id, &fields, message_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::test_support::{date, reservation};
    use shared_types::{FeeBreakdown, MailChannel, Platform};

    #[test]
    fn test_pending_fee_maps_to_zero_and_absent_values_dropped() {
        let mut res = reservation(
            MailChannel::Vrbo,
            Platform::Vrbo,
            "HA1234567",
            "Jane Doe",
            date(2025, 10, 24),
            None,
        );
        res.payment_processing_fee = Some(Money::Pending);
        res.cleaning_fee = Some(Money::Amount(80.0));

        let fields = build_field_map(&res, "m1");
        assert_eq!(
            fields.get(&Column::PaymentProcessingFee),
            Some(&FieldValue::Number(0.0))
        );
        assert_eq!(fields.get(&Column::CleaningFee), Some(&FieldValue::Number(80.0)));
        assert!(!fields.contains_key(&Column::CheckOut));
        assert!(!fields.contains_key(&Column::GuestPhone));
        assert!(!fields.contains_key(&Column::Accommodation));
        assert_eq!(fields.get(&Column::Platform), Some(&FieldValue::text("Vrbo")));
        assert_eq!(fields.get(&Column::MailMessageId), Some(&FieldValue::text("m1")));
    }

    #[test]
    fn test_accommodation_uses_folded_total() {
        let mut res = reservation(
            MailChannel::Vrbo,
            Platform::HomeAway,
            "HA1234567",
            "Jane Doe",
            date(2025, 10, 24),
            None,
        );
        res.accommodation = Some(Money::Amount(1000.0));
        res.resort_fee = Some(Money::Amount(50.0));
        res.fees = FeeBreakdown {
            accommodation_total: 1050.0,
            service_commission: 40.5,
            base_commission: 55.0,
        };

        let fields = build_field_map(&res, "m1");
        assert_eq!(
            fields.get(&Column::Accommodation),
            Some(&FieldValue::Number(1050.0))
        );
        assert_eq!(fields.get(&Column::Platform), Some(&FieldValue::text("Vrbo")));
        assert_eq!(
            fields.get(&Column::BaseCommission),
            Some(&FieldValue::Number(55.0))
        );
    }
}
