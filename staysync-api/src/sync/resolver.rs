use shared_types::{MailChannel, Platform, Reservation};
use std::sync::Arc;

use super::run_state::RunState;
use super::upsert::WriteMode;
use crate::storage::{Column, FieldValue, Filter, ReservationStore, StoreError, StoredRow};

/// What to do with one validated reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    SkipAlreadyProcessed,
    SkipDuplicateThisRun,
    SkipSupersededByCanonical,
    /// Overwrite a provisional row with the canonical version, keeping its id
    Upgrade { row_id: i64 },
    /// Same reservation number and platform already stored
    Update { row_id: i64 },
    Create,
}

impl Resolution {
    pub fn write_mode(self) -> Option<WriteMode> {
        match self {
            Resolution::Create => Some(WriteMode::Create),
            Resolution::Update { row_id } | Resolution::Upgrade { row_id } => {
                Some(WriteMode::Update { row_id })
            }
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resolution::SkipAlreadyProcessed => "already processed",
            Resolution::SkipDuplicateThisRun => "duplicate this run",
            Resolution::SkipSupersededByCanonical => "superseded by canonical channel",
            Resolution::Upgrade { .. } => "upgrade",
            Resolution::Update { .. } => "update",
            Resolution::Create => "create",
        }
    }
}

/// Decides between skip, create, update and upgrade. The checks run in a
/// fixed order: already processed, run duplicate, canonical precedence,
/// upgrade, reservation match, create.
pub struct DuplicateResolver {
    store: Arc<dyn ReservationStore>,
}

fn stay_filter(reservation: &Reservation) -> Vec<Filter> {
    vec![
        Filter::eq(Column::GuestName, FieldValue::text(&reservation.guest_name)),
        Filter::eq(Column::CheckIn, FieldValue::Date(reservation.check_in)),
    ]
}

fn row_channel(row: &StoredRow) -> MailChannel {
    row.text(Column::Channel)
        .map(MailChannel::from_label)
        .unwrap_or_default()
}

impl DuplicateResolver {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    pub async fn is_already_processed(&self, message_id: &str) -> Result<bool, StoreError> {
        self.store.is_message_processed(message_id).await
    }

    pub async fn resolve(
        &self,
        reservation: &Reservation,
        message_id: &str,
        state: &RunState,
    ) -> Result<Resolution, StoreError> {
        if self.is_already_processed(message_id).await? {
            return Ok(Resolution::SkipAlreadyProcessed);
        }

        if state.has_reservation(reservation) {
            return Ok(Resolution::SkipDuplicateThisRun);
        }
        if state.has_canonical_stay(reservation) {
            return Ok(if reservation.is_provisional() {
                Resolution::SkipSupersededByCanonical
            } else {
                Resolution::SkipDuplicateThisRun
            });
        }

        if reservation.is_provisional() && self.canonical_stay_exists(reservation).await? {
            return Ok(Resolution::SkipSupersededByCanonical);
        }

        if reservation.is_canonical() {
            if let Some(row_id) = self.provisional_row(reservation).await? {
                return Ok(Resolution::Upgrade { row_id });
            }
        }

        let same_reservation = self
            .store
            .find(&Filter::and([
                Filter::eq(
                    Column::ReservationNumber,
                    FieldValue::text(&reservation.reservation_number),
                ),
                Filter::eq(
                    Column::Platform,
                    FieldValue::text(reservation.platform.storage_label()),
                ),
            ]))
            .await?;
        if let Some(row) = same_reservation.first() {
            return Ok(Resolution::Update { row_id: row.id });
        }

        Ok(Resolution::Create)
    }

    /// A canonical row for the same guest and dates is already stored.
    async fn canonical_stay_exists(&self, reservation: &Reservation) -> Result<bool, StoreError> {
        let mut filters = stay_filter(reservation);
        filters.push(Filter::eq(
            Column::Platform,
            FieldValue::text(Platform::Airbnb.storage_label()),
        ));
        filters.push(Filter::eq(
            Column::Channel,
            FieldValue::text(MailChannel::Airbnb.label()),
        ));
        if let Some(check_out) = reservation.check_out {
            filters.push(Filter::eq(Column::CheckOut, FieldValue::Date(check_out)));
        }

        Ok(!self.store.find(&Filter::and(filters)).await?.is_empty())
    }

    /// A provisional row for the same guest and check-in, if any.
    async fn provisional_row(&self, reservation: &Reservation) -> Result<Option<i64>, StoreError> {
        let rows = self.store.find(&Filter::and(stay_filter(reservation))).await?;
        Ok(rows
            .iter()
            .find(|row| row_channel(row).is_intermediary())
            .map(|row| row.id))
    }
}
