use shared_types::Reservation;
use std::collections::HashSet;

/// Keys written during one sync run. Owned by a single run and dropped
/// with it.
#[derive(Debug, Default)]
pub struct RunState {
    reservation_keys: HashSet<String>,
    /// Stays of canonical reservations only
    canonical_stay_keys: HashSet<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_reservation(&self, reservation: &Reservation) -> bool {
        self.reservation_keys
            .contains(&reservation.reservation_key())
    }

    pub fn has_canonical_stay(&self, reservation: &Reservation) -> bool {
        self.canonical_stay_keys.contains(&reservation.stay_key())
    }

    pub fn record(&mut self, reservation: &Reservation) {
        self.reservation_keys.insert(reservation.reservation_key());
        if reservation.is_canonical() {
            self.canonical_stay_keys.insert(reservation.stay_key());
        }
    }
}
