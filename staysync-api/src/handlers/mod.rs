pub mod reservations;
pub mod sync;
