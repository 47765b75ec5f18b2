use serde::{Deserialize, Serialize};

pub mod message;
pub mod platform;
pub mod reservation;
pub mod sync;

pub use message::{MessageRef, RawMessage};
pub use platform::{MailChannel, Platform};
pub use reservation::{
    normalize_guest_name, CandidateReservation, FeeBreakdown, Money, PartialDate, Provenance,
    Reservation, Sourced, ValidationError,
};
pub use sync::{
    ReservationRecord, ReservationsResponse, RunSummary, SyncRun, SyncRunStatus, SyncRunsResponse,
};

/// Error response for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
