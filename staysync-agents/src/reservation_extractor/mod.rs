pub mod agent;
pub mod system_prompt;
pub mod types;

pub use agent::ReservationExtractorAgent;
pub use types::{AiMoney, AiReservationFields};
