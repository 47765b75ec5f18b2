pub mod llm;
pub mod reservation_extractor;

pub use llm::{GeminiClient, LlmClient, LlmError};
pub use reservation_extractor::{AiReservationFields, ReservationExtractorAgent};
