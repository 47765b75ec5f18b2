use chrono::{Datelike, NaiveDate};
use shared_types::Platform;
use std::sync::Arc;

use crate::llm::LlmClient;
use crate::reservation_extractor::system_prompt::{build_system_prompt, build_user_prompt};
use crate::reservation_extractor::types::AiReservationFields;

/// Bodies are truncated before prompting; confirmations carry their data
/// well within this many characters.
const MAX_BODY_CHARS: usize = 20_000;

pub struct ReservationExtractorAgent {
    llm_client: Arc<dyn LlmClient>,
}

impl ReservationExtractorAgent {
    pub fn new(llm_client: Arc<dyn LlmClient>) -> Self {
        Self { llm_client }
    }

    /// One call, no retry. Every failure is logged and returned as `None`.
    pub async fn extract(
        &self,
        platform: Platform,
        subject: &str,
        body: &str,
        reference: NaiveDate,
    ) -> Option<AiReservationFields> {
        let system_prompt = build_system_prompt(platform, reference.year());
        let body: String = body.chars().take(MAX_BODY_CHARS).collect();
        let user_prompt = build_user_prompt(subject, &body);

        tracing::debug!(
            model = self.llm_client.model_name(),
            platform = platform.storage_label(),
            "Requesting AI extraction"
        );

        let raw = match self
            .llm_client
            .complete_json(&system_prompt, &user_prompt)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "AI extraction call failed");
                return None;
            }
        };

        let parsed = AiReservationFields::parse(&raw);
        if parsed.is_none() {
            tracing::warn!(
                response_len = raw.len(),
                "AI extraction returned no usable data"
            );
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedClient {
        answer: Result<String, u16>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete_json(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(user.contains("**Subject:**"));
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "unavailable".to_string(),
                }),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    #[tokio::test]
    async fn test_extract_parses_answer() {
        let client = Arc::new(ScriptedClient {
            answer: Ok(r#"{"reservation_number": "HMABC12345", "platform": "Airbnb"}"#.to_string()),
            calls: AtomicUsize::new(0),
        });
        let agent = ReservationExtractorAgent::new(client.clone());

        let fields = agent
            .extract(Platform::Airbnb, "Reservation confirmed", "body", reference())
            .await
            .unwrap();
        assert_eq!(fields.reservation_number.as_deref(), Some("HMABC12345"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_call_is_not_retried() {
        let client = Arc::new(ScriptedClient {
            answer: Err(503),
            calls: AtomicUsize::new(0),
        });
        let agent = ReservationExtractorAgent::new(client.clone());

        let fields = agent
            .extract(Platform::Airbnb, "Reservation confirmed", "body", reference())
            .await;
        assert!(fields.is_none());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_garbage_answer_is_none() {
        let client = Arc::new(ScriptedClient {
            answer: Ok("I could not find a reservation.".to_string()),
            calls: AtomicUsize::new(0),
        });
        let agent = ReservationExtractorAgent::new(client);
        assert!(agent
            .extract(Platform::Vrbo, "Booking", "body", reference())
            .await
            .is_none());
    }
}
