use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use extractors::{
    parse_header_date, FeeCalculator, HeuristicExtractor, NoiseFilter, PlatformClassifier,
    PropertyCatalog, PropertyNormalizer, Reconciler, ReviewThresholds,
};
use shared_types::{MailChannel, Platform, RawMessage, RunSummary};
use staysync_agents::{GeminiClient, LlmClient, ReservationExtractorAgent};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{ApiConfig, MailConfig, MailSourceKind};
use crate::database::{sync_runs, AsyncDbConnection, Database};
use crate::integrations::{EmlDirectorySource, ImapMailSource, MailError, MailQuery, MailSource};
use crate::storage::{ReservationStore, SqliteReservationStore};
use crate::sync::{DuplicateResolver, Resolution, RunState, UpsertExecutor};

/// How one message ended.
#[derive(Debug)]
enum MessageOutcome {
    Written(Resolution),
    Skipped(String),
}

impl MessageOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        MessageOutcome::Skipped(reason.into())
    }
}

/// Parses the configured per-channel queries, canonical channel first.
pub fn build_queries(mail: &MailConfig) -> Result<Vec<MailQuery>, MailError> {
    mail.queries
        .ordered()
        .into_iter()
        .map(|q| MailQuery::parse(q).map(|q| q.with_default_window(mail.newer_than_days)))
        .collect()
}

fn build_mail_source(mail: &MailConfig) -> Result<Arc<dyn MailSource>> {
    match mail.source {
        MailSourceKind::EmlDir => {
            let dir = mail
                .eml_dir
                .as_deref()
                .context("[mail] eml_dir must be set when source = \"eml_dir\"")?;
            let source = EmlDirectorySource::open(dir)
                .with_context(|| format!("Failed to open mail directory {dir}"))?;
            Ok(Arc::new(source))
        }
        MailSourceKind::Imap => {
            let imap = mail
                .imap
                .clone()
                .context("[mail.imap] must be set when source = \"imap\"")?;
            Ok(Arc::new(ImapMailSource::new(imap, mail.max_messages)))
        }
    }
}

/// Loads the catalog file named in config, or the built-in catalog.
pub fn load_catalog(config: &ApiConfig) -> Result<PropertyCatalog> {
    match config.catalog.as_ref().and_then(|c| c.path.as_deref()) {
        Some(path) => PropertyCatalog::load(Path::new(path))
            .with_context(|| format!("Failed to load property catalog {path}")),
        None => PropertyCatalog::builtin().context("Built-in property catalog is invalid"),
    }
}

fn build_ai_agent(config: &ApiConfig) -> Result<Option<ReservationExtractorAgent>> {
    let Some(api_key) = config.gemini_api_key() else {
        tracing::info!("No Gemini API key configured, AI fallback disabled");
        return Ok(None);
    };

    let mut client = GeminiClient::new(api_key).context("Failed to build Gemini client")?;
    if let Some(llm) = &config.llm {
        if let Some(model) = &llm.model {
            client = client.with_model(model);
        }
        if let Some(endpoint) = &llm.endpoint {
            client = client.with_endpoint(endpoint);
        }
    }

    let client: Arc<dyn LlmClient> = Arc::new(client);
    tracing::info!(model = client.model_name(), "AI fallback enabled");
    Ok(Some(ReservationExtractorAgent::new(client)))
}

/// Runs the booking pipeline over one batch of mail.
///
/// Messages are processed one at a time, end to end, because the run-scoped
/// duplicate state must be updated before the next message is resolved.
/// Only one sync runs at a time per manager.
pub struct ReservationSyncManager {
    db_conn: AsyncDbConnection,
    mail: Arc<dyn MailSource>,
    queries: Vec<MailQuery>,
    ai_agent: Option<ReservationExtractorAgent>,
    classifier: PlatformClassifier,
    noise_filter: NoiseFilter,
    heuristics: HeuristicExtractor,
    reconciler: Reconciler,
    normalizer: PropertyNormalizer,
    fees: FeeCalculator,
    resolver: DuplicateResolver,
    upsert: UpsertExecutor,
    run_lock: Mutex<()>,
}

impl ReservationSyncManager {
    pub fn new(
        db_conn: AsyncDbConnection,
        mail: Arc<dyn MailSource>,
        queries: Vec<MailQuery>,
        normalizer: PropertyNormalizer,
        thresholds: ReviewThresholds,
    ) -> Self {
        let store: Arc<dyn ReservationStore> =
            Arc::new(SqliteReservationStore::new(db_conn.clone()));

        Self {
            db_conn,
            mail,
            queries,
            ai_agent: None,
            classifier: PlatformClassifier::new(),
            noise_filter: NoiseFilter::new(),
            heuristics: HeuristicExtractor::new(),
            reconciler: Reconciler::new(),
            normalizer,
            fees: FeeCalculator::new(thresholds),
            resolver: DuplicateResolver::new(store.clone()),
            upsert: UpsertExecutor::new(store),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_ai_agent(mut self, agent: ReservationExtractorAgent) -> Self {
        self.ai_agent = Some(agent);
        self
    }

    /// Wires every collaborator from configuration.
    pub fn from_config(config: &ApiConfig, db: &Database) -> Result<Self> {
        let queries = build_queries(&config.mail).context("Invalid [mail.queries]")?;
        let mail = build_mail_source(&config.mail)?;
        let normalizer = PropertyNormalizer::new(load_catalog(config)?);

        let manager = Self::new(
            db.async_connection.clone(),
            mail,
            queries,
            normalizer,
            config.review,
        );

        Ok(match build_ai_agent(config)? {
            Some(agent) => manager.with_ai_agent(agent),
            None => manager,
        })
    }

    /// One recorded sync run measured from today's date.
    pub async fn run_sync(&self) -> Result<RunSummary> {
        let run_id = sync_runs::start_sync_run(self.db_conn.clone()).await?;

        match self.sync(Local::now().date_naive()).await {
            Ok(summary) => {
                sync_runs::complete_sync_run(self.db_conn.clone(), run_id, &summary).await?;
                Ok(summary)
            }
            Err(e) => {
                let message = format!("{e:#}");
                if let Err(db_err) =
                    sync_runs::fail_sync_run(self.db_conn.clone(), run_id, &message).await
                {
                    tracing::error!(run_id, error = %db_err, "Failed to record failed sync run");
                }
                Err(e)
            }
        }
    }

    /// Processes every matching message. Fails only when the batch itself
    /// cannot be listed; per-message failures are counted as skipped.
    pub async fn sync(&self, today: NaiveDate) -> Result<RunSummary> {
        let _guard = self.run_lock.lock().await;

        let ids = self.collect_message_ids().await?;
        let mut summary = RunSummary {
            emails_found: ids.len() as u64,
            ..Default::default()
        };
        tracing::info!(count = ids.len(), "Found candidate booking emails");

        let mut batch = Vec::with_capacity(ids.len());
        for id in ids {
            match self.resolver.is_already_processed(&id).await {
                Ok(true) => {
                    tracing::info!(message_id = %id, decision = "skip", reason = "already processed", "Message skipped");
                    summary.emails_skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(message_id = %id, error = %e, "Processed-message lookup failed");
                    summary.emails_skipped += 1;
                    continue;
                }
            }

            match self.mail.get_content(&id).await {
                Ok(message) => {
                    let (channel, platform) = self.classifier.classify(&message);
                    batch.push((message, channel, platform));
                }
                Err(e) => {
                    tracing::warn!(message_id = %id, error = %e, "Failed to fetch message");
                    summary.emails_skipped += 1;
                }
            }
        }

        // Canonical channel first so later intermediary copies are caught
        batch.sort_by_key(|(_, channel, _)| channel.processing_rank());

        let mut state = RunState::new();
        for (message, channel, platform) in &batch {
            let outcome = self
                .process_message(message, *channel, *platform, today, &mut state)
                .await;

            match outcome {
                Ok(MessageOutcome::Written(resolution)) => {
                    tracing::info!(
                        message_id = %message.id,
                        decision = resolution.label(),
                        channel = channel.label(),
                        "Reservation written"
                    );
                    summary.records_upserted += 1;
                }
                Ok(MessageOutcome::Skipped(reason)) => {
                    tracing::info!(
                        message_id = %message.id,
                        decision = "skip",
                        reason = %reason,
                        "Message skipped"
                    );
                    summary.emails_skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(message_id = %message.id, error = %format!("{e:#}"), "Message failed");
                    summary.emails_skipped += 1;
                }
            }
        }
        debug_assert!(summary.is_balanced());

        tracing::info!(
            found = summary.emails_found,
            upserted = summary.records_upserted,
            skipped = summary.emails_skipped,
            "Sync run finished"
        );
        Ok(summary)
    }

    /// Message ids across all queries, first occurrence wins.
    async fn collect_message_ids(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for query in &self.queries {
            let refs = self
                .mail
                .search(query)
                .await
                .with_context(|| format!("Mail search failed for {:?}", query.terms()))?;
            for message_ref in refs {
                if seen.insert(message_ref.id.clone()) {
                    ids.push(message_ref.id);
                }
            }
        }
        Ok(ids)
    }

    async fn process_message(
        &self,
        message: &RawMessage,
        channel: MailChannel,
        platform: Platform,
        today: NaiveDate,
        state: &mut RunState,
    ) -> Result<MessageOutcome> {
        if channel == MailChannel::Unknown {
            return Ok(MessageOutcome::skipped("unknown platform"));
        }
        if let Some(reason) = self.noise_filter.check(message) {
            return Ok(MessageOutcome::skipped(reason));
        }

        let extraction = self.heuristics.extract(message, channel, platform, today);
        let ai = if extraction.is_sufficient() {
            None
        } else {
            let ai = self.ai_fallback(message, channel, platform, today).await;
            if ai.is_none() {
                let missing = extraction.missing_field().unwrap_or("required fields");
                return Ok(MessageOutcome::skipped(format!("insufficient data: missing {missing}")));
            }
            ai
        };

        let header_date = message.date.as_deref().and_then(parse_header_date);
        let candidate = match self.reconciler.reconcile(extraction, ai, header_date, today) {
            Ok(candidate) => candidate,
            Err(e) => return Ok(MessageOutcome::skipped(e.to_string())),
        };
        let mut reservation = match candidate.finalize() {
            Ok(reservation) => reservation,
            Err(e) => return Ok(MessageOutcome::skipped(e.to_string())),
        };

        reservation.property = self.normalizer.normalize(
            reservation.channel,
            reservation.platform,
            reservation.property_raw.as_deref(),
        );
        self.fees.apply(&mut reservation, today);

        let resolution = self
            .resolver
            .resolve(&reservation, &message.id, state)
            .await
            .context("Duplicate check failed")?;
        let Some(mode) = resolution.write_mode() else {
            return Ok(MessageOutcome::skipped(resolution.label()));
        };

        self.upsert
            .execute(&reservation, &message.id, mode)
            .await
            .with_context(|| format!("Write failed for {}", reservation.reservation_key()))?;
        state.record(&reservation);

        Ok(MessageOutcome::Written(resolution))
    }

    /// AI extraction applies only to canonical-channel mail.
    async fn ai_fallback(
        &self,
        message: &RawMessage,
        channel: MailChannel,
        platform: Platform,
        today: NaiveDate,
    ) -> Option<shared_types::CandidateReservation> {
        if channel != MailChannel::Airbnb {
            return None;
        }
        let agent = self.ai_agent.as_ref()?;

        tracing::debug!(message_id = %message.id, "Heuristics insufficient, trying AI extraction");
        agent
            .extract(platform, &message.subject, &message.body, today)
            .await
            .map(|fields| fields.into_candidate(channel, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::temp_database;
    use crate::storage::{Column, FieldValue};
    use async_trait::async_trait;
    use shared_types::MessageRef;
    use staysync_agents::LlmError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HEADER_DATE: &str = "Fri, 01 Aug 2025 09:15:00 +0000";

    /// Returns every message for every query; the manager de-duplicates.
    struct FakeMailSource {
        messages: Vec<RawMessage>,
        broken_ids: Vec<String>,
    }

    impl FakeMailSource {
        fn new(messages: Vec<RawMessage>) -> Self {
            Self {
                messages,
                broken_ids: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl MailSource for FakeMailSource {
        async fn search(&self, _query: &MailQuery) -> Result<Vec<MessageRef>, MailError> {
            Ok(self
                .messages
                .iter()
                .map(|m| MessageRef {
                    id: m.id.clone(),
                    thread_id: None,
                })
                .collect())
        }

        async fn get_content(&self, id: &str) -> Result<RawMessage, MailError> {
            if self.broken_ids.iter().any(|b| b == id) {
                return Err(MailError::Imap("connection reset".to_string()));
            }
            self.messages
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or_else(|| MailError::NotFound(id.to_string()))
        }
    }

    struct ScriptedLlm {
        answer: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete_json(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 2).unwrap()
    }

    fn message(id: &str, from: &str, subject: &str, body: &str) -> RawMessage {
        RawMessage {
            id: id.to_string(),
            thread_id: None,
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            date: Some(HEADER_DATE.to_string()),
        }
    }

    fn airbnb_confirmation() -> RawMessage {
        message(
            "airbnb-1",
            "Airbnb <automated@airbnb.com>",
            "Reservation confirmed - Maria Lopez arrives Sep 4",
            "Check-in\nSep 4\nCheckout\nSep 7\n\
             Confirmation code\nHMABC12345\n\
             Host service fee (3.0%)\n-$13.50",
        )
    }

    fn lodgify_copy() -> RawMessage {
        message(
            "lodgify-1",
            "Lodgify <notifications@lodgify.com>",
            "New Confirmed Booking: Maria Lopez (3 Nights, Arrival: Sep 4 2025) - #B16138101",
            "Source: Airbnb\nProperty: #3456633",
        )
    }

    fn vrbo_booking() -> RawMessage {
        message(
            "vrbo-1",
            "Vrbo <noreply@vrbo.com>",
            "Instant Booking from Jane Doe: Oct 24 - Oct 27, 2025 - #3456634",
            "Reservation ID: HA1234567\n\
             Cleaning fee: $80.00\n\
             Payment processing fees*\n$TBD",
        )
    }

    fn manager(db: &Database, source: FakeMailSource) -> ReservationSyncManager {
        let queries = build_queries(&MailConfig::default()).unwrap();
        let normalizer = PropertyNormalizer::new(PropertyCatalog::builtin().unwrap());
        ReservationSyncManager::new(
            db.async_connection.clone(),
            Arc::new(source),
            queries,
            normalizer,
            ReviewThresholds::default(),
        )
    }

    async fn stored_rows(db: &Database) -> Vec<crate::storage::StoredRow> {
        SqliteReservationStore::new(db.async_connection.clone())
            .list_recent(50)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let (_dir, db) = temp_database();
        let manager = manager(&db, FakeMailSource::new(vec![airbnb_confirmation(), vrbo_booking()]));

        let first = manager.sync(today()).await.unwrap();
        assert_eq!(first.emails_found, 2);
        assert_eq!(first.records_upserted, 2);
        assert!(first.is_balanced());

        let second = manager.sync(today()).await.unwrap();
        assert_eq!(second.records_upserted, 0);
        assert_eq!(second.emails_skipped, 2);
        assert!(second.is_balanced());

        assert_eq!(stored_rows(&db).await.len(), 2);
    }

    #[tokio::test]
    async fn test_reruns_settle_when_two_emails_share_a_reservation() {
        let (_dir, db) = temp_database();
        let mut fuller = airbnb_confirmation();
        fuller.id = "airbnb-9".to_string();
        fuller.body.push_str("\nCleaning fee\n$80.00");
        let manager = manager(
            &db,
            FakeMailSource::new(vec![airbnb_confirmation(), fuller]),
        );

        let first = manager.sync(today()).await.unwrap();
        assert_eq!(first.records_upserted, 1);
        assert_eq!(first.emails_skipped, 1);

        // A new run may apply the other email once as an update
        manager.sync(today()).await.unwrap();
        let settled = stored_rows(&db).await;
        assert_eq!(settled.len(), 1);

        for _ in 0..2 {
            let rerun = manager.sync(today()).await.unwrap();
            assert_eq!(rerun.records_upserted, 0);
            assert_eq!(rerun.emails_skipped, 2);
        }

        let rows = stored_rows(&db).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, settled[0].id);
        assert_eq!(
            rows[0].text(Column::MailMessageId),
            settled[0].text(Column::MailMessageId)
        );
        assert_eq!(rows[0].updated_at, settled[0].updated_at);
    }

    #[tokio::test]
    async fn test_two_vrbo_units_same_guest_and_dates_both_stored() {
        let (_dir, db) = temp_database();
        let mut second_unit = vrbo_booking();
        second_unit.id = "vrbo-2".to_string();
        second_unit.body = second_unit.body.replace("HA1234567", "HA7654321");
        let manager = manager(&db, FakeMailSource::new(vec![vrbo_booking(), second_unit]));

        let summary = manager.sync(today()).await.unwrap();
        assert_eq!(summary.records_upserted, 2);
        assert_eq!(summary.emails_skipped, 0);

        let mut numbers: Vec<_> = stored_rows(&db)
            .await
            .iter()
            .filter_map(|row| row.text(Column::ReservationNumber).map(str::to_string))
            .collect();
        numbers.sort();
        assert_eq!(numbers, vec!["HA1234567", "HA7654321"]);
    }

    #[tokio::test]
    async fn test_intermediary_copy_superseded_in_same_run() {
        let (_dir, db) = temp_database();
        // Intermediary copy listed first; the canonical one still wins
        let manager = manager(&db, FakeMailSource::new(vec![lodgify_copy(), airbnb_confirmation()]));

        let summary = manager.sync(today()).await.unwrap();
        assert_eq!(summary.emails_found, 2);
        assert_eq!(summary.records_upserted, 1);
        assert_eq!(summary.emails_skipped, 1);

        let rows = stored_rows(&db).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(Column::Channel), Some("Airbnb"));
        assert_eq!(rows[0].text(Column::ReservationNumber), Some("HMABC12345"));
        assert_eq!(
            rows[0].date(Column::CheckIn),
            NaiveDate::from_ymd_opt(2025, 9, 4)
        );
        assert_eq!(
            rows[0].get(Column::ServiceCommission),
            Some(&FieldValue::Number(13.5))
        );
    }

    #[tokio::test]
    async fn test_canonical_upgrades_provisional_row() {
        let (_dir, db) = temp_database();

        let first = manager(&db, FakeMailSource::new(vec![lodgify_copy()]));
        let summary = first.sync(today()).await.unwrap();
        assert_eq!(summary.records_upserted, 1);

        let rows = stored_rows(&db).await;
        let provisional_id = rows[0].id;
        assert_eq!(rows[0].text(Column::Channel), Some("Lodgify"));
        assert_eq!(rows[0].text(Column::Platform), Some("Airbnb"));
        assert_eq!(rows[0].text(Column::Property), Some("Harbor House"));
        assert_eq!(
            rows[0].date(Column::CheckOut),
            NaiveDate::from_ymd_opt(2025, 9, 7)
        );

        let second = manager(
            &db,
            FakeMailSource::new(vec![lodgify_copy(), airbnb_confirmation()]),
        );
        let summary = second.sync(today()).await.unwrap();
        assert_eq!(summary.records_upserted, 1);
        assert_eq!(summary.emails_skipped, 1);

        let rows = stored_rows(&db).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, provisional_id);
        assert_eq!(rows[0].text(Column::Channel), Some("Airbnb"));
        assert_eq!(rows[0].text(Column::ReservationNumber), Some("HMABC12345"));
        assert_eq!(rows[0].text(Column::MailMessageId), Some("airbnb-1"));
    }

    #[tokio::test]
    async fn test_pending_processing_fee_stored_as_zero() {
        let (_dir, db) = temp_database();
        let manager = manager(&db, FakeMailSource::new(vec![vrbo_booking()]));

        manager.sync(today()).await.unwrap();

        let rows = stored_rows(&db).await;
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.text(Column::Platform), Some("Vrbo"));
        assert_eq!(row.text(Column::ReservationNumber), Some("HA1234567"));
        assert_eq!(row.text(Column::GuestName), Some("Jane Doe"));
        assert_eq!(row.text(Column::Property), Some("Dune Cottage"));
        assert_eq!(
            row.get(Column::PaymentProcessingFee),
            Some(&FieldValue::Number(0.0))
        );
        assert_eq!(row.get(Column::CleaningFee), Some(&FieldValue::Number(80.0)));
        assert_eq!(row.get(Column::NeedsDateReview), Some(&FieldValue::Bool(false)));
    }

    #[tokio::test]
    async fn test_ai_fallback_fills_subject_only_confirmation() {
        let (_dir, db) = temp_database();
        let subject_only = message(
            "airbnb-2",
            "Airbnb <automated@airbnb.com>",
            "Reservation confirmed - Maria Lopez arrives Sep 4",
            "Send Maria a message to confirm check-in details.",
        );
        let llm = Arc::new(ScriptedLlm {
            answer: r#"{"reservation_number": "HMXYZ98765", "platform": "Airbnb"}"#.to_string(),
            calls: AtomicUsize::new(0),
        });
        let manager = manager(&db, FakeMailSource::new(vec![subject_only]))
            .with_ai_agent(ReservationExtractorAgent::new(llm.clone()));

        let summary = manager.sync(today()).await.unwrap();
        assert_eq!(summary.records_upserted, 1);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        let rows = stored_rows(&db).await;
        assert_eq!(rows[0].text(Column::ReservationNumber), Some("HMXYZ98765"));
        assert_eq!(rows[0].text(Column::GuestName), Some("Maria Lopez"));
        assert_eq!(
            rows[0].date(Column::CheckIn),
            NaiveDate::from_ymd_opt(2025, 9, 4)
        );
    }

    #[tokio::test]
    async fn test_skips_are_counted_and_never_abort_the_run() {
        let (_dir, db) = temp_database();
        let subject_only = message(
            "airbnb-2",
            "Airbnb <automated@airbnb.com>",
            "Reservation confirmed - Maria Lopez arrives Sep 4",
            "Send Maria a message to confirm check-in details.",
        );
        let noise = message(
            "airbnb-3",
            "Airbnb <automated@airbnb.com>",
            "Maria left a review",
            "",
        );
        let unknown = message("other-1", "friend@example.com", "Lunch on Friday?", "");
        let mut source = FakeMailSource::new(vec![
            subject_only,
            noise,
            unknown,
            vrbo_booking(),
            airbnb_confirmation(),
        ]);
        source.broken_ids.push("airbnb-1".to_string());

        let manager = manager(&db, source);
        let summary = manager.sync(today()).await.unwrap();

        assert_eq!(summary.emails_found, 5);
        assert_eq!(summary.records_upserted, 1);
        assert_eq!(summary.emails_skipped, 4);
        assert!(summary.is_balanced());
    }

    #[tokio::test]
    async fn test_run_sync_records_history() {
        let (_dir, db) = temp_database();
        let manager = manager(&db, FakeMailSource::new(vec![vrbo_booking()]));

        let summary = manager.run_sync().await.unwrap();
        assert_eq!(summary.records_upserted, 1);

        let runs = sync_runs::list_sync_runs(db.async_connection.clone(), 10)
            .await
            .unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].summary.records_upserted, 1);
    }
}
