use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Counters reported at the end of every sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RunSummary {
    /// Unique messages fetched after query de-duplication
    pub emails_found: u64,
    /// Rows created or updated
    pub records_upserted: u64,
    /// Messages that produced no write, for any reason
    pub emails_skipped: u64,
}

impl RunSummary {
    /// Every fetched message ends in exactly one of the two buckets.
    pub fn is_balanced(&self) -> bool {
        self.records_upserted + self.emails_skipped == self.emails_found
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum SyncRunStatus {
    Running,
    Completed,
    Failed,
}

impl SyncRunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncRunStatus::Running => "running",
            SyncRunStatus::Completed => "completed",
            SyncRunStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "running" => SyncRunStatus::Running,
            "completed" => SyncRunStatus::Completed,
            _ => SyncRunStatus::Failed,
        }
    }
}

/// One row of run history
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncRun {
    pub id: i64,
    pub status: SyncRunStatus,
    pub summary: RunSummary,
    pub error_message: Option<String>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncRunsResponse {
    pub runs: Vec<SyncRun>,
}

/// A stored reservation as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReservationRecord {
    pub id: i64,
    pub reservation_number: String,
    pub platform: String,
    pub channel: String,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    /// ISO `YYYY-MM-DD`
    pub check_in: String,
    pub check_out: Option<String>,
    pub booking_date: Option<String>,
    pub property: String,
    pub raw_property: Option<String>,
    pub adults: Option<i64>,
    pub children: Option<i64>,
    pub accommodation: Option<f64>,
    pub cleaning_fee: Option<f64>,
    pub guest_service_fee: Option<f64>,
    pub taxes: Option<f64>,
    pub damage_protection: Option<f64>,
    pub discount: Option<f64>,
    pub resort_fee: Option<f64>,
    pub service_commission: Option<f64>,
    pub base_commission: Option<f64>,
    pub payment_processing_fee: Option<f64>,
    pub needs_date_review: bool,
    pub mail_message_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReservationsResponse {
    pub reservations: Vec<ReservationRecord>,
}
