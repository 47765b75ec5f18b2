//! Tabular reservation storage.
//!
//! The pipeline talks to storage only through [`ReservationStore`]. Filters
//! and field maps are built from the closed [`Column`] set, so callers never
//! assemble SQL.

pub mod sqlite_storage;

pub use sqlite_storage::SqliteReservationStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared_types::ReservationRecord;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Row {0} not found")]
    NotFound(i64),

    #[error("Refusing to write an empty field map")]
    EmptyFieldMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    ReservationNumber,
    Platform,
    Channel,
    GuestName,
    GuestPhone,
    GuestEmail,
    CheckIn,
    CheckOut,
    BookingDate,
    Property,
    RawProperty,
    Adults,
    Children,
    Accommodation,
    CleaningFee,
    GuestServiceFee,
    Taxes,
    DamageProtection,
    Discount,
    ResortFee,
    ServiceCommission,
    BaseCommission,
    PaymentProcessingFee,
    NeedsDateReview,
    MailMessageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    Integer,
    Bool,
    Date,
}

impl Column {
    pub const ALL: [Column; 25] = [
        Column::ReservationNumber,
        Column::Platform,
        Column::Channel,
        Column::GuestName,
        Column::GuestPhone,
        Column::GuestEmail,
        Column::CheckIn,
        Column::CheckOut,
        Column::BookingDate,
        Column::Property,
        Column::RawProperty,
        Column::Adults,
        Column::Children,
        Column::Accommodation,
        Column::CleaningFee,
        Column::GuestServiceFee,
        Column::Taxes,
        Column::DamageProtection,
        Column::Discount,
        Column::ResortFee,
        Column::ServiceCommission,
        Column::BaseCommission,
        Column::PaymentProcessingFee,
        Column::NeedsDateReview,
        Column::MailMessageId,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::ReservationNumber => "reservation_number",
            Column::Platform => "platform",
            Column::Channel => "channel",
            Column::GuestName => "guest_name",
            Column::GuestPhone => "guest_phone",
            Column::GuestEmail => "guest_email",
            Column::CheckIn => "check_in",
            Column::CheckOut => "check_out",
            Column::BookingDate => "booking_date",
            Column::Property => "property",
            Column::RawProperty => "raw_property",
            Column::Adults => "adults",
            Column::Children => "children",
            Column::Accommodation => "accommodation",
            Column::CleaningFee => "cleaning_fee",
            Column::GuestServiceFee => "guest_service_fee",
            Column::Taxes => "taxes",
            Column::DamageProtection => "damage_protection",
            Column::Discount => "discount",
            Column::ResortFee => "resort_fee",
            Column::ServiceCommission => "service_commission",
            Column::BaseCommission => "base_commission",
            Column::PaymentProcessingFee => "payment_processing_fee",
            Column::NeedsDateReview => "needs_date_review",
            Column::MailMessageId => "mail_message_id",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::CheckIn | Column::CheckOut | Column::BookingDate => ColumnKind::Date,
            Column::Adults | Column::Children => ColumnKind::Integer,
            Column::NeedsDateReview => ColumnKind::Bool,
            Column::Accommodation
            | Column::CleaningFee
            | Column::GuestServiceFee
            | Column::Taxes
            | Column::DamageProtection
            | Column::Discount
            | Column::ResortFee
            | Column::ServiceCommission
            | Column::BaseCommission
            | Column::PaymentProcessingFee => ColumnKind::Number,
            _ => ColumnKind::Text,
        }
    }

    /// Guest names compare case-insensitively.
    pub fn ignores_case(self) -> bool {
        matches!(self, Column::GuestName)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Column values to write. Absent columns are left untouched on update.
pub type FieldMap = BTreeMap<Column, FieldValue>;

/// Equality/AND predicates over named columns
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(Column, FieldValue),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: Column, value: FieldValue) -> Self {
        Filter::Eq(column, value)
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }
}

/// A persisted reservation row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub fields: FieldMap,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StoredRow {
    pub fn get(&self, column: Column) -> Option<&FieldValue> {
        self.fields.get(&column)
    }

    pub fn text(&self, column: Column) -> Option<&str> {
        self.get(column).and_then(FieldValue::as_text)
    }

    pub fn date(&self, column: Column) -> Option<NaiveDate> {
        self.get(column).and_then(FieldValue::as_date)
    }

    fn number(&self, column: Column) -> Option<f64> {
        self.get(column).and_then(FieldValue::as_number)
    }

    fn date_string(&self, column: Column) -> Option<String> {
        self.date(column).map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn to_record(&self) -> ReservationRecord {
        let owned = |column| self.text(column).map(str::to_string);

        ReservationRecord {
            id: self.id,
            reservation_number: owned(Column::ReservationNumber).unwrap_or_default(),
            platform: owned(Column::Platform).unwrap_or_default(),
            channel: owned(Column::Channel).unwrap_or_default(),
            guest_name: owned(Column::GuestName).unwrap_or_default(),
            guest_phone: owned(Column::GuestPhone),
            guest_email: owned(Column::GuestEmail),
            check_in: self.date_string(Column::CheckIn).unwrap_or_default(),
            check_out: self.date_string(Column::CheckOut),
            booking_date: self.date_string(Column::BookingDate),
            property: owned(Column::Property).unwrap_or_default(),
            raw_property: owned(Column::RawProperty),
            adults: self.get(Column::Adults).and_then(FieldValue::as_integer),
            children: self.get(Column::Children).and_then(FieldValue::as_integer),
            accommodation: self.number(Column::Accommodation),
            cleaning_fee: self.number(Column::CleaningFee),
            guest_service_fee: self.number(Column::GuestServiceFee),
            taxes: self.number(Column::Taxes),
            damage_protection: self.number(Column::DamageProtection),
            discount: self.number(Column::Discount),
            resort_fee: self.number(Column::ResortFee),
            service_commission: self.number(Column::ServiceCommission),
            base_commission: self.number(Column::BaseCommission),
            payment_processing_fee: self.number(Column::PaymentProcessingFee),
            needs_date_review: self
                .get(Column::NeedsDateReview)
                .and_then(FieldValue::as_bool)
                .unwrap_or(false),
            mail_message_id: owned(Column::MailMessageId),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn find(&self, filter: &Filter) -> Result<Vec<StoredRow>, StoreError>;

    /// Inserts a row and records `source_message` as processed, atomically.
    async fn create(&self, fields: &FieldMap, source_message: &str)
        -> Result<StoredRow, StoreError>;

    /// Updates a row and records `source_message` as processed, atomically.
    async fn update(
        &self,
        row_id: i64,
        fields: &FieldMap,
        source_message: &str,
    ) -> Result<StoredRow, StoreError>;

    /// True once any write has recorded this message, even if a later
    /// message has since overwritten the row.
    async fn is_message_processed(&self, message_id: &str) -> Result<bool, StoreError>;
}
