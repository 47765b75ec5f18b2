use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

use super::{Column, ColumnKind, FieldMap, FieldValue, Filter, ReservationStore, StoreError, StoredRow};
use crate::database::AsyncDbConnection;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// [`ReservationStore`] over the `reservations` table.
#[derive(Clone)]
pub struct SqliteReservationStore {
    db_conn: AsyncDbConnection,
}

fn select_columns() -> String {
    let mut columns = vec!["id".to_string()];
    columns.extend(Column::ALL.iter().map(|c| c.name().to_string()));
    columns.push("created_at".to_string());
    columns.push("updated_at".to_string());
    columns.join(", ")
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Number(n) => Value::Real(*n),
        FieldValue::Integer(i) => Value::Integer(*i),
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Date(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
    }
}

/// Reads a stored value back into the column's kind. NULL and values that
/// do not fit the kind are treated as absent.
fn from_sql_value(column: Column, value: Value) -> Option<FieldValue> {
    match (column.kind(), value) {
        (_, Value::Null) => None,
        (ColumnKind::Text, Value::Text(s)) => Some(FieldValue::Text(s)),
        (ColumnKind::Number, Value::Real(n)) => Some(FieldValue::Number(n)),
        (ColumnKind::Number, Value::Integer(i)) => Some(FieldValue::Number(i as f64)),
        (ColumnKind::Integer, Value::Integer(i)) => Some(FieldValue::Integer(i)),
        (ColumnKind::Bool, Value::Integer(i)) => Some(FieldValue::Bool(i != 0)),
        (ColumnKind::Date, Value::Text(s)) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .ok()
            .map(FieldValue::Date),
        _ => None,
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    let id: i64 = row.get(0)?;
    let mut fields = FieldMap::new();
    for (offset, column) in Column::ALL.iter().enumerate() {
        let value: Value = row.get(offset + 1)?;
        if let Some(value) = from_sql_value(*column, value) {
            fields.insert(*column, value);
        }
    }
    let created_at: i64 = row.get(Column::ALL.len() + 1)?;
    let updated_at: i64 = row.get(Column::ALL.len() + 2)?;

    Ok(StoredRow {
        id,
        fields,
        created_at,
        updated_at,
    })
}

/// Renders a filter as a WHERE clause, pushing bound values in order.
fn filter_sql(filter: &Filter, params: &mut Vec<Value>) -> String {
    match filter {
        Filter::Eq(column, value) => {
            params.push(to_sql_value(value));
            if column.ignores_case() {
                format!("{} = ? COLLATE NOCASE", column.name())
            } else {
                format!("{} = ?", column.name())
            }
        }
        Filter::And(filters) if filters.is_empty() => "1 = 1".to_string(),
        Filter::And(filters) => {
            let parts: Vec<String> = filters.iter().map(|f| filter_sql(f, params)).collect();
            format!("({})", parts.join(" AND "))
        }
    }
}

fn get_row(conn: &Connection, row_id: i64) -> Result<StoredRow, StoreError> {
    let sql = format!("SELECT {} FROM reservations WHERE id = ?1", select_columns());
    match conn.query_row(&sql, [row_id], read_row) {
        Ok(row) => Ok(row),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(row_id)),
        Err(e) => Err(e.into()),
    }
}

/// Re-processing the same message points it at the row it last wrote.
fn record_processed(
    conn: &Connection,
    message_id: &str,
    row_id: i64,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO processed_messages (message_id, reservation_id, processed_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(message_id) DO UPDATE SET
            reservation_id = excluded.reservation_id,
            processed_at = excluded.processed_at",
        rusqlite::params![message_id, row_id, now],
    )?;
    Ok(())
}

impl SqliteReservationStore {
    pub fn new(db_conn: AsyncDbConnection) -> Self {
        Self { db_conn }
    }

    /// Most recently updated rows first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<StoredRow>, StoreError> {
        let conn = self.db_conn.lock().await?;
        let sql = format!(
            "SELECT {} FROM reservations ORDER BY updated_at DESC, id DESC LIMIT ?1",
            select_columns()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([limit as i64], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl ReservationStore for SqliteReservationStore {
    async fn find(&self, filter: &Filter) -> Result<Vec<StoredRow>, StoreError> {
        let conn = self.db_conn.lock().await?;

        let mut params = Vec::new();
        let where_clause = filter_sql(filter, &mut params);
        let sql = format!(
            "SELECT {} FROM reservations WHERE {} ORDER BY id",
            select_columns(),
            where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn create(
        &self,
        fields: &FieldMap,
        source_message: &str,
    ) -> Result<StoredRow, StoreError> {
        if fields.is_empty() {
            return Err(StoreError::EmptyFieldMap);
        }
        let mut conn = self.db_conn.lock().await?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp();

        let mut names: Vec<&str> = fields.keys().map(|c| c.name()).collect();
        names.extend(["created_at", "updated_at"]);
        let mut values: Vec<Value> = fields.values().map(to_sql_value).collect();
        values.extend([Value::Integer(now), Value::Integer(now)]);
        let placeholders = vec!["?"; names.len()].join(", ");

        let sql = format!(
            "INSERT INTO reservations ({}) VALUES ({}) RETURNING id",
            names.join(", "),
            placeholders
        );
        let id: i64 = tx.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        record_processed(&tx, source_message, id, now)?;

        let row = get_row(&tx, id)?;
        tx.commit()?;
        Ok(row)
    }

    async fn update(
        &self,
        row_id: i64,
        fields: &FieldMap,
        source_message: &str,
    ) -> Result<StoredRow, StoreError> {
        if fields.is_empty() {
            return Err(StoreError::EmptyFieldMap);
        }
        let mut conn = self.db_conn.lock().await?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp();

        let mut assignments: Vec<String> = fields
            .keys()
            .map(|c| format!("{} = ?", c.name()))
            .collect();
        assignments.push("updated_at = ?".to_string());
        let mut values: Vec<Value> = fields.values().map(to_sql_value).collect();
        values.push(Value::Integer(now));
        values.push(Value::Integer(row_id));

        let sql = format!(
            "UPDATE reservations SET {} WHERE id = ?",
            assignments.join(", ")
        );
        let changed = tx.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(StoreError::NotFound(row_id));
        }
        record_processed(&tx, source_message, row_id, now)?;

        let row = get_row(&tx, row_id)?;
        tx.commit()?;
        Ok(row)
    }

    async fn is_message_processed(&self, message_id: &str) -> Result<bool, StoreError> {
        let conn = self.db_conn.lock().await?;
        let found = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM processed_messages WHERE message_id = ?1)",
            [message_id],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::temp_database;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base_fields(number: &str, guest: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(Column::ReservationNumber, FieldValue::text(number));
        fields.insert(Column::Platform, FieldValue::text("Airbnb"));
        fields.insert(Column::Channel, FieldValue::text("Airbnb"));
        fields.insert(Column::GuestName, FieldValue::text(guest));
        fields.insert(Column::CheckIn, FieldValue::Date(date(2025, 9, 4)));
        fields.insert(Column::Property, FieldValue::text("Harbor House"));
        fields.insert(Column::NeedsDateReview, FieldValue::Bool(false));
        fields
    }

    #[test]
    fn test_filter_sql_binds_in_order() {
        let filter = Filter::and([
            Filter::eq(Column::GuestName, FieldValue::text("Ana")),
            Filter::eq(Column::CheckIn, FieldValue::Date(date(2025, 1, 2))),
        ]);
        let mut params = Vec::new();
        let sql = filter_sql(&filter, &mut params);
        assert_eq!(sql, "(guest_name = ? COLLATE NOCASE AND check_in = ?)");
        assert_eq!(
            params,
            vec![Value::Text("Ana".to_string()), Value::Text("2025-01-02".to_string())]
        );
    }

    #[tokio::test]
    async fn test_create_find_update() {
        let (_dir, db) = temp_database();
        let store = SqliteReservationStore::new(db.async_connection.clone());

        let mut fields = base_fields("HMABC12345", "Maria Lopez");
        fields.insert(Column::CleaningFee, FieldValue::Number(80.0));
        fields.insert(Column::Adults, FieldValue::Integer(2));
        let created = store.create(&fields, "m1").await.unwrap();
        assert_eq!(created.text(Column::GuestName), Some("Maria Lopez"));
        assert_eq!(created.date(Column::CheckIn), Some(date(2025, 9, 4)));
        assert!(created.get(Column::CheckOut).is_none());

        let found = store
            .find(&Filter::and([
                Filter::eq(Column::GuestName, FieldValue::text("maria lopez")),
                Filter::eq(Column::CheckIn, FieldValue::Date(date(2025, 9, 4))),
            ]))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, created.id);

        let mut patch = FieldMap::new();
        patch.insert(Column::Taxes, FieldValue::Number(42.5));
        let updated = store.update(created.id, &patch, "m2").await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.get(Column::Taxes), Some(&FieldValue::Number(42.5)));
        assert_eq!(updated.get(Column::CleaningFee), Some(&FieldValue::Number(80.0)));
        assert_eq!(updated.get(Column::Adults), Some(&FieldValue::Integer(2)));
    }

    #[tokio::test]
    async fn test_every_contributing_message_stays_processed() {
        let (_dir, db) = temp_database();
        let store = SqliteReservationStore::new(db.async_connection.clone());
        assert!(!store.is_message_processed("m1").await.unwrap());

        let created = store
            .create(&base_fields("HMABC12345", "Maria Lopez"), "m1")
            .await
            .unwrap();
        let mut patch = FieldMap::new();
        patch.insert(Column::MailMessageId, FieldValue::text("m2"));
        store.update(created.id, &patch, "m2").await.unwrap();

        assert!(store.is_message_processed("m1").await.unwrap());
        assert!(store.is_message_processed("m2").await.unwrap());
        assert!(!store.is_message_processed("m3").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_update_records_nothing() {
        let (_dir, db) = temp_database();
        let store = SqliteReservationStore::new(db.async_connection.clone());

        let mut patch = FieldMap::new();
        patch.insert(Column::Taxes, FieldValue::Number(1.0));
        assert!(store.update(999, &patch, "m1").await.is_err());
        assert!(!store.is_message_processed("m1").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_row_and_empty_map() {
        let (_dir, db) = temp_database();
        let store = SqliteReservationStore::new(db.async_connection.clone());

        let mut patch = FieldMap::new();
        patch.insert(Column::Taxes, FieldValue::Number(1.0));
        assert!(matches!(
            store.update(999, &patch, "m1").await,
            Err(StoreError::NotFound(999))
        ));
        assert!(matches!(
            store.create(&FieldMap::new(), "m1").await,
            Err(StoreError::EmptyFieldMap)
        ));
    }

    #[tokio::test]
    async fn test_list_recent_orders_newest_first() {
        let (_dir, db) = temp_database();
        let store = SqliteReservationStore::new(db.async_connection.clone());

        let first = store.create(&base_fields("HMAAAA1111", "Ana Ruiz"), "m1").await.unwrap();
        let second = store.create(&base_fields("HMBBBB2222", "Ben Ode"), "m2").await.unwrap();

        let rows = store.list_recent(10).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    }
}
