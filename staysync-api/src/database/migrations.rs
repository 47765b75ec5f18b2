use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    // One row per physical reservation. Nullable columns stay NULL when the
    // confirmation did not carry the value.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reservations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reservation_number VARCHAR NOT NULL,
            platform VARCHAR NOT NULL,
            channel VARCHAR NOT NULL,
            guest_name VARCHAR NOT NULL,
            guest_phone VARCHAR,
            guest_email VARCHAR,
            check_in VARCHAR NOT NULL,
            check_out VARCHAR,
            booking_date VARCHAR,
            property VARCHAR NOT NULL,
            raw_property VARCHAR,
            adults INTEGER,
            children INTEGER,
            accommodation DOUBLE,
            cleaning_fee DOUBLE,
            guest_service_fee DOUBLE,
            taxes DOUBLE,
            damage_protection DOUBLE,
            discount DOUBLE,
            resort_fee DOUBLE,
            service_commission DOUBLE,
            base_commission DOUBLE,
            payment_processing_fee DOUBLE,
            needs_date_review BOOLEAN NOT NULL DEFAULT 0,
            mail_message_id VARCHAR,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reservations_number_platform
            ON reservations(reservation_number, platform)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reservations_mail_message
            ON reservations(mail_message_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reservations_guest_check_in
            ON reservations(guest_name, check_in)",
        [],
    )?;

    // Every message that contributed to a row. `reservations.mail_message_id`
    // only holds the latest one, so idempotency is checked here.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS processed_messages (
            message_id VARCHAR PRIMARY KEY,
            reservation_id INTEGER NOT NULL REFERENCES reservations(id),
            processed_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO processed_messages (message_id, reservation_id, processed_at)
            SELECT mail_message_id, id, updated_at FROM reservations
            WHERE mail_message_id IS NOT NULL",
        [],
    )?;

    // Run history
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sync_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            status VARCHAR NOT NULL DEFAULT 'running' CHECK (status IN ('running', 'completed', 'failed')),
            emails_found BIGINT NOT NULL DEFAULT 0,
            records_upserted BIGINT NOT NULL DEFAULT 0,
            emails_skipped BIGINT NOT NULL DEFAULT 0,
            error_message VARCHAR,
            started_at BIGINT NOT NULL,
            completed_at BIGINT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sync_runs_started
            ON sync_runs(started_at)",
        [],
    )?;

    Ok(())
}
