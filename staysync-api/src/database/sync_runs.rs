use crate::database::AsyncDbConnection;
use anyhow::Result;
use rusqlite::params;
use shared_types::{RunSummary, SyncRun, SyncRunStatus};

pub async fn start_sync_run(conn: AsyncDbConnection) -> Result<i64> {
    let conn = conn.lock().await?;
    let now = chrono::Utc::now().timestamp();

    let id: i64 = conn.query_row(
        "INSERT INTO sync_runs (status, started_at) VALUES ('running', ?1) RETURNING id",
        params![now],
        |row| row.get(0),
    )?;

    Ok(id)
}

pub async fn complete_sync_run(
    conn: AsyncDbConnection,
    run_id: i64,
    summary: &RunSummary,
) -> Result<()> {
    let conn = conn.lock().await?;
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "UPDATE sync_runs
         SET status = 'completed', emails_found = ?1, records_upserted = ?2,
             emails_skipped = ?3, completed_at = ?4
         WHERE id = ?5",
        params![
            summary.emails_found as i64,
            summary.records_upserted as i64,
            summary.emails_skipped as i64,
            now,
            run_id
        ],
    )?;

    Ok(())
}

pub async fn fail_sync_run(conn: AsyncDbConnection, run_id: i64, error: &str) -> Result<()> {
    let conn = conn.lock().await?;
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "UPDATE sync_runs SET status = 'failed', error_message = ?1, completed_at = ?2
         WHERE id = ?3",
        params![error, now, run_id],
    )?;

    Ok(())
}

pub async fn list_sync_runs(conn: AsyncDbConnection, limit: usize) -> Result<Vec<SyncRun>> {
    let conn = conn.lock().await?;

    let mut stmt = conn.prepare(
        "SELECT id, status, emails_found, records_upserted, emails_skipped,
                error_message, started_at, completed_at
         FROM sync_runs
         ORDER BY started_at DESC, id DESC
         LIMIT ?1",
    )?;

    let runs = stmt
        .query_map([limit as i64], |row| {
            let status: String = row.get(1)?;
            Ok(SyncRun {
                id: row.get(0)?,
                status: SyncRunStatus::parse(&status),
                summary: RunSummary {
                    emails_found: row.get::<_, i64>(2)? as u64,
                    records_upserted: row.get::<_, i64>(3)? as u64,
                    emails_skipped: row.get::<_, i64>(4)? as u64,
                },
                error_message: row.get(5)?,
                started_at: row.get(6)?,
                completed_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(runs)
}
