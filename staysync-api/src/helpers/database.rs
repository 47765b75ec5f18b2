use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ApiConfig;
use crate::database::Database;

/// Returns the path to the staysync database
///
/// `[database] path` wins when set. Otherwise:
///
/// - **macOS**: `~/Library/Application Support/staysync/db.sqlite`
/// - **Linux**: `~/.local/share/staysync/db.sqlite`
/// - **Windows**: `%LOCALAPPDATA%\staysync\db.sqlite`
pub fn get_db_path(config: &ApiConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = config.database.as_ref().and_then(|d| d.path.as_deref()) {
        return Ok(PathBuf::from(path));
    }

    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(data_dir.join("staysync").join("db.sqlite"))
}

/// Opens the database, creating and migrating it on first use. Existing
/// data is kept; it is what makes re-runs idempotent.
pub fn initialize_database(config: &ApiConfig) -> anyhow::Result<Arc<Database>> {
    let db_path = get_db_path(config)?;
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "Database ready");
    Ok(Arc::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    #[test]
    fn test_configured_path_wins() {
        let config = ApiConfig {
            database: Some(DatabaseConfig {
                path: Some("/tmp/staysync-test/db.sqlite".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(
            get_db_path(&config).unwrap(),
            PathBuf::from("/tmp/staysync-test/db.sqlite")
        );
    }

    #[tokio::test]
    async fn test_reopening_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = ApiConfig {
            database: Some(DatabaseConfig {
                path: Some(dir.path().join("db.sqlite").display().to_string()),
            }),
            ..Default::default()
        };

        {
            let db = initialize_database(&config).unwrap();
            let conn = db.async_connection.lock().await.unwrap();
            conn.execute(
                "INSERT INTO sync_runs (status, started_at) VALUES ('completed', 1)",
                [],
            )
            .unwrap();
        }

        let db = initialize_database(&config).unwrap();
        let conn = db.async_connection.lock().await.unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sync_runs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
