use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Deserialize;
use shared_types::SyncRunsResponse;
use std::sync::Arc;
use tracing::info;

use crate::database::{sync_runs, Database};
use crate::jobs::ReservationSyncManager;

/// Runs one sync now and returns its summary. A second request waits for
/// the running one to finish.
pub async fn trigger_sync(
    manager: web::Data<Arc<ReservationSyncManager>>,
) -> ActixResult<HttpResponse> {
    info!("Triggering reservation sync");

    let summary = manager
        .run_sync()
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(format!("{e:#}")))?;

    Ok(HttpResponse::Ok().json(summary))
}

#[derive(Deserialize)]
pub struct RunsQuery {
    limit: Option<usize>,
}

pub async fn list_sync_runs(
    db: web::Data<Arc<Database>>,
    query: web::Query<RunsQuery>,
) -> ActixResult<HttpResponse> {
    let runs = sync_runs::list_sync_runs(db.async_connection.clone(), query.limit.unwrap_or(20))
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    Ok(HttpResponse::Ok().json(SyncRunsResponse { runs }))
}
