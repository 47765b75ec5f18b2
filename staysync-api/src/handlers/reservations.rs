use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Deserialize;
use shared_types::ReservationsResponse;
use std::sync::Arc;

use crate::database::Database;
use crate::storage::SqliteReservationStore;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

#[derive(Deserialize)]
pub struct ListQuery {
    limit: Option<usize>,
}

/// Most recently written reservations first.
pub async fn list_reservations(
    db: web::Data<Arc<Database>>,
    query: web::Query<ListQuery>,
) -> ActixResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let store = SqliteReservationStore::new(db.async_connection.clone());

    let rows = store
        .list_recent(limit)
        .await
        .map_err(|e| actix_web::error::ErrorInternalServerError(e.to_string()))?;

    Ok(HttpResponse::Ok().json(ReservationsResponse {
        reservations: rows.iter().map(|row| row.to_record()).collect(),
    }))
}
