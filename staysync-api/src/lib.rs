pub mod config;
pub mod database;
pub mod handlers;
pub mod helpers;
pub mod integrations;
pub mod jobs;
pub mod storage;
pub mod sync;

pub use database::Database;
pub use jobs::ReservationSyncManager;
