pub mod reservation_sync_manager;

pub use reservation_sync_manager::ReservationSyncManager;
