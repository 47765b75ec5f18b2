//! Duplicate/upgrade resolution and the single write per message.

pub mod resolver;
pub mod run_state;
pub mod upsert;

pub use resolver::{DuplicateResolver, Resolution};
pub use run_state::RunState;
pub use upsert::{build_field_map, UpsertExecutor, WriteMode};
