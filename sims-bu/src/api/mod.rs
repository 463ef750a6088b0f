//! HTTP API handlers for sims-bu

pub mod batches;
pub mod buildinfo;
pub mod health;
pub mod sse;
pub mod submit;

pub use batches::{
    add_row, create_batch, discard_batch, get_batch, list_batches, remove_row, update_row,
};
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use sse::event_stream;
pub use submit::{consolidate_batch, submit_batch};
