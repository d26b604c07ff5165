//! Utility functions for id generation and timestamp handling.
//!
//! Ids are client-generated UUIDs so entities can be referenced before any
//! network round trip. Timestamps are UTC and serialize as RFC 3339.

mod ids;
pub mod timestamps;

pub use ids::{generate_id, generate_uuid, is_valid_id};
pub use timestamps::{now_utc, Timestamp};
