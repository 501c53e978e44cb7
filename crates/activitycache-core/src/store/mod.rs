//! In-memory activity store.
//!
//! This module provides the `ActivityStore`, the single cache of activities
//! the rendering layer reads from, and the pieces it is built on:
//!
//! - `Registry`: identifier → activity map, the only copy of activity state
//! - `attendance::project`: user-relative `is_going`/`is_host` flags
//! - `group_by_date`: activities bucketed by calendar day
//!
//! All writes go through the store's mutation methods. Each one calls the
//! remote service and, on success, applies its local effect in one step
//! before announcing the change on the store's event channel.

pub mod activity_store;
pub mod attendance;
pub mod grouping;
pub mod registry;

pub use activity_store::{ActivityStore, Flags, StoreError, StoreEvent};
pub use attendance::{project, Attendance};
pub use grouping::{group_by_date, DateGroup};
pub use registry::Registry;
