//! activitycache core - a reactive, in-memory cache of activities backed by a
//! remote REST service.
//!
//! The `ActivityStore` holds every activity the client has seen, performs
//! create/edit/delete/attend mutations against the service, and exposes
//! derived views (activities grouped by day, per-user attendance flags) for
//! whatever renders them.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ActivityService, ApiClient, ApiError};
pub use config::Config;
pub use models::{Activity, ActivityDto, Attendee, CurrentUser, UserProfile};
pub use store::{ActivityStore, DateGroup, Flags, StoreError, StoreEvent};
