//! Data models for activities and the people attending them.
//!
//! This module contains:
//!
//! - `ActivityDto`: the wire representation exchanged with the activity service
//! - `Activity`, `Attendee`: the cached, user-relative view of an activity
//! - `UserProfile`, `CurrentUser`: the signed-in account

pub mod activity;
pub mod user;

pub use activity::{parse_activity_date, Activity, ActivityDto, Attendee, InvalidDate};
pub use user::{CurrentUser, UserProfile};
