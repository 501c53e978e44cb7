//! Remote activity service.
//!
//! This module provides the `ActivityService` trait the store talks to, and
//! `ApiClient`, its implementation over the REST API.
//!
//! The API uses JWT bearer token authentication obtained from the
//! register/login endpoints.

pub mod client;
pub mod error;
pub mod service;

pub use client::ApiClient;
pub use error::ApiError;
pub use service::ActivityService;
