//! Account and session handling.
//!
//! This module provides:
//! - `RegisterRequest`, `LoginRequest`: account payloads with local validation
//! - `ValidationErrors`: field-scoped validation failures, local or from the service
//! - `Session`: the signed-in profile and bearer token, persisted to disk
//!
//! Sessions are stored in the cache directory and expire after 7 days.

pub mod register;
pub mod session;
pub mod validation;

pub use register::{LoginRequest, RegisterRequest};
pub use session::{Session, SessionData};
pub use validation::{FieldError, ValidationErrors};
