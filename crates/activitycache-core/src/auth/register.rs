use serde::Serialize;

use super::ValidationErrors;

/// Shortest password the service accepts
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Check the format rules the service enforces, before any request is made.
    /// Uniqueness of email and username can only be checked by the service.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.display_name.trim().is_empty() {
            errors.add("displayName", "Display name must not be empty");
        }
        if self.username.trim().is_empty() {
            errors.add("username", "Username must not be empty");
        }
        if self.email.trim().is_empty() {
            errors.add("email", "Email must not be empty");
        } else if !is_valid_email(&self.email) {
            errors.add("email", "Email is not a valid email address");
        }
        if let Some(problem) = password_problem(&self.password) {
            errors.add("password", problem);
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Loose structural check: `local@domain.tld`, no whitespace.
fn is_valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

fn password_problem(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        Some("Password must not be empty")
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        Some("Password must be at least 6 characters")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain 1 lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain 1 uppercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain a number")
    } else if password.chars().all(char::is_alphanumeric) {
        Some("Password must contain non alphanumeric")
    } else {
        None
    }
}
