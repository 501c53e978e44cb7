use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// One or more field-scoped validation failures.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", summarize(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message for a field. Field names compare case-insensitively since
    /// the service reports `Email`/`UserName` where we use `email`/`username`.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field.eq_ignore_ascii_case(field))
            .map(|e| e.message.as_str())
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Parse a service error body of the form `{"errors": {"Email": "..."}}`.
    /// Message values may also be arrays of strings.
    pub fn from_response_body(body: &str) -> Option<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Messages {
            One(String),
            Many(Vec<String>),
        }

        #[derive(Deserialize)]
        struct Body {
            errors: BTreeMap<String, Messages>,
        }

        let parsed: Body = serde_json::from_str(body).ok()?;
        let mut errors = Self::new();
        for (field, messages) in parsed.errors {
            match messages {
                Messages::One(message) => errors.add(field, message),
                Messages::Many(messages) => {
                    for message in messages {
                        errors.add(field.clone(), message);
                    }
                }
            }
        }
        if errors.is_empty() {
            None
        } else {
            Some(errors)
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
