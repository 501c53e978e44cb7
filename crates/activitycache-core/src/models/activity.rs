use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CurrentUser;

/// Offset-less timestamp layouts accepted from the service, tried in order.
/// These are read as UTC.
const NAIVE_DATE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid date {value:?} on activity {id}")]
pub struct InvalidDate {
    pub id: String,
    pub value: String,
}

/// Parse an activity timestamp, keeping the offset it was encoded with.
pub fn parse_activity_date(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub username: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "isHost", default)]
    pub is_host: bool,
}

impl Attendee {
    pub fn from_user(user: &CurrentUser, is_host: bool) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            image: user.image.clone(),
            is_host,
        }
    }
}

/// Activity as sent to and received from the activity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDto {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub date: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

/// A cached activity. `is_going` and `is_host` are relative to the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: DateTime<FixedOffset>,
    pub city: String,
    pub venue: String,
    pub attendees: Vec<Attendee>,
    pub is_going: bool,
    pub is_host: bool,
}

impl Activity {
    /// Convert a DTO, parsing its date. User-relative flags start cleared.
    pub fn from_dto(dto: ActivityDto) -> Result<Self, InvalidDate> {
        let date = parse_activity_date(&dto.date).ok_or_else(|| InvalidDate {
            id: dto.id.clone(),
            value: dto.date.clone(),
        })?;

        Ok(Self {
            id: dto.id,
            title: dto.title,
            description: dto.description,
            category: dto.category,
            date,
            city: dto.city,
            venue: dto.venue,
            attendees: dto.attendees,
            is_going: false,
            is_host: false,
        })
    }

    pub fn to_dto(&self) -> ActivityDto {
        ActivityDto {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            date: self.date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            city: self.city.clone(),
            venue: self.venue.clone(),
            attendees: self.attendees.clone(),
        }
    }

    pub fn attendee(&self, username: &str) -> Option<&Attendee> {
        self.attendees.iter().find(|a| a.username == username)
    }

    /// The hosting attendee, if the service reported one
    pub fn host(&self) -> Option<&Attendee> {
        self.attendees.iter().find(|a| a.is_host)
    }

    /// Calendar day key in the date's own offset: "2024-01-31"
    pub fn day_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Formatted datetime: "Feb 06, 2026 @ 07:00 PM"
    pub fn formatted_date(&self) -> String {
        self.date.format("%b %d, %Y @ %I:%M %p").to_string()
    }

    /// "City, Venue", skipping empty parts
    pub fn location(&self) -> String {
        [self.city.as_str(), self.venue.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// Tests
// ============================================================================
