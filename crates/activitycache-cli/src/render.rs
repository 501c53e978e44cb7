//! Plain-text rendering of store views.

use activitycache_core::{Activity, DateGroup};

/// "09:00  Run (fitness) - London, Hyde Park  [hosting]"
pub fn activity_row(activity: &Activity) -> String {
    let mut row = format!(
        "{}  {}",
        activity.date.format("%H:%M"),
        activity.title
    );
    if !activity.category.is_empty() {
        row.push_str(&format!(" ({})", activity.category));
    }
    let location = activity.location();
    if !location.is_empty() {
        row.push_str(&format!(" - {}", location));
    }
    if let Some(badge) = badge(activity) {
        row.push_str(&format!("  [{}]", badge));
    }
    row
}

fn badge(activity: &Activity) -> Option<&'static str> {
    if activity.is_host {
        Some("hosting")
    } else if activity.is_going {
        Some("going")
    } else {
        None
    }
}

pub fn date_groups(groups: &[DateGroup]) -> String {
    if groups.is_empty() {
        return "No activities".to_string();
    }
    let mut out = Vec::new();
    for group in groups {
        out.push(group.day.format("%A %d %B %Y").to_string());
        for activity in &group.activities {
            out.push(format!("  {}  {}", activity_row(activity), activity.id));
        }
    }
    out.join("\n")
}

pub fn activity_detail(activity: &Activity) -> String {
    let mut out = vec![
        activity.title.clone(),
        format!("  When:     {}", activity.formatted_date()),
        format!("  Where:    {}", activity.location()),
        format!("  Category: {}", activity.category),
        format!("  Id:       {}", activity.id),
    ];
    if !activity.description.is_empty() {
        out.push(String::new());
        out.push(format!("  {}", activity.description));
    }
    if let Some(host) = activity.host() {
        out.push(String::new());
        out.push(format!("  Hosted by {}", host.display_name));
    }
    if let Some(badge) = badge(activity) {
        out.push(format!("  You are {}", badge));
    }
    out.push(format!("  {} going:", activity.attendees.len()));
    for attendee in &activity.attendees {
        out.push(format!("    {} (@{})", attendee.display_name, attendee.username));
    }
    out.join("\n")
}
