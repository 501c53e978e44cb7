use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::Activity;

/// Activities falling on one calendar day, earliest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup {
    pub day: NaiveDate,
    pub activities: Vec<Activity>,
}

impl DateGroup {
    /// "2024-01-31"
    pub fn day_key(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

/// Group activities by the calendar day of their date, in its own offset.
///
/// Days come out ascending. Within a day activities are ordered by instant,
/// ties keeping the order of `activities`.
pub fn group_by_date<'a>(activities: impl IntoIterator<Item = &'a Activity>) -> Vec<DateGroup> {
    let mut sorted: Vec<&Activity> = activities.into_iter().collect();
    sorted.sort_by_key(|a| a.date);

    let mut days: BTreeMap<NaiveDate, Vec<Activity>> = BTreeMap::new();
    for activity in sorted {
        days.entry(activity.date.date_naive())
            .or_default()
            .push(activity.clone());
    }

    days.into_iter()
        .map(|(day, activities)| DateGroup { day, activities })
        .collect()
}
