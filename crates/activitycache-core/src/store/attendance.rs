use crate::models::Activity;

/// User-relative attendance flags for one activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attendance {
    pub is_going: bool,
    pub is_host: bool,
}

impl Attendance {
    pub fn apply(self, activity: &mut Activity) {
        activity.is_going = self.is_going;
        activity.is_host = self.is_host;
    }
}

/// Compute `is_going`/`is_host` for `username` from the attendee list.
pub fn project(activity: &Activity, username: &str) -> Attendance {
    let attendee = activity.attendee(username);
    Attendance {
        is_going: attendee.is_some(),
        is_host: activity
            .attendees
            .iter()
            .any(|a| a.is_host && a.username == username),
    }
}
