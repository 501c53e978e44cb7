use indexmap::IndexMap;

use crate::models::Activity;

/// Canonical identifier → activity map.
///
/// Keys always equal `Activity::id`. Every write bumps `version`, which
/// derived views use to tell whether their cached result is still current.
#[derive(Debug, Default)]
pub struct Registry {
    activities: IndexMap<String, Activity>,
    version: u64,
}

impl Registry {
    pub fn get(&self, id: &str) -> Option<&Activity> {
        self.activities.get(id)
    }

    /// Insert or replace the activity stored under its own identifier
    pub fn set(&mut self, activity: Activity) {
        self.activities.insert(activity.id.clone(), activity);
        self.version += 1;
    }

    pub fn delete(&mut self, id: &str) -> Option<Activity> {
        // Order of values() is not part of the contract; swap_remove keeps this O(1)
        let removed = self.activities.swap_remove(id);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    pub fn values(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
