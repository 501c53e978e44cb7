//! The activity store: cache-first reads, mutations reconciled against the
//! remote service, and the derived views built from the registry.
//!
//! The store is single-threaded. State lives in a `RefCell` that is never
//! borrowed across an `.await`, so several operations may be in flight at
//! once on the same thread (e.g. under `tokio::join!`) while observers read
//! flags and views between their steps.

use std::cell::RefCell;
use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::ActivityService;
use crate::models::{Activity, ActivityDto, Attendee, CurrentUser, InvalidDate};

use super::attendance;
use super::grouping::{group_by_date, DateGroup};
use super::registry::Registry;

// ============================================================================
// Notification messages
// ============================================================================

const LOAD_LIST_ERROR: &str = "Problem loading activities";
const LOAD_ONE_ERROR: &str = "Problem loading activity";
const SUBMIT_ERROR: &str = "Problem submitting data";
const DELETE_ERROR: &str = "Problem deleting activity";
const ATTEND_ERROR: &str = "Problem signing up to activity";
const UNATTEND_ERROR: &str = "Problem cancelling attendance";

// ============================================================================
// Public types
// ============================================================================

/// Signals published by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// State changed; derived views should be re-read
    Changed,
    /// A create/edit succeeded; show the activity's detail view
    Navigate { id: String },
    /// An operation failed; show `message` to the user
    Error { message: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Activity has no identifier")]
    MissingId,

    #[error("No activity is selected")]
    NoSelection,

    #[error(transparent)]
    InvalidDate(#[from] InvalidDate),

    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

/// Transient progress flags, reset when each operation completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    pub loading_initial: bool,
    pub submitting: bool,
    pub loading: bool,
    /// UI element that started the pending delete
    pub target: Option<String>,
}

// ============================================================================
// Internal state
// ============================================================================

/// Per-identifier mutation tickets.
#[derive(Debug, Default, Clone, Copy)]
struct Sequence {
    issued: u64,
    applied: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    registry: Registry,
    /// Identifier of the active selection; the activity itself stays in the registry
    selected: Option<String>,
    flags: Flags,
    /// Never pruned: an entry kept after a delete is what rejects its stale completions
    sequences: HashMap<String, Sequence>,
}

impl StoreState {
    fn issue(&mut self, id: &str) -> u64 {
        let seq = self.sequences.entry(id.to_string()).or_default();
        seq.issued += 1;
        seq.issued
    }

    /// Mark `ticket` applied, unless a mutation issued after it already was.
    fn accept(&mut self, id: &str, ticket: u64) -> bool {
        let seq = self.sequences.entry(id.to_string()).or_default();
        if ticket < seq.applied {
            warn!(id = %id, ticket, applied = seq.applied, "Dropping stale completion");
            return false;
        }
        seq.applied = ticket;
        true
    }

    fn selected_activity(&self) -> Option<&Activity> {
        self.selected.as_deref().and_then(|id| self.registry.get(id))
    }
}

// ============================================================================
// Store
// ============================================================================

pub struct ActivityStore<S> {
    service: S,
    user: CurrentUser,
    state: RefCell<StoreState>,
    /// Last `activities_by_date` result, keyed on registry version
    by_date: RefCell<Option<(u64, Vec<DateGroup>)>>,
    events: mpsc::UnboundedSender<StoreEvent>,
}

impl<S: ActivityService> ActivityStore<S> {
    /// Create an empty store for `user`. Events are delivered on the returned
    /// receiver until the store is dropped.
    pub fn new(service: S, user: CurrentUser) -> (Self, mpsc::UnboundedReceiver<StoreEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let store = Self {
            service,
            user,
            state: RefCell::new(StoreState::default()),
            by_date: RefCell::new(None),
            events,
        };
        (store, rx)
    }

    #[cfg(test)]
    pub(crate) fn service(&self) -> &S {
        &self.service
    }

    // ===== Reads =====

    pub fn get_activity(&self, id: &str) -> Option<Activity> {
        self.state.borrow().registry.get(id).cloned()
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.state.borrow().registry.values().cloned().collect()
    }

    /// The active selection, read through the registry
    pub fn selected(&self) -> Option<Activity> {
        self.state.borrow().selected_activity().cloned()
    }

    pub fn clear_selection(&self) {
        self.transition(|state| state.selected = None);
    }

    /// Activities grouped by calendar day, days ascending.
    /// Recomputed only when the registry has changed since the last call.
    pub fn activities_by_date(&self) -> Vec<DateGroup> {
        let state = self.state.borrow();
        let version = state.registry.version();

        if let Some((cached_version, groups)) = self.by_date.borrow().as_ref() {
            if *cached_version == version {
                return groups.clone();
            }
        }

        let groups = group_by_date(state.registry.values());
        *self.by_date.borrow_mut() = Some((version, groups.clone()));
        groups
    }

    /// Registry version; increases on every registry write
    pub fn version(&self) -> u64 {
        self.state.borrow().registry.version()
    }

    pub fn flags(&self) -> Flags {
        self.state.borrow().flags.clone()
    }

    pub fn loading_initial(&self) -> bool {
        self.state.borrow().flags.loading_initial
    }

    pub fn submitting(&self) -> bool {
        self.state.borrow().flags.submitting
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().flags.loading
    }

    pub fn target(&self) -> Option<String> {
        self.state.borrow().flags.target.clone()
    }

    // ===== Loads =====

    /// Fetch every activity and register it. Existing entries with the same
    /// identifier are replaced; records with unparseable dates are skipped.
    pub async fn load_activities(&self) -> Result<(), StoreError> {
        self.transition(|state| state.flags.loading_initial = true);

        let dtos = match self.service.list().await {
            Ok(dtos) => dtos,
            Err(e) => {
                self.transition(|state| state.flags.loading_initial = false);
                return Err(self.fail(LOAD_LIST_ERROR, e.into()));
            }
        };

        let activities: Vec<Activity> = dtos
            .into_iter()
            .filter_map(|dto| match self.prepare(dto) {
                Ok(activity) => Some(activity),
                Err(e) => {
                    warn!(id = %e.id, date = %e.value, "Skipping activity with invalid date");
                    None
                }
            })
            .collect();

        let count = activities.len();
        self.transition(|state| {
            for activity in activities {
                state.registry.set(activity);
            }
            state.flags.loading_initial = false;
        });

        info!(count, "Loaded activities");
        Ok(())
    }

    /// Select activity `id`, fetching it only if it is not cached.
    pub async fn load_activity(&self, id: &str) -> Result<Activity, StoreError> {
        let cached = self.get_activity(id);
        if let Some(activity) = cached {
            debug!(id = %id, "Activity served from cache");
            self.transition(|state| state.selected = Some(id.to_string()));
            return Ok(activity);
        }

        self.transition(|state| state.flags.loading_initial = true);

        let result = match self.service.details(id).await {
            Ok(dto) => self.prepare(dto).map_err(StoreError::from),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(activity) => {
                let loaded = activity.clone();
                self.transition(|state| {
                    state.selected = Some(activity.id.clone());
                    state.registry.set(activity);
                    state.flags.loading_initial = false;
                });
                Ok(loaded)
            }
            Err(e) => {
                self.transition(|state| state.flags.loading_initial = false);
                Err(self.fail(LOAD_ONE_ERROR, e))
            }
        }
    }

    // ===== Mutations =====

    /// Create `activity` under its caller-assigned identifier. The signed-in
    /// user becomes its host.
    pub async fn create_activity(&self, activity: Activity) -> Result<(), StoreError> {
        if activity.id.trim().is_empty() {
            return Err(StoreError::MissingId);
        }
        let id = activity.id.clone();
        let ticket = self.transition(|state| {
            state.flags.submitting = true;
            state.issue(&id)
        });

        if let Err(e) = self.service.create(&activity.to_dto()).await {
            self.transition(|state| state.flags.submitting = false);
            return Err(self.fail(SUBMIT_ERROR, e.into()));
        }

        let mut created = activity;
        created.attendees = vec![Attendee::from_user(&self.user, true)];
        created.is_going = true;
        created.is_host = true;

        let applied = self.transition(|state| {
            let accepted = state.accept(&id, ticket);
            if accepted {
                state.registry.set(created);
            }
            state.flags.submitting = false;
            accepted
        });

        if applied {
            info!(id = %id, "Created activity");
            self.publish(StoreEvent::Navigate { id });
        }
        Ok(())
    }

    /// Replace the cached activity wholesale and make it the active selection.
    pub async fn edit_activity(&self, activity: Activity) -> Result<(), StoreError> {
        let id = activity.id.clone();
        let ticket = self.transition(|state| {
            state.flags.submitting = true;
            state.issue(&id)
        });

        if let Err(e) = self.service.update(&activity.to_dto()).await {
            self.transition(|state| state.flags.submitting = false);
            return Err(self.fail(SUBMIT_ERROR, e.into()));
        }

        let applied = self.transition(|state| {
            let accepted = state.accept(&id, ticket);
            if accepted {
                state.registry.set(activity);
                state.selected = Some(id.clone());
            }
            state.flags.submitting = false;
            accepted
        });

        if applied {
            info!(id = %id, "Edited activity");
            self.publish(StoreEvent::Navigate { id });
        }
        Ok(())
    }

    /// Delete activity `id`. `target` names the UI element that asked for it,
    /// so only that element shows progress.
    pub async fn delete_activity(&self, id: &str, target: impl Into<String>) -> Result<(), StoreError> {
        let target = target.into();
        let ticket = self.transition(|state| {
            state.flags.submitting = true;
            state.flags.target = Some(target);
            state.issue(id)
        });

        let result = self.service.delete(id).await;

        self.transition(|state| {
            if result.is_ok() && state.accept(id, ticket) {
                state.registry.delete(id);
                if state.selected.as_deref() == Some(id) {
                    state.selected = None;
                }
            }
            state.flags.submitting = false;
            state.flags.target = None;
        });

        match result {
            Ok(()) => {
                info!(id = %id, "Deleted activity");
                Ok(())
            }
            Err(e) => Err(self.fail(DELETE_ERROR, e.into())),
        }
    }

    /// Add the signed-in user to the selected activity's attendees.
    pub async fn attend(&self) -> Result<(), StoreError> {
        let id = self.selected_id()?;
        let ticket = self.transition(|state| {
            state.flags.loading = true;
            state.issue(&id)
        });

        let result = self.service.attend(&id).await;
        let attendee = Attendee::from_user(&self.user, false);

        self.transition(|state| {
            if result.is_ok() && state.accept(&id, ticket) {
                if let Some(mut activity) = state.registry.get(&id).cloned() {
                    if activity.attendee(&attendee.username).is_none() {
                        activity.attendees.push(attendee);
                    }
                    attendance::project(&activity, &self.user.username).apply(&mut activity);
                    state.registry.set(activity);
                }
            }
            state.flags.loading = false;
        });

        result.map_err(|e| self.fail(ATTEND_ERROR, e.into()))
    }

    /// Remove the signed-in user from the selected activity's attendees.
    pub async fn unattend(&self) -> Result<(), StoreError> {
        let id = self.selected_id()?;
        let ticket = self.transition(|state| {
            state.flags.loading = true;
            state.issue(&id)
        });

        let result = self.service.unattend(&id).await;
        let username = self.user.username.as_str();

        self.transition(|state| {
            if result.is_ok() && state.accept(&id, ticket) {
                if let Some(mut activity) = state.registry.get(&id).cloned() {
                    activity.attendees.retain(|a| a.username != username);
                    attendance::project(&activity, username).apply(&mut activity);
                    state.registry.set(activity);
                }
            }
            state.flags.loading = false;
        });

        result.map_err(|e| self.fail(UNATTEND_ERROR, e.into()))
    }

    // ===== Helpers =====

    /// Parse a DTO and compute the user-relative flags
    fn prepare(&self, dto: ActivityDto) -> Result<Activity, InvalidDate> {
        let mut activity = Activity::from_dto(dto)?;
        attendance::project(&activity, &self.user.username).apply(&mut activity);
        Ok(activity)
    }

    fn selected_id(&self) -> Result<String, StoreError> {
        self.state
            .borrow()
            .selected_activity()
            .map(|a| a.id.clone())
            .ok_or(StoreError::NoSelection)
    }

    /// Apply `f` as one step, then tell subscribers
    fn transition<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let result = {
            let mut state = self.state.borrow_mut();
            f(&mut state)
        };
        self.publish(StoreEvent::Changed);
        result
    }

    fn publish(&self, event: StoreEvent) {
        // Receiver gone means nobody is rendering; nothing to do
        let _ = self.events.send(event);
    }

    fn fail(&self, message: &str, err: StoreError) -> StoreError {
        error!(error = %err, "{}", message);
        self.publish(StoreEvent::Error {
            message: message.to_string(),
        });
        err
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{activity, attendee, dto, user, FakeService};

    fn drain(rx: &mut mpsc::UnboundedReceiver<StoreEvent>) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn errors(events: &[StoreEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                StoreEvent::Error { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    fn store_with(dtos: Vec<ActivityDto>) -> (ActivityStore<FakeService>, mpsc::UnboundedReceiver<StoreEvent>) {
        ActivityStore::new(FakeService::with_activities(dtos), user())
    }

    // ===== Loads =====

    #[tokio::test]
    async fn test_load_activities_groups_by_day() {
        let (store, _rx) = store_with(vec![
            dto("A", "2024-01-02T10:00:00"),
            dto("B", "2024-01-01T09:00:00"),
        ]);

        store.load_activities().await.unwrap();

        let groups = store.activities_by_date();
        let keyed: Vec<(String, Vec<String>)> = groups
            .iter()
            .map(|g| (g.day_key(), g.activities.iter().map(|a| a.id.clone()).collect()))
            .collect();
        assert_eq!(
            keyed,
            vec![
                ("2024-01-01".to_string(), vec!["B".to_string()]),
                ("2024-01-02".to_string(), vec!["A".to_string()]),
            ]
        );
        assert!(!store.loading_initial());
    }

    #[tokio::test]
    async fn test_load_activities_projects_attendance() {
        let mut hosted = dto("hosted", "2024-01-01T09:00:00");
        hosted.attendees = vec![attendee("bob", true)];
        let mut joined = dto("joined", "2024-01-01T10:00:00");
        joined.attendees = vec![attendee("alice", true), attendee("bob", false)];
        let mut other = dto("other", "2024-01-01T11:00:00");
        other.attendees = vec![attendee("alice", true)];
        let (store, _rx) = store_with(vec![hosted, joined, other]);

        store.load_activities().await.unwrap();

        let hosted = store.get_activity("hosted").unwrap();
        assert!(hosted.is_going && hosted.is_host);
        let joined = store.get_activity("joined").unwrap();
        assert!(joined.is_going && !joined.is_host);
        let other = store.get_activity("other").unwrap();
        assert!(!other.is_going && !other.is_host);
    }

    #[tokio::test]
    async fn test_load_activities_skips_invalid_dates() {
        let (store, _rx) = store_with(vec![
            dto("good", "2024-01-01T09:00:00"),
            dto("bad", "someday"),
        ]);

        store.load_activities().await.unwrap();

        assert!(store.get_activity("good").is_some());
        assert!(store.get_activity("bad").is_none());
    }

    #[tokio::test]
    async fn test_load_activities_failure_notifies() {
        let (store, mut rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.service().fail("list");

        assert!(store.load_activities().await.is_err());

        assert!(!store.loading_initial());
        assert!(store.activities().is_empty());
        assert_eq!(errors(&drain(&mut rx)), vec![LOAD_LIST_ERROR]);
    }

    #[tokio::test]
    async fn test_loading_initial_visible_while_in_flight() {
        let (store, _rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        let release = store.service().gate_next();
        let store = &store;

        let (result, observed) = tokio::join!(store.load_activities(), async move {
            let observed = store.loading_initial();
            let _ = release.send(());
            observed
        });

        assert!(result.is_ok());
        assert!(observed);
        assert!(!store.loading_initial());
    }

    #[tokio::test]
    async fn test_load_activity_cache_first() {
        let (store, _rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activities().await.unwrap();

        let activity = store.load_activity("A").await.unwrap();

        assert_eq!(activity.id, "A");
        assert_eq!(store.selected().map(|a| a.id), Some("A".to_string()));
        assert_eq!(store.service().calls(), vec!["list:".to_string()]);
    }

    #[tokio::test]
    async fn test_load_activity_fetches_when_missing() {
        let mut remote = dto("A", "2024-01-01T09:00:00");
        remote.attendees = vec![attendee("bob", true)];
        let (store, _rx) = store_with(vec![remote]);

        let activity = store.load_activity("A").await.unwrap();

        assert!(activity.is_host);
        assert_eq!(store.get_activity("A"), Some(activity.clone()));
        assert_eq!(store.selected(), Some(activity));
        assert_eq!(store.service().calls(), vec!["details:A".to_string()]);
        assert!(!store.loading_initial());

        // Second load is served from the registry
        store.load_activity("A").await.unwrap();
        assert_eq!(store.service().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_load_activity_invalid_date_leaves_state() {
        let (store, mut rx) = store_with(vec![dto("A", "tomorrow")]);

        let err = store.load_activity("A").await.unwrap_err();

        assert!(matches!(err, StoreError::InvalidDate(_)));
        assert!(store.get_activity("A").is_none());
        assert!(store.selected().is_none());
        assert!(!store.loading_initial());
        assert_eq!(errors(&drain(&mut rx)), vec![LOAD_ONE_ERROR]);
    }

    // ===== Create / edit / delete =====

    #[tokio::test]
    async fn test_create_adds_host_attendee() {
        let (store, mut rx) = store_with(vec![]);
        let mut new = activity("u1", "2024-03-01T08:00:00");
        new.title = "Run".to_string();

        store.create_activity(new).await.unwrap();

        let created = store.get_activity("u1").unwrap();
        assert_eq!(created.id, "u1");
        assert_eq!(created.title, "Run");
        assert_eq!(created.attendees.len(), 1);
        assert_eq!(created.attendees[0].username, "bob");
        assert!(created.attendees[0].is_host);
        assert!(created.is_host);
        assert!(created.is_going);
        assert!(!store.submitting());

        let events = drain(&mut rx);
        assert!(events.contains(&StoreEvent::Navigate { id: "u1".to_string() }));
        assert!(errors(&events).is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_leaves_registry_empty() {
        let (store, mut rx) = store_with(vec![]);
        store.service().fail("create");

        let result = store.create_activity(activity("u1", "2024-03-01T08:00:00")).await;

        assert!(matches!(result, Err(StoreError::Remote(_))));
        assert!(store.activities().is_empty());
        assert!(!store.submitting());
        let events = drain(&mut rx);
        assert_eq!(errors(&events), vec![SUBMIT_ERROR]);
        assert!(!events.iter().any(|e| matches!(e, StoreEvent::Navigate { .. })));
    }

    #[tokio::test]
    async fn test_create_requires_identifier() {
        let (store, _rx) = store_with(vec![]);
        let result = store.create_activity(activity("", "2024-03-01T08:00:00")).await;
        assert!(matches!(result, Err(StoreError::MissingId)));
        assert!(store.service().calls().is_empty());
    }

    #[tokio::test]
    async fn test_edit_replaces_and_selects() {
        let (store, mut rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activities().await.unwrap();

        let mut edited = store.get_activity("A").unwrap();
        edited.title = "Edited".to_string();
        store.edit_activity(edited.clone()).await.unwrap();

        assert_eq!(store.get_activity("A"), Some(edited.clone()));
        assert_eq!(store.selected(), Some(edited));
        assert!(!store.submitting());
        assert!(drain(&mut rx).contains(&StoreEvent::Navigate { id: "A".to_string() }));
    }

    #[tokio::test]
    async fn test_edit_failure_keeps_entry() {
        let (store, mut rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activities().await.unwrap();
        let before = store.get_activity("A").unwrap();
        store.service().fail("update");

        let mut edited = before.clone();
        edited.title = "Edited".to_string();
        assert!(store.edit_activity(edited).await.is_err());

        assert_eq!(store.get_activity("A"), Some(before));
        assert!(!store.submitting());
        assert_eq!(errors(&drain(&mut rx)), vec![SUBMIT_ERROR]);
    }

    #[tokio::test]
    async fn test_delete_removes_entry_and_clears_target() {
        let (store, _rx) = store_with(vec![
            dto("A", "2024-01-01T09:00:00"),
            dto("B", "2024-01-02T09:00:00"),
        ]);
        store.load_activities().await.unwrap();
        store.load_activity("A").await.unwrap();
        let release = store.service().gate_next();
        let store = &store;

        let (result, in_flight) = tokio::join!(store.delete_activity("A", "delete-A"), async move {
            let flags = store.flags();
            let _ = release.send(());
            flags
        });

        assert!(result.is_ok());
        assert!(in_flight.submitting);
        assert_eq!(in_flight.target.as_deref(), Some("delete-A"));
        assert!(store.get_activity("A").is_none());
        assert!(store.get_activity("B").is_some());
        assert!(store.selected().is_none());
        assert_eq!(store.flags(), Flags::default());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_entry() {
        let (store, mut rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activities().await.unwrap();
        store.service().fail("delete");

        assert!(store.delete_activity("A", "delete-A").await.is_err());

        assert!(store.get_activity("A").is_some());
        assert!(!store.submitting());
        assert!(store.target().is_none());
        assert_eq!(errors(&drain(&mut rx)), vec![DELETE_ERROR]);
    }

    // ===== Attendance =====

    #[tokio::test]
    async fn test_attend_then_unattend_restores_attendees() {
        let mut remote = dto("A", "2024-01-01T09:00:00");
        remote.attendees = vec![attendee("alice", true)];
        let (store, _rx) = store_with(vec![remote]);
        let original = store.load_activity("A").await.unwrap();
        assert!(!original.is_going);

        store.attend().await.unwrap();
        let attending = store.get_activity("A").unwrap();
        assert!(attending.is_going);
        assert!(!attending.is_host);
        assert_eq!(attending.attendees.len(), 2);
        let me = attending.attendee("bob").unwrap();
        assert!(!me.is_host);
        assert!(attending.attendee("alice").unwrap().is_host);
        assert_eq!(store.selected(), Some(attending));

        store.unattend().await.unwrap();
        let after = store.get_activity("A").unwrap();
        assert_eq!(after.attendees, original.attendees);
        assert!(!after.is_going);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn test_attend_twice_does_not_duplicate() {
        let (store, _rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activity("A").await.unwrap();

        store.attend().await.unwrap();
        store.attend().await.unwrap();

        let activity = store.get_activity("A").unwrap();
        assert_eq!(activity.attendees.iter().filter(|a| a.username == "bob").count(), 1);
    }

    #[tokio::test]
    async fn test_attend_requires_selection() {
        let (store, _rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activities().await.unwrap();

        assert!(matches!(store.attend().await, Err(StoreError::NoSelection)));
        assert!(matches!(store.unattend().await, Err(StoreError::NoSelection)));
        assert_eq!(store.service().calls(), vec!["list:".to_string()]);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn test_attend_failure_leaves_attendees() {
        let (store, mut rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        let before = store.load_activity("A").await.unwrap();
        store.service().fail("attend");

        assert!(store.attend().await.is_err());

        assert_eq!(store.get_activity("A"), Some(before));
        assert!(!store.loading());
        assert_eq!(errors(&drain(&mut rx)), vec![ATTEND_ERROR]);
    }

    #[tokio::test]
    async fn test_host_unattend_clears_host_flag() {
        let mut remote = dto("A", "2024-01-01T09:00:00");
        remote.attendees = vec![attendee("bob", true)];
        let (store, _rx) = store_with(vec![remote]);
        let loaded = store.load_activity("A").await.unwrap();
        assert!(loaded.is_going && loaded.is_host);

        store.unattend().await.unwrap();

        let after = store.get_activity("A").unwrap();
        assert!(after.attendees.is_empty());
        assert!(!after.is_going);
        assert!(!after.is_host);
        assert_eq!(attendance::project(&after, "bob"), attendance::Attendance::default());
    }

    #[tokio::test]
    async fn test_unattend_failure_leaves_attendees() {
        let mut remote = dto("A", "2024-01-01T09:00:00");
        remote.attendees = vec![attendee("alice", true), attendee("bob", false)];
        let (store, mut rx) = store_with(vec![remote]);
        let before = store.load_activity("A").await.unwrap();
        assert!(before.is_going);
        store.service().fail("unattend");

        assert!(matches!(store.unattend().await, Err(StoreError::Remote(_))));

        assert_eq!(store.get_activity("A"), Some(before));
        assert!(!store.loading());
        assert_eq!(errors(&drain(&mut rx)), vec![UNATTEND_ERROR]);
    }

    #[tokio::test]
    async fn test_loading_visible_while_attendance_in_flight() {
        let (store, _rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activity("A").await.unwrap();
        let store = &store;

        let release = store.service().gate_next();
        let (result, observed) = tokio::join!(store.attend(), async move {
            let observed = store.loading();
            let _ = release.send(());
            observed
        });
        assert!(result.is_ok());
        assert!(observed);
        assert!(!store.loading());

        let release = store.service().gate_next();
        let (result, observed) = tokio::join!(store.unattend(), async move {
            let observed = store.loading();
            let _ = release.send(());
            observed
        });
        assert!(result.is_ok());
        assert!(observed);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn test_clear_selection() {
        let (store, _rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activity("A").await.unwrap();
        store.clear_selection();
        assert!(store.selected().is_none());
        assert!(store.get_activity("A").is_some());
    }

    // ===== Sequencing and views =====

    #[tokio::test]
    async fn test_stale_edit_completion_is_dropped() {
        let (store, mut rx) = store_with(vec![]);
        let release_first = store.service().gate_next();
        let mut first = activity("A", "2024-01-01T09:00:00");
        first.title = "First".to_string();
        let mut second = activity("A", "2024-01-01T09:00:00");
        second.title = "Second".to_string();
        let store = &store;

        let (r1, r2) = tokio::join!(store.edit_activity(first), async move {
            let result = store.edit_activity(second).await;
            let _ = release_first.send(());
            result
        });

        assert!(r1.is_ok());
        assert!(r2.is_ok());
        assert_eq!(store.get_activity("A").unwrap().title, "Second");
        assert!(!store.submitting());
        let navigations = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, StoreEvent::Navigate { .. }))
            .count();
        assert_eq!(navigations, 1);
    }

    #[tokio::test]
    async fn test_stale_edit_after_delete_does_not_restore_entry() {
        let (store, mut rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activities().await.unwrap();
        let mut edited = store.get_activity("A").unwrap();
        edited.title = "Edited".to_string();
        let release_edit = store.service().gate_next();
        let store = &store;

        let (edit, delete) = tokio::join!(store.edit_activity(edited), async move {
            let result = store.delete_activity("A", "delete-A").await;
            let _ = release_edit.send(());
            result
        });

        assert!(edit.is_ok());
        assert!(delete.is_ok());
        assert!(store.get_activity("A").is_none());
        assert!(store.selected().is_none());
        assert_eq!(store.flags(), Flags::default());
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| matches!(e, StoreEvent::Navigate { .. })));
    }

    #[tokio::test]
    async fn test_stale_attend_after_edit_is_dropped() {
        let (store, _rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        let mut edited = store.load_activity("A").await.unwrap();
        edited.title = "Edited".to_string();
        let release_attend = store.service().gate_next();
        let store = &store;

        let (attend, edit) = tokio::join!(store.attend(), async move {
            let result = store.edit_activity(edited).await;
            let _ = release_attend.send(());
            result
        });

        assert!(attend.is_ok());
        assert!(edit.is_ok());
        let after = store.get_activity("A").unwrap();
        assert_eq!(after.title, "Edited");
        assert!(after.attendee("bob").is_none());
        assert!(!after.is_going);
        assert!(!store.loading());
        assert!(!store.submitting());
    }

    #[tokio::test]
    async fn test_activities_by_date_recomputed_after_write() {
        let (store, _rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activities().await.unwrap();

        let version = store.version();
        let first = store.activities_by_date();
        assert_eq!(store.activities_by_date(), first);
        assert_eq!(store.version(), version);

        store.create_activity(activity("B", "2024-01-03T09:00:00")).await.unwrap();

        assert!(store.version() > version);
        let groups = store.activities_by_date();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].activities[0].id, "B");
    }

    #[tokio::test]
    async fn test_transitions_publish_changed() {
        let (store, mut rx) = store_with(vec![dto("A", "2024-01-01T09:00:00")]);
        store.load_activities().await.unwrap();
        let events = drain(&mut rx);
        // flag on, then registry writes with flag off
        assert_eq!(events, vec![StoreEvent::Changed, StoreEvent::Changed]);
    }

    #[test]
    fn test_sequence_accepts_in_issue_order_and_rejects_stale() {
        let mut state = StoreState::default();
        let t1 = state.issue("A");
        let t2 = state.issue("A");
        assert!(state.accept("A", t2));
        assert!(!state.accept("A", t1));

        // Other identifiers are independent
        let other = state.issue("B");
        assert!(state.accept("B", other));
    }
}
