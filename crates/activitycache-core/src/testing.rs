//! Test fixtures shared by the store tests: activity builders and an
//! in-memory `ActivityService` that records calls.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::api::ActivityService;
use crate::models::{Activity, ActivityDto, Attendee, CurrentUser};

pub fn user() -> CurrentUser {
    CurrentUser {
        username: "bob".to_string(),
        display_name: "Bob".to_string(),
        image: None,
    }
}

pub fn attendee(username: &str, is_host: bool) -> Attendee {
    Attendee {
        username: username.to_string(),
        display_name: username.to_string(),
        image: None,
        is_host,
    }
}

pub fn dto(id: &str, date: &str) -> ActivityDto {
    ActivityDto {
        id: id.to_string(),
        title: format!("Activity {}", id),
        description: "Description".to_string(),
        category: "drinks".to_string(),
        date: date.to_string(),
        city: "London".to_string(),
        venue: "Pub".to_string(),
        attendees: vec![],
    }
}

pub fn activity(id: &str, date: &str) -> Activity {
    Activity::from_dto(dto(id, date)).expect("valid test date")
}

#[derive(Default)]
pub struct FakeService {
    activities: RefCell<Vec<ActivityDto>>,
    calls: RefCell<Vec<String>>,
    failing: RefCell<HashSet<&'static str>>,
    gates: RefCell<VecDeque<oneshot::Receiver<()>>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activities(activities: Vec<ActivityDto>) -> Self {
        let service = Self::new();
        *service.activities.borrow_mut() = activities;
        service
    }

    /// Make every later call to `method` fail
    pub fn fail(&self, method: &'static str) {
        self.failing.borrow_mut().insert(method);
    }

    /// The next call parks until the returned sender fires (or is dropped)
    pub fn gate_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().push_back(rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    async fn call(&self, method: &'static str, arg: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("{}:{}", method, arg));
        let gate = self.gates.borrow_mut().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.failing.borrow().contains(method) {
            return Err(anyhow!("{} failed", method));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ActivityService for FakeService {
    async fn list(&self) -> Result<Vec<ActivityDto>> {
        self.call("list", "").await?;
        Ok(self.activities.borrow().clone())
    }

    async fn details(&self, id: &str) -> Result<ActivityDto> {
        self.call("details", id).await?;
        self.activities
            .borrow()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("activity {} not found", id))
    }

    async fn create(&self, activity: &ActivityDto) -> Result<()> {
        self.call("create", &activity.id).await
    }

    async fn update(&self, activity: &ActivityDto) -> Result<()> {
        self.call("update", &activity.id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.call("delete", id).await
    }

    async fn attend(&self, id: &str) -> Result<()> {
        self.call("attend", id).await
    }

    async fn unattend(&self, id: &str) -> Result<()> {
        self.call("unattend", id).await
    }
}
