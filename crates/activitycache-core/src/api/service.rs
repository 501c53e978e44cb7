use anyhow::Result;
use async_trait::async_trait;

use crate::models::ActivityDto;

/// The remote side of the activity store.
///
/// Mutations only acknowledge; the service never returns the stored activity,
/// so callers assign identifiers before calling `create`.
#[async_trait(?Send)]
pub trait ActivityService {
    async fn list(&self) -> Result<Vec<ActivityDto>>;

    async fn details(&self, id: &str) -> Result<ActivityDto>;

    async fn create(&self, activity: &ActivityDto) -> Result<()>;

    async fn update(&self, activity: &ActivityDto) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Add the signed-in user to the activity's attendees
    async fn attend(&self, id: &str) -> Result<()>;

    /// Remove the signed-in user from the activity's attendees
    async fn unattend(&self, id: &str) -> Result<()>;
}
