//! API client for the activities REST API.
//!
//! This module provides the `ApiClient` struct for account requests and the
//! authenticated activity endpoints behind `ActivityService`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::{LoginRequest, RegisterRequest};
use crate::models::{ActivityDto, UserProfile};

use super::{ActivityService, ApiError};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the activities service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `http://localhost:5000/api`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ===== Account =====

    /// Register a new account. Rejections with field errors come back as
    /// `ApiError::Validation`; local format rules are checked first.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile> {
        request.validate().map_err(ApiError::Validation)?;
        self.send_json(self.request(Method::POST, "user/register").json(request))
            .await
            .context("Registration failed")
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<UserProfile> {
        self.send_json(self.request(Method::POST, "user/login").json(request))
            .await
            .context("Login failed")
    }

    // ===== Request helpers =====

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(ApiError::NetworkError)?;
        Self::check_response(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let url = response.url().to_string();
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// Send a request whose response body is only an acknowledgement
    async fn send_ack(&self, builder: RequestBuilder) -> Result<()> {
        let response = self.send(builder).await?;
        debug!(url = %response.url(), status = %response.status(), "Request acknowledged");
        Ok(())
    }

    async fn send_body<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: &B) -> Result<()> {
        self.send_ack(self.request(method, path).json(body)).await
    }
}

#[async_trait(?Send)]
impl ActivityService for ApiClient {
    async fn list(&self) -> Result<Vec<ActivityDto>> {
        let activities: Vec<ActivityDto> = self
            .send_json(self.request(Method::GET, "activities"))
            .await
            .context("Failed to fetch activities")?;
        debug!(count = activities.len(), "Fetched activities");
        Ok(activities)
    }

    async fn details(&self, id: &str) -> Result<ActivityDto> {
        self.send_json(self.request(Method::GET, &format!("activities/{}", id)))
            .await
            .with_context(|| format!("Failed to fetch activity {}", id))
    }

    async fn create(&self, activity: &ActivityDto) -> Result<()> {
        self.send_body(Method::POST, "activities", activity)
            .await
            .with_context(|| format!("Failed to create activity {}", activity.id))
    }

    async fn update(&self, activity: &ActivityDto) -> Result<()> {
        self.send_body(Method::PUT, &format!("activities/{}", activity.id), activity)
            .await
            .with_context(|| format!("Failed to update activity {}", activity.id))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.send_ack(self.request(Method::DELETE, &format!("activities/{}", id)))
            .await
            .with_context(|| format!("Failed to delete activity {}", id))
    }

    async fn attend(&self, id: &str) -> Result<()> {
        self.send_ack(self.request(Method::POST, &format!("activities/{}/attend", id)))
            .await
            .with_context(|| format!("Failed to attend activity {}", id))
    }

    async fn unattend(&self, id: &str) -> Result<()> {
        self.send_ack(self.request(Method::DELETE, &format!("activities/{}/attend", id)))
            .await
            .with_context(|| format!("Failed to unattend activity {}", id))
    }
}
