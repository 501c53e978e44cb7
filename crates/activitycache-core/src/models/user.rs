use serde::{Deserialize, Serialize};

/// Account returned by the service on register/login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub username: String,
    #[serde(default)]
    pub image: Option<String>,
    pub token: String,
}

/// The signed-in user as seen by the activity store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: String,
    pub display_name: String,
    pub image: Option<String>,
}
