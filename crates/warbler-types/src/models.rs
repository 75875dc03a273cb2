use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image stored for accounts that sign up without one.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub user_id: Uuid,
    pub author_username: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}
