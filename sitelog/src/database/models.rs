//! Database models
//!
//! Rust structs representing the persisted entities.
//! Field names are camelCase on the wire; the view layer reads them as-is.

use crate::config::DEFAULT_MOOD_COLOR;
use crate::storage::ImageRef;
use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The four record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Posts,
    Comments,
    Likes,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Posts => "posts",
            Collection::Comments => "comments",
            Collection::Likes => "likes",
        }
    }
}

/// A record stored in one of the collections
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    const COLLECTION: Collection;

    type Key: PartialEq;

    /// Identity used by upsert
    fn key(&self) -> Self::Key;
}

/// A user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Display name, unique across users
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// A logged site visit
///
/// Deserialization goes through `StoredPost` so that records written by
/// older versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredPost")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    /// Author name at the time of posting
    pub author_name: String,
    pub building_name: String,
    pub category: String,
    pub location: String,
    /// Visit date as entered, usually `YYYY-MM-DD`
    pub visit_date: String,
    pub note: String,
    pub tags: Vec<String>,
    pub mood_color: String,
    pub images: Vec<ImageRef>,
    /// Single image written by older versions; folded into `images` at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    pub created_at: DateTime<Utc>,
}

/// Post as found on disk. `images` may be a list, a bare string (the old
/// single-image shape) or missing.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPost {
    id: String,
    user_id: String,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    building_name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    visit_date: String,
    #[serde(default)]
    note: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_mood_color")]
    mood_color: String,
    #[serde(default)]
    images: Value,
    #[serde(default)]
    image: Option<ImageRef>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
}

impl From<StoredPost> for Post {
    fn from(stored: StoredPost) -> Self {
        let mut image = stored.image;
        let images = match stored.images {
            Value::Null => Vec::new(),
            Value::Array(items) => items.into_iter().map(ImageRef::from_json).collect(),
            // Bare string: same meaning as the legacy `image` field
            Value::String(raw) if image.is_none() => {
                image = Some(ImageRef::from(raw));
                Vec::new()
            }
            other => vec![ImageRef::from_json(other)],
        };

        Post {
            id: stored.id,
            user_id: stored.user_id,
            author_name: stored.author_name,
            building_name: stored.building_name,
            category: stored.category,
            location: stored.location,
            visit_date: stored.visit_date,
            note: stored.note,
            tags: stored.tags,
            mood_color: stored.mood_color,
            images,
            image,
            created_at: stored.created_at,
        }
    }
}

fn default_mood_color() -> String {
    DEFAULT_MOOD_COLOR.to_string()
}

/// Accept RFC 3339 strings and epoch milliseconds
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    };

    parsed.ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", value)))
}

impl Post {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

impl Record for Post {
    const COLLECTION: Collection = Collection::Posts;
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// A comment on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    #[serde(default)]
    pub author_name: String,
    pub text: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Record for Comment {
    const COLLECTION: Collection = Collection::Comments;
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// A like, keyed by (post, user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub post_id: String,
    pub user_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub fn matches(&self, post_id: &str, user_id: &str) -> bool {
        self.post_id == post_id && self.user_id == user_id
    }
}

impl Record for Like {
    const COLLECTION: Collection = Collection::Likes;
    type Key = (String, String);

    fn key(&self) -> (String, String) {
        (self.post_id.clone(), self.user_id.clone())
    }
}

/// Create post request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub building_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub visit_date: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mood_color: Option<String>,
}

/// Update profile request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub user_id: String,
    pub name: Option<String>,
    pub bio: Option<String>,
}
