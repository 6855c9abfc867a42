//! Posts service
//!
//! High-level business logic for site-visit posts.
//! Integrates the record store and the blob store for uploaded photos.

use crate::config::{
    DEFAULT_MOOD_COLOR, MAX_BUILDING_NAME_LENGTH, MAX_IMAGES_PER_POST, MAX_NOTE_LENGTH,
    MAX_TAGS_PER_POST,
};
use crate::database::{NewPost, Post, RecordStore, User};
use crate::error::{AppError, Result};
use crate::storage::{BlobStore, ImageRef};
use chrono::Utc;
use uuid::Uuid;

/// Service for managing posts
#[derive(Clone)]
pub struct PostsService {
    records: RecordStore,
    blob_store: BlobStore,
}

impl PostsService {
    pub fn new(records: RecordStore, blob_store: BlobStore) -> Self {
        Self {
            records,
            blob_store,
        }
    }

    /// All posts in stored order
    pub async fn get_posts(&self) -> Result<Vec<Post>> {
        self.records.read_all().await
    }

    pub async fn get_post(&self, id: &str) -> Result<Post> {
        self.get_posts()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    pub async fn save_post(&self, post: Post) -> Result<()> {
        tracing::debug!("Saving post: {}", post.id);
        self.records.upsert(post).await
    }

    /// Delete a post with its comments and likes.
    ///
    /// Image blobs are not deleted; other posts may share them.
    pub async fn delete_post(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting post: {}", id);

        if !self.records.delete_post(id).await? {
            return Err(AppError::PostNotFound(id.to_string()));
        }

        tracing::info!("Post deleted successfully: {}", id);
        Ok(())
    }

    /// Posts by one user, newest first
    pub async fn get_user_posts(&self, user_id: &str) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .get_posts()
            .await?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect();
        newest_first(&mut posts);
        Ok(posts)
    }

    /// Create a post for `author`, storing each upload in the blob store
    pub async fn create_post(
        &self,
        author: &User,
        req: NewPost,
        uploads: &[Vec<u8>],
    ) -> Result<Post> {
        tracing::info!(
            "Creating post: {} by {} ({} images)",
            req.building_name,
            author.name,
            uploads.len()
        );

        let building_name = req.building_name.trim().to_string();
        if building_name.is_empty() {
            return Err(AppError::Validation("Building name is required".to_string()));
        }
        if building_name.chars().count() > MAX_BUILDING_NAME_LENGTH {
            return Err(AppError::Validation(format!(
                "Building name must be at most {} characters",
                MAX_BUILDING_NAME_LENGTH
            )));
        }
        if req.note.chars().count() > MAX_NOTE_LENGTH {
            return Err(AppError::Validation(format!(
                "Note must be at most {} characters",
                MAX_NOTE_LENGTH
            )));
        }
        if uploads.len() > MAX_IMAGES_PER_POST {
            return Err(AppError::Validation(format!(
                "A post can have at most {} photos",
                MAX_IMAGES_PER_POST
            )));
        }

        let tags = normalize_tags(&req.tags);
        if tags.len() > MAX_TAGS_PER_POST {
            return Err(AppError::Validation(format!(
                "A post can have at most {} tags",
                MAX_TAGS_PER_POST
            )));
        }

        let mood_color = match req.mood_color.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_MOOD_COLOR.to_string(),
            Some(color) if is_valid_mood_color(color) => color.to_lowercase(),
            Some(color) => {
                return Err(AppError::Validation(format!(
                    "Invalid mood color: {}",
                    color
                )))
            }
        };

        let mut blob_ids = Vec::with_capacity(uploads.len());
        for data in uploads {
            match self.blob_store.put(data).await {
                Ok(id) => blob_ids.push(id),
                Err(e) => {
                    self.discard_blobs(&blob_ids).await;
                    return Err(e);
                }
            }
        }
        let images = blob_ids.iter().cloned().map(ImageRef::Blob).collect();

        let post = Post {
            id: format!("post_{}", Uuid::new_v4().simple()),
            user_id: author.id.clone(),
            author_name: author.name.clone(),
            building_name,
            category: req.category.trim().to_string(),
            location: req.location.trim().to_string(),
            visit_date: req.visit_date.trim().to_string(),
            note: req.note,
            tags,
            mood_color,
            images,
            image: None,
            created_at: Utc::now(),
        };

        if let Err(e) = self.records.upsert(post.clone()).await {
            self.discard_blobs(&blob_ids).await;
            return Err(e);
        }

        tracing::info!("Post created successfully: {}", post.id);

        Ok(post)
    }

    /// Remove blobs written for a post that was never saved
    async fn discard_blobs(&self, ids: &[String]) {
        for id in ids {
            if let Err(e) = self.blob_store.delete(id).await {
                tracing::warn!("Orphaned blob {} left behind: {}", id, e);
            }
        }
    }

    /// All posts, newest first
    pub async fn feed(&self) -> Result<Vec<Post>> {
        let mut posts = self.get_posts().await?;
        newest_first(&mut posts);
        Ok(posts)
    }

    /// Posts with at least one photo, newest first
    pub async fn explore(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .get_posts()
            .await?
            .into_iter()
            .filter(|p| !p.images.is_empty())
            .collect();
        newest_first(&mut posts);
        Ok(posts)
    }

    /// Search posts by building, location, category, note or tag
    pub async fn search(&self, query: &str) -> Result<Vec<Post>> {
        let query_lower = query.trim().trim_start_matches('#').to_lowercase();
        if query_lower.is_empty() {
            return self.feed().await;
        }

        let filtered = self
            .feed()
            .await?
            .into_iter()
            .filter(|post| {
                post.building_name.to_lowercase().contains(&query_lower)
                    || post.location.to_lowercase().contains(&query_lower)
                    || post.category.to_lowercase().contains(&query_lower)
                    || post.note.to_lowercase().contains(&query_lower)
                    || post
                        .tags
                        .iter()
                        .any(|t| t.to_lowercase().contains(&query_lower))
            })
            .collect();

        Ok(filtered)
    }

    pub async fn posts_by_tag(&self, tag: &str) -> Result<Vec<Post>> {
        let tag = tag.trim().trim_start_matches('#');
        Ok(self
            .feed()
            .await?
            .into_iter()
            .filter(|p| p.has_tag(tag))
            .collect())
    }
}

fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Trim, drop a leading `#`, drop empties and case-insensitive duplicates
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').trim();
        if tag.is_empty() || normalized.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        normalized.push(tag.to_string());
    }
    normalized
}

/// `#rgb` or `#rrggbb`
fn is_valid_mood_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
