//! Likes service
//!
//! A like is a toggle on (post, user), not a counter.

use crate::database::{Like, RecordStore};
use crate::error::Result;

/// Service for managing likes
#[derive(Clone)]
pub struct LikesService {
    records: RecordStore,
}

impl LikesService {
    pub fn new(records: RecordStore) -> Self {
        Self { records }
    }

    /// Likes on a post
    pub async fn get_likes(&self, post_id: &str) -> Result<Vec<Like>> {
        let likes = self.records.read_all::<Like>().await?;
        Ok(likes.into_iter().filter(|l| l.post_id == post_id).collect())
    }

    /// Returns true if the post is liked after the call
    pub async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.records.toggle_like(post_id, user_id).await
    }

    pub async fn is_liked(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.records.is_liked(post_id, user_id).await
    }

    pub async fn like_count(&self, post_id: &str) -> Result<usize> {
        Ok(self.get_likes(post_id).await?.len())
    }
}
