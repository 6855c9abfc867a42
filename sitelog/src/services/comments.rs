//! Comments service

use crate::config::MAX_COMMENT_LENGTH;
use crate::database::{Comment, Post, RecordStore, User};
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

/// Service for managing comments
#[derive(Clone)]
pub struct CommentsService {
    records: RecordStore,
}

impl CommentsService {
    pub fn new(records: RecordStore) -> Self {
        Self { records }
    }

    /// Comments on a post, oldest first
    pub async fn get_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let comments = self.records.read_all::<Comment>().await?;
        Ok(comments.into_iter().filter(|c| c.post_id == post_id).collect())
    }

    pub async fn save_comment(&self, comment: Comment) -> Result<()> {
        tracing::debug!("Saving comment: {} on post: {}", comment.id, comment.post_id);
        self.records.upsert(comment).await
    }

    /// Validate and append a comment by `author`
    pub async fn add_comment(&self, post_id: &str, author: &User, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Comment cannot be empty".to_string()));
        }
        if text.chars().count() > MAX_COMMENT_LENGTH {
            return Err(AppError::Validation(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let posts = self.records.read_all::<Post>().await?;
        if !posts.iter().any(|p| p.id == post_id) {
            return Err(AppError::PostNotFound(post_id.to_string()));
        }

        let comment = Comment {
            id: format!("comment_{}", Uuid::new_v4().simple()),
            post_id: post_id.to_string(),
            user_id: author.id.clone(),
            author_name: author.name.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
        };

        self.save_comment(comment.clone()).await?;

        Ok(comment)
    }

    pub async fn comment_count(&self, post_id: &str) -> Result<usize> {
        Ok(self.get_comments(post_id).await?.len())
    }
}
