//! Record store
//!
//! Each collection is persisted as a single JSON array and always read
//! and replaced whole. Writes to different collections are independent:
//! a compound operation such as post deletion is three separate
//! replacements, and a crash between them can leave orphaned comments
//! or likes behind.

use super::models::*;
use crate::error::Result;
use chrono::Utc;
use sqlx::SqlitePool;

const CURRENT_USER_KEY: &str = "current_user";

/// Collection-level access to users, posts, comments and likes
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a whole collection; empty if it was never written
    pub async fn read_all<T: Record>(&self) -> Result<Vec<T>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM collections WHERE name = ?")
                .bind(T::COLLECTION.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match body {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace a whole collection
    pub async fn write_all<T: Record>(&self, records: &[T]) -> Result<()> {
        let body = serde_json::to_string(records)?;

        sqlx::query(
            r#"
            INSERT INTO collections (name, body, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(T::COLLECTION.as_str())
        .bind(&body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Wrote {} {} ({} bytes)",
            records.len(),
            T::COLLECTION.as_str(),
            body.len()
        );
        Ok(())
    }

    /// Replace the first record with the same key, or append
    pub async fn upsert<T: Record>(&self, record: T) -> Result<()> {
        let mut records = self.read_all::<T>().await?;
        let key = record.key();

        match records.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }

        self.write_all(&records).await
    }

    /// Remove matching records, keeping the order of the rest.
    /// Returns how many were removed.
    pub async fn delete_where<T, F>(&self, predicate: F) -> Result<usize>
    where
        T: Record,
        F: Fn(&T) -> bool,
    {
        let records = self.read_all::<T>().await?;
        let before = records.len();

        let survivors: Vec<T> = records.into_iter().filter(|r| !predicate(r)).collect();
        let removed = before - survivors.len();

        if removed > 0 {
            self.write_all(&survivors).await?;
        }

        Ok(removed)
    }

    /// Delete a post together with its comments and likes.
    /// Returns whether the post itself existed.
    pub async fn delete_post(&self, post_id: &str) -> Result<bool> {
        let posts = self.delete_where::<Post, _>(|p| p.id == post_id).await?;
        let comments = self
            .delete_where::<Comment, _>(|c| c.post_id == post_id)
            .await?;
        let likes = self.delete_where::<Like, _>(|l| l.post_id == post_id).await?;

        tracing::debug!(
            "Deleted post {} ({} comments, {} likes)",
            post_id,
            comments,
            likes
        );
        Ok(posts > 0)
    }

    /// Flip the like state of (post, user). Returns the new state.
    pub async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let mut likes = self.read_all::<Like>().await?;

        let liked = match likes.iter().position(|l| l.matches(post_id, user_id)) {
            Some(index) => {
                likes.remove(index);
                false
            }
            None => {
                likes.push(Like {
                    post_id: post_id.to_string(),
                    user_id: user_id.to_string(),
                    created_at: Utc::now(),
                });
                true
            }
        };

        self.write_all(&likes).await?;

        tracing::debug!("Toggled like on {} by {}: {}", post_id, user_id, liked);
        Ok(liked)
    }

    pub async fn is_liked(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let likes = self.read_all::<Like>().await?;
        Ok(likes.iter().any(|l| l.matches(post_id, user_id)))
    }

    /// The user recorded by the last login, as it was at that time
    pub async fn current_user(&self) -> Result<Option<User>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM session WHERE key = ?")
            .bind(CURRENT_USER_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match value {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Record the session user. The user is also upserted into the users
    /// collection.
    pub async fn set_current_user(&self, user: &User) -> Result<()> {
        self.upsert(user.clone()).await?;

        sqlx::query(
            r#"
            INSERT INTO session (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(CURRENT_USER_KEY)
        .bind(serde_json::to_string(user)?)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Set current user: {}", user.id);
        Ok(())
    }

    pub async fn clear_current_user(&self) -> Result<()> {
        sqlx::query("DELETE FROM session WHERE key = ?")
            .bind(CURRENT_USER_KEY)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Cleared current user");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
