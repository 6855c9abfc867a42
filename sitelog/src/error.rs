//! Error types for sitelog
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the frontend.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record store or blob store could not be opened
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Requested blob identifier is absent
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    #[error("{0}")]
    Validation(String),
}

impl AppError {
    /// Message shown to the user when an action fails.
    ///
    /// Internal failures collapse to a generic sentence; the full error is
    /// logged instead.
    pub fn user_message(&self) -> String {
        match self {
            AppError::StorageUnavailable(_) => {
                "Local storage is unavailable. Some features are disabled.".to_string()
            }
            AppError::NotFound(_) => "This image is no longer available.".to_string(),
            AppError::PostNotFound(_) => "This post no longer exists.".to_string(),
            AppError::UserNotFound(_) => "This user no longer exists.".to_string(),
            AppError::InvalidImageData(_) => "The image could not be read.".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Database(_) | AppError::Io(_) | AppError::Serialization(_) => {
                tracing::error!("Unexpected storage failure: {}", self);
                "Something went wrong while saving. Please try again.".to_string()
            }
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
