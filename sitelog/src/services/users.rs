//! Users service
//!
//! Login by display name and profile editing. The session keeps a snapshot
//! of the logged-in user; editing a profile through this service refreshes
//! that snapshot, a bare `save_user` does not.

use crate::config::{MAX_BIO_LENGTH, MAX_USER_NAME_LENGTH};
use crate::database::{RecordStore, UpdateProfileRequest, User};
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

/// Service for managing users and the session user
#[derive(Clone)]
pub struct UsersService {
    records: RecordStore,
}

impl UsersService {
    pub fn new(records: RecordStore) -> Self {
        Self { records }
    }

    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.records.read_all().await
    }

    pub async fn save_user(&self, user: User) -> Result<()> {
        tracing::debug!("Saving user: {}", user.id);
        self.records.upsert(user).await
    }

    pub async fn get_current_user(&self) -> Result<Option<User>> {
        self.records.current_user().await
    }

    pub async fn set_current_user(&self, user: &User) -> Result<()> {
        self.records.set_current_user(user).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<User>> {
        let name = name.trim();
        Ok(self.get_users().await?.into_iter().find(|u| u.name == name))
    }

    /// Load the user with this name, creating it on first login,
    /// and make it the session user
    pub async fn login(&self, name: &str) -> Result<User> {
        let name = validate_name(name)?;

        let user = match self.find_by_name(&name).await? {
            Some(user) => {
                tracing::info!("Logging in existing user: {}", user.id);
                user
            }
            None => {
                let user = User {
                    id: format!("user_{}", Uuid::new_v4().simple()),
                    name,
                    bio: String::new(),
                    created_at: Utc::now(),
                };
                tracing::info!("Created user on first login: {}", user.id);
                user
            }
        };

        self.set_current_user(&user).await?;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<()> {
        tracing::info!("Logging out");
        self.records.clear_current_user().await
    }

    /// Edit name and/or bio. Names stay unique. The session snapshot is
    /// refreshed when the edited user is logged in.
    pub async fn update_profile(&self, req: UpdateProfileRequest) -> Result<User> {
        let users = self.get_users().await?;
        let mut user = users
            .iter()
            .find(|u| u.id == req.user_id)
            .cloned()
            .ok_or_else(|| AppError::UserNotFound(req.user_id.clone()))?;

        if let Some(name) = &req.name {
            let name = validate_name(name)?;
            if users.iter().any(|u| u.name == name && u.id != user.id) {
                return Err(AppError::Validation("Name is already taken".to_string()));
            }
            user.name = name;
        }

        if let Some(bio) = &req.bio {
            let bio = bio.trim();
            if bio.chars().count() > MAX_BIO_LENGTH {
                return Err(AppError::Validation(format!(
                    "Bio must be at most {} characters",
                    MAX_BIO_LENGTH
                )));
            }
            user.bio = bio.to_string();
        }

        self.save_user(user.clone()).await?;

        let is_current = self
            .get_current_user()
            .await?
            .is_some_and(|current| current.id == user.id);
        if is_current {
            self.set_current_user(&user).await?;
        }

        tracing::info!("Updated profile: {}", user.id);
        Ok(user)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if name.chars().count() > MAX_USER_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Name must be at most {} characters",
            MAX_USER_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}
