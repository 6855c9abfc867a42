//! Application session and initialization
//!
//! `AppSession` owns everything the view layer talks to: the stores, the
//! services, the display URL cache and the active tab. The logged-in user
//! lives in the record store's session pointer and is read from there on
//! every action, so changes made through [`AppSession::users`] are seen too.
//! Build it with [`AppSession::init`] before anything else and end it with
//! [`AppSession::shutdown`].

use crate::config::{BLOBS_DIRNAME, DATABASE_FILENAME, IMAGE_STORE_NAME, IMAGE_STORE_VERSION};
use crate::database::{self, NewPost, Post, RecordStore, UpdateProfileRequest, User};
use crate::error::{AppError, Result};
use crate::services::{
    migrate_inline_images, CommentsService, LikesService, MigrationReport, PostsService,
    UsersService,
};
use crate::storage::{BlobStore, DisplayUrl, DisplayUrlCache, ImageRef};
use std::path::Path;

/// Top-level view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Feed,
    Explore,
    Profile,
}

/// Central session state holding all services
pub struct AppSession {
    records: RecordStore,
    blob_store: BlobStore,
    users: UsersService,
    posts: PostsService,
    comments: CommentsService,
    likes: LikesService,
    display_urls: DisplayUrlCache,
    current_tab: Tab,
    migration: MigrationReport,
}

impl AppSession {
    /// Open both stores under `data_dir`, migrate inline images and
    /// restore the session user. Called once on startup.
    pub async fn init(data_dir: &Path) -> Result<Self> {
        tracing::info!("Initializing session");
        tracing::info!("App data directory: {:?}", data_dir);

        std::fs::create_dir_all(data_dir).map_err(|e| {
            AppError::StorageUnavailable(format!("cannot create {:?}: {}", data_dir, e))
        })?;

        let pool = database::create_pool(&data_dir.join(DATABASE_FILENAME))
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("cannot open record store: {}", e)))?;
        let records = RecordStore::new(pool);

        let blob_store = BlobStore::new(
            &data_dir.join(BLOBS_DIRNAME),
            IMAGE_STORE_NAME,
            IMAGE_STORE_VERSION,
        );
        blob_store.initialize().await?;

        // A failed migration leaves the stored posts as they were
        let migration = match migrate_inline_images(&records, &blob_store).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Image migration skipped: {}", e);
                MigrationReport::default()
            }
        };

        match records.current_user().await? {
            Some(user) => tracing::info!("Restored session for user: {}", user.id),
            None => tracing::info!("No user logged in"),
        }

        let session = Self {
            users: UsersService::new(records.clone()),
            posts: PostsService::new(records.clone(), blob_store.clone()),
            comments: CommentsService::new(records.clone()),
            likes: LikesService::new(records.clone()),
            display_urls: DisplayUrlCache::new(blob_store.clone()),
            records,
            blob_store,
            current_tab: Tab::default(),
            migration,
        };

        tracing::info!("Session initialized successfully");

        Ok(session)
    }

    /// Release every display URL and close the record store
    pub async fn shutdown(mut self) {
        let released = self.display_urls.release_all();
        self.records.close().await;
        tracing::info!("Session closed ({} display URLs released)", released);
    }

    pub fn users(&self) -> &UsersService {
        &self.users
    }

    pub fn posts(&self) -> &PostsService {
        &self.posts
    }

    pub fn comments(&self) -> &CommentsService {
        &self.comments
    }

    pub fn likes(&self) -> &LikesService {
        &self.likes
    }

    pub fn blob_store(&self) -> &BlobStore {
        &self.blob_store
    }

    pub fn display_urls(&self) -> &DisplayUrlCache {
        &self.display_urls
    }

    /// What the startup migration did
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    /// The logged-in user, if any
    pub async fn current_user(&self) -> Result<Option<User>> {
        self.records.current_user().await
    }

    pub fn current_tab(&self) -> Tab {
        self.current_tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        tracing::debug!("Switching tab: {:?} -> {:?}", self.current_tab, tab);
        self.current_tab = tab;
    }

    pub async fn login(&self, name: &str) -> Result<User> {
        self.users.login(name).await
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.users.logout().await?;
        self.current_tab = Tab::default();
        Ok(())
    }

    pub async fn update_profile(&self, req: UpdateProfileRequest) -> Result<User> {
        self.users.update_profile(req).await
    }

    /// Create a post as the logged-in user
    pub async fn create_post(&self, req: NewPost, uploads: &[Vec<u8>]) -> Result<Post> {
        let author = self.require_user().await?;
        self.posts.create_post(&author, req, uploads).await
    }

    /// Comment as the logged-in user
    pub async fn add_comment(&self, post_id: &str, text: &str) -> Result<database::Comment> {
        let author = self.require_user().await?;
        self.comments.add_comment(post_id, &author, text).await
    }

    /// Toggle the logged-in user's like; returns the new state
    pub async fn toggle_like(&self, post_id: &str) -> Result<bool> {
        let user = self.require_user().await?;
        self.likes.toggle_like(post_id, &user.id).await
    }

    /// Delete a post and release the display URLs of its images
    pub async fn delete_post(&mut self, post_id: &str) -> Result<()> {
        let post = self.posts.get_post(post_id).await?;
        self.posts.delete_post(post_id).await?;
        self.release_post_images(&post);
        Ok(())
    }

    pub async fn resolve_image(&mut self, image: &ImageRef) -> DisplayUrl {
        self.display_urls.resolve(image).await
    }

    pub fn release_image(&mut self, image: &ImageRef) -> bool {
        self.display_urls.release(image)
    }

    /// Release the display URLs of every image on `post`.
    /// Call when a view showing the post is torn down.
    pub fn release_post_images(&mut self, post: &Post) -> usize {
        post.images
            .iter()
            .filter(|image| self.display_urls.release(image))
            .count()
    }

    /// Delete all image content. Posts keep their references, which
    /// resolve to [`DisplayUrl::Unavailable`] from then on.
    pub async fn clear_images(&mut self) -> Result<()> {
        tracing::info!("Clearing all images");
        self.display_urls.release_all();
        self.blob_store.clear().await
    }

    async fn require_user(&self) -> Result<User> {
        self.current_user()
            .await?
            .ok_or_else(|| AppError::Validation("Log in to continue".to_string()))
    }
}
