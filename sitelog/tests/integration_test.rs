//! Integration tests for sitelog
//!
//! These tests verify end-to-end functionality including:
//! - Startup migration of inline images
//! - Post, comment and like workflows through the session
//! - Display URLs and clearing the image store

use chrono::Utc;
use sitelog::app::AppSession;
use sitelog::config::{BLOBS_DIRNAME, DATABASE_FILENAME, IMAGE_STORE_NAME, IMAGE_STORE_VERSION};
use sitelog::database::{create_pool, Comment, Like, NewPost, Post, RecordStore};
use sitelog::services::MigrationReport;
use sitelog::storage::{BlobStore, DisplayUrl, ImageRef};
use std::path::Path;
use tempfile::TempDir;

/// Write posts straight into a fresh data directory, the way an older
/// version of the app left them
async fn seed_posts(data_dir: &Path, posts: &[Post]) {
    let pool = create_pool(&data_dir.join(DATABASE_FILENAME)).await.unwrap();
    let records = RecordStore::new(pool);
    records.write_all(posts).await.unwrap();
    records.close().await;
}

/// Write a raw posts body, bypassing the typed models
async fn seed_raw_posts(data_dir: &Path, body: &str) {
    let pool = create_pool(&data_dir.join(DATABASE_FILENAME)).await.unwrap();
    sqlx::query("INSERT INTO collections (name, body, updated_at) VALUES ('posts', ?, ?)")
        .bind(body)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;
}

fn legacy_post(id: &str, images: &[&str]) -> Post {
    Post {
        id: id.to_string(),
        user_id: "user_A".to_string(),
        author_name: "ana".to_string(),
        building_name: "Therme Vals".to_string(),
        category: "Spa".to_string(),
        location: "Vals".to_string(),
        visit_date: "2022-09-03".to_string(),
        note: "Stone and water".to_string(),
        tags: vec!["zumthor".to_string()],
        mood_color: "#556b2f".to_string(),
        images: images.iter().map(|s| ImageRef::from(*s)).collect(),
        image: None,
        created_at: Utc::now(),
    }
}

fn image_store(data_dir: &Path) -> BlobStore {
    BlobStore::new(
        &data_dir.join(BLOBS_DIRNAME),
        IMAGE_STORE_NAME,
        IMAGE_STORE_VERSION,
    )
}

#[tokio::test]
async fn test_startup_migrates_inline_images_once() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path();
    seed_posts(data_dir, &[legacy_post("post_1", &["data:image/png;base64,QUJD"])]).await;

    // First startup migrates
    let session = AppSession::init(data_dir).await.unwrap();
    assert_eq!(session.migration_report().images_migrated, 1);
    assert!(session.migration_report().persisted);

    let posts = session.posts().get_posts().await.unwrap();
    let migrated = posts[0].images.clone();
    let id = migrated[0].blob_id().unwrap().to_string();
    assert_eq!(session.blob_store().get(&id).await.unwrap(), b"ABC");
    let blobs_after_first = session.blob_store().list_all().await.unwrap();
    session.shutdown().await;

    // Second startup is a no-op
    let session = AppSession::init(data_dir).await.unwrap();
    assert_eq!(session.migration_report().images_migrated, 0);
    assert!(!session.migration_report().persisted);

    let posts = session.posts().get_posts().await.unwrap();
    assert_eq!(posts[0].images, migrated);
    assert_eq!(session.blob_store().list_all().await.unwrap(), blobs_after_first);
    session.shutdown().await;
}

#[tokio::test]
async fn test_startup_keeps_undecodable_images() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path();
    seed_posts(
        data_dir,
        &[legacy_post("post_1", &["data:image/png;base64,%%%", "data:image/png;base64,QUJD"])],
    )
    .await;

    let mut session = AppSession::init(data_dir).await.unwrap();
    let report = session.migration_report().clone();
    assert_eq!(report.images_migrated, 1);
    assert_eq!(report.images_failed, 1);

    let post = session.posts().get_post("post_1").await.unwrap();
    assert!(post.images[0].is_inline());
    assert!(post.images[1].blob_id().is_some());

    // The inline image is still displayable as-is
    let shown = session.resolve_image(&post.images[0]).await;
    assert_eq!(shown.url(), Some("data:image/png;base64,%%%"));

    session.shutdown().await;
}

#[tokio::test]
async fn test_startup_reads_older_post_shapes() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path();
    seed_raw_posts(
        data_dir,
        r#"[
            {"id": "post_1", "userId": "user_A", "images": [null], "createdAt": "2020-01-01T00:00:00Z"},
            {"id": "post_2", "userId": "user_A", "images": "data:image/png;base64,QUJD", "createdAt": 1600000000000},
            {"id": "post_3", "userId": "user_A", "image": "data:,hi", "createdAt": 1500000000000}
        ]"#,
    )
    .await;

    let session = AppSession::init(data_dir).await.unwrap();
    let report = session.migration_report().clone();
    assert_eq!(report.posts_scanned, 3);
    assert_eq!(report.legacy_fields_folded, 2);
    assert_eq!(report.images_migrated, 2);

    let feed = session.posts().feed().await.unwrap();
    let ids: Vec<&str> = feed.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["post_2", "post_1", "post_3"]);
    assert_eq!(feed[1].images, vec![ImageRef::Unknown("null".to_string())]);
    assert!(feed[0].images[0].blob_id().is_some());

    session.shutdown().await;
}

#[tokio::test]
async fn test_startup_survives_unreadable_posts() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path();
    seed_raw_posts(data_dir, "not json").await;

    let session = AppSession::init(data_dir).await.unwrap();

    assert_eq!(session.migration_report(), &MigrationReport::default());
    assert!(session.posts().get_posts().await.is_err());
    session.shutdown().await;
}

#[tokio::test]
async fn test_post_comment_like_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = AppSession::init(temp_dir.path()).await.unwrap();

    let ana = session.login("ana").await.unwrap();
    let post = session
        .create_post(
            NewPost {
                building_name: "Lloyd's Building".to_string(),
                category: "Office".to_string(),
                location: "London".to_string(),
                visit_date: "2023-11-20".to_string(),
                note: "Services on the outside".to_string(),
                tags: vec!["hightech".to_string(), "rogers".to_string()],
                mood_color: Some("#7f8c8d".to_string()),
            },
            &[b"facade".to_vec()],
        )
        .await
        .unwrap();

    assert_eq!(post.user_id, ana.id);
    assert_eq!(session.posts().get_user_posts(&ana.id).await.unwrap().len(), 1);

    // Another user comments and likes
    session.login("ben").await.unwrap();
    session.add_comment(&post.id, "Love the lifts").await.unwrap();
    assert!(session.toggle_like(&post.id).await.unwrap());
    assert_eq!(session.likes().like_count(&post.id).await.unwrap(), 1);

    // Double toggle returns to the same state
    let likes_before: Vec<Like> = session.likes().get_likes(&post.id).await.unwrap();
    session.toggle_like(&post.id).await.unwrap();
    session.toggle_like(&post.id).await.unwrap();
    let likes_after = session.likes().get_likes(&post.id).await.unwrap();
    assert_eq!(likes_before.len(), likes_after.len());
    assert!(likes_after[0].matches(&post.id, &likes_before[0].user_id));

    let comments: Vec<Comment> = session.comments().get_comments(&post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author_name, "ben");

    // Delete cascades
    session.delete_post(&post.id).await.unwrap();
    assert!(session.posts().get_posts().await.unwrap().is_empty());
    assert!(session.comments().get_comments(&post.id).await.unwrap().is_empty());
    assert!(session.likes().get_likes(&post.id).await.unwrap().is_empty());

    session.shutdown().await;
}

#[tokio::test]
async fn test_session_user_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    let session = AppSession::init(temp_dir.path()).await.unwrap();
    let ana = session.login("ana").await.unwrap();
    session.shutdown().await;

    let session = AppSession::init(temp_dir.path()).await.unwrap();
    assert_eq!(session.current_user().await.unwrap(), Some(ana));
    session.shutdown().await;
}

#[tokio::test]
async fn test_display_urls_and_clear() {
    let temp_dir = TempDir::new().unwrap();
    let mut session = AppSession::init(temp_dir.path()).await.unwrap();
    session.login("ana").await.unwrap();

    let post = session
        .create_post(
            NewPost {
                building_name: "Glass House".to_string(),
                ..Default::default()
            },
            &[b"first photo".to_vec(), b"second photo".to_vec()],
        )
        .await
        .unwrap();

    let first = session.resolve_image(&post.images[0]).await;
    let url = first.url().unwrap().to_string();
    assert_eq!(
        session.display_urls().object_urls().fetch(&url).unwrap(),
        b"first photo"
    );

    // Released handles are replaced by new ones
    assert!(session.release_image(&post.images[0]));
    let again = session.resolve_image(&post.images[0]).await;
    assert_ne!(again.url().unwrap(), url);

    session.resolve_image(&post.images[1]).await;
    assert_eq!(session.release_post_images(&post), 2);
    assert!(session.display_urls().is_empty());

    // Clearing images leaves references dangling
    session.resolve_image(&post.images[0]).await;
    session.clear_images().await.unwrap();
    assert!(session.display_urls().object_urls().is_empty());

    let post = session.posts().get_post(&post.id).await.unwrap();
    assert_eq!(post.images.len(), 2);
    assert_eq!(
        session.resolve_image(&post.images[0]).await,
        DisplayUrl::Unavailable
    );

    session.shutdown().await;
}

#[tokio::test]
async fn test_blob_store_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path();

    let session = AppSession::init(data_dir).await.unwrap();
    let id = session.blob_store().put(b"kept").await.unwrap();
    session.shutdown().await;

    let store = image_store(data_dir);
    store.initialize().await.unwrap();
    assert_eq!(store.get(&id).await.unwrap(), b"kept");
}
