//! Inline image migration
//!
//! Older posts embed their photos as `data:` URIs (and the oldest ones use a
//! single `image` field instead of the `images` list). This pass moves that
//! content into the blob store and rewrites the references.
//!
//! There is no schema version for posts, so the pass runs on every startup.
//! A post with no inline data and no legacy field is left alone, which makes
//! a second run a no-op.

use crate::database::{Post, RecordStore};
use crate::error::Result;
use crate::storage::{BlobStore, ImageRef, InlineImage};

/// Outcome of one migration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub posts_scanned: usize,
    pub images_migrated: usize,
    /// Images left inline because decoding or storing failed
    pub images_failed: usize,
    pub legacy_fields_folded: usize,
    /// Whether the posts collection was rewritten
    pub persisted: bool,
}

/// Move inline image data on all posts into the blob store.
///
/// A failure on one image keeps its inline data in place and the pass
/// continues. The posts collection is written once at the end, and only if
/// something changed.
pub async fn migrate_inline_images(
    records: &RecordStore,
    blobs: &BlobStore,
) -> Result<MigrationReport> {
    let mut posts = records.read_all::<Post>().await?;
    let mut report = MigrationReport {
        posts_scanned: posts.len(),
        ..Default::default()
    };

    for post in posts.iter_mut() {
        if let Some(legacy) = post.image.take() {
            if !post.images.contains(&legacy) {
                post.images.push(legacy);
            }
            report.legacy_fields_folded += 1;
        }

        for image in post.images.iter_mut() {
            let ImageRef::Inline(inline) = &*image else {
                continue;
            };

            match store_inline(blobs, inline).await {
                Ok(id) => {
                    tracing::debug!("Migrated inline image on post {} to {}", post.id, id);
                    *image = ImageRef::Blob(id);
                    report.images_migrated += 1;
                }
                Err(e) => {
                    tracing::warn!("Keeping inline image on post {}: {}", post.id, e);
                    report.images_failed += 1;
                }
            }
        }
    }

    if report.images_migrated > 0 || report.legacy_fields_folded > 0 {
        records.write_all(&posts).await?;
        report.persisted = true;
    }

    if report.persisted || report.images_failed > 0 {
        tracing::info!(
            "Image migration: {} migrated, {} failed, {} legacy fields folded across {} posts",
            report.images_migrated,
            report.images_failed,
            report.legacy_fields_folded,
            report.posts_scanned
        );
    }

    Ok(report)
}

async fn store_inline(blobs: &BlobStore, inline: &InlineImage) -> Result<String> {
    let bytes = inline.decode()?;
    blobs.put(&bytes).await
}
