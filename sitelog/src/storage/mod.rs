//! Storage module
//!
//! Provides blob storage for image content and the display URL cache
//! that exposes it to the view layer.

pub mod blob_store;
pub mod display_urls;
pub mod image_ref;

pub use blob_store::BlobStore;
pub use display_urls::{DisplayUrl, DisplayUrlCache, ObjectUrlRegistry};
pub use image_ref::{ImageRef, InlineImage};
