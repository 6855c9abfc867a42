//! Application configuration constants
//!
//! Central location for storage names, identifier conventions
//! and validation boundaries used throughout the application.

// ===== Storage Layout =====

/// Record store database file, relative to the data directory
pub const DATABASE_FILENAME: &str = "sitelog.db";

/// Directory holding all blob store namespaces, relative to the data directory
pub const BLOBS_DIRNAME: &str = "blobs";

/// Namespace of the image blob store
pub const IMAGE_STORE_NAME: &str = "sitelog-images";

/// Schema version of the image blob store.
/// Bumping this runs the upgrade step on the next open.
pub const IMAGE_STORE_VERSION: u32 = 1;

/// Environment variable the binary reads the data directory from
pub const DATA_DIR_ENV: &str = "SITELOG_DATA_DIR";

/// Data directory used when the environment variable is unset
pub const DEFAULT_DATA_DIR: &str = "./sitelog-data";

// ===== Identifier Conventions =====

/// Prefix of inline-encoded image data (not yet migrated)
pub const INLINE_IMAGE_PREFIX: &str = "data:";

/// Prefix of blob store identifiers
pub const BLOB_ID_PREFIX: &str = "img_";

/// Scheme of object URL handles minted by the display cache
pub const OBJECT_URL_PREFIX: &str = "blob:sitelog/";

// ===== Validation Limits =====

/// Maximum length of a user display name
pub const MAX_USER_NAME_LENGTH: usize = 40;

/// Maximum length of a user bio
pub const MAX_BIO_LENGTH: usize = 500;

/// Maximum length of a building name
pub const MAX_BUILDING_NAME_LENGTH: usize = 120;

/// Maximum length of a post note
pub const MAX_NOTE_LENGTH: usize = 5_000;

/// Maximum number of tags on a post
pub const MAX_TAGS_PER_POST: usize = 20;

/// Maximum number of images on a post
pub const MAX_IMAGES_PER_POST: usize = 10;

/// Maximum length of a comment
pub const MAX_COMMENT_LENGTH: usize = 1_000;

/// Mood color used when a post is created without one
pub const DEFAULT_MOOD_COLOR: &str = "#8a8a8a";
