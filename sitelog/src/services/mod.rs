//! Services module
//!
//! Business logic services that coordinate between the session and the stores.

pub mod comments;
pub mod likes;
pub mod migration;
pub mod posts;
pub mod users;

pub use comments::CommentsService;
pub use likes::LikesService;
pub use migration::{migrate_inline_images, MigrationReport};
pub use posts::PostsService;
pub use users::UsersService;
