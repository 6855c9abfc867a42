//! sitelog library
//!
//! Local persistence for an architectural site-visit journal: a record
//! store for users, posts, comments and likes, a blob store for photos,
//! the startup migration of inline images and the display URL cache.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod storage;
