//! Client for the source Discourse forum.

mod client;
mod models;

pub use client::ForumClient;
pub use models::*;
