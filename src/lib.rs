//! Forum Mirror library.
//!
//! Incrementally mirrors a Discourse forum's topics and posts into SQLite,
//! backfilling newly discovered topics and tombstoning topics that disappear
//! at the source.

pub mod config;
pub mod constants;
pub mod db;
pub mod duration;
pub mod error;
pub mod forum;
pub mod scheduler;
pub mod sync;
pub mod web;
