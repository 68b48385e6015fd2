//! Client for the remote posts collection (json-server style REST API).

pub mod client;
pub mod types;

pub use client::PostsClient;
pub use types::{Post, PostFields};
