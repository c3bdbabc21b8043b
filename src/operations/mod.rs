//! Command-line operations built on the client.
//!
//! Each operation takes its options and a [`RedditClient`](crate::RedditClient),
//! does its work, and hands back formatted output for the CLI to print.

pub mod comment;
pub mod posts;
pub mod submit;
pub mod user;
