//! redcore: the core of a Reddit API client.
//!
//! Build a [`Config`], hand it to [`RedditClient::new`], then use the client
//! to look up lazy models, walk listings with a [`Paginator`], or send raw
//! [`Request`]s through the rate-limited, authenticated pipeline.
//!
//! ```no_run
//! # async fn run() -> redcore::Result<()> {
//! use redcore::{Config, RedditClient};
//!
//! let config = Config::new("my-bot/0.1 by u/someone")
//!     .with_script_credentials("client-id", "secret", "someone", "hunter2");
//! let client = RedditClient::new(config)?;
//!
//! let mut hot = client.subreddit("rust").hot().with_limit(Some(5));
//! while let Some(thing) = hot.next_thing().await? {
//!     println!("{}", thing);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod cancel;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod objector;
pub mod operations;
pub mod paginator;
pub mod ratelimit;
pub mod transport;
pub mod util;

pub use cancel::CancelToken;
pub use client::{ClientRef, Endpoint, RedditClient, Request};
pub use config::{CacheSettings, Config, Credentials};
pub use error::{ApiError, ErrorItem, RedditClientError, Result};
pub use models::{Listing, Model, ModelKind, Object, Thing};
pub use objector::Objector;
pub use paginator::Paginator;
pub use transport::mock::{MockResponse, MockTransport};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
