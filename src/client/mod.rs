//! The session facade.
//!
//! A [`RedditClient`] owns the whole stack: configuration, URL registry,
//! rate limiter, authenticator, request pipeline, objector and the optional
//! response cache. It is cheap to clone and safe to share between tasks;
//! all clones talk to the same rate limiter and token.

mod pipeline;
mod request;

pub use pipeline::RequestPipeline;
pub use request::{Endpoint, Request};

use crate::auth::Authenticator;
use crate::cache::ResponseCache;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::endpoints::UrlRegistry;
use crate::error::{RedditClientError, Result};
use crate::models::{
    Comment, ListingFlavor, Message, Model, ModelKind, Multireddit, Object, Redditor, Submission,
    Subreddit, Thing,
};
use crate::objector::Objector;
use crate::paginator::Paginator;
use crate::ratelimit::RateLimiter;
use crate::transport::{HttpTransport, ReqwestTransport};
use log::{debug, info};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// `/api/info` accepts at most this many fullnames per call.
const INFO_BATCH: usize = 100;

pub(crate) struct ClientInner {
    config: Config,
    pipeline: RequestPipeline,
    objector: Objector,
    cache: Option<ResponseCache>,
}

/// Non-owning handle from a model back to the client that built it.
#[derive(Clone, Default)]
pub struct ClientRef {
    inner: Weak<ClientInner>,
    cancel: CancelToken,
}

impl ClientRef {
    pub(crate) fn new(inner: Weak<ClientInner>, cancel: CancelToken) -> Self {
        Self { inner, cancel }
    }

    /// A handle that never resolves to a client.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn upgrade(&self) -> Result<RedditClient> {
        self.inner
            .upgrade()
            .map(|inner| RedditClient {
                inner,
                cancel: self.cancel.clone(),
            })
            .ok_or_else(|| {
                RedditClientError::ClientError("object is not attached to a live client".to_string())
            })
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

impl fmt::Debug for ClientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRef")
            .field("attached", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// User agent actually sent: the caller's, tagged with this library.
fn full_user_agent(user_agent: &str) -> String {
    format!("{} redcore/{}", user_agent, env!("CARGO_PKG_VERSION"))
}

#[derive(Clone)]
pub struct RedditClient {
    inner: Arc<ClientInner>,
    cancel: CancelToken,
}

impl fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditClient")
            .field("config", &self.inner.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl RedditClient {
    /// Build a client that talks to Reddit over HTTPS.
    pub fn new(config: Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&full_user_agent(&config.user_agent))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a client on top of any [`HttpTransport`].
    pub fn with_transport(config: Config, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let credentials = config.validate()?;
        let user_agent = full_user_agent(&config.user_agent);
        debug!(
            "Creating RedditClient for {} with user_agent: {}",
            config.base_url, user_agent
        );

        let pipeline = RequestPipeline::new(&config, credentials, user_agent, transport)?;
        let cache = config.cache.map(ResponseCache::new);
        if config.check_for_updates {
            info!(
                "Update checks are not supported; running redcore {}",
                env!("CARGO_PKG_VERSION")
            );
        }

        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| ClientInner {
            objector: Objector::new(weak.clone()),
            config,
            pipeline,
            cache,
        });
        Ok(Self {
            inner,
            cancel: CancelToken::new(),
        })
    }

    /// A clone whose requests, and the lazy loads of the models they
    /// return, observe `token`.
    pub fn cancellable(&self, token: CancelToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: token,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn objector(&self) -> &Objector {
        &self.inner.objector
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.inner.pipeline
    }

    pub fn registry(&self) -> &UrlRegistry {
        self.inner.pipeline.registry()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        self.inner.pipeline.rate_limiter()
    }

    pub fn authenticator(&self) -> &Authenticator {
        self.inner.pipeline.authenticator()
    }

    pub(crate) fn handle(&self) -> ClientRef {
        ClientRef::new(Arc::downgrade(&self.inner), self.cancel.clone())
    }

    /// Send `request` and return the raw JSON body.
    ///
    /// With caching enabled, GET responses are served from the cache while
    /// fresh and any mutating request empties it.
    pub async fn request_json(&self, request: &Request) -> Result<Value> {
        let pipeline = &self.inner.pipeline;
        let Some(cache) = &self.inner.cache else {
            return pipeline.execute(request, &self.cancel).await;
        };

        if request.is_mutating() {
            cache.clear();
            return pipeline.execute(request, &self.cancel).await;
        }

        let key = ResponseCache::key(&pipeline.resolve(request)?, &pipeline.query_for(request));
        if let Some(hit) = cache.get(&key) {
            return Ok(hit);
        }
        let value = pipeline.execute(request, &self.cancel).await?;
        cache.insert(key, value.clone());
        Ok(value)
    }

    /// Send `request` and objectify the response.
    pub async fn request(&self, request: &Request) -> Result<Object> {
        let value = self.request_json(request).await?;
        Ok(self.inner.objector.objectify_with(value, &self.cancel))
    }

    /// Drop cached responses for the named endpoints.
    pub fn invalidate_endpoints(&self, names: &[&str]) -> Result<()> {
        let templates = self.registry().group(names)?;
        if let Some(cache) = &self.inner.cache {
            cache.invalidate(&templates);
        }
        Ok(())
    }

    pub fn subreddit(&self, name: &str) -> Subreddit {
        Subreddit::from_name(self.handle(), name)
    }

    pub fn redditor(&self, name: &str) -> Redditor {
        Redditor::from_name(self.handle(), name)
    }

    pub fn submission(&self, id: &str) -> Submission {
        Submission::from_id(self.handle(), id.trim_start_matches("t3_"))
    }

    pub fn submission_from_url(&self, url: &str) -> Result<Submission> {
        let id = Submission::id_from_url(url)?;
        Ok(Submission::from_id(self.handle(), &id))
    }

    pub fn comment(&self, id: &str) -> Comment {
        Comment::from_id(self.handle(), id.trim_start_matches("t1_"))
    }

    pub fn message(&self, id: &str) -> Message {
        Message::from_id(self.handle(), id.trim_start_matches("t4_"))
    }

    pub fn multireddit(&self, owner: &str, name: &str) -> Multireddit {
        Multireddit::from_parts(self.handle(), owner, name)
    }

    /// A paginator over any listing endpoint.
    pub fn paginate(&self, request: Request) -> Paginator {
        Paginator::new(self.handle(), request)
    }

    pub fn front_page(&self) -> Paginator {
        self.paginate(Request::get("hot"))
    }

    pub fn inbox(&self) -> Paginator {
        self.paginate(Request::get("inbox"))
    }

    pub fn unread(&self) -> Paginator {
        self.paginate(Request::get("unread"))
    }

    pub fn sent(&self) -> Paginator {
        self.paginate(Request::get("sent"))
    }

    /// Site-wide search.
    pub fn search(&self, query: &str) -> Paginator {
        self.paginate(Request::get("search").param("q", query))
    }

    /// Moderator notes about `user` in `subreddit`.
    pub fn mod_notes(&self, subreddit: &str, user: &str) -> Paginator {
        self.paginate(
            Request::get("mod_notes")
                .param("subreddit", subreddit)
                .param("user", user),
        )
        .with_flavor(ListingFlavor::ModNotes)
    }

    pub fn modmail_conversations(&self) -> Paginator {
        self.paginate(Request::get("modmail_conversations"))
            .with_flavor(ListingFlavor::ModmailConversations)
    }

    /// The authenticated account.
    pub async fn me(&self) -> Result<Redditor> {
        match self.request(&Request::get("me")).await? {
            Object::Map(attributes) => Ok(Redditor(Model::fetched(
                ModelKind::Redditor,
                attributes,
                self.handle(),
            ))),
            Object::Thing(Thing::Redditor(redditor)) => Ok(redditor),
            other => Err(RedditClientError::ResponseError(format!(
                "unexpected {} from /api/v1/me",
                other.type_name()
            ))),
        }
    }

    /// Look up things by fullname, in batches of 100.
    pub async fn info(&self, fullnames: &[&str]) -> Result<Vec<Thing>> {
        let mut things = Vec::with_capacity(fullnames.len());
        for batch in fullnames.chunks(INFO_BATCH) {
            let request = Request::get("info").param("id", batch.join(","));
            match self.request(&request).await? {
                Object::Listing(listing) => things.extend(
                    listing
                        .into_children()
                        .into_iter()
                        .filter_map(Object::into_thing),
                ),
                other => {
                    return Err(RedditClientError::ResponseError(format!(
                        "unexpected {} from /api/info",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(things)
    }
}
