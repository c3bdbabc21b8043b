//! Lazy iteration over Reddit listing endpoints.
//!
//! A [`Paginator`] walks the pages of a listing one HTTP call at a time,
//! handing out items as they are needed. It is single-use: once it has
//! reported the end of the sequence, further calls to
//! [`next`](Paginator::next) fail with a `ClientError`. Use
//! [`restart`](Paginator::restart) to walk again from the initial cursor.

use crate::client::{ClientRef, Request};
use crate::error::{RedditClientError, Result};
use crate::models::{Listing, ListingFlavor, Object, Thing};
use log::debug;
use std::collections::VecDeque;

/// Reddit never returns more than this many items per page.
pub const PAGE_SIZE: usize = 100;

/// Hard cap on page fetches, whatever the server claims.
pub const MAX_PAGES: usize = 1000;

/// Items handed out when no limit is given.
pub const DEFAULT_LIMIT: usize = 100;

pub struct Paginator {
    client: ClientRef,
    request: Request,
    limit: Option<usize>,
    flavor: Option<ListingFlavor>,
    start_after: Option<String>,
    after: Option<String>,
    buffer: VecDeque<Object>,
    yielded: usize,
    pages: usize,
    /// No further page will be requested.
    exhausted: bool,
    /// `next` already reported the end.
    finished: bool,
}

impl Paginator {
    pub(crate) fn new(client: ClientRef, request: Request) -> Self {
        Self {
            client,
            request,
            limit: Some(DEFAULT_LIMIT),
            flavor: None,
            start_after: None,
            after: None,
            buffer: VecDeque::new(),
            yielded: 0,
            pages: 0,
            exhausted: false,
            finished: false,
        }
    }

    /// Maximum number of items to yield; `None` walks until the server runs
    /// out (bounded by [`MAX_PAGES`]).
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Begin after `cursor` instead of at the first page.
    pub fn starting_after(mut self, cursor: impl Into<String>) -> Self {
        let cursor = cursor.into();
        self.after = Some(cursor.clone());
        self.start_after = Some(cursor);
        self
    }

    /// Extra query parameter sent with every page, e.g. `t` or `sort`.
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.request.set_param(key, value);
        self
    }

    /// Parse untagged pages as `flavor` instead of guessing from their keys.
    pub fn with_flavor(mut self, flavor: ListingFlavor) -> Self {
        self.flavor = Some(flavor);
        self
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// A fresh paginator over the same listing, from the initial cursor.
    pub fn restart(&self) -> Paginator {
        let mut fresh = Paginator::new(self.client.clone(), self.request.clone());
        fresh.limit = self.limit;
        fresh.flavor = self.flavor;
        fresh.start_after = self.start_after.clone();
        fresh.after = self.start_after.clone();
        fresh
    }

    fn limit_reached(&self) -> bool {
        matches!(self.limit, Some(limit) if self.yielded >= limit)
    }

    /// The next item, or `None` at the end of the listing.
    #[allow(clippy::should_implement_trait)]
    pub async fn next(&mut self) -> Result<Option<Object>> {
        if self.finished {
            return Err(RedditClientError::ClientError(
                "paginator already exhausted; call restart() to walk it again".to_string(),
            ));
        }

        if self.limit_reached() {
            return Ok(self.finish());
        }
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        match self.buffer.pop_front() {
            Some(item) => {
                self.yielded += 1;
                Ok(Some(item))
            }
            None => Ok(self.finish()),
        }
    }

    /// Like [`next`](Paginator::next), for listings that only hold things.
    pub async fn next_thing(&mut self) -> Result<Option<Thing>> {
        match self.next().await? {
            Some(Object::Thing(thing)) => Ok(Some(thing)),
            Some(other) => Err(RedditClientError::ResponseError(format!(
                "expected a thing in listing, got {}",
                other.type_name()
            ))),
            None => Ok(None),
        }
    }

    /// Drain the remaining items.
    pub async fn collect_all(&mut self) -> Result<Vec<Object>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    fn finish(&mut self) -> Option<Object> {
        self.finished = true;
        self.buffer.clear();
        None
    }

    async fn fetch_page(&mut self) -> Result<()> {
        if self.pages >= MAX_PAGES {
            debug!("Paginator reached {} pages, stopping", MAX_PAGES);
            self.exhausted = true;
            return Ok(());
        }

        let page_size = match self.limit {
            Some(limit) => limit.saturating_sub(self.yielded).min(PAGE_SIZE),
            None => PAGE_SIZE,
        };
        let mut request = self.request.clone();
        request.set_param("limit", page_size.to_string());
        request.set_param("count", self.yielded.to_string());
        let cursor_param = self.flavor.unwrap_or(ListingFlavor::Standard).cursor_param();
        match &self.after {
            Some(after) => request.set_param(cursor_param, after.clone()),
            None => request.remove_param(cursor_param),
        }

        let client = self.client.upgrade()?;
        let response = client.request(&request).await?;
        self.pages += 1;

        let listing = extract_listing(response, self.flavor)?;
        let next_after = listing.after().map(str::to_string);
        let before = listing.before().map(str::to_string);
        debug!(
            "Fetched page {} with {} items, after={:?}",
            self.pages,
            listing.len(),
            next_after
        );

        // an empty page ends the walk even when it still names a cursor
        let stalled = next_after.is_some() && (next_after == self.after || next_after == before);
        if listing.is_empty() || next_after.is_none() || stalled {
            self.exhausted = true;
        }

        self.after = next_after;
        self.buffer.extend(listing.into_children());
        Ok(())
    }
}

/// Find the listing in a page response.
fn extract_listing(object: Object, flavor: Option<ListingFlavor>) -> Result<Listing> {
    match object {
        Object::Listing(listing) => Ok(listing),
        // [submission, comments] style responses page over the second element
        Object::List(mut items) if items.len() >= 2 => extract_listing(items.swap_remove(1), flavor),
        Object::Map(attributes) => {
            let flavor = flavor
                .or_else(|| ListingFlavor::detect(&attributes))
                .ok_or_else(|| RedditClientError::ResponseError("response is not a listing".to_string()))?;
            Ok(Listing::from_attributes(flavor, attributes))
        }
        other => Err(RedditClientError::ResponseError(format!(
            "expected a listing, got {}",
            other.type_name()
        ))),
    }
}
