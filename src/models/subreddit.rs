use super::listing::ListingFlavor;
use super::redditor::Redditor;
use super::submission::Submission;
use super::{format_timestamp, stub_attributes, Model, ModelKind, Object};
use crate::client::{ClientRef, Request};
use crate::error::{RedditClientError, Result};
use crate::paginator::Paginator;
use crate::util::url_join;
use log::{debug, info};
use serde_json::Value;
use std::fmt;

model_wrapper!(
    /// A subreddit (`t5`).
    Subreddit
);

model_wrapper!(
    /// One page of a subreddit wiki.
    WikiPage
);

model_wrapper!(
    /// A subreddit's custom CSS and the images it references.
    Stylesheet
);

model_wrapper!(
    /// An entry of a subreddit's moderation log.
    ModAction
);

/// Time window for `top` and `controversial` listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    Hour,
    Day,
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl TimeFilter {
    pub fn as_param(self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

impl std::str::FromStr for TimeFilter {
    type Err = RedditClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeFilter::Hour),
            "day" => Ok(TimeFilter::Day),
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            "year" => Ok(TimeFilter::Year),
            "all" => Ok(TimeFilter::All),
            other => Err(RedditClientError::ClientError(format!("invalid time filter '{}'", other))),
        }
    }
}

/// What a new post carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostContent {
    SelfText(String),
    Link(String),
}

impl Subreddit {
    pub(crate) fn from_name(client: ClientRef, name: &str) -> Self {
        let name = name.trim_start_matches("r/").trim_start_matches("/r/");
        Self(Model::stub(
            ModelKind::Subreddit,
            stub_attributes(&[("display_name", name)]),
            client,
        ))
    }

    pub fn display_name(&self) -> &str {
        self.str_attr("display_name").unwrap_or_default()
    }

    pub fn title(&self) -> Option<&str> {
        self.str_attr("title")
    }

    pub fn subscribers(&self) -> Option<i64> {
        self.i64_attr("subscribers")
    }

    pub fn public_description(&self) -> Option<&str> {
        self.str_attr("public_description")
    }

    pub fn over_18(&self) -> bool {
        self.bool_attr("over18").unwrap_or(false)
    }

    fn listing(&self, endpoint: &str) -> Paginator {
        Paginator::new(
            self.client_ref().clone(),
            Request::get(endpoint).arg(self.display_name()),
        )
    }

    pub fn hot(&self) -> Paginator {
        self.listing("subreddit_hot")
    }

    pub fn newest(&self) -> Paginator {
        self.listing("subreddit_new")
    }

    pub fn rising(&self) -> Paginator {
        self.listing("subreddit_rising")
    }

    pub fn gilded(&self) -> Paginator {
        self.listing("subreddit_gilded")
    }

    pub fn top(&self, time: TimeFilter) -> Paginator {
        self.listing("subreddit_top").param("t", time.as_param())
    }

    pub fn controversial(&self, time: TimeFilter) -> Paginator {
        self.listing("subreddit_controversial").param("t", time.as_param())
    }

    /// Newest comments across the subreddit.
    pub fn comments(&self) -> Paginator {
        self.listing("subreddit_comments")
    }

    pub fn search(&self, query: &str) -> Paginator {
        self.listing("subreddit_search")
            .param("q", query)
            .param("restrict_sr", "on")
    }

    pub fn mod_log(&self) -> Paginator {
        self.listing("modlog")
    }

    pub fn flair_list(&self) -> Paginator {
        self.listing("flairlist").with_flavor(ListingFlavor::Flair)
    }

    pub fn wiki_page(&self, name: &str) -> WikiPage {
        WikiPage(Model::stub(
            ModelKind::WikiPage,
            stub_attributes(&[("subreddit", self.display_name()), ("name", name)]),
            self.client_ref().clone(),
        ))
    }

    pub fn stylesheet(&self) -> Stylesheet {
        Stylesheet(Model::stub(
            ModelKind::Stylesheet,
            stub_attributes(&[("subreddit", self.display_name())]),
            self.client_ref().clone(),
        ))
    }

    pub async fn moderators(&self) -> Result<Vec<Redditor>> {
        let request = Request::get("moderators").arg(self.display_name());
        match self.client()?.request(&request).await? {
            Object::Listing(listing) => listing
                .into_children()
                .into_iter()
                .map(Redditor::try_from)
                .collect(),
            other => Err(RedditClientError::ResponseError(format!(
                "expected a moderator list, got {}",
                other.type_name()
            ))),
        }
    }

    /// Rules as returned by Reddit, objectified but otherwise untouched.
    pub async fn rules(&self) -> Result<Object> {
        let request = Request::get("subreddit_rules").arg(self.display_name());
        self.client()?.request(&request).await
    }

    /// A random submission. Reddit answers with a redirect to it.
    pub async fn random(&self) -> Result<Submission> {
        let client = self.client()?;
        let request = Request::get("subreddit_random").arg(self.display_name());
        let id = match client.request(&request).await {
            Err(RedditClientError::Redirect { location, .. }) => {
                let absolute = if location.starts_with("http") {
                    location
                } else {
                    url_join(client.registry().base(), &location)
                };
                Submission::id_from_url(&absolute)?
            }
            Ok(Object::List(pages)) => pages
                .into_iter()
                .next()
                .and_then(Object::into_listing)
                .and_then(|l| l.into_children().into_iter().next())
                .and_then(Object::into_thing)
                .and_then(|t| t.id().map(str::to_string))
                .ok_or_else(|| RedditClientError::ResponseError("random returned no submission".into()))?,
            Ok(other) => {
                return Err(RedditClientError::ResponseError(format!(
                    "unexpected {} from random",
                    other.type_name()
                )))
            }
            Err(err) => return Err(err),
        };
        Ok(Submission::from_id(self.client_ref().clone(), &id))
    }

    /// Create a post. Returns a stub for the new submission.
    pub async fn submit(&self, title: &str, content: PostContent) -> Result<Submission> {
        let mut request = Request::post("submit")
            .form("sr", self.display_name())
            .form("title", title)
            .form("resubmit", "true")
            .form("sendreplies", "true");
        request = match &content {
            PostContent::SelfText(text) => request.form("kind", "self").form("text", text.as_str()),
            PostContent::Link(url) => request.form("kind", "link").form("url", url.as_str()),
        };

        debug!("Submitting '{}' to r/{}", title, self.display_name());
        let response = self.client()?.request_json(&request).await?;
        let id = response
            .pointer("/json/data/id")
            .and_then(Value::as_str)
            .ok_or_else(|| RedditClientError::ResponseError("submit response has no id".into()))?;
        info!("Created submission {} in r/{}", id, self.display_name());
        Ok(Submission::from_id(self.client_ref().clone(), id))
    }

    pub async fn subscribe(&self) -> Result<()> {
        self.set_subscription("sub").await
    }

    pub async fn unsubscribe(&self) -> Result<()> {
        self.set_subscription("unsub").await
    }

    async fn set_subscription(&self, action: &str) -> Result<()> {
        let request = Request::post("subscribe")
            .form("action", action)
            .form("sr_name", self.display_name());
        self.client()?.request_json(&request).await?;
        Ok(())
    }
}

impl fmt::Display for Subreddit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl WikiPage {
    pub fn subreddit_name(&self) -> &str {
        self.str_attr("subreddit").unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.str_attr("name").unwrap_or_default()
    }

    pub fn content_md(&self) -> Option<&str> {
        self.str_attr("content_md")
    }

    pub fn revision_by(&self) -> Option<Redditor> {
        self.attr("revision_by")
            .cloned()
            .and_then(|object| Redditor::try_from(object).ok())
    }

    pub fn revision_date(&self) -> Option<String> {
        self.f64_attr("revision_date").map(format_timestamp)
    }

    /// Replace the page content.
    pub async fn edit(&self, content: &str, reason: Option<&str>) -> Result<()> {
        let mut request = Request::post("wiki_edit")
            .arg(self.subreddit_name())
            .form("page", self.name())
            .form("content", content);
        if let Some(reason) = reason {
            request = request.form("reason", reason);
        }
        self.client()?.request_json(&request).await?;
        Ok(())
    }
}

impl fmt::Display for WikiPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subreddit_name(), self.name())
    }
}

impl Stylesheet {
    /// A detached stylesheet built from its parts.
    pub fn from_parts(stylesheet: &str, images: Vec<Value>) -> Self {
        let mut attributes = stub_attributes(&[("stylesheet", stylesheet)]);
        attributes.insert("images".to_string(), Object::Value(Value::Array(images)));
        Self(Model::fetched(ModelKind::Stylesheet, attributes, ClientRef::detached()))
    }

    pub fn stylesheet(&self) -> &str {
        self.str_attr("stylesheet").unwrap_or_default()
    }

    pub fn image_count(&self) -> usize {
        match self.attr("images") {
            Some(Object::Value(Value::Array(images))) => images.len(),
            Some(Object::List(images)) => images.len(),
            _ => 0,
        }
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Stylesheet with {} characters and {} images>",
            self.stylesheet().chars().count(),
            self.image_count()
        )
    }
}

impl ModAction {
    pub fn action(&self) -> Option<&str> {
        self.str_attr("action")
    }

    pub fn moderator(&self) -> Option<&str> {
        self.str_attr("mod")
    }

    pub fn target_fullname(&self) -> Option<&str> {
        self.str_attr("target_fullname")
    }

    pub fn details(&self) -> Option<&str> {
        self.str_attr("details")
    }
}

impl fmt::Display for ModAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} by {}",
            self.action().unwrap_or("?"),
            self.moderator().unwrap_or("?")
        )
    }
}
