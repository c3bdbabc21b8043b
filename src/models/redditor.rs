use super::subreddit::Subreddit;
use super::{format_timestamp, stub_attributes, Model, ModelKind, Object};
use crate::client::{ClientRef, Request};
use crate::error::Result;
use crate::paginator::Paginator;
use log::debug;
use std::fmt;

model_wrapper!(
    /// A Reddit account (`t2`).
    Redditor
);

model_wrapper!(
    /// A named collection of subreddits owned by a user.
    Multireddit
);

model_wrapper!(
    /// An award or trophy (`t6`).
    Award
);

impl Redditor {
    pub(crate) fn from_name(client: ClientRef, name: &str) -> Self {
        let name = name.trim_start_matches("u/").trim_start_matches("/u/");
        Self(Model::stub(ModelKind::Redditor, stub_attributes(&[("name", name)]), client))
    }

    pub fn name(&self) -> &str {
        self.str_attr("name").unwrap_or_default()
    }

    pub fn link_karma(&self) -> Option<i64> {
        self.i64_attr("link_karma")
    }

    pub fn comment_karma(&self) -> Option<i64> {
        self.i64_attr("comment_karma")
    }

    pub fn created(&self) -> Option<String> {
        self.f64_attr("created_utc").map(format_timestamp)
    }

    fn listing(&self, endpoint: &str) -> Paginator {
        Paginator::new(self.client_ref().clone(), Request::get(endpoint).arg(self.name()))
    }

    pub fn overview(&self) -> Paginator {
        self.listing("user_overview")
    }

    pub fn submissions(&self) -> Paginator {
        self.listing("user_submitted")
    }

    pub fn comments(&self) -> Paginator {
        self.listing("user_comments")
    }

    pub fn upvoted(&self) -> Paginator {
        self.listing("user_upvoted")
    }

    pub fn saved(&self) -> Paginator {
        self.listing("user_saved")
    }

    /// Send a private message to this user.
    pub async fn message(&self, subject: &str, text: &str) -> Result<()> {
        let request = Request::post("compose")
            .form("to", self.name())
            .form("subject", subject)
            .form("text", text);
        debug!("Sending message to u/{}", self.name());
        self.client()?.request_json(&request).await?;
        Ok(())
    }
}

impl fmt::Display for Redditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Multireddit {
    pub(crate) fn from_parts(client: ClientRef, owner: &str, name: &str) -> Self {
        let path = format!("/user/{}/m/{}", owner, name);
        Self(Model::stub(
            ModelKind::Multireddit,
            stub_attributes(&[("owner", owner), ("name", name), ("path", path.as_str())]),
            client,
        ))
    }

    pub fn name(&self) -> &str {
        self.str_attr("name").unwrap_or_default()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.str_attr("display_name")
    }

    pub fn path(&self) -> &str {
        self.str_attr("path").unwrap_or_default()
    }

    /// The member subreddits, as stubs.
    pub fn subreddits(&self) -> Vec<Subreddit> {
        let Some(Object::List(entries)) = self.attr("subreddits") else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| entry.get("name").and_then(Object::as_str))
            .map(|name| Subreddit::from_name(self.client_ref().clone(), name))
            .collect()
    }

    fn listing(&self, sort: &str) -> Paginator {
        let path = format!("{}/{}", self.path().trim_matches('/'), sort);
        Paginator::new(self.client_ref().clone(), Request::get_path(path))
    }

    pub fn hot(&self) -> Paginator {
        self.listing("hot")
    }

    pub fn newest(&self) -> Paginator {
        self.listing("new")
    }
}

impl fmt::Display for Multireddit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl Award {
    pub fn name(&self) -> Option<&str> {
        self.str_attr("name")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_attr("description")
    }

    pub fn icon_url(&self) -> Option<&str> {
        self.str_attr("icon_url")
    }
}

impl fmt::Display for Award {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().or_else(|| self.id()).unwrap_or_default())
    }
}
