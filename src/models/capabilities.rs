//! Actions shared by several kinds of Reddit objects.
//!
//! Each trait has default implementations built on [`Model`], so a type
//! opts in with an empty `impl`.

use super::{Model, Thing};
use crate::client::Request;
use crate::error::{RedditClientError, Result};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
    Clear,
}

impl VoteDirection {
    pub fn as_param(self) -> &'static str {
        match self {
            VoteDirection::Up => "1",
            VoteDirection::Down => "-1",
            VoteDirection::Clear => "0",
        }
    }
}

/// Send a form POST on behalf of `model`, with its fullname as `id_key`.
async fn act(model: &Model, endpoint: &str, id_key: &str, extra: &[(&str, &str)]) -> Result<Value> {
    let fullname = model.require_fullname()?;
    let mut request = Request::post(endpoint).form(id_key, fullname);
    for (key, value) in extra {
        request = request.form(key, *value);
    }
    debug!("{} {}", endpoint, fullname);
    model.client()?.request_json(&request).await
}

/// Reddit answers comment and edit calls with the new thing wrapped in
/// `{"json": {"data": {"things": [...]}}}`.
fn first_thing(model: &Model, mut response: Value) -> Result<Thing> {
    let payload = response
        .pointer_mut("/json/data/things/0")
        .map(Value::take)
        .ok_or_else(|| RedditClientError::ResponseError("response carries no thing".into()))?;
    let client = model.client()?;
    client
        .objector()
        .objectify_with(payload, model.client_ref().cancel_token())
        .into_thing()
        .ok_or_else(|| RedditClientError::ResponseError("response thing has no kind".into()))
}

#[async_trait]
pub trait Votable: AsRef<Model> + Sync {
    async fn vote(&self, direction: VoteDirection) -> Result<()> {
        act(self.as_ref(), "vote", "id", &[("dir", direction.as_param())]).await?;
        Ok(())
    }

    async fn upvote(&self) -> Result<()> {
        self.vote(VoteDirection::Up).await
    }

    async fn downvote(&self) -> Result<()> {
        self.vote(VoteDirection::Down).await
    }

    async fn clear_vote(&self) -> Result<()> {
        self.vote(VoteDirection::Clear).await
    }
}

#[async_trait]
pub trait Saveable: AsRef<Model> + Sync {
    /// Save to the authenticated user's list, optionally in `category`.
    async fn save(&self, category: Option<&str>) -> Result<()> {
        match category {
            Some(category) => act(self.as_ref(), "save", "id", &[("category", category)]).await?,
            None => act(self.as_ref(), "save", "id", &[]).await?,
        };
        Ok(())
    }

    async fn unsave(&self) -> Result<()> {
        act(self.as_ref(), "unsave", "id", &[]).await?;
        Ok(())
    }
}

#[async_trait]
pub trait Deletable: AsRef<Model> + Sync {
    const DELETE_ENDPOINT: &'static str = "del";

    async fn delete(&self) -> Result<()> {
        act(self.as_ref(), Self::DELETE_ENDPOINT, "id", &[]).await?;
        Ok(())
    }
}

#[async_trait]
pub trait Editable: AsRef<Model> + Sync {
    /// Replace the body text. Returns the updated object.
    async fn edit(&self, body: &str) -> Result<Thing> {
        let model = self.as_ref();
        let response = act(model, "edit", "thing_id", &[("text", body)]).await?;
        first_thing(model, response)
    }
}

#[async_trait]
pub trait Reportable: AsRef<Model> + Sync {
    async fn report(&self, reason: &str) -> Result<()> {
        act(self.as_ref(), "report", "thing_id", &[("reason", reason)]).await?;
        Ok(())
    }
}

#[async_trait]
pub trait Replyable: AsRef<Model> + Sync {
    /// Post a reply. Returns the new comment or message.
    async fn reply(&self, body: &str) -> Result<Thing> {
        let model = self.as_ref();
        let response = act(model, "comment", "thing_id", &[("text", body)]).await?;
        first_thing(model, response)
    }
}
