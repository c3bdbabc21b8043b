use super::capabilities::{Deletable, Replyable};
use super::{format_timestamp, stub_attributes, Model, ModelKind};
use crate::client::{ClientRef, Request};
use crate::error::Result;
use std::fmt;

model_wrapper!(
    /// A private message (`t4`).
    Message
);

impl Message {
    pub(crate) fn from_id(client: ClientRef, id: &str) -> Self {
        Self(Model::stub(ModelKind::Message, stub_attributes(&[("id", id)]), client))
    }

    pub fn subject(&self) -> Option<&str> {
        self.str_attr("subject")
    }

    pub fn body(&self) -> Option<&str> {
        self.str_attr("body")
    }

    pub fn author(&self) -> Option<&str> {
        self.str_attr("author")
    }

    pub fn dest(&self) -> Option<&str> {
        self.str_attr("dest")
    }

    pub fn is_unread(&self) -> bool {
        self.bool_attr("new").unwrap_or(false)
    }

    pub fn sent_at(&self) -> Option<String> {
        self.f64_attr("created_utc").map(format_timestamp)
    }

    pub async fn mark_read(&self) -> Result<()> {
        self.mark("read_message").await
    }

    pub async fn mark_unread(&self) -> Result<()> {
        self.mark("unread_message").await
    }

    async fn mark(&self, endpoint: &str) -> Result<()> {
        let request = Request::post(endpoint).form("id", self.require_fullname()?);
        self.client()?.request_json(&request).await?;
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id().unwrap_or_default())
    }
}

impl Deletable for Message {
    const DELETE_ENDPOINT: &'static str = "del_msg";
}

impl Replyable for Message {}
