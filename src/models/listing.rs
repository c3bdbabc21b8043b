//! Listings and "load more comments" placeholders.

use super::{attributes_to_json, Attributes, Object, Thing};
use crate::client::{ClientRef, Request};
use crate::error::{RedditClientError, Result};
use crate::util::split_fullname;
use serde_json::{Map, Value};

/// `/api/morechildren` accepts at most this many ids per call.
const MORECHILDREN_BATCH: usize = 100;

/// The payload shapes that carry a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingFlavor {
    /// `{"kind": "Listing", "data": {"children": [...], "after": ...}}`
    Standard,
    /// Flair list: `{"users": [...], "next": ...}`
    Flair,
    /// Mod notes: `{"mod_notes": [...], "end_cursor": ..., "has_next_page": ...}`
    ModNotes,
    /// Modmail: `{"conversations": {...}, "conversationIds": [...]}`
    ModmailConversations,
    /// `UserList`, the relationship listings (moderators, friends, ...).
    RedditorList,
}

impl ListingFlavor {
    pub fn children_key(self) -> &'static str {
        match self {
            ListingFlavor::Standard | ListingFlavor::RedditorList => "children",
            ListingFlavor::Flair => "users",
            ListingFlavor::ModNotes => "mod_notes",
            ListingFlavor::ModmailConversations => "conversations",
        }
    }

    /// Query parameter that carries the cursor to the next page.
    pub fn cursor_param(self) -> &'static str {
        match self {
            ListingFlavor::ModNotes => "before",
            _ => "after",
        }
    }

    /// Recognize an untagged listing by the key that holds its items.
    pub fn detect(attributes: &Attributes) -> Option<Self> {
        [
            ListingFlavor::Standard,
            ListingFlavor::Flair,
            ListingFlavor::ModNotes,
            ListingFlavor::ModmailConversations,
        ]
        .into_iter()
        .find(|flavor| attributes.contains_key(flavor.children_key()))
    }
}

/// One page of results plus the cursors around it.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    flavor: ListingFlavor,
    children: Vec<Object>,
    before: Option<String>,
    after: Option<String>,
    dist: Option<u64>,
    attributes: Attributes,
}

impl Listing {
    pub fn new(flavor: ListingFlavor, children: Vec<Object>) -> Self {
        Self {
            flavor,
            children,
            before: None,
            after: None,
            dist: None,
            attributes: Attributes::new(),
        }
    }

    /// Build a listing from already objectified attributes. The children
    /// are taken out of `attributes`; everything else is kept.
    pub fn from_attributes(flavor: ListingFlavor, mut attributes: Attributes) -> Self {
        let children = match attributes.remove(flavor.children_key()) {
            Some(Object::List(items)) => items,
            Some(Object::Value(Value::Array(items))) => items.into_iter().map(Object::Value).collect(),
            Some(Object::Map(by_id)) => ordered_conversations(by_id, &attributes),
            Some(other) if !other.is_null() => vec![other],
            _ => Vec::new(),
        };

        let text = |key: &str| {
            attributes
                .get(key)
                .and_then(Object::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let after = match flavor {
            ListingFlavor::Standard | ListingFlavor::RedditorList => text("after"),
            ListingFlavor::Flair => text("next"),
            ListingFlavor::ModNotes => {
                let more = attributes.get("has_next_page").and_then(Object::as_bool);
                if more == Some(true) {
                    text("end_cursor")
                } else {
                    None
                }
            }
            ListingFlavor::ModmailConversations => children.last().and_then(child_id),
        };
        let before = match flavor {
            ListingFlavor::Flair => text("prev"),
            ListingFlavor::ModNotes => text("start_cursor"),
            _ => text("before"),
        };
        let dist = attributes.get("dist").and_then(Object::as_u64);

        Self {
            flavor,
            children,
            before,
            after,
            dist,
            attributes,
        }
    }

    /// Objectify a raw listing payload without a client, e.g. for offline
    /// processing of saved responses.
    pub fn from_json(flavor: ListingFlavor, data: Value) -> Result<Self> {
        match crate::objector::Objector::detached().objectify(data) {
            Object::Listing(listing) => Ok(listing),
            Object::Map(attributes) => Ok(Self::from_attributes(flavor, attributes)),
            other => Err(RedditClientError::ResponseError(format!(
                "expected a listing, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn flavor(&self) -> ListingFlavor {
        self.flavor
    }

    pub fn children(&self) -> &[Object] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Object> {
        self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Cursor for the next page; `None` when there is none.
    pub fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }

    pub fn before(&self) -> Option<&str> {
        self.before.as_deref()
    }

    pub fn dist(&self) -> Option<u64> {
        self.dist
    }

    pub fn attr(&self, name: &str) -> Option<&Object> {
        self.attributes.get(name)
    }

    /// The tagged children, skipping `more` placeholders and plain maps.
    pub fn things(&self) -> impl Iterator<Item = &Thing> {
        self.children.iter().filter_map(Object::as_thing)
    }

    /// The trailing "load more comments" placeholders of a comment tree.
    pub fn more_comments(&self) -> impl Iterator<Item = &MoreComments> {
        self.children.iter().filter_map(|child| match child {
            Object::More(more) => Some(more),
            _ => None,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut data = match attributes_to_json(&self.attributes) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        data.insert(
            self.flavor.children_key().to_string(),
            Value::Array(self.children.iter().map(Object::to_json).collect()),
        );
        match self.flavor {
            ListingFlavor::Standard => serde_json::json!({"kind": "Listing", "data": data}),
            ListingFlavor::RedditorList => serde_json::json!({"kind": "UserList", "data": data}),
            _ => Value::Object(data),
        }
    }
}

fn child_id(child: &Object) -> Option<String> {
    match child {
        Object::Thing(thing) => thing.id().map(str::to_string),
        other => other.get("id").and_then(Object::as_str).map(str::to_string),
    }
}

/// Modmail sends conversations keyed by id, with their display order in
/// `conversationIds`.
fn ordered_conversations(mut by_id: Attributes, attributes: &Attributes) -> Vec<Object> {
    let order: Vec<String> = match attributes.get("conversation_ids") {
        Some(Object::Value(Value::Array(ids))) => ids
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    let mut children: Vec<Object> = order.iter().filter_map(|id| by_id.remove(id)).collect();
    children.extend(by_id.into_values());
    children
}

/// A placeholder for comments that were not included in a comment tree.
#[derive(Debug, Clone)]
pub struct MoreComments {
    pub id: String,
    pub parent_id: String,
    /// Ids (without prefix) of the comments still to load. Empty for a
    /// "continue this thread" link.
    pub children: Vec<String>,
    pub count: u64,
    pub depth: u64,
    client: ClientRef,
}

impl PartialEq for MoreComments {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.parent_id == other.parent_id
            && self.children == other.children
            && self.count == other.count
    }
}

impl MoreComments {
    pub(crate) fn from_attributes(attributes: &Attributes, client: ClientRef) -> Self {
        let text = |key: &str| {
            attributes
                .get(key)
                .and_then(Object::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let children = match attributes.get("children") {
            Some(Object::Value(Value::Array(ids))) => ids
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        Self {
            id: text("id"),
            parent_id: text("parent_id"),
            children,
            count: attributes.get("count").and_then(Object::as_u64).unwrap_or(0),
            depth: attributes.get("depth").and_then(Object::as_u64).unwrap_or(0),
            client,
        }
    }

    pub fn is_continue_thread(&self) -> bool {
        self.children.is_empty()
    }

    /// Load the comments this placeholder stands for, as a new cursorless
    /// listing. `link_fullname` is the fullname of the submission the tree
    /// belongs to. The result may again contain `MoreComments` for deeper
    /// levels.
    pub async fn expand(&self, link_fullname: &str) -> Result<Listing> {
        let client = self.client.upgrade()?;

        if self.is_continue_thread() {
            let (_, link_id) = split_fullname(link_fullname).ok_or_else(|| {
                RedditClientError::ClientError(format!("'{}' is not a fullname", link_fullname))
            })?;
            let (_, parent) = split_fullname(&self.parent_id).ok_or_else(|| {
                RedditClientError::ClientError(format!("'{}' is not a fullname", self.parent_id))
            })?;
            let request = Request::get("comment_thread").arg(link_id).arg(parent);
            let children = match client.request(&request).await? {
                Object::List(pages) => pages
                    .into_iter()
                    .nth(1)
                    .and_then(Object::into_listing)
                    .map(Listing::into_children)
                    .ok_or_else(|| RedditClientError::ResponseError("missing comment listing".into()))?,
                other => {
                    return Err(RedditClientError::ResponseError(format!(
                        "unexpected {} from comment thread",
                        other.type_name()
                    )))
                }
            };
            return Ok(Listing::new(ListingFlavor::Standard, children));
        }

        let mut comments = Vec::with_capacity(self.children.len());
        for batch in self.children.chunks(MORECHILDREN_BATCH) {
            let request = Request::post("morechildren")
                .form("link_id", link_fullname)
                .form("children", batch.join(","));
            let response = client.request(&request).await?;
            let things = response
                .get("json")
                .and_then(|json| json.get("data"))
                .and_then(|data| data.get("things"));
            match things {
                Some(Object::List(items)) => comments.extend(items.iter().cloned()),
                Some(Object::Value(Value::Array(items))) if items.is_empty() => {}
                Some(other) => {
                    return Err(RedditClientError::ResponseError(format!(
                        "morechildren returned {} instead of a list of things",
                        other.type_name()
                    )))
                }
                None => {
                    return Err(RedditClientError::ResponseError(
                        "morechildren response has no things".into(),
                    ))
                }
            }
        }
        Ok(Listing::new(ListingFlavor::Standard, comments))
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "kind": "more",
            "data": {
                "id": self.id,
                "parent_id": self.parent_id,
                "children": self.children,
                "count": self.count,
                "depth": self.depth,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objector::Objector;
    use serde_json::json;

    fn attributes(value: Value) -> Attributes {
        match Objector::detached().objectify(value) {
            Object::Map(map) => map,
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn flair_listing_uses_next_cursor() {
        let listing = Listing::from_attributes(
            ListingFlavor::Flair,
            attributes(json!({"users": [{"user": "a"}, {"user": "b"}], "next": "b", "prev": null})),
        );
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.after(), Some("b"));
        assert_eq!(listing.before(), None);
    }

    #[test]
    fn mod_notes_cursor_requires_next_page() {
        let more = Listing::from_attributes(
            ListingFlavor::ModNotes,
            attributes(json!({"mod_notes": [{"id": "n1"}], "end_cursor": "c1", "has_next_page": true})),
        );
        assert_eq!(more.after(), Some("c1"));

        let last = Listing::from_attributes(
            ListingFlavor::ModNotes,
            attributes(json!({"mod_notes": [{"id": "n2"}], "end_cursor": "c2", "has_next_page": false})),
        );
        assert_eq!(last.after(), None);
    }

    #[test]
    fn modmail_follows_conversation_order() {
        let listing = Listing::from_attributes(
            ListingFlavor::ModmailConversations,
            attributes(json!({
                "conversations": {"a1": {"id": "a1"}, "z9": {"id": "z9"}},
                "conversationIds": ["z9", "a1"],
            })),
        );
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.after(), Some("a1"));
        assert_eq!(child_id(&listing.children()[0]).as_deref(), Some("z9"));
    }

    #[test]
    fn empty_listing_has_no_cursor() {
        let listing = Listing::from_json(
            ListingFlavor::Standard,
            json!({"kind": "Listing", "data": {"children": [], "after": null, "before": null}}),
        )
        .unwrap();
        assert!(listing.is_empty());
        assert_eq!(listing.after(), None);
    }

    #[test]
    fn more_comments_are_collected() {
        let listing = Listing::from_json(
            ListingFlavor::Standard,
            json!({"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"id": "c1"}},
                {"kind": "more", "data": {"id": "m1", "parent_id": "t3_abc", "children": ["c2", "c3"], "count": 2, "depth": 0}},
            ]}}),
        )
        .unwrap();
        assert_eq!(listing.things().count(), 1);
        let more: Vec<_> = listing.more_comments().collect();
        assert_eq!(more.len(), 1);
        assert_eq!(more[0].children, vec!["c2".to_string(), "c3".to_string()]);
        assert!(!more[0].is_continue_thread());
    }

    #[tokio::test]
    async fn expanding_without_client_fails_cleanly() {
        let listing = Listing::from_json(
            ListingFlavor::Standard,
            json!({"kind": "Listing", "data": {"children": [
                {"kind": "more", "data": {"id": "_", "parent_id": "t1_c1", "children": [], "count": 0}},
            ]}}),
        )
        .unwrap();
        let more = listing.more_comments().next().unwrap();
        assert!(more.is_continue_thread());
        assert!(matches!(
            more.expand("t3_abc").await,
            Err(RedditClientError::ClientError(_))
        ));
    }
}
