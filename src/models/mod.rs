//! Reddit objects.
//!
//! Every payload that comes back from the API is turned into an [`Object`]
//! by the [`Objector`](crate::objector::Objector). Tagged payloads become
//! [`Thing`]s: typed wrappers over a shared [`Model`] that keeps the raw
//! attributes, whether they were fetched, and a weak handle back to the
//! client that produced them.

use crate::client::{ClientRef, RedditClient, Request};
use crate::error::{RedditClientError, Result};
use log::debug;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Generates a typed wrapper around [`Model`] whose [`Thing`] variant and
/// [`ModelKind`] variant share its name.
macro_rules! model_wrapper {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) $crate::models::Model);

        impl $name {
            pub fn model(&self) -> &$crate::models::Model {
                &self.0
            }

            pub fn into_model(self) -> $crate::models::Model {
                self.0
            }

            /// Load the complete object from Reddit. Attributes already
            /// known locally are kept when the response omits them.
            pub async fn fetch(&self) -> $crate::error::Result<Self> {
                self.0.fetch().await.map(Self)
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::models::Model;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl AsRef<$crate::models::Model> for $name {
            fn as_ref(&self) -> &$crate::models::Model {
                &self.0
            }
        }

        impl From<$name> for $crate::models::Thing {
            fn from(value: $name) -> Self {
                $crate::models::Thing::$name(value)
            }
        }

        impl TryFrom<$crate::models::Thing> for $name {
            type Error = $crate::error::RedditClientError;

            fn try_from(thing: $crate::models::Thing) -> $crate::error::Result<Self> {
                match thing {
                    $crate::models::Thing::$name(value) => Ok(value),
                    other => Err($crate::error::RedditClientError::ResponseError(format!(
                        "expected {}, got {}",
                        stringify!($name),
                        other.kind()
                    ))),
                }
            }
        }

        impl TryFrom<$crate::models::Object> for $name {
            type Error = $crate::error::RedditClientError;

            fn try_from(object: $crate::models::Object) -> $crate::error::Result<Self> {
                match object {
                    $crate::models::Object::Thing(thing) => Self::try_from(thing),
                    other => Err($crate::error::RedditClientError::ResponseError(format!(
                        "expected {}, got {}",
                        stringify!($name),
                        other.type_name()
                    ))),
                }
            }
        }
    };
}

pub mod capabilities;
pub mod listing;
pub mod message;
pub mod redditor;
pub mod submission;
pub mod subreddit;

pub use capabilities::{Deletable, Editable, Replyable, Reportable, Saveable, VoteDirection, Votable};
pub use listing::{Listing, ListingFlavor, MoreComments};
pub use message::Message;
pub use redditor::{Award, Multireddit, Redditor};
pub use submission::{Comment, Submission};
pub use subreddit::{ModAction, Stylesheet, Subreddit, WikiPage};

/// Attribute bag of a model or of an untagged JSON object.
pub type Attributes = BTreeMap<String, Object>;

/// The result of objectifying a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Scalars and arrays of scalars, kept as raw JSON.
    Value(Value),
    List(Vec<Object>),
    /// An untagged JSON object whose values were objectified recursively.
    Map(Attributes),
    Thing(Thing),
    Listing(Listing),
    More(MoreComments),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Value(Value::Null) => "null",
            Object::Value(Value::Array(_)) | Object::List(_) => "list",
            Object::Value(_) => "value",
            Object::Map(_) => "map",
            Object::Thing(_) => "thing",
            Object::Listing(_) => "listing",
            Object::More(_) => "more",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Value(Value::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Object::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Value(v) => v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Object::Value(v) => v.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Object::Value(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Value(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            Object::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Object]> {
        match self {
            Object::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_thing(&self) -> Option<&Thing> {
        match self {
            Object::Thing(thing) => Some(thing),
            _ => None,
        }
    }

    pub fn into_thing(self) -> Option<Thing> {
        match self {
            Object::Thing(thing) => Some(thing),
            _ => None,
        }
    }

    pub fn as_listing(&self) -> Option<&Listing> {
        match self {
            Object::Listing(listing) => Some(listing),
            _ => None,
        }
    }

    pub fn into_listing(self) -> Option<Listing> {
        match self {
            Object::Listing(listing) => Some(listing),
            _ => None,
        }
    }

    /// Look up a key of a map, or an attribute of a thing.
    pub fn get(&self, key: &str) -> Option<&Object> {
        match self {
            Object::Map(map) => map.get(key),
            Object::Thing(thing) => thing.attr(key),
            _ => None,
        }
    }

    /// Render back to JSON. Things and listings are re-wrapped in their
    /// `{kind, data}` envelope; normalized keys stay normalized.
    pub fn to_json(&self) -> Value {
        match self {
            Object::Value(v) => v.clone(),
            Object::List(items) => Value::Array(items.iter().map(Object::to_json).collect()),
            Object::Map(map) => attributes_to_json(map),
            Object::Thing(thing) => thing.model().to_json(),
            Object::Listing(listing) => listing.to_json(),
            Object::More(more) => more.to_json(),
        }
    }
}

/// Attributes for a stub built from identifiers.
pub(crate) fn stub_attributes(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Object::Value(Value::String(v.to_string()))))
        .collect()
}

/// Render a `created_utc` style epoch timestamp.
pub(crate) fn format_timestamp(epoch_seconds: f64) -> String {
    use chrono::{TimeZone, Utc};

    let timestamp = Utc
        .timestamp_opt(epoch_seconds as i64, 0)
        .single()
        .unwrap_or_else(Utc::now);

    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub(crate) fn attributes_to_json(attributes: &Attributes) -> Value {
    let map: Map<String, Value> = attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    Value::Object(map)
}

/// What a [`Model`] represents, from the payload's `kind` tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Comment,
    Redditor,
    Submission,
    Message,
    Subreddit,
    Award,
    WikiPage,
    ModAction,
    Stylesheet,
    Multireddit,
    /// A tag this library has no type for.
    Other(String),
}

impl ModelKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "t1" => ModelKind::Comment,
            "t2" => ModelKind::Redditor,
            "t3" => ModelKind::Submission,
            "t4" => ModelKind::Message,
            "t5" => ModelKind::Subreddit,
            "t6" => ModelKind::Award,
            "wikipage" => ModelKind::WikiPage,
            "modaction" => ModelKind::ModAction,
            "stylesheet" => ModelKind::Stylesheet,
            "LabeledMulti" => ModelKind::Multireddit,
            other => ModelKind::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            ModelKind::Comment => "t1",
            ModelKind::Redditor => "t2",
            ModelKind::Submission => "t3",
            ModelKind::Message => "t4",
            ModelKind::Subreddit => "t5",
            ModelKind::Award => "t6",
            ModelKind::WikiPage => "wikipage",
            ModelKind::ModAction => "modaction",
            ModelKind::Stylesheet => "stylesheet",
            ModelKind::Multireddit => "LabeledMulti",
            ModelKind::Other(tag) => tag,
        }
    }

    /// Fullname prefix for the `t1`..`t6` kinds.
    pub fn fullname_prefix(&self) -> Option<&'static str> {
        match self {
            ModelKind::Comment => Some("t1"),
            ModelKind::Redditor => Some("t2"),
            ModelKind::Submission => Some("t3"),
            ModelKind::Message => Some("t4"),
            ModelKind::Subreddit => Some("t5"),
            ModelKind::Award => Some("t6"),
            _ => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Other(tag) => write!(f, "{}", tag),
            known => write!(f, "{:?}", known),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Built from a complete server payload.
    Fetched,
    /// Built locally from an identifier; loads itself on first miss.
    Stub,
}

/// Shared state behind every typed model.
#[derive(Clone)]
pub struct Model {
    kind: ModelKind,
    state: FetchState,
    attributes: Attributes,
    fullname: Option<String>,
    client: ClientRef,
}

impl Model {
    pub(crate) fn fetched(kind: ModelKind, attributes: Attributes, client: ClientRef) -> Self {
        Self::build(kind, FetchState::Fetched, attributes, client)
    }

    pub(crate) fn stub(kind: ModelKind, attributes: Attributes, client: ClientRef) -> Self {
        Self::build(kind, FetchState::Stub, attributes, client)
    }

    fn build(kind: ModelKind, state: FetchState, attributes: Attributes, client: ClientRef) -> Self {
        let fullname = compute_fullname(&kind, &attributes);
        Self {
            kind,
            state,
            attributes,
            fullname,
            client,
        }
    }

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn is_fetched(&self) -> bool {
        self.state == FetchState::Fetched
    }

    /// `<kind>_<base36 id>`, for the `t1`..`t6` kinds.
    pub fn fullname(&self) -> Option<&str> {
        self.fullname.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.str_attr("id")
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Attribute lookup without any network access.
    pub fn attr(&self, name: &str) -> Option<&Object> {
        self.attributes.get(name)
    }

    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(Object::as_str)
    }

    pub fn i64_attr(&self, name: &str) -> Option<i64> {
        self.attr(name).and_then(Object::as_i64)
    }

    pub fn f64_attr(&self, name: &str) -> Option<f64> {
        self.attr(name).and_then(Object::as_f64)
    }

    pub fn bool_attr(&self, name: &str) -> Option<bool> {
        self.attr(name).and_then(Object::as_bool)
    }

    /// The key used for equality and hashing: the natural name for
    /// subreddits, redditors and the other named kinds, the fullname for
    /// everything else.
    pub fn identity(&self) -> Option<String> {
        let lower = |name: &str| self.str_attr(name).map(str::to_lowercase);
        match self.kind {
            ModelKind::Subreddit => lower("display_name"),
            ModelKind::Redditor => lower("name"),
            ModelKind::Multireddit => lower("path"),
            ModelKind::Stylesheet => lower("subreddit"),
            ModelKind::WikiPage => match (lower("subreddit"), lower("name")) {
                (Some(subreddit), Some(page)) => Some(format!("{}/{}", subreddit, page)),
                _ => None,
            },
            _ => self.fullname.clone(),
        }
    }

    /// Return `name`, fetching the object first when it is a stub that does
    /// not know the attribute yet. Fetched models never hit the network.
    pub async fn get(&self, name: &str) -> Result<Object> {
        if let Some(value) = self.attributes.get(name) {
            return Ok(value.clone());
        }
        if self.is_fetched() {
            return Err(self.missing(name));
        }
        debug!("Lazily fetching {} to read '{}'", self.kind, name);
        let fetched = self.fetch().await?;
        fetched
            .attributes
            .get(name)
            .cloned()
            .ok_or_else(|| self.missing(name))
    }

    /// Load the complete object. The returned model is always fetched; local
    /// attributes survive where the response does not carry them.
    pub async fn fetch(&self) -> Result<Model> {
        let client = self.client()?;
        let request = self.fetch_request()?;
        let object = client.request(&request).await?;
        let mut loaded = self.extract_fetched(object)?;

        let mut attributes = self.attributes.clone();
        attributes.append(&mut loaded);
        Ok(Self::fetched(self.kind.clone(), attributes, self.client.clone()))
    }

    fn fetch_request(&self) -> Result<Request> {
        let request = match self.kind {
            ModelKind::Subreddit => {
                Request::get("subreddit_about").arg(self.require_str("display_name")?)
            }
            ModelKind::Redditor => Request::get("user_about").arg(self.require_str("name")?),
            ModelKind::Submission => Request::get("submission").arg(self.require_str("id")?),
            ModelKind::Comment => Request::get("info").param("id", self.require_fullname()?),
            ModelKind::Message => Request::get("message").arg(self.require_str("id")?),
            ModelKind::WikiPage => Request::get("wiki_page")
                .arg(self.require_str("subreddit")?)
                .arg(self.require_str("name")?),
            ModelKind::Stylesheet => Request::get("stylesheet").arg(self.require_str("subreddit")?),
            ModelKind::Multireddit => Request::get("multireddit_api")
                .arg(self.require_str("owner")?)
                .arg(self.require_str("name")?),
            _ => {
                return Err(RedditClientError::ClientError(format!(
                    "{} objects cannot be fetched",
                    self.kind
                )))
            }
        };
        Ok(request)
    }

    /// Pull this model's attributes out of a fetch response.
    fn extract_fetched(&self, object: Object) -> Result<Attributes> {
        let unexpected = |object: &Object| {
            RedditClientError::ResponseError(format!(
                "unexpected {} while fetching {}",
                object.type_name(),
                self.kind
            ))
        };

        match object {
            // comments/{id} answers [submission listing, comment listing]
            Object::List(items) if self.kind == ModelKind::Submission => {
                let mut items = items.into_iter();
                let first = items
                    .next()
                    .ok_or_else(|| RedditClientError::ResponseError("empty submission response".into()))?;
                let mut attributes = self.extract_fetched(first)?;
                if let Some(Object::Listing(comments)) = items.next() {
                    attributes.insert("comments".to_string(), Object::Listing(comments));
                }
                Ok(attributes)
            }
            Object::Thing(thing) if thing.kind() == &self.kind => Ok(thing.into_model().attributes),
            Object::Listing(listing) => {
                let mut candidates: Vec<Model> = listing
                    .into_children()
                    .into_iter()
                    .filter_map(Object::into_thing)
                    .map(Thing::into_model)
                    .filter(|m| m.kind == self.kind)
                    .collect();
                let position = candidates
                    .iter()
                    .position(|m| m.fullname.is_some() && m.fullname == self.fullname)
                    .unwrap_or(0);
                if candidates.is_empty() {
                    return Err(RedditClientError::NotFound {
                        url: format!("{} {}", self.kind, self.fullname().unwrap_or("?")),
                    });
                }
                Ok(candidates.swap_remove(position).attributes)
            }
            other => Err(unexpected(&other)),
        }
    }

    pub(crate) fn client(&self) -> Result<RedditClient> {
        self.client.upgrade()
    }

    pub(crate) fn client_ref(&self) -> &ClientRef {
        &self.client
    }

    pub(crate) fn require_str(&self, name: &str) -> Result<&str> {
        self.str_attr(name).ok_or_else(|| self.missing(name))
    }

    pub(crate) fn require_fullname(&self) -> Result<&str> {
        self.fullname().ok_or_else(|| self.missing("name"))
    }

    fn missing(&self, name: &str) -> RedditClientError {
        RedditClientError::MissingAttribute {
            kind: self.kind.to_string(),
            attribute: name.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "kind": self.kind.tag(),
            "data": attributes_to_json(&self.attributes),
        })
    }
}

fn compute_fullname(kind: &ModelKind, attributes: &Attributes) -> Option<String> {
    let prefix = kind.fullname_prefix()?;
    let tagged = |s: &str| s.len() > prefix.len() + 1 && s.starts_with(prefix) && s[prefix.len()..].starts_with('_');

    if let Some(name) = attributes.get("name").and_then(Object::as_str) {
        if tagged(name) {
            return Some(name.to_string());
        }
    }
    let id = attributes.get("id").and_then(Object::as_str)?;
    if tagged(id) {
        Some(id.to_string())
    } else {
        Some(format!("{}_{}", prefix, id))
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("fullname", &self.fullname)
            .field("attributes", &self.attributes.len())
            .finish()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.attributes == other.attributes,
            _ => false,
        }
    }
}

impl Eq for Model {}

impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.identity().hash(state);
    }
}

/// A tagged Reddit object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Thing {
    Comment(Comment),
    Redditor(Redditor),
    Submission(Submission),
    Message(Message),
    Subreddit(Subreddit),
    Award(Award),
    WikiPage(WikiPage),
    ModAction(ModAction),
    Stylesheet(Stylesheet),
    Multireddit(Multireddit),
    /// Unrecognized kind; attributes are preserved untouched.
    Unknown(Model),
}

impl Thing {
    pub fn from_model(model: Model) -> Self {
        let kind = model.kind.clone();
        match kind {
            ModelKind::Comment => Thing::Comment(Comment(model)),
            ModelKind::Redditor => Thing::Redditor(Redditor(model)),
            ModelKind::Submission => Thing::Submission(Submission(model)),
            ModelKind::Message => Thing::Message(Message(model)),
            ModelKind::Subreddit => Thing::Subreddit(Subreddit(model)),
            ModelKind::Award => Thing::Award(Award(model)),
            ModelKind::WikiPage => Thing::WikiPage(WikiPage(model)),
            ModelKind::ModAction => Thing::ModAction(ModAction(model)),
            ModelKind::Stylesheet => Thing::Stylesheet(Stylesheet(model)),
            ModelKind::Multireddit => Thing::Multireddit(Multireddit(model)),
            ModelKind::Other(_) => Thing::Unknown(model),
        }
    }

    pub fn model(&self) -> &Model {
        match self {
            Thing::Comment(v) => &v.0,
            Thing::Redditor(v) => &v.0,
            Thing::Submission(v) => &v.0,
            Thing::Message(v) => &v.0,
            Thing::Subreddit(v) => &v.0,
            Thing::Award(v) => &v.0,
            Thing::WikiPage(v) => &v.0,
            Thing::ModAction(v) => &v.0,
            Thing::Stylesheet(v) => &v.0,
            Thing::Multireddit(v) => &v.0,
            Thing::Unknown(model) => model,
        }
    }

    pub fn into_model(self) -> Model {
        match self {
            Thing::Comment(v) => v.0,
            Thing::Redditor(v) => v.0,
            Thing::Submission(v) => v.0,
            Thing::Message(v) => v.0,
            Thing::Subreddit(v) => v.0,
            Thing::Award(v) => v.0,
            Thing::WikiPage(v) => v.0,
            Thing::ModAction(v) => v.0,
            Thing::Stylesheet(v) => v.0,
            Thing::Multireddit(v) => v.0,
            Thing::Unknown(model) => model,
        }
    }
}

impl std::ops::Deref for Thing {
    type Target = Model;

    fn deref(&self) -> &Model {
        self.model()
    }
}

impl fmt::Display for Thing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Thing::Comment(v) => fmt::Display::fmt(v, f),
            Thing::Redditor(v) => fmt::Display::fmt(v, f),
            Thing::Submission(v) => fmt::Display::fmt(v, f),
            Thing::Message(v) => fmt::Display::fmt(v, f),
            Thing::Subreddit(v) => fmt::Display::fmt(v, f),
            Thing::Award(v) => fmt::Display::fmt(v, f),
            Thing::WikiPage(v) => fmt::Display::fmt(v, f),
            Thing::ModAction(v) => fmt::Display::fmt(v, f),
            Thing::Stylesheet(v) => fmt::Display::fmt(v, f),
            Thing::Multireddit(v) => fmt::Display::fmt(v, f),
            Thing::Unknown(model) => write!(
                f,
                "{} {}",
                model.kind,
                model.fullname().or_else(|| model.id()).unwrap_or("?")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objector::Objector;
    use serde_json::json;

    fn thing(value: Value) -> Thing {
        Objector::detached().objectify(value).into_thing().unwrap()
    }

    #[test]
    fn fullname_prefers_tagged_name() {
        let submission = thing(json!({"kind": "t3", "data": {"id": "abc", "name": "t3_abc"}}));
        assert_eq!(submission.fullname(), Some("t3_abc"));

        let redditor = thing(json!({"kind": "t2", "data": {"id": "1w72", "name": "spez"}}));
        assert_eq!(redditor.fullname(), Some("t2_1w72"));
    }

    #[test]
    fn subreddits_compare_by_display_name() {
        let a = thing(json!({"kind": "t5", "data": {"display_name": "Rust", "id": "2qh1i"}}));
        let b = thing(json!({"kind": "t5", "data": {"display_name": "rust", "subscribers": 5}}));
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn different_kinds_never_compare_equal() {
        let comment = thing(json!({"kind": "t1", "data": {"id": "x"}}));
        let submission = thing(json!({"kind": "t3", "data": {"id": "x"}}));
        assert_ne!(comment, submission);
    }

    #[test]
    fn typed_conversions() {
        let object = Objector::detached().objectify(json!({"kind": "t1", "data": {"id": "c1"}}));
        let comment = Comment::try_from(object.clone()).unwrap();
        assert_eq!(comment.fullname(), Some("t1_c1"));
        assert!(Submission::try_from(object).is_err());
    }

    #[tokio::test]
    async fn fetched_model_reports_missing_attribute_without_network() {
        let submission = thing(json!({"kind": "t3", "data": {"id": "abc"}}));
        let err = submission.get("title").await.unwrap_err();
        assert!(matches!(
            err,
            RedditClientError::MissingAttribute { ref attribute, .. } if attribute == "title"
        ));
    }

    #[test]
    fn to_json_rewraps_things() {
        let payload = json!({"kind": "t1", "data": {"id": "c1", "body": "hi"}});
        assert_eq!(Objector::detached().objectify(payload.clone()).to_json(), payload);
    }
}
