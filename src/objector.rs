//! Turns raw JSON into [`Object`] trees.
//!
//! The objector never touches the network. It holds a weak reference to the
//! client so the models it builds can load themselves later.

use crate::cancel::CancelToken;
use crate::client::{ClientInner, ClientRef};
use crate::models::{Attributes, Listing, ListingFlavor, Model, ModelKind, MoreComments, Object, Thing};
use crate::util::camel_to_snake;
use serde_json::{Map, Value};
use std::sync::Weak;

/// camelCase keys sent by the newer (modmail, mod notes) endpoints that are
/// renamed to snake_case. Any other key is kept as sent.
const CAMEL_CASE_FIELDS: &[&str] = &[
    "actionTypeId",
    "approveStatus",
    "banStatus",
    "bodyMarkdown",
    "conversationIds",
    "displayName",
    "isAdmin",
    "isAuto",
    "isDeleted",
    "isHidden",
    "isHighlighted",
    "isInternal",
    "isMuted",
    "isOp",
    "isParticipant",
    "isPermanent",
    "isRepliable",
    "isShadowBanned",
    "isSuspended",
    "isUnread",
    "lastModUpdate",
    "lastUnread",
    "lastUpdated",
    "lastUserUpdate",
    "modActions",
    "muteStatus",
    "numMessages",
    "objIds",
    "participantSubreddit",
    "recentComments",
    "recentConvos",
    "recentPosts",
];

#[derive(Debug, Clone)]
pub struct Objector {
    client: Weak<ClientInner>,
}

impl Objector {
    pub(crate) fn new(client: Weak<ClientInner>) -> Self {
        Self { client }
    }

    /// An objector whose models have no client to load themselves with.
    pub fn detached() -> Self {
        Self { client: Weak::new() }
    }

    pub fn objectify(&self, value: Value) -> Object {
        self.objectify_with(value, &CancelToken::new())
    }

    /// Objectify, handing `cancel` to every model built so their lazy loads
    /// observe the same cancellation as the request that produced them.
    pub fn objectify_with(&self, value: Value, cancel: &CancelToken) -> Object {
        let client = ClientRef::new(self.client.clone(), cancel.clone());
        objectify_value(value, &client)
    }
}

fn objectify_value(value: Value, client: &ClientRef) -> Object {
    match value {
        Value::Array(items) if items.iter().all(is_scalar) => Object::Value(Value::Array(items)),
        Value::Array(items) => Object::List(
            items
                .into_iter()
                .map(|item| objectify_value(item, client))
                .collect(),
        ),
        Value::Object(map) => objectify_map(map, client),
        scalar => Object::Value(scalar),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn objectify_map(mut map: Map<String, Value>, client: &ClientRef) -> Object {
    let tagged = matches!(
        (map.get("kind"), map.get("data")),
        (Some(Value::String(_)), Some(Value::Object(_)))
    );
    if tagged {
        if let (Some(Value::String(kind)), Some(Value::Object(data))) = (map.remove("kind"), map.remove("data")) {
            return objectify_tagged(&kind, data, client);
        }
    }

    let attributes = objectify_attributes(map, client);
    // relationship entries (friends, moderators, banned) carry no kind tag
    if ["date", "id", "name"].iter().all(|key| attributes.contains_key(*key)) {
        return Object::Thing(Thing::from_model(Model::fetched(
            ModelKind::Redditor,
            attributes,
            client.clone(),
        )));
    }
    Object::Map(attributes)
}

fn objectify_tagged(kind: &str, data: Map<String, Value>, client: &ClientRef) -> Object {
    let attributes = objectify_attributes(data, client);
    match kind {
        "Listing" => Object::Listing(Listing::from_attributes(ListingFlavor::Standard, attributes)),
        "UserList" => Object::Listing(Listing::from_attributes(ListingFlavor::RedditorList, attributes)),
        "more" => Object::More(MoreComments::from_attributes(&attributes, client.clone())),
        tag => Object::Thing(Thing::from_model(Model::fetched(
            ModelKind::from_tag(tag),
            attributes,
            client.clone(),
        ))),
    }
}

fn objectify_attributes(map: Map<String, Value>, client: &ClientRef) -> Attributes {
    map.into_iter()
        .map(|(key, value)| (normalize_key(key), objectify_value(value, client)))
        .collect()
}

fn normalize_key(key: String) -> String {
    if CAMEL_CASE_FIELDS.contains(&key.as_str()) {
        camel_to_snake(&key)
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn objectify(value: Value) -> Object {
        Objector::detached().objectify(value)
    }

    #[test]
    fn scalars_and_scalar_lists_pass_through() {
        assert_eq!(objectify(json!(5)), Object::Value(json!(5)));
        assert_eq!(objectify(json!(null)), Object::Value(Value::Null));
        assert_eq!(objectify(json!(["a", 1, true])), Object::Value(json!(["a", 1, true])));
    }

    #[test]
    fn fullname_matches_payload_name() {
        for (kind, id) in [("t1", "c0ffee"), ("t3", "abc123"), ("t5", "2qh1i"), ("t4", "m1")] {
            let name = format!("{}_{}", kind, id);
            let thing = objectify(json!({"kind": kind, "data": {"id": id, "name": name}}))
                .into_thing()
                .unwrap();
            assert_eq!(thing.fullname(), Some(name.as_str()));
        }
    }

    #[test]
    fn listing_children_are_objectified() {
        let payload = json!({
            "kind": "Listing",
            "data": {
                "after": "t3_b",
                "before": null,
                "dist": 2,
                "children": [
                    {"kind": "t3", "data": {"id": "a", "title": "first"}},
                    {"kind": "t3", "data": {"id": "b", "title": "second"}},
                ],
            }
        });
        let listing = objectify(payload).into_listing().unwrap();
        assert_eq!(listing.len(), 2);
        assert!(listing.children().iter().all(|c| matches!(c, Object::Thing(Thing::Submission(_)))));
        assert_eq!(listing.after(), Some("t3_b"));
        assert_eq!(listing.before(), None);
        assert_eq!(listing.dist(), Some(2));
    }

    #[test]
    fn unknown_kind_keeps_data() {
        let thing = objectify(json!({"kind": "t9", "data": {"id": "x", "weird": [1, 2]}}))
            .into_thing()
            .unwrap();
        assert!(matches!(thing, Thing::Unknown(_)));
        assert_eq!(thing.kind(), &ModelKind::Other("t9".to_string()));
        assert_eq!(thing.attr("weird"), Some(&Object::Value(json!([1, 2]))));
    }

    #[test]
    fn known_camel_case_keys_are_normalized() {
        let object = objectify(json!({"isAdmin": true, "numMessages": 3, "someOtherKey": 1}));
        let map = object.as_map().unwrap();
        assert!(map.contains_key("is_admin"));
        assert!(map.contains_key("num_messages"));
        assert!(map.contains_key("someOtherKey"));
    }

    #[test]
    fn nested_replies_listing() {
        let comment = objectify(json!({
            "kind": "t1",
            "data": {
                "id": "c1",
                "replies": {"kind": "Listing", "data": {"children": [
                    {"kind": "t1", "data": {"id": "c2"}},
                ]}},
            }
        }))
        .into_thing()
        .unwrap();
        let replies = comment.attr("replies").and_then(Object::as_listing).unwrap();
        assert_eq!(replies.things().next().unwrap().fullname(), Some("t1_c2"));
    }

    #[test]
    fn kind_without_object_data_is_a_plain_map() {
        let object = objectify(json!({"kind": "t3", "data": "nope"}));
        assert!(matches!(object, Object::Map(_)));
    }

    #[test]
    fn objectifying_twice_is_structurally_equal() {
        let payload = json!({"kind": "Listing", "data": {"children": [
            {"kind": "t1", "data": {"id": "c1", "body": "x"}},
            {"kind": "more", "data": {"id": "m", "parent_id": "t1_c1", "children": ["c9"], "count": 1}},
        ], "after": null}});
        let first = objectify(payload.clone());
        let second = objectify(payload);
        assert_eq!(first, second);
        assert_eq!(first.to_json(), second.to_json());
    }
}
