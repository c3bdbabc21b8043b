mod common;

use common::{client, listing, submissions};
use redcore::models::{ListingFlavor, Redditor};
use redcore::{MockResponse, MockTransport, Object, RedditClientError, Request, Thing};
use reqwest::Method;
use serde_json::json;

fn ids(items: &[Object]) -> Vec<String> {
    items
        .iter()
        .filter_map(Object::as_thing)
        .filter_map(|t| t.id().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn limit_below_page_size_makes_one_call() {
    let (client, transport) = client(MockTransport::new().expect(
        Method::GET,
        "/hot",
        MockResponse::json(200, listing(submissions(0..100), Some("t3_p99"))),
    ));

    let mut paginator = client.front_page().with_limit(Some(50));
    let items = paginator.collect_all().await.unwrap();

    assert_eq!(items.len(), 50);
    assert_eq!(transport.count("/hot"), 1);
    let sent = &transport.requests()[1];
    assert_eq!(sent.query_value("limit"), Some("50"));
    assert_eq!(sent.query_value("count"), Some("0"));
    assert_eq!(sent.query_value("after"), None);
}

#[tokio::test]
async fn follows_the_after_cursor_until_it_runs_out() {
    let (client, transport) = client(
        MockTransport::new()
            .expect(
                Method::GET,
                "/r/rust/new",
                MockResponse::json(200, listing(submissions(0..3), Some("t3_p2"))),
            )
            .expect(
                Method::GET,
                "/r/rust/new",
                MockResponse::json(200, listing(submissions(3..5), None)),
            ),
    );

    let mut paginator = client.subreddit("rust").newest().with_limit(None);
    let items = paginator.collect_all().await.unwrap();

    assert_eq!(ids(&items), ["p0", "p1", "p2", "p3", "p4"]);
    assert_eq!(paginator.pages_fetched(), 2);
    let pages: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.url.ends_with("/r/rust/new"))
        .collect();
    assert_eq!(pages[0].query_value("limit"), Some("100"));
    assert_eq!(pages[1].query_value("after"), Some("t3_p2"));
    assert_eq!(pages[1].query_value("count"), Some("3"));
}

#[tokio::test]
async fn stalled_cursor_ends_the_walk() {
    let (client, transport) = client(
        MockTransport::new()
            .expect(Method::GET, "/hot", MockResponse::json(200, listing(submissions(0..2), Some("t3_p1"))))
            .always(Method::GET, "/hot", MockResponse::json(200, listing(submissions(2..4), Some("t3_p1")))),
    );

    let items = client.front_page().with_limit(None).collect_all().await.unwrap();

    assert_eq!(items.len(), 4);
    assert_eq!(transport.count("/hot"), 2);
}

#[tokio::test]
async fn empty_page_ends_the_walk_even_with_a_cursor() {
    let (client, transport) = client(
        MockTransport::new()
            .always(Method::GET, "/hot", MockResponse::json(200, listing(vec![], Some("t3_zzz")))),
    );

    let mut paginator = client.front_page();
    assert!(paginator.next().await.unwrap().is_none());
    assert_eq!(transport.count("/hot"), 1);
}

#[tokio::test]
async fn exhausted_paginator_refuses_a_second_walk() {
    let (client, transport) = client(
        MockTransport::new().always(
            Method::GET,
            "/hot",
            MockResponse::json(200, listing(submissions(0..2), None)),
        ),
    );

    let mut paginator = client.front_page();
    assert_eq!(paginator.collect_all().await.unwrap().len(), 2);
    assert!(matches!(
        paginator.next().await,
        Err(RedditClientError::ClientError(_))
    ));

    let mut again = paginator.restart();
    assert_eq!(again.collect_all().await.unwrap().len(), 2);
    assert_eq!(transport.count("/hot"), 2);
}

#[tokio::test]
async fn starting_cursor_and_extra_params_are_sent() {
    let (client, transport) = client(MockTransport::new().expect(
        Method::GET,
        "/r/rust/top",
        MockResponse::json(200, listing(submissions(0..1), None)),
    ));

    let mut paginator = client
        .subreddit("rust")
        .top(Default::default())
        .starting_after("t3_start")
        .param("sr_detail", "true");
    paginator.collect_all().await.unwrap();

    let sent = transport
        .requests()
        .into_iter()
        .find(|r| r.url.ends_with("/r/rust/top"))
        .unwrap();
    assert_eq!(sent.query_value("after"), Some("t3_start"));
    assert_eq!(sent.query_value("t"), Some("all"));
    assert_eq!(sent.query_value("sr_detail"), Some("true"));
}

#[tokio::test]
async fn flair_list_pages_with_next() {
    let (client, transport) = client(
        MockTransport::new()
            .expect(
                Method::GET,
                "/r/rust/api/flairlist",
                MockResponse::json(200, json!({
                    "users": [{"user": "a", "flair_text": "x"}, {"user": "b", "flair_text": "y"}],
                    "next": "b",
                })),
            )
            .expect(
                Method::GET,
                "/r/rust/api/flairlist",
                MockResponse::json(200, json!({"users": [{"user": "c", "flair_text": "z"}]})),
            ),
    );

    let users: Vec<String> = client
        .subreddit("rust")
        .flair_list()
        .with_limit(None)
        .collect_all()
        .await
        .unwrap()
        .iter()
        .filter_map(|o| o.get("user").and_then(Object::as_str).map(str::to_string))
        .collect();

    assert_eq!(users, ["a", "b", "c"]);
    assert_eq!(transport.requests()[2].query_value("after"), Some("b"));
}

#[tokio::test]
async fn mod_notes_send_end_cursor_as_before() {
    let page = |ids: &[&str], next: bool, cursor: &str| {
        json!({
            "mod_notes": ids.iter().map(|id| json!({"id": id, "type": "NOTE"})).collect::<Vec<_>>(),
            "start_cursor": ids[0],
            "end_cursor": cursor,
            "has_next_page": next,
        })
    };
    let (client, transport) = client(
        MockTransport::new()
            .expect(Method::GET, "/api/mod/notes", MockResponse::json(200, page(&["n1", "n2"], true, "c2")))
            .expect(Method::GET, "/api/mod/notes", MockResponse::json(200, page(&["n3"], false, "c3"))),
    );

    let notes = client
        .mod_notes("rust", "spez")
        .with_limit(None)
        .collect_all()
        .await
        .unwrap();

    assert_eq!(notes.len(), 3);
    let calls: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.url.ends_with("/api/mod/notes"))
        .collect();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].query_value("subreddit"), Some("rust"));
    assert_eq!(calls[0].query_value("user"), Some("spez"));
    assert_eq!(calls[0].query_value("before"), None);
    assert_eq!(calls[1].query_value("before"), Some("c2"));
    assert_eq!(calls[1].query_value("after"), None);
}

#[tokio::test]
async fn user_lists_yield_redditors() {
    let (client, _) = client(MockTransport::new().expect(
        Method::GET,
        "/r/rust/about/moderators",
        MockResponse::json(200, json!({"kind": "UserList", "data": {"children": [
            {"name": "alice", "id": "t2_1", "date": 1.0, "mod_permissions": ["all"]},
            {"name": "bob", "id": "t2_2", "date": 2.0, "mod_permissions": ["wiki"]},
        ]}})),
    ));

    let moderators = client.subreddit("rust").moderators().await.unwrap();
    let names: Vec<&str> = moderators.iter().map(Redditor::name).collect();
    assert_eq!(names, ["alice", "bob"]);
}

#[tokio::test]
async fn comment_pages_walk_the_second_listing() {
    let (client, _) = client(MockTransport::new().expect(
        Method::GET,
        "/duplicates/abc",
        MockResponse::json(200, json!([
            listing(vec![json!({"kind": "t3", "data": {"id": "abc"}})], None),
            listing(submissions(0..2), None),
        ])),
    ));

    let mut duplicates = client.submission("abc").duplicates().unwrap();
    let mut found = Vec::new();
    while let Some(thing) = duplicates.next_thing().await.unwrap() {
        assert!(matches!(thing, Thing::Submission(_)));
        found.push(thing.id().unwrap_or_default().to_string());
    }
    assert_eq!(found, ["p0", "p1"]);
}

#[tokio::test]
async fn any_listing_endpoint_can_be_paginated() {
    let (client, _) = client(MockTransport::new().expect(
        Method::GET,
        "/user/spez/m/tech/hot",
        MockResponse::json(200, listing(submissions(0..2), None)),
    ));

    let items = client
        .paginate(Request::get_path("user/{user}/m/{multi}/hot").arg("spez").arg("tech"))
        .with_flavor(ListingFlavor::Standard)
        .collect_all()
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
}
