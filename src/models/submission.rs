use super::capabilities::{Deletable, Editable, Replyable, Reportable, Saveable, Votable};
use super::{format_timestamp, stub_attributes, Listing, Model, ModelKind, Object};
use crate::client::{ClientRef, Request};
use crate::error::{RedditClientError, Result};
use crate::paginator::Paginator;
use std::fmt;
use url::Url;

model_wrapper!(
    /// A link or text post (`t3`).
    Submission
);

model_wrapper!(
    /// A comment (`t1`).
    Comment
);

impl Submission {
    pub(crate) fn from_id(client: ClientRef, id: &str) -> Self {
        Self(Model::stub(ModelKind::Submission, stub_attributes(&[("id", id)]), client))
    }

    /// Extract the base36 id from a submission URL such as
    /// `https://www.reddit.com/r/rust/comments/abc123/title/` or
    /// `https://redd.it/abc123`.
    pub fn id_from_url(url: &str) -> Result<String> {
        let invalid = || RedditClientError::ClientError(format!("'{}' is not a submission URL", url));
        let parsed = Url::parse(url).map_err(|_| invalid())?;
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let id = if parsed.host_str() == Some("redd.it") {
            segments.first().copied()
        } else {
            segments
                .iter()
                .position(|seg| *seg == "comments" || *seg == "gallery")
                .and_then(|i| segments.get(i + 1).copied())
        };
        id.map(str::to_string).ok_or_else(invalid)
    }

    pub fn title(&self) -> Option<&str> {
        self.str_attr("title")
    }

    pub fn author(&self) -> Option<&str> {
        self.str_attr("author")
    }

    /// Display name of the subreddit the post lives in.
    pub fn subreddit_name(&self) -> Option<&str> {
        self.str_attr("subreddit")
    }

    pub fn score(&self) -> Option<i64> {
        self.i64_attr("score")
    }

    pub fn num_comments(&self) -> Option<i64> {
        self.i64_attr("num_comments")
    }

    pub fn permalink(&self) -> Option<&str> {
        self.str_attr("permalink")
    }

    pub fn url(&self) -> Option<&str> {
        self.str_attr("url")
    }

    pub fn selftext(&self) -> Option<&str> {
        self.str_attr("selftext")
    }

    pub fn is_self(&self) -> bool {
        self.bool_attr("is_self").unwrap_or(false)
    }

    pub fn created_utc(&self) -> Option<f64> {
        self.f64_attr("created_utc")
    }

    /// The comment tree, present once the submission has been fetched.
    pub fn comments(&self) -> Option<&Listing> {
        self.attr("comments").and_then(Object::as_listing)
    }

    /// Fetch the submission together with its comment tree.
    pub async fn load_comments(&self) -> Result<Listing> {
        let fetched = self.fetch().await?;
        fetched.comments().cloned().ok_or_else(|| RedditClientError::MissingAttribute {
            kind: ModelKind::Submission.to_string(),
            attribute: "comments".to_string(),
        })
    }

    /// Other submissions of the same link.
    pub fn duplicates(&self) -> Result<Paginator> {
        let id = self.require_str("id")?;
        Ok(Paginator::new(self.client_ref().clone(), Request::get("duplicates").arg(id)))
    }

    pub async fn hide(&self) -> Result<()> {
        self.toggle("hide").await
    }

    pub async fn unhide(&self) -> Result<()> {
        self.toggle("unhide").await
    }

    async fn toggle(&self, endpoint: &str) -> Result<()> {
        let request = Request::post(endpoint).form("id", self.require_fullname()?);
        self.client()?.request_json(&request).await?;
        Ok(())
    }

    /// Multi-line description with the important metadata.
    pub fn format_summary(&self) -> String {
        let mut content = format!(
            "Title: {}\nAuthor: u/{}\nSubreddit: r/{}\nScore: {} ({}% upvoted) | Comments: {}\n",
            self.title().unwrap_or_default(),
            self.author().unwrap_or("[deleted]"),
            self.subreddit_name().unwrap_or_default(),
            self.score().unwrap_or(0),
            (self.f64_attr("upvote_ratio").unwrap_or(0.0) * 100.0) as i32,
            self.num_comments().unwrap_or(0),
        );

        let mut flags = Vec::new();
        if self.is_self() {
            flags.push("Self Post");
        }
        for (attr, label) in [
            ("over_18", "NSFW"),
            ("spoiler", "Spoiler"),
            ("is_video", "Video"),
            ("is_original_content", "OC"),
            ("stickied", "Stickied"),
            ("locked", "Locked"),
        ] {
            if self.bool_attr(attr).unwrap_or(false) {
                flags.push(label);
            }
        }
        if !flags.is_empty() {
            content.push_str(&format!("Flags: [{}]\n", flags.join(", ")));
        }

        if let Some(flair) = self.str_attr("link_flair_text").filter(|f| !f.is_empty()) {
            content.push_str(&format!("Flair: {}\n", flair));
        }

        // long self posts are cut at a character boundary
        if let Some(text) = self.selftext().filter(|t| self.is_self() && !t.is_empty()) {
            let text = match text.char_indices().nth(500) {
                Some((cut, _)) => format!("{}...", &text[..cut]),
                None => text.to_string(),
            };
            content.push_str("\nContent:\n---------\n");
            content.push_str(&text);
            content.push_str("\n---------\n");
        }

        if let Some(permalink) = self.permalink() {
            let full = format!("https://reddit.com{}", permalink);
            content.push_str(&format!("\nPermalink: {}", full));
            match self.url() {
                Some(url) if !self.is_self() && url != full => {
                    content.push_str(&format!("\nExternal URL: {}", url));
                }
                _ => {}
            }
        }

        content
    }

    /// One line: subreddit, score, title and author.
    pub fn format_short_summary(&self) -> String {
        format!(
            "[r/{} | {} pts] {} - by u/{}",
            self.subreddit_name().unwrap_or_default(),
            self.score().unwrap_or(0),
            self.title().unwrap_or_default(),
            self.author().unwrap_or("[deleted]")
        )
    }

    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.created_utc().unwrap_or(0.0))
    }
}

impl fmt::Display for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.score(), self.title()) {
            (Some(score), Some(title)) => write!(f, "{} :: {}", score, title),
            _ => write!(f, "{}", self.id().unwrap_or_default()),
        }
    }
}

impl Votable for Submission {}
impl Saveable for Submission {}
impl Deletable for Submission {}
impl Editable for Submission {}
impl Reportable for Submission {}
impl Replyable for Submission {}

impl Comment {
    pub(crate) fn from_id(client: ClientRef, id: &str) -> Self {
        Self(Model::stub(ModelKind::Comment, stub_attributes(&[("id", id)]), client))
    }

    pub fn body(&self) -> Option<&str> {
        self.str_attr("body")
    }

    pub fn author(&self) -> Option<&str> {
        self.str_attr("author")
    }

    pub fn score(&self) -> Option<i64> {
        self.i64_attr("score")
    }

    /// Fullname of the parent: the submission for top-level comments.
    pub fn parent_id(&self) -> Option<&str> {
        self.str_attr("parent_id")
    }

    /// Fullname of the submission this comment belongs to.
    pub fn link_id(&self) -> Option<&str> {
        self.str_attr("link_id")
    }

    pub fn is_root(&self) -> bool {
        match (self.parent_id(), self.link_id()) {
            (Some(parent), Some(link)) => parent == link,
            _ => false,
        }
    }

    pub fn replies(&self) -> Option<&Listing> {
        self.attr("replies").and_then(Object::as_listing)
    }

    /// A stub for the submission this comment was posted in.
    pub fn submission(&self) -> Result<Submission> {
        let link_id = self.link_id().ok_or_else(|| RedditClientError::MissingAttribute {
            kind: ModelKind::Comment.to_string(),
            attribute: "link_id".to_string(),
        })?;
        let id = link_id.strip_prefix("t3_").unwrap_or(link_id);
        Ok(Submission::from_id(self.client_ref().clone(), id))
    }

    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.f64_attr("created_utc").unwrap_or(0.0))
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id().unwrap_or_default())
    }
}

impl Votable for Comment {}
impl Saveable for Comment {}
impl Deletable for Comment {}
impl Editable for Comment {}
impl Reportable for Comment {}
impl Replyable for Comment {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objector::Objector;
    use serde_json::json;

    fn submission(data: serde_json::Value) -> Submission {
        Submission::try_from(Objector::detached().objectify(json!({"kind": "t3", "data": data}))).unwrap()
    }

    #[test]
    fn id_from_url_forms() {
        assert_eq!(
            Submission::id_from_url("https://www.reddit.com/r/rust/comments/abc123/some_title/").unwrap(),
            "abc123"
        );
        assert_eq!(Submission::id_from_url("https://redd.it/xyz9").unwrap(), "xyz9");
        assert_eq!(
            Submission::id_from_url("https://www.reddit.com/gallery/g4ll3ry").unwrap(),
            "g4ll3ry"
        );
        assert!(Submission::id_from_url("https://www.reddit.com/r/rust/").is_err());
        assert!(Submission::id_from_url("not a url").is_err());
    }

    #[test]
    fn display_uses_score_and_title() {
        assert_eq!(submission(json!({"id": "a", "score": 42, "title": "Hello"})).to_string(), "42 :: Hello");
        assert_eq!(submission(json!({"id": "a"})).to_string(), "a");
    }

    #[test]
    fn summary_lists_flags() {
        let post = submission(json!({
            "id": "a",
            "title": "Ask me",
            "author": "someone",
            "subreddit": "rust",
            "score": 10,
            "upvote_ratio": 0.9,
            "num_comments": 3,
            "is_self": true,
            "over_18": true,
            "selftext": "body",
            "permalink": "/r/rust/comments/a/ask_me/",
        }));
        let summary = post.format_summary();
        assert!(summary.contains("Flags: [Self Post, NSFW]"));
        assert!(summary.contains("Content:\n---------\nbody"));
        assert!(summary.contains("Permalink: https://reddit.com/r/rust/comments/a/ask_me/"));
        assert_eq!(post.format_short_summary(), "[r/rust | 10 pts] Ask me - by u/someone");
    }

    #[test]
    fn comment_navigation() {
        let comment = Comment::try_from(Objector::detached().objectify(json!({
            "kind": "t1",
            "data": {"id": "c1", "name": "t1_c1", "parent_id": "t3_abc", "link_id": "t3_abc", "replies": ""},
        })))
        .unwrap();
        assert!(comment.is_root());
        assert!(comment.replies().is_none());
        let parent = comment.submission().unwrap();
        assert_eq!(parent.fullname(), Some("t3_abc"));
        assert!(!parent.is_fetched());
    }
}
