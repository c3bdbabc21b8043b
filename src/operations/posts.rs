use crate::client::RedditClient;
use crate::error::Result;
use crate::models::{Submission, Thing};
use chrono::DateTime;
use log::{error, info};

/// Configuration options for listing posts
#[derive(Debug, Clone)]
pub struct PostsOptions {
    /// The number of posts to retrieve
    pub count: usize,
    /// The subreddit to list (None for the front page)
    pub subreddit: Option<String>,
    /// Display posts in a brief, one-line format
    pub brief: bool,
}

impl Default for PostsOptions {
    fn default() -> Self {
        Self {
            count: 10,
            subreddit: None,
            brief: false,
        }
    }
}

/// Result of a posts listing operation
#[derive(Debug)]
pub struct PostsResult {
    /// The submissions that were listed
    pub posts: Vec<Submission>,
    /// Formatted output (for CLI display)
    pub formatted_output: String,
}

/// Operation for listing hot posts from a subreddit or the front page
pub struct PostsOperation {
    options: PostsOptions,
    client: RedditClient,
}

impl PostsOperation {
    pub fn new(options: PostsOptions, client: RedditClient) -> Self {
        Self { options, client }
    }

    pub async fn execute(&self) -> Result<PostsResult> {
        info!(
            "Fetching {} posts from {}",
            self.options.count,
            self.options.subreddit.as_deref().unwrap_or("the front page")
        );

        let paginator = match &self.options.subreddit {
            Some(sub) => self.client.subreddit(sub).hot(),
            None => self.client.front_page(),
        };
        let mut paginator = paginator.with_limit(Some(self.options.count));

        let mut posts = Vec::new();
        while let Some(thing) = paginator.next_thing().await? {
            if let Thing::Submission(submission) = thing {
                posts.push(submission);
            }
        }

        let mut output = String::new();
        if posts.is_empty() {
            output.push_str("No posts found.\n");
        } else {
            output.push_str(&format!("Found {} posts\n", posts.len()));
            if self.options.brief {
                format_brief_output(&posts, &mut output);

                output.push_str("\nPost Type Legend:\n");
                output.push_str("[T] = Text post\n");
                output.push_str("[V] = Video\n");
                output.push_str("[I] = Image\n");
                output.push_str("[G] = Gallery\n");
                output.push_str("[L] = Link\n");
            } else {
                format_detailed_output(&posts, &mut output);
            }
        }

        Ok(PostsResult {
            posts,
            formatted_output: output,
        })
    }
}

/// Single letter describing what a post links to.
fn post_type(post: &Submission) -> &'static str {
    let url = post.url().unwrap_or_default();
    if post.is_self() {
        "T"
    } else if post.bool_attr("is_video").unwrap_or(false) {
        "V"
    } else if url.contains("i.redd.it") || url.contains("imgur.com") {
        "I"
    } else if url.contains("reddit.com/gallery") {
        "G"
    } else {
        "L"
    }
}

/// Cut `text` to `max` characters, ending with "..." when shortened.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut = text.chars().take(max - 3).collect::<String>();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

fn format_brief_output(posts: &[Submission], output: &mut String) {
    for (i, post) in posts.iter().enumerate() {
        let time = post
            .created_utc()
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());

        let content = if post.is_self() {
            let text = post.selftext().unwrap_or_default().trim().replace('\n', " ");
            if text.is_empty() {
                "[No content]".to_string()
            } else {
                format!("\"{}\"", truncate(&text, 30))
            }
        } else {
            let url = post.url().unwrap_or_default();
            let url = url
                .strip_prefix("https://")
                .or_else(|| url.strip_prefix("http://"))
                .unwrap_or(url);
            truncate(url, 30)
        };

        output.push_str(&format!(
            "{:2}. [{}] [{}] {} ({}) r/{} | ID: {} | https://reddit.com{}\n",
            i + 1,
            post_type(post),
            time,
            truncate(post.title().unwrap_or_default(), 30),
            content,
            post.subreddit_name().unwrap_or_default(),
            post.fullname().unwrap_or_default(),
            post.permalink().unwrap_or_default(),
        ));
    }
}

fn format_detailed_output(posts: &[Submission], output: &mut String) {
    for post in posts {
        output.push_str("\n============ POST =============\n");
        output.push_str(&format!("[{}]\n", post.format_timestamp()));
        output.push_str(&format!(
            "Thing ID: {} (use this for commenting)\n",
            post.fullname().unwrap_or_default()
        ));
        output.push_str(&post.format_summary());
        output.push_str("\n================================\n\n");
    }
}

/// CLI handler for the posts command
pub async fn handle_posts_command(
    count: usize,
    subreddit: Option<String>,
    brief: bool,
    client: RedditClient,
) -> Result<()> {
    let options = PostsOptions {
        count,
        subreddit,
        brief,
    };

    match PostsOperation::new(options, client).execute().await {
        Ok(result) => {
            print!("{}", result.formatted_output);
            Ok(())
        }
        Err(err) => {
            error!("Error fetching posts: {}", err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transport::mock::{MockResponse, MockTransport};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: MockTransport) -> RedditClient {
        let config = Config::new("posts test")
            .with_script_credentials("id", "secret", "user", "pass")
            .with_base_url("https://oauth.example")
            .with_auth_url("https://www.example");
        RedditClient::with_transport(config, Arc::new(transport.with_token("tok", 3600))).unwrap()
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 30), "short");
        assert_eq!(truncate("ééééééééééé", 8), "ééééé...");
    }

    #[tokio::test]
    async fn brief_listing_shows_one_line_per_post() {
        let transport = MockTransport::new().expect(
            Method::GET,
            "/r/rust/hot",
            MockResponse::json(200, json!({"kind": "Listing", "data": {"after": null, "children": [
                {"kind": "t3", "data": {
                    "id": "a1", "name": "t3_a1", "title": "Hello", "is_self": true,
                    "selftext": "body", "subreddit": "rust", "permalink": "/r/rust/comments/a1/",
                    "created_utc": 0.0,
                }},
                {"kind": "t3", "data": {
                    "id": "b2", "name": "t3_b2", "title": "A picture", "is_self": false,
                    "url": "https://i.redd.it/x.png", "subreddit": "rust",
                    "permalink": "/r/rust/comments/b2/",
                }},
            ]}})),
        );
        let options = PostsOptions {
            count: 5,
            subreddit: Some("rust".to_string()),
            brief: true,
        };
        let result = PostsOperation::new(options, client(transport)).execute().await.unwrap();

        assert_eq!(result.posts.len(), 2);
        assert!(result.formatted_output.contains(" 1. [T] [00:00] Hello (\"body\") r/rust | ID: t3_a1"));
        assert!(result.formatted_output.contains(" 2. [I] [--:--] A picture (i.redd.it/x.png)"));
    }

    #[tokio::test]
    async fn empty_front_page() {
        let transport = MockTransport::new().expect(
            Method::GET,
            "/hot",
            MockResponse::json(200, json!({"kind": "Listing", "data": {"after": null, "children": []}})),
        );
        let result = PostsOperation::new(PostsOptions::default(), client(transport))
            .execute()
            .await
            .unwrap();
        assert_eq!(result.formatted_output, "No posts found.\n");
    }
}
