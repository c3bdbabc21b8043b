use crate::client::RedditClient;
use crate::error::Result;
use crate::models::{Redditor, Thing};
use log::{error, info};

/// Configuration options for showing a user profile
#[derive(Debug, Clone, Default)]
pub struct UserOptions {
    /// The account to show; None shows the authenticated account
    pub name: Option<String>,
    /// How many recent submissions to list
    pub recent: usize,
}

/// Operation for showing karma and recent submissions of an account
pub struct UserOperation {
    options: UserOptions,
    client: RedditClient,
}

impl UserOperation {
    pub fn new(options: UserOptions, client: RedditClient) -> Self {
        Self { options, client }
    }

    pub async fn execute(&self) -> Result<String> {
        let redditor = match &self.options.name {
            Some(name) => self.client.redditor(name).fetch().await?,
            None => self.client.me().await?,
        };
        info!("Loaded profile of u/{}", redditor.name());

        let mut output = format_profile(&redditor);
        if self.options.recent > 0 {
            let mut submissions = redditor.submissions().with_limit(Some(self.options.recent));
            output.push_str("\nRecent submissions:\n");
            while let Some(thing) = submissions.next_thing().await? {
                if let Thing::Submission(post) = thing {
                    output.push_str(&format!("  {}\n", post.format_short_summary()));
                }
            }
        }
        Ok(output)
    }
}

fn format_profile(redditor: &Redditor) -> String {
    format!(
        "u/{}\nLink karma: {} | Comment karma: {}\nCreated: {}\n",
        redditor.name(),
        redditor.link_karma().unwrap_or(0),
        redditor.comment_karma().unwrap_or(0),
        redditor.created().unwrap_or_else(|| "unknown".to_string()),
    )
}

/// CLI handler for the user command
pub async fn handle_user_command(name: Option<String>, recent: usize, client: RedditClient) -> Result<()> {
    match UserOperation::new(UserOptions { name, recent }, client).execute().await {
        Ok(output) => {
            print!("{}", output);
            Ok(())
        }
        Err(err) => {
            error!("Error loading user: {}", err);
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

    #[tokio::test]
    async fn shows_profile_and_recent_posts() {
        let transport = MockTransport::new()
            .with_token("tok", 3600)
            .expect(
                Method::GET,
                "/user/spez/about",
                MockResponse::json(200, json!({"kind": "t2", "data": {
                    "id": "1w72", "name": "spez", "link_karma": 10, "comment_karma": 20,
                    "created_utc": 1118030400.0,
                }})),
            )
            .expect(
                Method::GET,
                "/user/spez/submitted",
                MockResponse::json(200, json!({"kind": "Listing", "data": {"after": null, "children": [
                    {"kind": "t3", "data": {"id": "a", "title": "Hi", "subreddit": "announcements",
                        "score": 5, "author": "spez"}},
                ]}})),
            );
        let config = Config::new("user test")
            .with_script_credentials("id", "secret", "user", "pass")
            .with_base_url("https://oauth.example")
            .with_auth_url("https://www.example");
        let client = RedditClient::with_transport(config, Arc::new(transport)).unwrap();

        let options = UserOptions {
            name: Some("spez".to_string()),
            recent: 3,
        };
        let output = UserOperation::new(options, client).execute().await.unwrap();

        assert!(output.starts_with("u/spez\nLink karma: 10 | Comment karma: 20\n"));
        assert!(output.contains("Created: 2005-06-06 04:00:00 UTC"));
        assert!(output.contains("  [r/announcements | 5 pts] Hi - by u/spez\n"));
    }
}
