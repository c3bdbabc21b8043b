use crate::client::RedditClient;
use crate::error::{RedditClientError, Result};
use crate::models::Replyable;
use log::{error, info};

/// Configuration options for replying to a post or comment
#[derive(Debug, Clone)]
pub struct CommentOptions {
    /// Fullname of the parent: "t3_" plus a post id, or "t1_" plus a comment id
    pub thing_id: String,
    /// Text content of the comment
    pub text: String,
}

/// Result of a comment creation operation
#[derive(Debug)]
pub struct CommentResult {
    /// Fullname of the new comment
    pub comment_id: String,
    /// Formatted message for CLI output
    pub message: String,
}

/// Operation for creating a comment on a post or another comment
pub struct CommentOperation {
    options: CommentOptions,
    client: RedditClient,
}

impl CommentOperation {
    pub fn new(options: CommentOptions, client: RedditClient) -> Self {
        Self { options, client }
    }

    pub async fn execute(&self) -> Result<CommentResult> {
        let thing_id = self.options.thing_id.as_str();
        info!("Creating a new comment on thing_id: {}", thing_id);

        let created = if let Some(id) = thing_id.strip_prefix("t3_") {
            self.client.submission(id).reply(&self.options.text).await?
        } else if let Some(id) = thing_id.strip_prefix("t1_") {
            self.client.comment(id).reply(&self.options.text).await?
        } else {
            return Err(RedditClientError::ClientError(format!(
                "cannot comment on {}: expected a t1_ or t3_ fullname",
                thing_id
            )));
        };

        let comment_id = created.fullname().unwrap_or_default().to_string();
        let message = match created.str_attr("permalink") {
            Some(permalink) => format!(
                "Comment created successfully! URL: https://reddit.com{}",
                permalink
            ),
            None => format!("Comment created successfully! ID: {}", comment_id),
        };
        Ok(CommentResult {
            comment_id,
            message,
        })
    }
}

/// CLI handler for the comment command
pub async fn handle_comment_command(
    thing_id: String,
    text: String,
    client: RedditClient,
) -> Result<()> {
    let options = CommentOptions { thing_id, text };

    match CommentOperation::new(options, client).execute().await {
        Ok(result) => {
            println!("{}", result.message);
            Ok(())
        }
        Err(err) => {
            error!("Error creating comment: {}", err);
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

    fn client(transport: Arc<MockTransport>) -> RedditClient {
        let config = Config::new("comment test")
            .with_script_credentials("id", "secret", "user", "pass")
            .with_base_url("https://oauth.example")
            .with_auth_url("https://www.example");
        RedditClient::with_transport(config, transport).unwrap()
    }

    #[tokio::test]
    async fn replies_to_a_submission() {
        let transport = Arc::new(MockTransport::new().with_token("tok", 3600).expect(
            Method::POST,
            "/api/comment",
            MockResponse::json(
                200,
                json!({"json": {"errors": [], "data": {"things": [
                    {"kind": "t1", "data": {"id": "c9", "name": "t1_c9", "permalink": "/r/rust/comments/a1/_/c9/"}},
                ]}}}),
            ),
        ));
        let options = CommentOptions {
            thing_id: "t3_a1".to_string(),
            text: "nice".to_string(),
        };
        let result = CommentOperation::new(options, client(transport.clone()))
            .execute()
            .await
            .unwrap();

        assert_eq!(result.comment_id, "t1_c9");
        assert!(result.message.ends_with("/r/rust/comments/a1/_/c9/"));
        let sent = transport
            .requests()
            .into_iter()
            .find(|r| r.url.contains("/api/comment"))
            .unwrap();
        assert_eq!(sent.form_value("thing_id"), Some("t3_a1"));
        assert_eq!(sent.form_value("text"), Some("nice"));
    }

    #[tokio::test]
    async fn rejects_other_kinds() {
        let transport = Arc::new(MockTransport::new());
        let options = CommentOptions {
            thing_id: "t5_abc".to_string(),
            text: "hi".to_string(),
        };
        let err = CommentOperation::new(options, client(transport.clone()))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, RedditClientError::ClientError(_)));
        assert!(transport.requests().is_empty());
    }
}
