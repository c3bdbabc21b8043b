use crate::client::RedditClient;
use crate::error::Result;
use crate::models::subreddit::PostContent;
use log::{error, info};

/// Configuration options for creating a post
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// The subreddit to post to, with or without the "r/" prefix
    pub subreddit: String,
    /// Title of the post
    pub title: String,
    /// Body text of a self post
    pub text: Option<String>,
    /// Target of a link post; wins over `text`
    pub url: Option<String>,
}

/// Result of a post creation operation
#[derive(Debug)]
pub struct SubmitResult {
    /// Fullname of the new post
    pub post_id: String,
    /// Formatted message for CLI output
    pub message: String,
}

/// Operation for creating a self or link post in a subreddit
pub struct SubmitOperation {
    options: SubmitOptions,
    client: RedditClient,
}

impl SubmitOperation {
    pub fn new(options: SubmitOptions, client: RedditClient) -> Self {
        Self { options, client }
    }

    pub async fn execute(&self) -> Result<SubmitResult> {
        let subreddit = self.client.subreddit(&self.options.subreddit);
        info!(
            "Creating a new post in r/{}: '{}'",
            subreddit.display_name(),
            self.options.title
        );

        let content = match (&self.options.url, &self.options.text) {
            (Some(url), _) => PostContent::Link(url.clone()),
            (None, text) => PostContent::SelfText(text.clone().unwrap_or_default()),
        };
        let submission = subreddit.submit(&self.options.title, content).await?;

        let post_id = submission.fullname().unwrap_or_default().to_string();
        let message = format!(
            "Post created successfully! URL: https://redd.it/{}",
            submission.id().unwrap_or_default()
        );
        Ok(SubmitResult { post_id, message })
    }
}

/// CLI handler for the submit command
pub async fn handle_submit_command(options: SubmitOptions, client: RedditClient) -> Result<()> {
    match SubmitOperation::new(options, client).execute().await {
        Ok(result) => {
            println!("{}", result.message);
            Ok(())
        }
        Err(err) => {
            error!("Error creating post: {}", err);
            Err(err)
        }
    }
}
