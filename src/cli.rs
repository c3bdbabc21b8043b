use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "redcore",
    version,
    about = "Command-line front end for the redcore Reddit client."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Command to list hot posts from a subreddit or the front page.
    Posts {
        /// The number of posts to retrieve.
        #[arg(long, short, help = "Number of posts to retrieve", default_value_t = 10)]
        count: usize,

        /// The name of the subreddit to fetch posts from.
        /// If not provided, posts from the front page will be retrieved.
        #[arg(long, short, help = "Subreddit name (optional)", required = false)]
        subreddit: Option<String>,

        /// Display posts in a brief, one-line format.
        #[arg(long, short, help = "Show posts in a brief one-line format", required = false)]
        brief: bool,
    },

    /// Command to create a new post in a subreddit.
    /// Requires script or refresh-token credentials with the 'submit' scope.
    Submit {
        /// The name of the subreddit to post to.
        #[arg(help = "Subreddit name", required = true)]
        subreddit: String,

        /// Title of the post.
        #[arg(help = "Post title", required = true)]
        title: String,

        /// Text content of a self post.
        #[arg(long, short, help = "Post text", conflicts_with = "url")]
        text: Option<String>,

        /// Target of a link post.
        #[arg(long, short, help = "Link URL")]
        url: Option<String>,
    },

    /// Command to reply to a post or comment.
    Comment {
        /// Fullname of the parent ("t3_" for posts, "t1_" for comments).
        #[arg(help = "Thing ID of the post or comment", required = true)]
        thing_id: String,

        /// Text content of the comment.
        #[arg(help = "Comment text", required = true)]
        text: String,
    },

    /// Command to show a user's karma and recent submissions.
    User {
        /// The account to show. Defaults to the authenticated account.
        #[arg(help = "Username (optional)", required = false)]
        name: Option<String>,

        /// Number of recent submissions to list.
        #[arg(long, short, help = "Recent submissions to list", default_value_t = 5)]
        recent: usize,
    },
}
