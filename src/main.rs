mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use log::{error, info};
use redcore::operations::{comment, posts, submit, user};
use redcore::{Config, RedditClient};
use std::process;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    info!("Starting redcore with command: {:?}", cli.command);

    let client = match RedditClient::new(Config::from_env()) {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to create Reddit client: {}", err);
            eprintln!("Set REDDIT_CLIENT_ID, REDDIT_CLIENT_SECRET and either REDDIT_USERNAME/REDDIT_PASSWORD or REDDIT_REFRESH_TOKEN.");
            process::exit(2);
        }
    };

    let result = match cli.command {
        Commands::Posts {
            count,
            subreddit,
            brief,
        } => posts::handle_posts_command(count, subreddit, brief, client).await,
        Commands::Submit {
            subreddit,
            title,
            text,
            url,
        } => {
            let options = submit::SubmitOptions {
                subreddit,
                title,
                text,
                url,
            };
            submit::handle_submit_command(options, client).await
        }
        Commands::Comment { thing_id, text } => {
            comment::handle_comment_command(thing_id, text, client).await
        }
        Commands::User { name, recent } => user::handle_user_command(name, recent, client).await,
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
