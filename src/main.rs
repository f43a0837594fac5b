mod config;
mod github;
mod oauth;
mod pr;
mod report;
mod server;
mod squash;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::github::{build_http_client, GitHubClient};

/// PR Squasher: replaces the commits of a GitHub Pull Request with a single
/// commit carrying the PR's title and description, then force-pushes it.
#[derive(Parser, Debug)]
#[command(name = "pr-squasher", version, about)]
struct Cli {
    /// Configuration file (default: .squasher.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web service (GitHub OAuth login + squash form)
    Serve {
        /// Address to listen on, overriding [server] bind
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Squash one pull request from the terminal using GITHUB_TOKEN
    Squash {
        /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42)
        pr_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pr_squasher=info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;
    debug!(web_host = %config.github.web_host, api_url = %config.github.api_url, "loaded configuration");

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            server::serve(config, &bind).await?;
        }
        Command::Squash { pr_url } => {
            let _main_span = info_span!("pr_squash", pr_url = %pr_url).entered();

            let http = build_http_client(config.request_timeout())?;
            let client = GitHubClient::new(http, &config.github.api_url, config.github_token()?);
            let outcome = squash::squash(&client, &pr_url, &config.squash_settings()).await;
            report::print_terminal_report(&outcome);

            if let Err(error) = outcome.result {
                return Err(error.into());
            }
        }
    }

    Ok(())
}
