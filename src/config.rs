//! Command-line and environment configuration for the feed connection.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use reqwest::Url;

use crate::feed::LiveFeed;
use crate::fetch::BasicClient;
use crate::fetch::auth::FeedAuth;

pub const DEFAULT_FEED_URL: &str = "https://gtfsapi.translink.ca/v3/gtfsposition";

/// Where the feed credential is placed on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthKind {
    /// Query-string parameter named by `--auth-name`
    UrlParam,
    /// HTTP header named by `--auth-name`
    Header,
    /// No credential
    None,
}

#[derive(Debug, Clone, Args)]
pub struct StaticArgs {
    /// Directory containing routes.txt and directions.txt
    #[arg(long, env = "STATIC_DATA_DIR", default_value = "gtfs-static")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct FeedArgs {
    /// GTFS-RT vehicle position endpoint
    #[arg(long, env = "FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: Url,

    /// How the API key is sent to the feed
    #[arg(long, value_enum, default_value_t = AuthKind::UrlParam)]
    pub auth: AuthKind,

    /// Query parameter or header name carrying the API key
    #[arg(long, default_value = "apikey")]
    pub auth_name: String,

    /// Feed API key
    #[arg(long, env = "FEED_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,
}

impl FeedArgs {
    pub fn feed_auth(&self) -> FeedAuth {
        match self.auth {
            AuthKind::UrlParam => FeedAuth::UrlParam {
                param_name: self.auth_name.clone(),
            },
            AuthKind::Header => FeedAuth::Header {
                header_name: self.auth_name.clone(),
            },
            AuthKind::None => FeedAuth::None,
        }
    }

    /// Builds the authenticated [`LiveFeed`] these arguments describe.
    ///
    /// # Errors
    ///
    /// Fails before any client is built when the chosen auth mode needs a key
    /// and none (or an empty one) was supplied.
    pub fn live_feed(&self) -> Result<LiveFeed> {
        let auth = self.feed_auth();
        if auth.requires_auth() && self.api_key.as_deref().is_none_or(str::is_empty) {
            bail!(
                "Feed auth '{}' needs an API key: set FEED_API_KEY or pass --api-key",
                self.auth_name
            );
        }

        let client = BasicClient::new(Duration::from_secs(self.timeout_secs))
            .context("Failed to create HTTP client")?;
        let client = auth
            .wrap(client, self.api_key.clone())
            .context("Invalid feed credentials")?;

        Ok(LiveFeed::new(client, self.feed_url.clone()))
    }
}
