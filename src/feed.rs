//! Live vehicle-position feed: fetching and protobuf decoding.

use chrono::{DateTime, TimeDelta, Utc};
use prost::Message;
use reqwest::Url;
use tracing::debug;

use crate::fetch::{FetchError, HttpClient, fetch_bytes};
use crate::gtfs_rt::{FeedEntity, FeedMessage};

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, prost::DecodeError> {
    FeedMessage::decode(bytes)
}

/// One decoded feed message, valid for a single request.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub message: FeedMessage,
    pub received_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(message: FeedMessage) -> Self {
        Self {
            message,
            received_at: Utc::now(),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FetchError> {
        Ok(Self::new(parse_feed(bytes)?))
    }

    pub fn entities(&self) -> &[FeedEntity] {
        &self.message.entity
    }

    /// Producer timestamp from the feed header, if present and in range.
    pub fn feed_timestamp(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.message.header.timestamp?).ok()?;
        DateTime::from_timestamp(secs, 0)
    }

    /// How old the producer's data was when the snapshot arrived.
    pub fn age(&self) -> Option<TimeDelta> {
        Some(self.received_at - self.feed_timestamp()?)
    }
}

/// The upstream feed endpoint together with the (authenticating) client used
/// to reach it.
pub struct LiveFeed {
    client: Box<dyn HttpClient>,
    url: Url,
}

impl LiveFeed {
    pub fn new(client: impl HttpClient + 'static, url: Url) -> Self {
        Self {
            client: Box::new(client),
            url,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetches and decodes the current snapshot. Called once per request;
    /// nothing is cached and failures are not retried.
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let bytes = fetch_bytes(&self.client, &self.url).await?;
        debug!(bytes = bytes.len(), "Feed bytes received, parsing");

        let snapshot = Snapshot::decode(&bytes)?;
        debug!(
            entity_count = snapshot.entities().len(),
            feed_timestamp = ?snapshot.feed_timestamp(),
            age_secs = snapshot.age().map(|age| age.num_seconds()),
            "Feed parsed successfully"
        );

        Ok(snapshot)
    }
}
