mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::{StatusCode, Url};

/// Failure to obtain a decoded feed snapshot.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("error sending request: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed returned status {0}")]
    Status(StatusCode),

    #[error("error decoding feed: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Issues a single GET for `url` and returns the response body.
///
/// No retry is attempted; non-success statuses are reported as
/// [`FetchError::Status`].
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &Url) -> Result<Vec<u8>, FetchError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());

    let resp = client.execute(req).await?;
    let status = resp.status();
    tracing::debug!(status = status.as_u16(), "Feed responded");

    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    Ok(resp.bytes().await?.to_vec())
}
