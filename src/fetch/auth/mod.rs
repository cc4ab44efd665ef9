//! Credential injection for the upstream feed.
//!
//! [`FeedAuth`] describes where the access key goes; [`FeedAuth::wrap`] turns
//! that into an [`HttpClient`] decorator ([`UrlParam`] or [`ApiKey`]).

mod api_key;
mod url_param;

pub use api_key::ApiKey;
pub use url_param::UrlParam;

use crate::fetch::client::HttpClient;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("feed requires an API key but none was configured")]
    MissingKey,

    #[error("auth query parameter name is empty")]
    EmptyParamName,

    #[error("invalid auth header name '{0}'")]
    InvalidHeaderName(String),

    #[error("API key is not a valid header value")]
    InvalidKey,
}

/// Describes how the feed expects its credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedAuth {
    /// No authentication required.
    None,
    /// API key appended as a URL query parameter with the given name.
    UrlParam { param_name: String },
    /// API key sent as an HTTP header with the given name.
    Header { header_name: String },
}

impl FeedAuth {
    /// Returns `true` if any authentication credentials are needed.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, FeedAuth::None)
    }

    /// Wraps `inner` so every request carries `key` as described by `self`.
    ///
    /// # Errors
    ///
    /// Fails if auth is required and `key` is `None` or empty, or if the
    /// parameter/header name or key is unusable.
    pub fn wrap<C: HttpClient + 'static>(
        &self,
        inner: C,
        key: Option<String>,
    ) -> Result<Box<dyn HttpClient>, AuthError> {
        match self {
            FeedAuth::None => Ok(Box::new(inner)),
            FeedAuth::UrlParam { param_name } => {
                let key = key.ok_or(AuthError::MissingKey)?;
                Ok(Box::new(UrlParam::new(inner, param_name, &key)?))
            }
            FeedAuth::Header { header_name } => {
                let key = key.ok_or(AuthError::MissingKey)?;
                Ok(Box::new(ApiKey::new(inner, header_name, &key)?))
            }
        }
    }
}
