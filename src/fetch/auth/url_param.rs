use crate::fetch::client::HttpClient;
use async_trait::async_trait;

use super::AuthError;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// TransLink expects `?apikey=<key>`. The key only exists on the outgoing
/// request, so the configured feed URL, which is recorded in spans, never
/// contains it.
pub struct UrlParam<C> {
    inner: C,
    param_name: String,
    key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: &str, key: &str) -> Result<Self, AuthError> {
        if param_name.is_empty() {
            return Err(AuthError::EmptyParamName);
        }
        if key.is_empty() {
            return Err(AuthError::MissingKey);
        }

        Ok(Self {
            inner,
            param_name: param_name.to_string(),
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req).await
    }
}
