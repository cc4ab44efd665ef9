use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

use super::AuthError;

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header name and value are validated once at construction.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self, AuthError> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|_| AuthError::InvalidHeaderName(header_name.to_string()))?;
        let mut key = HeaderValue::from_str(key).map_err(|_| AuthError::InvalidKey)?;
        key.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            key,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Option<String>>>);

    #[async_trait]
    impl HttpClient for Recorder {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let auth = req
                .headers()
                .get("x-api-key")
                .map(|v| v.to_str().unwrap().to_string());
            self.0.lock().unwrap().push(auth);
            Ok(axum::http::Response::new(Vec::<u8>::new()).into())
        }
    }

    #[tokio::test]
    async fn test_sets_configured_header() {
        let client = ApiKey::new(Recorder::default(), "X-Api-Key", "token").unwrap();
        let req = reqwest::Request::new(reqwest::Method::GET, "https://feed.example/".parse().unwrap());

        client.execute(req).await.unwrap();

        let seen = client.inner.0.lock().unwrap();
        assert_eq!(seen[0].as_deref(), Some("token"));
    }

    #[test]
    fn test_rejects_newline_in_key() {
        assert!(matches!(
            ApiKey::new(Recorder::default(), "x-api-key", "bad\nkey"),
            Err(AuthError::InvalidKey)
        ));
    }
}
