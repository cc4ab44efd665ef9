use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a single outbound request. Wrappers such as
/// [`UrlParam`](super::auth::UrlParam) decorate an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Box<C> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
