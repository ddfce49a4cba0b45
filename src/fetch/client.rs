use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared HTTP requests. Lets the geocoder run against any
/// transport, including ones that decorate requests before sending.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
