mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::{StatusCode, Url};

/// Issues a GET for `url` and returns the status together with the raw body.
/// Non-success statuses are returned, not turned into errors.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: Url,
) -> reqwest::Result<(StatusCode, Vec<u8>)> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    Ok((status, resp.bytes().await?.to_vec()))
}
