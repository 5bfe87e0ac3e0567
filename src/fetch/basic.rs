use std::time::Duration;

use super::client::HttpClient;
use reqwest::blocking::{Client, Request, Response};

/// Plain blocking client. Feed archives can be large, so the read timeout is
/// generous.
pub struct BasicClient(Client);

impl BasicClient {
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self(client))
    }
}

impl HttpClient for BasicClient {
    fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.0.execute(req)
    }
}
