//! Downloading of remote feed archives.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::{AtlasError, Result};
use tracing::debug;

/// Downloads `url` in a single blocking request and returns the body.
///
/// # Errors
///
/// Returns [`AtlasError::SourceUnavailable`] if `url` is not a valid URL and
/// [`AtlasError::Fetch`] if the request fails or the server answers with an
/// error status.
pub fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let parsed: reqwest::Url = url
        .parse()
        .map_err(|_| AtlasError::SourceUnavailable(url.to_owned()))?;
    let req = reqwest::blocking::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req)?.error_for_status()?;
    let bytes = resp.bytes()?.to_vec();
    debug!(url, bytes = bytes.len(), "Feed archive downloaded");
    Ok(bytes)
}
