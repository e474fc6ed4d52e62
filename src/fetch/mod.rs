mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Joins a file name onto a directory path or base URL.
pub fn join_location(base: &str, name: &str) -> String {
    if is_remote(base) {
        format!("{}/{}", base.trim_end_matches('/'), name)
    } else {
        Path::new(base).join(name).to_string_lossy().into_owned()
    }
}

/// Reads `name` under `source`; `.gz` files are decompressed.
#[tracing::instrument(skip(client))]
pub async fn read_source<C: HttpClient>(client: &C, source: &str, name: &str) -> Result<Vec<u8>> {
    let location = join_location(source, name);
    let bytes = if is_remote(source) {
        fetch_bytes(client, &location).await?
    } else {
        tokio::fs::read(&location)
            .await
            .with_context(|| format!("reading {location}"))?
    };
    debug!(bytes = bytes.len(), "Source read");

    if name.ends_with(".gz") {
        gunzip(&bytes).with_context(|| format!("decompressing {location}"))
    } else {
        Ok(bytes)
    }
}

pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}
