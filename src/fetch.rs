//! Fetch the current manifest database from the Destiny 2 API
//!
//! The manifest endpoint names the current version and the path of a zip
//! archive holding the content database. The archive is buffered in memory
//! and its first entry is written to `<work_dir>/<version>.manifest`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::info;

pub const MANIFEST_ENDPOINT: &str = "https://www.bungie.net/Platform/Destiny2/Manifest";
pub const CONTENT_HOST: &str = "https://www.bungie.net";

/// Only the English content stream is read
pub const CONTENT_LOCALE: &str = "en";

/// Where to look for the manifest and where to put it
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Endpoint describing the current manifest
    pub endpoint: String,

    /// Host the content paths are relative to
    pub content_host: String,

    /// Directory the extracted database is written into
    pub work_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            endpoint: String::from(MANIFEST_ENDPOINT),
            content_host: String::from(CONTENT_HOST),
            work_dir: PathBuf::from("."),
        }
    }
}

/// The current manifest version and where its content lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    pub version: String,
    pub content_path: String,
}

#[derive(Deserialize)]
struct ManifestEnvelope {
    #[serde(rename = "Response")]
    response: Option<ManifestResponse>,
    #[serde(rename = "ErrorStatus", default)]
    error_status: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestResponse {
    version: String,
    #[serde(default)]
    mobile_world_content_paths: HashMap<String, String>,
}

/// Read the version and content path out of a manifest endpoint response
pub fn parse_manifest_info(body: &str) -> Result<ManifestInfo> {
    let envelope: ManifestEnvelope =
        serde_json::from_str(body).context("Failed to parse manifest response")?;

    let Some(response) = envelope.response else {
        bail!(
            "Manifest response has no content ({}: {})",
            envelope.error_status.as_deref().unwrap_or("unknown status"),
            envelope.message.as_deref().unwrap_or("no message")
        );
    };

    let content_path = response
        .mobile_world_content_paths
        .get(CONTENT_LOCALE)
        .cloned()
        .with_context(|| format!("Manifest {} has no '{}' content path", response.version, CONTENT_LOCALE))?;

    Ok(ManifestInfo {
        version: response.version,
        content_path,
    })
}

/// Downloads and unpacks manifest databases
pub struct ManifestFetcher {
    agent: ureq::Agent,
    config: FetchConfig,
}

impl ManifestFetcher {
    pub fn new(config: FetchConfig) -> Self {
        ManifestFetcher {
            agent: ureq::AgentBuilder::new().build(),
            config,
        }
    }

    /// Ask the API which manifest is current
    pub fn resolve(&self, api_key: &str) -> Result<ManifestInfo> {
        let request = self.agent.get(&self.config.endpoint).set("X-API-Key", api_key);
        let body = send(request, &self.config.endpoint)?
            .into_string()
            .context("Failed to read manifest response")?;

        let manifest = parse_manifest_info(&body)?;
        info!(version = %manifest.version, "Resolved current manifest");
        Ok(manifest)
    }

    /// Download the content archive and extract the database, returning its path
    pub fn download(&self, manifest: &ManifestInfo) -> Result<PathBuf> {
        let url = format!(
            "{}{}",
            self.config.content_host.trim_end_matches('/'),
            manifest.content_path
        );
        info!(%url, "Downloading manifest archive");

        let mut archive = Vec::new();
        send(self.agent.get(&url), &url)?
            .into_reader()
            .read_to_end(&mut archive)
            .context("Failed to read manifest archive")?;

        let destination = self.database_path(manifest);
        let written = extract_first_entry(&archive, &destination)?;
        info!(path = %destination.display(), bytes = written, "Extracted manifest database");

        Ok(destination)
    }

    /// Resolve and download in one step
    pub fn fetch(&self, api_key: &str) -> Result<PathBuf> {
        let manifest = self.resolve(api_key)?;
        self.download(&manifest)
    }

    pub fn database_path(&self, manifest: &ManifestInfo) -> PathBuf {
        self.config.work_dir.join(format!("{}.manifest", manifest.version))
    }
}

fn send(request: ureq::Request, url: &str) -> Result<ureq::Response> {
    match request.call() {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            bail!("{} returned {}: {}", url, code, body);
        }
        Err(e) => bail!("Request to {} failed: {}", url, e),
    }
}

/// Write the first entry of a zip archive to `destination`, replacing any
/// existing file. Returns the number of bytes written.
pub fn extract_first_entry(archive: &[u8], destination: &Path) -> Result<u64> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .context("Manifest archive is not a valid zip file")?;
    if zip.is_empty() {
        bail!("Manifest archive is empty");
    }
    let mut entry = zip.by_index(0).context("Failed to open manifest archive entry")?;

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut file = File::create(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    match std::io::copy(&mut entry, &mut file) {
        Ok(written) => Ok(written),
        Err(e) => {
            // Leave no truncated database behind
            drop(file);
            let _ = std::fs::remove_file(destination);
            Err(e).with_context(|| format!("Failed to extract manifest to {}", destination.display()))
        }
    }
}
