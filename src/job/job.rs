use crate::error::{Error, Result};
use crate::extension::{ExtensionId, FetchKey, PlatformDescriptor};

use reqwest::Url;
use std::path::Path;

/// One package to retrieve.
///
/// The fetch URL is built by the caller from the identifier and platform;
/// the orchestrator only uses it to issue the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: ExtensionId,
    pub platform: PlatformDescriptor,
    pub url: Url,
    /// Output file name, used when an output directory is configured.
    pub filename: String,
}

impl Job {
    /// Creates a new [`Job`] writing to `<id>.zip`.
    pub fn new(id: ExtensionId, platform: PlatformDescriptor, url: &Url) -> Self {
        let filename = format!("{}.zip", id);
        Self {
            id,
            platform,
            url: url.clone(),
            filename,
        }
    }

    /// Validate raw input and create a [`Job`].
    ///
    /// The identifier is checked first, so a malformed identifier is
    /// reported as [`Error::InvalidIdentifierFormat`] even when the URL is
    /// also broken.
    pub fn parse(id: &str, platform: PlatformDescriptor, url: &str) -> Result<Self> {
        let id: ExtensionId = id.parse()?;
        let url = Url::parse(url)
            .map_err(|e| Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", url, e)))?;
        Ok(Self::new(id, platform, &url))
    }

    /// Use a custom output file name. `.zip` is appended when missing.
    ///
    /// Only the last path component is kept, so the file always lands in the
    /// output directory. A name without one (`..`, empty) is ignored.
    pub fn with_filename(self, filename: &str) -> Self {
        let Some(filename) = Path::new(filename).file_name().and_then(|n| n.to_str()) else {
            return self;
        };
        let filename = if filename.to_ascii_lowercase().ends_with(".zip") {
            filename.to_string()
        } else {
            format!("{}.zip", filename)
        };
        Self { filename, ..self }
    }

    /// The cache and deduplication key of this job.
    pub fn key(&self) -> FetchKey {
        FetchKey::new(self.id.clone(), self.platform.clone())
    }
}
