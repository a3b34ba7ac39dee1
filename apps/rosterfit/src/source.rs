//! # Roster Source
//!
//! Where a roster workbook comes from: a local file or an HTTP(S) link.
//!
//! Fetching is all-or-nothing. Any failure (unreadable file, non-2xx status,
//! oversized body) is a `RosterFitError::Fetch` and no roster is produced.

use rosterfit_core::{LoadedRoster, RosterFitError, RosterLoader};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Maximum workbook size accepted from any source (50 MB).
pub const MAX_ROSTER_BYTES: u64 = 50 * 1024 * 1024;

/// Timeout for fetching a workbook over HTTP.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A roster workbook location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterSource {
    File(PathBuf),
    Url(String),
}

impl RosterSource {
    /// `http://` and `https://` links are URLs; anything else is a path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }

    fn fetch_error(&self, reason: impl Into<String>) -> RosterFitError {
        RosterFitError::Fetch {
            origin: self.to_string(),
            reason: reason.into(),
        }
    }

    /// Read the raw workbook bytes.
    pub async fn fetch(&self) -> Result<Vec<u8>, RosterFitError> {
        match self {
            Self::File(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| self.fetch_error(e.to_string()))?;
                if !metadata.is_file() {
                    return Err(self.fetch_error("not a regular file"));
                }
                if metadata.len() > MAX_ROSTER_BYTES {
                    return Err(self.fetch_error(format!(
                        "{} bytes exceeds maximum {}",
                        metadata.len(),
                        MAX_ROSTER_BYTES
                    )));
                }
                tokio::fs::read(path)
                    .await
                    .map_err(|e| self.fetch_error(e.to_string()))
            }
            Self::Url(url) => {
                let client = reqwest::Client::builder()
                    .timeout(FETCH_TIMEOUT)
                    .build()
                    .map_err(|e| self.fetch_error(e.to_string()))?;
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| self.fetch_error(e.to_string()))?;

                let status = resp.status();
                if !status.is_success() {
                    return Err(self.fetch_error(format!("HTTP {}", status.as_u16())));
                }
                if resp
                    .content_length()
                    .is_some_and(|len| len > MAX_ROSTER_BYTES)
                {
                    return Err(self.fetch_error("response body too large"));
                }

                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| self.fetch_error(e.to_string()))?;
                if body.len() as u64 > MAX_ROSTER_BYTES {
                    return Err(self.fetch_error("response body too large"));
                }
                Ok(body.to_vec())
            }
        }
    }

    /// Fetch and parse into a roster.
    pub async fn load(&self, loader: &RosterLoader) -> Result<LoadedRoster, RosterFitError> {
        tracing::info!("Loading roster from {}", self);
        let bytes = self.fetch().await?;
        let loaded = loader.load_bytes(&bytes)?;
        tracing::info!(
            people = loaded.roster.len(),
            weeks = loaded.roster.weeks().len(),
            fingerprint = %loaded.fingerprint,
            "Roster loaded"
        );
        Ok(loaded)
    }
}

impl fmt::Display for RosterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

impl FromStr for RosterSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_paths_distinguished() {
        assert_eq!(
            RosterSource::parse("https://example.com/r.json"),
            RosterSource::Url("https://example.com/r.json".to_string())
        );
        assert_eq!(
            RosterSource::parse("HTTP://example.com/r.json"),
            RosterSource::Url("HTTP://example.com/r.json".to_string())
        );
        assert_eq!(
            RosterSource::parse(" data/roster.json "),
            RosterSource::File(PathBuf::from("data/roster.json"))
        );
    }

    #[tokio::test]
    async fn missing_file_is_fetch_error() {
        let source = RosterSource::parse("/definitely/not/here.json");
        assert!(matches!(
            source.fetch().await,
            Err(RosterFitError::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn directory_is_fetch_error() {
        let dir = std::env::temp_dir();
        let source = RosterSource::File(dir);
        assert!(matches!(
            source.fetch().await,
            Err(RosterFitError::Fetch { .. })
        ));
    }
}
