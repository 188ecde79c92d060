use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

const TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Got HTTP {status} from GET {url}")]
    Status { status: u16, url: String },
    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Page cache I/O on {path:?}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Kind of markup behind a URL; picks the cache file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Xml,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Xml => "xml",
        }
    }
}

/// Anything that can hand back raw markup for a URL.
pub trait PageSource {
    fn fetch(&self, url: &str, format: Format) -> Result<String, FetchError>;
}

/// Live HTTP fetches, mirrored into a flat cache directory keyed by URL hash.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    cache_dir: PathBuf,
    use_cache: bool,
}

impl HttpSource {
    pub fn new(cache_dir: impl Into<PathBuf>, use_cache: bool) -> Result<Self, FetchError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|source| FetchError::Cache {
            path: cache_dir.clone(),
            source,
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|source| FetchError::Request {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            cache_dir,
            use_cache,
        })
    }

    fn cache_path(&self, url: &str, format: Format) -> PathBuf {
        self.cache_dir.join(cache_file_name(url, format))
    }

    fn get(&self, url: &str) -> Result<String, FetchError> {
        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.text().map_err(request_err)
    }
}

impl PageSource for HttpSource {
    fn fetch(&self, url: &str, format: Format) -> Result<String, FetchError> {
        let path = self.cache_path(url, format);

        if self.use_cache && path.exists() {
            debug!("GET [cache {}] {}", file_name(&path), url);
            return fs::read_to_string(&path).map_err(|source| FetchError::Cache { path, source });
        }

        debug!("GET {}", url);
        let body = self.get(url)?;
        fs::write(&path, &body).map_err(|source| FetchError::Cache { path, source })?;
        Ok(body)
    }
}

/// Stable cache file name: hex SHA-256 of the URL plus the format extension.
pub fn cache_file_name(url: &str, format: Format) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{:x}.{}", digest, format.extension())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;

    use super::*;

    /// In-memory pages for pipeline tests; unknown URLs answer 404.
    #[derive(Default)]
    pub struct MemorySource {
        pages: HashMap<String, String>,
    }

    impl MemorySource {
        pub fn with(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl PageSource for MemorySource {
        fn fetch(&self, url: &str, _format: Format) -> Result<String, FetchError> {
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_name_is_stable_and_typed() {
        let a = cache_file_name("https://wiki.facepunch.com/gmod/", Format::Html);
        let b = cache_file_name("https://wiki.facepunch.com/gmod/", Format::Html);
        assert_eq!(a, b);
        assert!(a.ends_with(".html"));
        // 64 hex chars + ".html"
        assert_eq!(a.len(), 64 + 5);
        assert_ne!(a, cache_file_name("https://wiki.facepunch.com/gmod/x", Format::Html));
    }

    #[test]
    fn cached_fetch_never_hits_network() {
        let dir = tempfile::tempdir().unwrap();
        let url = "http://127.0.0.1:9/never-served";
        fs::write(dir.path().join(cache_file_name(url, Format::Xml)), "<function/>").unwrap();

        let source = HttpSource::new(dir.path(), true).unwrap();
        assert_eq!(source.fetch(url, Format::Xml).unwrap(), "<function/>");
    }

    #[test]
    fn status_error_message() {
        let err = FetchError::Status {
            status: 503,
            url: "https://example.com/x".into(),
        };
        assert_eq!(err.to_string(), "Got HTTP 503 from GET https://example.com/x");
    }
}
