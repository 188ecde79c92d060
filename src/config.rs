use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime settings. Defaults below, overridable through `WIKI_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub wiki_path: String,
    pub cache_dir: PathBuf,
    pub prescraped_path: PathBuf,
    pub output_path: PathBuf,
    pub dump_path: PathBuf,
}

impl Settings {
    pub fn load() -> Result<Self> {
        config::Config::builder()
            .set_default("base_url", "https://wiki.facepunch.com")?
            .set_default("wiki_path", "/gmod/")?
            .set_default("cache_dir", "scrape")?
            .set_default("prescraped_path", "scrape/scrape.json")?
            .set_default("output_path", "resources/wiki.json")?
            .set_default("dump_path", "gluadump.json")?
            .add_source(config::Environment::with_prefix("WIKI"))
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Failed to deserialize settings")
    }

    /// Sidebar page carrying the whole navigation tree.
    pub fn index_url(&self) -> String {
        format!("{}{}", self.base_url, self.wiki_path)
    }

    /// Raw markup URL for a wiki page given as an href (absolute or site-relative).
    pub fn page_url(&self, href: &str) -> String {
        let path = href.strip_prefix(self.base_url.as_str()).unwrap_or(href);
        format!("{}{}?format=text", self.base_url, path)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://wiki.facepunch.com".into(),
            wiki_path: "/gmod/".into(),
            cache_dir: PathBuf::from("scrape"),
            prescraped_path: PathBuf::from("scrape/scrape.json"),
            output_path: PathBuf::from("resources/wiki.json"),
            dump_path: PathBuf::from("gluadump.json"),
        }
    }
}
