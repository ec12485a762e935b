//! Remote content host.
//!
//! Host contract:
//! - `GET {api_base}/{category}` returns `[{name, path, type, download_url}]`;
//!   only `type == "file"` entries ending in `.md` are posts
//! - post bodies come from `download_url`, or `{raw_base}/{path}` without one
//! - optional `GET {manifest_url}` returns `{"categories": [...]}` and replaces
//!   the configured category list
//!
//! Categories are fetched concurrently. A failing category or file is logged
//! and skipped; only a total failure is an error.

use crate::source::{ContentSource, SourceKind, post_from_raw, slug_from_file_name};
use async_trait::async_trait;
use futures::future::join_all;
use inkpress_core::prelude::*;
use inkpress_core::RemoteConfig;
use serde::Deserialize;
use tracing::instrument;

const USER_AGENT: &str = concat!("inkpress/", env!("CARGO_PKG_VERSION"));

/// One entry of a category directory listing
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ListingEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ListingEntry {
    /// Slug when this entry is a post file
    pub fn post_slug(&self) -> Option<&str> {
        if self.kind != "file" {
            return None;
        }
        slug_from_file_name(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    categories: Vec<String>,
}

pub struct RemoteSource {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl RemoteSource {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::network(format!("Cannot build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn listing_url(&self, category: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), category)
    }

    fn content_url(&self, entry: &ListingEntry) -> Option<String> {
        if let Some(url) = entry.download_url.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }
        self.config.raw_base.as_ref().map(|base| {
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                entry.path.trim_start_matches('/')
            )
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(format!("GET {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "GET {url} returned HTTP {}",
                response.status()
            )));
        }
        Ok(response)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| Error::network(format!("Reading {url} failed: {e}")))
    }

    /// Category directory listing
    pub async fn list_category(&self, category: &str) -> Result<Vec<ListingEntry>> {
        let url = self.listing_url(category);
        self.get(&url)
            .await?
            .json()
            .await
            .map_err(|e| Error::network(format!("Listing {url} is not valid: {e}")))
    }

    async fn fetch_manifest(&self, url: &str) -> Result<Vec<String>> {
        let manifest: Manifest = self
            .get(url)
            .await?
            .json()
            .await
            .map_err(|e| Error::network(format!("Manifest {url} is not valid: {e}")))?;
        Ok(manifest.categories)
    }

    async fn fetch_entry(&self, category: &str, entry: &ListingEntry) -> Result<Post> {
        let slug = entry
            .post_slug()
            .ok_or_else(|| Error::other(format!("{} is not a post", entry.path)))?;
        let url = self.content_url(entry).ok_or_else(|| {
            Error::config_error(format!(
                "No download_url for {} and no raw_base configured",
                entry.path
            ))
        })?;
        let raw = self.fetch_text(&url).await?;
        Ok(post_from_raw(category, slug, &raw))
    }

    /// All posts of one category; individual file failures are skipped
    #[instrument(skip(self), name = "remote_load_category")]
    pub async fn load_category(&self, category: &str) -> Result<Vec<Post>> {
        let entries = self.list_category(category).await?;
        let posts: Vec<&ListingEntry> = entries.iter().filter(|e| e.post_slug().is_some()).collect();
        log::debug!("Category '{}' lists {} posts", category, posts.len());

        let results = join_all(posts.iter().map(|e| self.fetch_entry(category, e))).await;
        let mut loaded = Vec::with_capacity(results.len());
        for (entry, result) in posts.iter().zip(results) {
            match result {
                Ok(post) => loaded.push(post),
                Err(e) => log::warn!("Skipping {}: {}", entry.path, e),
            }
        }
        Ok(loaded)
    }
}

#[async_trait]
impl ContentSource for RemoteSource {
    #[instrument(skip(self), name = "remote_load_all")]
    async fn load_all(&self) -> Result<Vec<Post>> {
        let categories = self.categories().await?;
        if categories.is_empty() {
            return Err(Error::network("No remote categories to load"));
        }

        let results = join_all(categories.iter().map(|c| self.load_category(c))).await;

        let mut posts = Vec::new();
        let mut failures = 0;
        for (category, result) in categories.iter().zip(results) {
            match result {
                Ok(mut loaded) => posts.append(&mut loaded),
                Err(e) => {
                    failures += 1;
                    log::warn!("Remote category '{}' failed: {}", category, e);
                }
            }
        }

        if failures == categories.len() {
            return Err(Error::network(format!(
                "All {} remote categories failed",
                failures
            )));
        }

        log::info!(
            "Fetched {} remote posts from {} categories",
            posts.len(),
            categories.len() - failures
        );
        Ok(posts)
    }

    async fn load_one(&self, category: &str, slug: &str) -> Result<Post> {
        let entries = self.list_category(category).await?;
        let entry = entries
            .iter()
            .find(|e| e.post_slug() == Some(slug))
            .ok_or_else(|| Error::not_found(slug))?;
        self.fetch_entry(category, entry).await
    }

    async fn categories(&self) -> Result<Vec<String>> {
        if let Some(url) = &self.config.manifest_url {
            match self.fetch_manifest(url).await {
                Ok(categories) => return Ok(categories),
                Err(e) => log::warn!("Manifest unavailable, using configured categories: {}", e),
            }
        }
        Ok(self.config.categories.clone())
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }
}
