//! Post repository: the single read API over local and remote content.
//!
//! Local mode loads the content directory once and memoizes it. Remote mode
//! serves the aggregate listing from the session cache while it is fresh,
//! refetches when it expires, and falls back to local content when the remote
//! host fails. [`PostRepository::served_from`] reports which path answered
//! the last listing.
//!
//! Slugs are unique within a listing: the first post in source order keeps a
//! slug and later duplicates are dropped with a warning.

use crate::remote::RemoteSource;
use crate::source::{ContentSource, LocalSource};
use inkpress_core::prelude::*;
use inkpress_core::{
    Clock, FileStore, MemoryStore, SessionCache, SessionStore, SystemClock, normalize_category,
    utils::expand_path,
};
use parking_lot::RwLock as SyncRwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::instrument;

/// Which path produced the most recent listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServedFrom {
    /// Local content (local mode, or remote fallback)
    Local,
    /// Fresh fetch from the remote host
    Remote,
    /// Session cache hit
    Cache,
}

/// Order posts newest first; undated posts count as the epoch; ties keep
/// source order
pub fn sort_posts(mut posts: Vec<Post>) -> Arc<[Post]> {
    posts.sort_by_key(|p| std::cmp::Reverse(p.sort_key()));
    Arc::from(posts)
}

/// A sorted listing with unique slugs and its slug index
#[derive(Debug, Default)]
struct Collection {
    posts: Arc<[Post]>,
    by_slug: HashMap<String, usize>,
}

impl Collection {
    /// The first post for a slug in source order wins; later ones are dropped
    fn build(posts: Vec<Post>) -> Self {
        let mut seen: HashMap<String, String> = HashMap::with_capacity(posts.len());
        let mut unique = Vec::with_capacity(posts.len());
        for post in posts {
            if let Some(kept) = seen.get(&post.slug) {
                log::warn!(
                    "Duplicate slug '{}': keeping {}/{}, dropping {}/{}",
                    post.slug,
                    kept,
                    post.slug,
                    post.category,
                    post.slug
                );
                continue;
            }
            seen.insert(post.slug.clone(), post.category.clone());
            unique.push(post);
        }

        let posts = sort_posts(unique);
        let by_slug = posts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.slug.clone(), i))
            .collect();
        Self { posts, by_slug }
    }

    fn position(&self, slug: &str) -> Option<usize> {
        self.by_slug.get(slug).copied()
    }

    fn get(&self, slug: &str) -> Option<&Post> {
        self.position(slug).map(|i| &self.posts[i])
    }
}

struct RemoteMode {
    source: Arc<dyn ContentSource>,
    cache: Option<SessionCache<Vec<Post>>>,
    /// Collection built from the current cache entry, kept for identity
    memo: RwLock<Option<Arc<Collection>>>,
}

pub struct PostRepository {
    local: Arc<dyn ContentSource>,
    local_posts: RwLock<Option<Arc<Collection>>>,
    remote: Option<RemoteMode>,
    served_from: SyncRwLock<Option<ServedFrom>>,
}

impl PostRepository {
    /// Repository over local content only
    pub fn local(source: Arc<dyn ContentSource>) -> Self {
        Self {
            local: source,
            local_posts: RwLock::new(None),
            remote: None,
            served_from: SyncRwLock::new(None),
        }
    }

    /// Repository over a remote source with a local fallback
    pub fn remote(
        source: Arc<dyn ContentSource>,
        fallback: Arc<dyn ContentSource>,
        cache: Option<SessionCache<Vec<Post>>>,
    ) -> Self {
        Self {
            remote: Some(RemoteMode {
                source,
                cache,
                memo: RwLock::new(None),
            }),
            ..Self::local(fallback)
        }
    }

    /// Build sources and cache from configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let content_dir = expand_path(&config.content_dir.to_string_lossy())?;
        let local: Arc<dyn ContentSource> = Arc::new(LocalSource::new(content_dir));

        match (config.source, &config.remote) {
            (SourceMode::Local, _) => Ok(Self::local(local)),
            (SourceMode::Remote, None) => Err(Error::config_error(
                "Remote source selected but no remote settings given",
            )),
            (SourceMode::Remote, Some(remote)) => {
                let source: Arc<dyn ContentSource> = Arc::new(RemoteSource::new(remote.clone())?);
                let cache = if config.cache.enabled {
                    let store: Arc<dyn SessionStore> = match &config.cache.dir {
                        Some(dir) => {
                            Arc::new(FileStore::open(expand_path(&dir.to_string_lossy())?)?)
                        }
                        None => Arc::new(MemoryStore::new()),
                    };
                    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
                    Some(SessionCache::new(
                        store,
                        clock,
                        config.cache.key.clone(),
                        Duration::from_secs(config.cache.ttl_secs),
                    ))
                } else {
                    None
                };
                Ok(Self::remote(source, local, cache))
            }
        }
    }

    /// Which path answered the last listing, if any
    pub fn served_from(&self) -> Option<ServedFrom> {
        *self.served_from.read()
    }

    fn mark(&self, from: ServedFrom) {
        *self.served_from.write() = Some(from);
    }

    /// All posts, newest first
    #[instrument(skip(self), name = "list_posts")]
    pub async fn list_posts(&self) -> Result<Arc<[Post]>> {
        Ok(Arc::clone(&self.collection().await?.posts))
    }

    async fn collection(&self) -> Result<Arc<Collection>> {
        match &self.remote {
            Some(remote) => self.list_remote(remote).await,
            None => {
                let posts = self.list_local().await?;
                self.mark(ServedFrom::Local);
                Ok(posts)
            }
        }
    }

    async fn list_local(&self) -> Result<Arc<Collection>> {
        if let Some(posts) = self.local_posts.read().await.as_ref() {
            return Ok(Arc::clone(posts));
        }

        let mut slot = self.local_posts.write().await;
        if let Some(posts) = slot.as_ref() {
            return Ok(Arc::clone(posts));
        }
        let posts = Arc::new(Collection::build(self.local.load_all().await?));
        log::info!("Loaded {} local posts", posts.posts.len());
        *slot = Some(Arc::clone(&posts));
        Ok(posts)
    }

    /// Local content behind a remote source. An unreadable fallback is an
    /// empty collection, not an error.
    async fn local_fallback(&self) -> Arc<Collection> {
        match self.list_local().await {
            Ok(posts) => posts,
            Err(e) => {
                log::warn!("Local fallback content unavailable: {}", e);
                Arc::new(Collection::default())
            }
        }
    }

    /// Collection for a fresh cache entry, memoized for identity
    async fn cached(&self, remote: &RemoteMode) -> Option<Arc<Collection>> {
        let cached = remote.cache.as_ref().and_then(|c| c.get())?;
        let mut memo = remote.memo.write().await;
        let posts = match memo.as_ref() {
            Some(posts) => Arc::clone(posts),
            None => {
                let posts = Arc::new(Collection::build(cached));
                *memo = Some(Arc::clone(&posts));
                posts
            }
        };
        Some(posts)
    }

    async fn list_remote(&self, remote: &RemoteMode) -> Result<Arc<Collection>> {
        if let Some(posts) = self.cached(remote).await {
            log::debug!("Serving {} posts from session cache", posts.posts.len());
            self.mark(ServedFrom::Cache);
            return Ok(posts);
        }

        match remote.source.load_all().await {
            Ok(fetched) => {
                let posts = Arc::new(Collection::build(fetched));
                if let Some(cache) = &remote.cache {
                    cache.put(posts.posts.to_vec());
                }
                *remote.memo.write().await = Some(Arc::clone(&posts));
                self.mark(ServedFrom::Remote);
                Ok(posts)
            }
            Err(e) => {
                log::warn!("Remote content unavailable, falling back to local: {}", e);
                *remote.memo.write().await = None;
                let posts = self.local_fallback().await;
                self.mark(ServedFrom::Local);
                Ok(posts)
            }
        }
    }

    /// One post by slug; `Error::NotFound` when no source has it
    #[instrument(skip(self), name = "get_post_by_slug")]
    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Post> {
        let Some(remote) = &self.remote else {
            return self
                .list_local()
                .await?
                .get(slug)
                .cloned()
                .ok_or_else(|| Error::not_found(slug));
        };

        if let Some(posts) = self.cached(remote).await {
            if let Some(post) = posts.get(slug) {
                return Ok(post.clone());
            }
        }

        match remote.source.categories().await {
            Ok(categories) => {
                for category in &categories {
                    match remote.source.load_one(category, slug).await {
                        Ok(post) => return Ok(post),
                        Err(e) => log::debug!("'{}' not in remote category '{}': {}", slug, category, e),
                    }
                }
            }
            Err(e) => log::warn!("Remote categories unavailable: {}", e),
        }

        log::warn!("'{}' not found remotely, trying local content", slug);
        self.local_fallback()
            .await
            .get(slug)
            .cloned()
            .ok_or_else(|| Error::not_found(slug))
    }

    /// Distinct categories, sorted
    pub async fn categories(&self) -> Result<Vec<String>> {
        let posts = self.list_posts().await?;
        let mut categories: Vec<String> = posts.iter().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    pub async fn posts_in_category(&self, category: &str) -> Result<Vec<Post>> {
        let wanted = normalize_category(category);
        Ok(self
            .list_posts()
            .await?
            .iter()
            .filter(|p| p.category == wanted)
            .cloned()
            .collect())
    }

    pub async fn featured_posts(&self) -> Result<Vec<Post>> {
        Ok(self
            .list_posts()
            .await?
            .iter()
            .filter(|p| p.featured)
            .cloned()
            .collect())
    }

    /// Neighbours in listing order: `(newer, older)`
    pub async fn adjacent(&self, slug: &str) -> Result<(Option<Post>, Option<Post>)> {
        let collection = self.collection().await?;
        let index = collection
            .position(slug)
            .ok_or_else(|| Error::not_found(slug))?;
        let posts = &collection.posts;
        let newer = index.checked_sub(1).map(|i| posts[i].clone());
        let older = posts.get(index + 1).cloned();
        Ok((newer, older))
    }

    /// Invalidate the session cache; the next listing refetches
    pub async fn clear_cache(&self) {
        if let Some(remote) = &self.remote {
            if let Some(cache) = &remote.cache {
                cache.clear();
            }
            *remote.memo.write().await = None;
        }
    }
}
