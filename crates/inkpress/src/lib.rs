//! # Inkpress
//!
//! One handle over the whole engine: posts from the configured source,
//! fuzzy search over them, and rendering of a post into a node tree and HTML.
//!
//! ```no_run
//! use inkpress::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let blog = Blog::from_config(SiteConfig::builder("content").build()?)?;
//!
//! let page = blog.render_post("ownership").await?;
//! for heading in &page.toc {
//!     println!("{} #{}", heading.text, heading.id);
//! }
//! println!("{}", page.html);
//! # Ok(())
//! # }
//! ```

use inkpress_content::{PostRepository, SearchHit, SearchIndex, SearchQuery, ServedFrom};
use inkpress_core::prelude::*;
use inkpress_parser::{RenderNode, Renderer, prepare, table_of_contents, to_html};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

pub use inkpress_content as content;
pub use inkpress_parser as parser;

/// A post ready for display
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPost {
    pub post: Post,
    pub toc: Vec<TocHeading>,
    pub nodes: Vec<RenderNode>,
    pub html: String,
    /// Neighbours in listing order
    pub newer: Option<Post>,
    pub older: Option<Post>,
}

/// Rendered markdown without a post around it
#[derive(Debug, Clone, Serialize)]
pub struct RenderedContent {
    pub toc: Vec<TocHeading>,
    pub nodes: Vec<RenderNode>,
    pub html: String,
}

pub struct Blog {
    config: SiteConfig,
    repository: PostRepository,
    index: RwLock<SearchIndex>,
    renderer: Renderer,
}

impl Blog {
    pub fn new(config: SiteConfig, repository: PostRepository) -> Self {
        let index = SearchIndex::new(config.search.threshold);
        Self {
            config,
            repository,
            index: RwLock::new(index),
            renderer: Renderer::new(),
        }
    }

    /// Validate the configuration and build its repository
    pub fn from_config(config: SiteConfig) -> Result<Self> {
        config.validate()?;
        let repository = PostRepository::from_config(&config)?;
        log::debug!(
            "Blog ready: profile={} source={:?}",
            config.profile,
            config.source
        );
        Ok(Self::new(config, repository))
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn repository(&self) -> &PostRepository {
        &self.repository
    }

    pub fn served_from(&self) -> Option<ServedFrom> {
        self.repository.served_from()
    }

    /// All posts, newest first
    pub async fn posts(&self) -> Result<Arc<[Post]>> {
        self.repository.list_posts().await
    }

    pub async fn posts_in_category(&self, category: &str) -> Result<Vec<Post>> {
        self.repository.posts_in_category(category).await
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.repository.categories().await
    }

    /// Search the current listing; the configured default limit applies
    /// when the query sets none
    #[instrument(skip(self), name = "blog_search")]
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let posts = self.repository.list_posts().await?;

        if self.index.write().sync(&posts) {
            log::debug!("Search index rebuilt for {} posts", posts.len());
        }

        let mut query = query.clone();
        if query.limit.is_none() && self.config.search.default_limit > 0 {
            query.limit = Some(self.config.search.default_limit);
        }
        Ok(self.index.read().search(&query))
    }

    /// Run markdown through the transform pipeline and the renderer
    pub fn render_markdown(&self, markdown: &str) -> RenderedContent {
        let document = prepare(markdown);
        let toc = table_of_contents(&document);
        let nodes = self.renderer.render(&document);
        let html = to_html(&nodes);
        RenderedContent { toc, nodes, html }
    }

    #[instrument(skip(self), name = "render_post")]
    pub async fn render_post(&self, slug: &str) -> Result<RenderedPost> {
        let post = self.repository.get_post_by_slug(slug).await?;
        let (newer, older) = match self.repository.adjacent(slug).await {
            Ok(neighbours) => neighbours,
            Err(e) => {
                log::warn!("No neighbours for '{}': {}", slug, e);
                (None, None)
            }
        };

        let RenderedContent { toc, nodes, html } = self.render_markdown(&post.content);
        Ok(RenderedPost {
            post,
            toc,
            nodes,
            html,
            newer,
            older,
        })
    }
}

pub mod prelude {
    pub use crate::{Blog, RenderedContent, RenderedPost};
    pub use inkpress_content::prelude::*;
    pub use inkpress_parser::{RenderNode, Renderer};
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpress_content::{BundledPost, LocalSource};

    fn blog() -> Blog {
        let source = LocalSource::bundled(vec![
            BundledPost::new(
                "rust",
                "ownership",
                "---\ntitle: Ownership\ndate: 2024-02-01\n---\n## Moves\n\n## Moves\n",
            ),
            BundledPost::new(
                "rust",
                "lifetimes",
                "---\ntitle: Lifetimes\ndate: 2024-03-01\n---\nText",
            ),
        ]);
        Blog::new(
            SiteConfig::default(),
            PostRepository::local(Arc::new(source)),
        )
    }

    #[test]
    fn test_render_markdown_dedups_heading_ids() {
        let rendered = blog().render_markdown("## Setup\n\n## Setup\n");
        let ids: Vec<_> = rendered.toc.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["setup", "setup-2"]);
        assert!(rendered.html.contains(r#"id="setup-2""#));
    }

    #[tokio::test]
    async fn test_render_post_with_neighbours() {
        let page = blog().render_post("ownership").await.unwrap();
        assert_eq!(page.post.title, "Ownership");
        assert_eq!(page.toc.len(), 2);
        assert_eq!(page.newer.map(|p| p.slug), Some("lifetimes".to_string()));
        assert!(page.older.is_none());
    }

    #[tokio::test]
    async fn test_unknown_slug_is_not_found() {
        assert!(blog().render_post("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_search_applies_default_limit() {
        let mut config = SiteConfig::default();
        config.search.default_limit = 1;
        let source = LocalSource::bundled(vec![
            BundledPost::new("rust", "a", "---\ntitle: Rust one\n---\n"),
            BundledPost::new("rust", "b", "---\ntitle: Rust two\n---\n"),
        ]);
        let blog = Blog::new(config, PostRepository::local(Arc::new(source)));

        assert_eq!(blog.search(&SearchQuery::new("rust")).await.unwrap().len(), 1);
        assert_eq!(
            blog.search(&SearchQuery::new("rust").limit(5)).await.unwrap().len(),
            2
        );
    }
}
