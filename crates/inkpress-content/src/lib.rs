//! # Inkpress Content
//!
//! Where posts come from and how readers find them.
//!
//! This crate provides:
//! - [`source::LocalSource`]: `<root>/<category>/<slug>.md` files or bundled posts
//! - [`remote::RemoteSource`]: per-category listings fetched over HTTP
//! - [`repository::PostRepository`]: sorted listing, lookup by slug, session
//!   caching of remote content and fallback to local content
//! - [`search::SearchIndex`]: fuzzy matching over title, summary, category and tags
//!
//! ## Quick Start
//!
//! ```no_run
//! use inkpress_content::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = SiteConfig::builder("~/blog/content").build()?;
//! let repository = PostRepository::from_config(&config)?;
//!
//! let posts = repository.list_posts().await?;
//! let mut index = SearchIndex::new(config.search.threshold);
//! index.sync(&posts);
//!
//! for hit in index.search(&SearchQuery::new("borrow checker").limit(5)) {
//!     println!("{:.2} {}", hit.score, hit.post.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Remote mode
//!
//! The aggregate listing is cached under a fixed key for `cache.ttl_secs`.
//! Any remote failure is logged and answered from local content instead;
//! [`repository::PostRepository::served_from`] tells which path answered.

pub mod remote;
pub mod repository;
pub mod search;
pub mod source;

pub use remote::{ListingEntry, RemoteSource};
pub use repository::{PostRepository, ServedFrom, sort_posts};
pub use search::{SearchHit, SearchIndex, SearchQuery};
pub use source::{BundledPost, ContentSource, LocalSource, SourceKind, post_from_raw};

pub mod prelude {
    pub use crate::repository::{PostRepository, ServedFrom};
    pub use crate::search::{SearchHit, SearchIndex, SearchQuery};
    pub use crate::source::{BundledPost, ContentSource, LocalSource};
    pub use inkpress_core::prelude::*;
}
