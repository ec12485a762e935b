//! # Inkpress Core
//!
//! Core data models, error types, configuration and shared services for the
//! blog content engine. This crate defines the canonical types that all other
//! crates depend on.
//!
//! ## Architecture Principles
//!
//! - **Type-Driven Design**: closed enums for document nodes, strong config types
//! - **Zero Panic in Libraries**: All errors are `Result<T, Error>`
//! - **Builder Pattern for Configuration**: `SiteConfig::builder`
//! - **Immutable Collections**: loaded posts are shared as `Arc<[Post]>`
//! - **Injected Effects**: caches take a store and a clock
//!
//! ## Core Modules
//!
//! - [`models`] - Posts, TOC entries and the markdown document tree
//! - [`error`] - Error type and Result alias
//! - [`config`] - Site configuration structures
//! - [`profiles`] - Configuration presets
//! - [`cache`] - Session cache with pluggable store and clock
//! - [`vitals`] - Web Vitals / resource timing collector
//! - [`utils`] - Utility functions
//!
//! ## Usage Examples
//!
//! ```
//! use inkpress_core::prelude::*;
//! use serde_json::Map;
//!
//! let post = Post::from_metadata("hello", "Dev Notes", &Map::new(), "Body");
//! assert_eq!(post.category, "dev-notes");
//! assert_eq!(post.title, "hello");
//! ```
//!
//! ### Error Handling
//!
//! ```
//! use inkpress_core::prelude::*;
//!
//! fn lookup(slug: &str) -> Result<Post> {
//!     Err(Error::not_found(slug))
//! }
//! assert!(lookup("missing").unwrap_err().is_not_found());
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod profiles;
pub mod utils;
pub mod vitals;

pub use cache::{CacheEntry, Clock, FileStore, ManualClock, MemoryStore, SessionCache, SessionStore, SystemClock};
pub use config::*;
pub use error::{Error, Result};
pub use models::*;
pub use profiles::ConfigProfile;
pub use utils::{normalize_category, parse_post_date, to_json_string};
pub use vitals::{
    PerfBudget, PerfEvent, Rating, ResourceKind, VitalMetric, VitalsCollector, VitalsProducer,
    VitalsSnapshot, overlay_enabled,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{SiteConfig, SourceMode};
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        Block, Document, Inline, ListItem, Post, TableAlignment, TocHeading, inline_text,
    };
    pub use crate::profiles::ConfigProfile;
}
