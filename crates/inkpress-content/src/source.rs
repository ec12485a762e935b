//! Content sources: where raw posts come from.

use async_trait::async_trait;
use inkpress_core::prelude::*;
use inkpress_core::normalize_category;
use inkpress_parser::parse_frontmatter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of post files
pub const POST_EXTENSION: &str = "md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Remote,
}

/// A provider of posts
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Every post the source knows about, in source order
    async fn load_all(&self) -> Result<Vec<Post>>;

    /// One post by category and slug; `Error::NotFound` when absent
    async fn load_one(&self, category: &str, slug: &str) -> Result<Post>;

    /// Category names as the source addresses them
    async fn categories(&self) -> Result<Vec<String>>;

    fn kind(&self) -> SourceKind;
}

/// Build a post from a raw markdown file
pub fn post_from_raw(category: &str, slug: &str, raw: &str) -> Post {
    let frontmatter = parse_frontmatter(raw);
    Post::from_metadata(slug, category, &frontmatter.metadata, frontmatter.body)
}

/// Slug of a post file name (`hello-world.md` -> `hello-world`)
pub fn slug_from_file_name(name: &str) -> Option<&str> {
    let stem = name.strip_suffix(&format!(".{}", POST_EXTENSION))?;
    if stem.is_empty() { None } else { Some(stem) }
}

/// A post shipped inside the binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledPost {
    pub category: String,
    pub slug: String,
    pub raw: String,
}

impl BundledPost {
    pub fn new(category: impl Into<String>, slug: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            slug: slug.into(),
            raw: raw.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum LocalOrigin {
    Directory(PathBuf),
    Bundled(Vec<BundledPost>),
}

/// Posts stored as `<root>/<category>/<slug>.md`, or bundled in memory
#[derive(Debug, Clone)]
pub struct LocalSource {
    origin: LocalOrigin,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            origin: LocalOrigin::Directory(root.into()),
        }
    }

    pub fn bundled(posts: Vec<BundledPost>) -> Self {
        Self {
            origin: LocalOrigin::Bundled(posts),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        match &self.origin {
            LocalOrigin::Directory(root) => Some(root),
            LocalOrigin::Bundled(_) => None,
        }
    }

    /// Post files under the root, sorted by path
    fn scan_files(root: &Path) -> Result<Vec<(String, String, PathBuf)>> {
        if !root.is_dir() {
            return Err(Error::config_error(format!(
                "Content directory does not exist: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(slug) = entry.file_name().to_str().and_then(slug_from_file_name) else {
                continue;
            };
            let Some(category) = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
            else {
                continue;
            };
            files.push((
                category.to_string(),
                slug.to_string(),
                entry.path().to_path_buf(),
            ));
        }
        Ok(files)
    }
}

#[async_trait]
impl ContentSource for LocalSource {
    async fn load_all(&self) -> Result<Vec<Post>> {
        match &self.origin {
            LocalOrigin::Directory(root) => {
                let files = Self::scan_files(root)?;
                log::info!("Found {} post files under {}", files.len(), root.display());

                let mut posts = Vec::with_capacity(files.len());
                for (category, slug, path) in files {
                    match tokio::fs::read_to_string(&path).await {
                        Ok(raw) => posts.push(post_from_raw(&category, &slug, &raw)),
                        Err(e) => log::warn!("Failed to read {}: {}", path.display(), e),
                    }
                }
                Ok(posts)
            }
            LocalOrigin::Bundled(bundled) => Ok(bundled
                .iter()
                .map(|b| post_from_raw(&b.category, &b.slug, &b.raw))
                .collect()),
        }
    }

    async fn load_one(&self, category: &str, slug: &str) -> Result<Post> {
        match &self.origin {
            LocalOrigin::Directory(root) => {
                let path = root
                    .join(category)
                    .join(format!("{}.{}", slug, POST_EXTENSION));
                match tokio::fs::read_to_string(&path).await {
                    Ok(raw) => Ok(post_from_raw(category, slug, &raw)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(Error::not_found(slug))
                    }
                    Err(e) => Err(Error::io(e)),
                }
            }
            LocalOrigin::Bundled(bundled) => bundled
                .iter()
                .find(|b| {
                    b.slug == slug && normalize_category(&b.category) == normalize_category(category)
                })
                .map(|b| post_from_raw(&b.category, &b.slug, &b.raw))
                .ok_or_else(|| Error::not_found(slug)),
        }
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = match &self.origin {
            LocalOrigin::Directory(root) => Self::scan_files(root)?
                .into_iter()
                .map(|(category, _, _)| category)
                .collect(),
            LocalOrigin::Bundled(bundled) => bundled.iter().map(|b| b.category.clone()).collect(),
        };
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }
}
