//! Inkpress CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inkpress::prelude::*;
use inkpress::parser::interpret_diagram;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Inkpress - browse, search and render blog posts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file (takes precedence over --profile)
    #[arg(short, long, env = "INKPRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Configuration profile to use (development, production, offline)
    #[arg(short, long, default_value = "development")]
    profile: String,

    /// Local content directory, overriding the configured one
    #[arg(long, env = "INKPRESS_CONTENT")]
    content: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List posts, newest first
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Print one post
    Show {
        slug: String,
        /// Render to HTML instead of printing the markdown body
        #[arg(long, action = clap::ArgAction::SetTrue)]
        html: bool,
    },
    /// Print the table of contents of a post
    Toc { slug: String },
    /// Fuzzy search over title, summary, category and tags
    Search {
        query: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Lay out a diagram spec file and print the result as JSON
    Diagram { file: PathBuf },
    /// List categories
    Categories,
}

async fn load_config(args: &Args) -> Result<SiteConfig> {
    let mut config = match &args.config {
        Some(path) => SiteConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => args.profile.parse::<ConfigProfile>()?.create_config(),
    };
    if let Some(content) = &args.content {
        config.content_dir = content.clone();
    }
    Ok(config)
}

/// Logs go to stderr so command output stays pipeable. `RUST_LOG` wins over
/// the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_ascii_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_post_line(post: &Post) {
    let date = post
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    let star = if post.featured { "*" } else { " " };
    println!("{} {}{}/{}  {}", date, star, post.category, post.slug, post.title);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args).await?;
    init_logging(&config.log_level);

    log::debug!("Inkpress v{} profile={}", env!("CARGO_PKG_VERSION"), config.profile);

    match args.command {
        // Diagram files need no content source
        Command::Diagram { file } => print_diagram(&file).await,
        command => run(Blog::from_config(config)?, command).await,
    }
}

async fn print_diagram(file: &Path) -> Result<()> {
    let source = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let layout = interpret_diagram(&source)?;
    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(())
}

async fn run(blog: Blog, command: Command) -> Result<()> {
    match command {
        Command::List { category } => {
            let posts = match category {
                Some(category) => blog.posts_in_category(&category).await?,
                None => blog.posts().await?.to_vec(),
            };
            for post in &posts {
                print_post_line(post);
            }
        }
        Command::Show { slug, html } => {
            if html {
                let page = blog.render_post(&slug).await?;
                println!("{}", page.html);
            } else {
                let post = blog.repository().get_post_by_slug(&slug).await?;
                println!("# {}", post.title);
                if !post.summary.is_empty() {
                    println!("> {}", post.summary);
                }
                if !post.tags.is_empty() {
                    println!("tags: {}", post.tags.join(", "));
                }
                println!();
                println!("{}", post.content);
            }
        }
        Command::Toc { slug } => {
            let page = blog.render_post(&slug).await?;
            for heading in &page.toc {
                let indent = "  ".repeat(usize::from(heading.level.saturating_sub(2)));
                println!("{}- {} (#{})", indent, heading.text, heading.id);
            }
        }
        Command::Search {
            query,
            category,
            limit,
        } => {
            let mut search = SearchQuery::new(query);
            search.category = category;
            search.limit = limit;
            let hits = blog.search(&search).await?;
            if hits.is_empty() {
                println!("No matches");
            }
            for hit in &hits {
                print!("{:.2} ", hit.score);
                print_post_line(&hit.post);
            }
        }
        Command::Categories => {
            for category in blog.categories().await? {
                println!("{}", category);
            }
        }
        Command::Diagram { file } => print_diagram(&file).await?,
    }

    if let Some(from) = blog.served_from() {
        log::debug!("Content served from {:?}", from);
    }

    Ok(())
}
