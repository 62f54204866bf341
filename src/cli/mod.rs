//! CLI module for the newsdesk command-line client.
//!
//! Subcommands:
//! - `login` / `logout` - Start or end a session
//! - `whoami` - Show the signed-in user as the backend sees it
//! - `status` - Show local session state without contacting the backend
//! - `refresh` - Exchange the refresh token for a new access token
//! - `articles ...` - Browse, draft and review articles
//! - `users set-role` - Change another user's role

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::auth::tokens::decode_claims;
use crate::config::Config;
use crate::error::AppError;
use crate::listing::{ArticleFilter, ShapedPage, SortBy};
use crate::models::{ArticleInput, ArticleSummary, Credentials, Id, User};
use crate::AppContext;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "newsdesk")]
#[command(author, version, about = "Command-line client for the newsroom publishing API", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "newsdesk.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// GraphQL endpoint (overrides [api] endpoint)
    #[arg(long, env = "NEWSDESK_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded file
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(url) = &self.api_url {
            config.api.endpoint = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        config.validate()
    }
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with username and password
    Login {
        username: String,
        /// Password (can also be set via NEWSDESK_PASSWORD env var)
        #[arg(long, env = "NEWSDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget stored tokens
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show local session state
    Status,

    /// Refresh the access token
    Refresh,

    /// Article commands
    #[command(subcommand)]
    Articles(ArticleCommands),

    /// User administration commands
    #[command(subcommand)]
    Users(UserCommands),
}

#[derive(Subcommand, Debug)]
pub enum ArticleCommands {
    /// List published articles
    List(ListArgs),
    /// List your own articles
    Mine(ListArgs),
    /// List articles waiting for review
    Queue(ListArgs),
    /// Create a draft
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        excerpt: Option<String>,
        /// Category ID
        #[arg(long)]
        category: Option<String>,
        /// Tag ID, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Submit a draft for review
    Submit { id: String },
    /// Publish a pending article
    Publish { id: String },
    /// Send a pending article back with a reason
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Change a user's role (reader, writer, manager, admin)
    SetRole { user_id: String, role: String },
}

/// Filter, sort and paging flags shared by list commands
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive title search
    #[arg(short, long)]
    pub search: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub tag: Option<String>,
    /// newest, oldest, title-asc, title-desc, author-asc, author-desc
    #[arg(long, default_value = "newest")]
    pub sort: SortBy,
    #[arg(short, long, default_value = "1")]
    pub page: usize,
    /// Defaults to [listing] page_size
    #[arg(long)]
    pub page_size: Option<usize>,
}

impl ListArgs {
    pub fn filter(&self) -> ArticleFilter {
        ArticleFilter {
            search: self.search.clone(),
            category_id: self.category.clone().map(Id::from),
            tag_id: self.tag.clone().map(Id::from),
            sort_by: self.sort,
        }
    }
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

/// Run a CLI command
pub async fn run_command(cli: &Cli, ctx: &AppContext) -> Result<()> {
    match &cli.command {
        Commands::Login { username, password } => cmd_login(ctx, username, password).await,
        Commands::Logout => cmd_logout(ctx).await,
        Commands::Whoami => cmd_whoami(ctx).await,
        Commands::Status => cmd_status(ctx),
        Commands::Refresh => cmd_refresh(ctx).await,
        Commands::Articles(command) => cmd_articles(ctx, command).await,
        Commands::Users(UserCommands::SetRole { user_id, role }) => {
            let user = ctx.users.set_role(&Id::from(user_id.as_str()), role).await?;
            println!("{} is now {}", user.username, role_label(&user));
            Ok(())
        }
    }
}

async fn cmd_login(ctx: &AppContext, username: &str, password: &str) -> Result<()> {
    let user = ctx
        .session
        .login(&Credentials::new(username, password))
        .await
        .map_err(AppError::from)?;
    println!("Signed in as {} ({})", user.display_name(), role_label(&user));
    Ok(())
}

async fn cmd_logout(ctx: &AppContext) -> Result<()> {
    ctx.session.logout().await;
    println!("Signed out.");
    Ok(())
}

async fn cmd_whoami(ctx: &AppContext) -> Result<()> {
    let user = ctx
        .session
        .get_current_user()
        .await
        .ok_or_else(|| AppError::unauthorized("Not signed in. Run `newsdesk login` first."))?;
    print_user(&user);
    Ok(())
}

/// Local view only: token presence, expiry and the cached user
fn cmd_status(ctx: &AppContext) -> Result<()> {
    let tokens = ctx.session.tokens();

    println!();
    println!("=== Session Status ===");
    println!();
    println!("Endpoint:   {}", ctx.config.api.endpoint);

    let Some(access) = tokens.get_access_token() else {
        println!("Session:    [--] Signed out");
        println!();
        return Ok(());
    };

    let now = chrono::Utc::now().timestamp();
    let claims = decode_claims(&access);
    let expires = claims.as_ref().and_then(|c| c.exp).map(|exp| exp as i64);
    match expires {
        Some(exp) if exp > now => {
            println!("Session:    [OK] Active");
            println!("Expires in: {}", format_duration((exp - now) as u64));
        }
        Some(_) => println!("Session:    [!!] Access token expired"),
        None => println!("Session:    [!!] Access token unreadable"),
    }
    let refresh = if tokens.get_refresh_token().is_some() {
        "stored"
    } else {
        "none"
    };
    println!("Refresh:    {}", refresh);

    if let Some(user) = tokens.load_user_snapshot() {
        println!();
        print_user(&user);
    } else if let Some(subject) = claims.as_ref().and_then(|c| c.display_subject()) {
        println!("Subject:    {}", subject);
    }

    println!();
    Ok(())
}

async fn cmd_refresh(ctx: &AppContext) -> Result<()> {
    if !ctx.session.refresh_token().await {
        return Err(AppError::unauthorized("Session could not be refreshed. Please sign in again.").into());
    }
    println!("Access token refreshed.");
    Ok(())
}

async fn cmd_articles(ctx: &AppContext, command: &ArticleCommands) -> Result<()> {
    let default_size = ctx.config.listing.page_size;
    match command {
        ArticleCommands::List(args) => {
            let page = ctx
                .articles
                .list(&args.filter(), args.page, args.page_size.unwrap_or(default_size))
                .await?;
            print_page(&page);
        }
        ArticleCommands::Mine(args) => {
            let page = ctx
                .articles
                .list_mine(&args.filter(), args.page, args.page_size.unwrap_or(default_size))
                .await?;
            print_page(&page);
        }
        ArticleCommands::Queue(args) => {
            let page = ctx
                .articles
                .review_queue(&args.filter(), args.page, args.page_size.unwrap_or(default_size))
                .await?;
            print_page(&page);
        }
        ArticleCommands::Create {
            title,
            content,
            excerpt,
            category,
            tags,
        } => {
            let input = ArticleInput {
                title: title.clone(),
                content: content.clone(),
                excerpt: excerpt.clone(),
                category_id: category.as_deref().map(Id::from),
                tag_ids: tags.iter().map(|t| Id::from(t.as_str())).collect(),
            };
            let article = ctx.articles.create_draft(&input).await?;
            println!("Created draft {} \"{}\"", article.id, article.title);
        }
        ArticleCommands::Submit { id } => {
            let article = ctx.articles.submit_for_review(&Id::from(id.as_str())).await?;
            println!("Article {} is now {}", article.id, article.status);
        }
        ArticleCommands::Publish { id } => {
            let article = ctx.articles.publish(&Id::from(id.as_str())).await?;
            println!("Article {} is now {}", article.id, article.status);
        }
        ArticleCommands::Reject { id, reason } => {
            let article = ctx.articles.reject(&Id::from(id.as_str()), reason).await?;
            println!("Article {} is now {}", article.id, article.status);
        }
    }
    Ok(())
}

fn print_user(user: &User) {
    let caps = user.capabilities();
    let mut granted = Vec::new();
    if caps.can_write {
        granted.push("write");
    }
    if caps.can_manage {
        granted.push("manage");
    }
    if caps.can_admin {
        granted.push("admin");
    }

    println!("User:       {} ({})", user.display_name(), user.username);
    if !user.email.is_empty() {
        println!("Email:      {}", user.email);
    }
    println!("Role:       {}", role_label(user));
    println!(
        "Can:        {}",
        if granted.is_empty() {
            "read".to_string()
        } else {
            granted.join(", ")
        }
    );
}

fn role_label(user: &User) -> String {
    user.role()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "no role".to_string())
}

fn print_page(page: &ShapedPage<ArticleSummary>) {
    if page.items.is_empty() {
        println!("No articles found.");
        return;
    }

    println!();
    println!(
        "{:<10}  {:<40}  {:<20}  {:<10}  {:<16}",
        "ID", "TITLE", "AUTHOR", "STATUS", "CREATED"
    );
    println!("{}", "-".repeat(104));

    for article in &page.items {
        let author = article.author.full_name();
        let author = if author.is_empty() {
            article.author.username.clone()
        } else {
            author
        };
        println!(
            "{:<10}  {:<40}  {:<20}  {:<10}  {:<16}",
            truncate(&article.id.to_string(), 10),
            truncate(&article.title, 40),
            truncate(&author, 20),
            article.status,
            article.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!(
        "Page {} of {} ({} articles)",
        page.page,
        page.total_pages.max(1),
        page.total_count
    );
}

/// Format duration to human-readable string
fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate to `max_len` characters with an ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
