//! Subcommands and their terminal rendering.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use linkwire_core::api::DEFAULT_PAGE_SIZE;
use linkwire_core::auth::{ClientSecretStore, TokenEndpoint};
use linkwire_core::models::{DetailedProfile, LikesPage, PostComment, PostSummary, UgcPost, UserInfo};
use linkwire_core::{Config, CoreError, Linkwire, Urn};
use tracing::info;

use crate::format::{format_date, format_optional, format_relative, format_timestamp, truncate_string};

/// Longest commentary shown per post in list views
const PREVIEW_LEN: usize = 280;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the browser URL that starts authorization
    AuthUrl,
    /// Exchange an authorization code for a stored credential
    Authorize {
        code: String,
        /// Redirect URI used for the code, if not the configured one
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Show the stored credential
    Status,
    /// Share a text post
    Share { text: String },
    /// Share a link with commentary
    ShareLink { text: String, url: String },
    /// Upload an image and share it with text
    ShareImage { text: String, path: PathBuf },
    /// Reshare a post, optionally with commentary
    Reshare {
        post: String,
        #[arg(default_value = "")]
        text: String,
    },
    /// Delete a post
    Delete { post: String },
    Like { post: String },
    Unlike { post: String },
    /// Comment on a post
    Comment { post: String, text: String },
    /// Show a single post
    Get { post: String },
    /// Show comments on a post
    Comments {
        post: String,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        count: u32,
    },
    /// Show the like count and recent likers of a post
    Likes {
        post: String,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        count: u32,
    },
    /// List your recent posts
    Posts {
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        count: u32,
    },
    /// Show the authorized member's profile
    Profile {
        /// Include headline from the member profile endpoint
        #[arg(long)]
        detailed: bool,
    },
    /// Show a post with its comments and likes
    Summary {
        post: String,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        count: u32,
    },
    /// Manage the OAuth client secret in the OS keychain
    #[command(subcommand)]
    Secret(SecretCommand),
}

#[derive(Debug, Subcommand)]
pub enum SecretCommand {
    /// Prompt for the client secret and store it
    Set {
        #[arg(long, env = "LINKEDIN_CLIENT_ID")]
        client_id: String,
    },
    /// Remove the stored client secret
    Clear {
        #[arg(long, env = "LINKEDIN_CLIENT_ID")]
        client_id: String,
    },
}

/// Run a command and return what should be printed on success.
pub async fn run(command: Command) -> Result<String> {
    if let Command::Secret(secret) = command {
        return run_secret(secret);
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    let linkwire = Linkwire::new(config)?;
    let output = execute(&linkwire, command).await?;
    Ok(with_durability_warning(output, linkwire.session().store().durability()))
}

/// Append a warning when the credential in use could not be written to disk.
fn with_durability_warning(output: String, durability: Result<(), CoreError>) -> String {
    match durability {
        Ok(()) => output,
        Err(e) => format!(
            "{}\n\nWarning: the refreshed credential is only held in memory ({}). It will be saved on the next successful write.",
            output, e
        ),
    }
}

fn run_secret(command: SecretCommand) -> Result<String> {
    match command {
        SecretCommand::Set { client_id } => {
            let secret = rpassword::prompt_password("Client secret: ").context("Failed to read client secret")?;
            if secret.trim().is_empty() {
                return Err(anyhow!("Client secret must not be empty"));
            }
            ClientSecretStore::store(&client_id, secret.trim())?;
            Ok(format!("Client secret for {} stored in keychain.", client_id))
        }
        SecretCommand::Clear { client_id } => {
            ClientSecretStore::delete(&client_id)?;
            Ok(format!("Client secret for {} removed from keychain.", client_id))
        }
    }
}

async fn execute(linkwire: &Linkwire, command: Command) -> Result<String> {
    let client = linkwire.client();
    let reauth = linkwire.config().reauthorization_url();
    let fail = |action: &str, err: CoreError| failure(action, &reauth, err);

    match command {
        Command::AuthUrl => {
            let state = TokenEndpoint::generate_state();
            let url = linkwire.session().endpoint().authorization_url(&state);
            Ok(format!("Open this URL in your browser to authorize:\n{}\n\nState: {}", url, state))
        }
        Command::Authorize { code, redirect_uri } => {
            let record = linkwire
                .session()
                .complete_authorization(&code, redirect_uri.as_deref())
                .await
                .map_err(|e| fail("complete authorization", e))?;
            info!(subject = %record.subject_id, "Authorization complete");
            Ok(format!(
                "Authorized as {}. Token expires {}.",
                Urn::person(&record.subject_id),
                format_timestamp(record.expires_at_epoch_millis)
            ))
        }
        Command::Status => Ok(render_status(linkwire, &reauth)),
        Command::Share { text } => client
            .share_text(&text)
            .await
            .map(|r| created("Post shared successfully!", "Post ID", r.post_id))
            .map_err(|e| fail("share post", e)),
        Command::ShareLink { text, url } => client
            .share_link(&text, &url)
            .await
            .map(|r| created("Link shared successfully!", "Post ID", r.post_id))
            .map_err(|e| fail("share link", e)),
        Command::ShareImage { text, path } => client
            .share_image(&text, &path)
            .await
            .map(|r| created("Post with image shared successfully!", "Post ID", r.post_id))
            .map_err(|e| fail("share post with image", e)),
        Command::Reshare { post, text } => client
            .reshare(&post, &text)
            .await
            .map(|r| created("Post reshared successfully!", "Post ID", r.post_id))
            .map_err(|e| fail("reshare post", e)),
        Command::Delete { post } => client
            .delete_post(&post)
            .await
            .map(|_| "Post deleted successfully.".to_string())
            .map_err(|e| fail("delete post", e)),
        Command::Like { post } => client
            .like_post(&post)
            .await
            .map(|_| "Post liked successfully.".to_string())
            .map_err(|e| fail("like post", e)),
        Command::Unlike { post } => client
            .unlike_post(&post)
            .await
            .map(|_| "Post unliked successfully.".to_string())
            .map_err(|e| fail("unlike post", e)),
        Command::Comment { post, text } => client
            .comment_on_post(&post, &text)
            .await
            .map(|r| created("Comment added successfully!", "Comment ID", r.comment_id))
            .map_err(|e| fail("add comment", e)),
        Command::Get { post } => client
            .get_post(&post)
            .await
            .map(|p| render_post(&p))
            .map_err(|e| fail("get post", e)),
        Command::Comments { post, count } => client
            .get_post_comments(&post, count)
            .await
            .map(|c| render_comments(&c))
            .map_err(|e| fail("get comments", e)),
        Command::Likes { post, count } => client
            .get_post_likes(&post, count)
            .await
            .map(|l| render_likes(&l))
            .map_err(|e| fail("get likes", e)),
        Command::Posts { count } => client
            .list_posts(count)
            .await
            .map(|p| render_posts(&p))
            .map_err(|e| fail("list posts", e)),
        Command::Profile { detailed } => {
            let user = client.user_info().await.map_err(|e| fail("get profile", e))?;
            let mut output = render_user_info(&user);
            if detailed {
                let profile = client.detailed_profile().await.map_err(|e| fail("get profile", e))?;
                output.push('\n');
                output.push_str(&render_detailed_profile(&profile));
            }
            Ok(output)
        }
        Command::Summary { post, count } => client
            .post_summary(&post, count)
            .await
            .map(|s| render_summary(&s))
            .map_err(|e| fail("get post summary", e)),
        Command::Secret(_) => Err(anyhow!("secret commands do not need a session")),
    }
}

/// Error shown to the operator. Anything that can only be fixed by
/// authorizing again points at the authorization page instead.
pub fn failure(action: &str, reauthorization_url: &str, err: CoreError) -> anyhow::Error {
    if err.is_reauthorization_required() {
        anyhow!("Authentication required. Please visit {} in your browser.", reauthorization_url)
    } else {
        anyhow!("Failed to {}: {}", action, err)
    }
}

fn created(message: &str, label: &str, id: Option<String>) -> String {
    match id {
        Some(id) => format!("{} ({}: {})", message, label, id),
        None => message.to_string(),
    }
}

fn render_status(linkwire: &Linkwire, reauthorization_url: &str) -> String {
    let Some(record) = linkwire.session().store().current() else {
        return format!(
            "Not authenticated. Please visit {} in your browser.",
            reauthorization_url
        );
    };

    let now = linkwire.session().now_millis();
    let expiry = format!(
        "{} ({})",
        format_timestamp(record.expires_at_epoch_millis),
        format_relative(record.expires_at_epoch_millis, now)
    );
    let mut lines = vec![
        format!("Authenticated as {}", Urn::person(&record.subject_id)),
        format!("Access token expires: {}", expiry),
        format!("Credential file: {}", linkwire.session().store().path().display()),
    ];
    if record.is_expired_at(now) {
        lines.push("The access token has expired and will be refreshed on the next request.".to_string());
    }
    lines.join("\n")
}

fn post_date(post: &UgcPost) -> String {
    post.created_millis()
        .map(format_date)
        .unwrap_or_else(|| "unknown date".to_string())
}

pub fn render_post(post: &UgcPost) -> String {
    format!(
        "Post ID: {}\nDate: {}\nStatus: {}\n\n{}",
        post.id,
        post_date(post),
        post.lifecycle_state.as_deref().unwrap_or("UNKNOWN"),
        post.text().unwrap_or("(no text)")
    )
}

pub fn render_posts(posts: &[UgcPost]) -> String {
    if posts.is_empty() {
        return "No posts found.".to_string();
    }
    posts
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. [{}] {}\n   {}",
                i + 1,
                post_date(p),
                p.id,
                truncate_string(p.text().unwrap_or("(no text)"), PREVIEW_LEN)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_comments(comments: &[PostComment]) -> String {
    if comments.is_empty() {
        return "No comments found.".to_string();
    }
    comments
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let date = c
                .created
                .as_ref()
                .map(|stamp| format_date(stamp.time))
                .unwrap_or_else(|| "unknown date".to_string());
            format!("{}. [{}] {}\n   {}", i + 1, date, c.actor, c.text())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_likes(page: &LikesPage) -> String {
    let actors = if page.likes.is_empty() {
        "(none)".to_string()
    } else {
        page.likes.iter().map(|l| l.actor.as_str()).collect::<Vec<_>>().join("\n")
    };
    format!("Total likes: {}\n\nRecent likers:\n{}", page.total, actors)
}

pub fn render_summary(summary: &PostSummary) -> String {
    format!(
        "{}\n\n--- Comments ({}) ---\n{}\n\n--- Likes ---\n{}",
        render_post(&summary.post),
        summary.comments.len(),
        render_comments(&summary.comments),
        render_likes(&summary.likes)
    )
}

pub fn render_user_info(user: &UserInfo) -> String {
    let verified = user
        .email_verified
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mut lines = vec![
        format!("Name: {}", format_optional(&user.name, "(not shared)")),
        format!("First name: {}", format_optional(&user.given_name, "(not shared)")),
        format!("Last name: {}", format_optional(&user.family_name, "(not shared)")),
        format!("Email: {} (verified: {})", format_optional(&user.email, "(not shared)"), verified),
        format!("User ID: {}", user.sub),
    ];
    if let Some(picture) = &user.picture {
        lines.push(format!("Profile picture: {}", picture));
    }
    lines.join("\n")
}

pub fn render_detailed_profile(profile: &DetailedProfile) -> String {
    format!(
        "Profile name: {}\nHeadline: {}",
        profile.full_name(),
        profile.headline().unwrap_or("(none)")
    )
}
