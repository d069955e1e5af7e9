//! LinkedIn operations built on top of the [`RequestDispatcher`].
//!
//! Each method only shapes a request and decodes the response; freshness,
//! authentication and error classification all happen in the dispatcher.

use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, info};

use super::dispatcher::{ApiRequest, RequestDispatcher};
use super::{CoreError, Urn};
use crate::models::{
    CommentResult, DetailedProfile, Elements, LikesPage, PostComment, PostLike, PostSummary,
    RegisterUploadResponse, ShareResult, UgcPost, UserInfo,
};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound the API accepts for `count` on list endpoints.
pub const MAX_PAGE_SIZE: u32 = 50;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

const FEEDSHARE_IMAGE_RECIPE: &str = "urn:li:digitalmediaRecipe:feedshare-image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaCategory {
    None,
    Article,
    Image,
}

impl MediaCategory {
    fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::None => "NONE",
            MediaCategory::Article => "ARTICLE",
            MediaCategory::Image => "IMAGE",
        }
    }
}

/// Client for LinkedIn member operations.
/// Clone is cheap - the dispatcher shares its session and connection pool.
#[derive(Clone)]
pub struct LinkedInClient {
    dispatcher: RequestDispatcher,
}

impl LinkedInClient {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    // ===== Publishing =====

    /// Share a text post
    pub async fn share_text(&self, text: &str) -> Result<ShareResult, CoreError> {
        require_text(text, "post text")?;
        let response = self
            .dispatcher
            .invoke(|ctx| {
                ApiRequest::post("/ugcPosts").json(share_body(&ctx.author(), text, MediaCategory::None, None, None))
            })
            .await?;
        Ok(ShareResult {
            post_id: response.restli_id,
        })
    }

    /// Share a link with commentary
    pub async fn share_link(&self, text: &str, url: &str) -> Result<ShareResult, CoreError> {
        require_text(text, "commentary")?;
        require_text(url, "link url")?;
        let media = json!([{ "status": "READY", "originalUrl": url }]);
        let response = self
            .dispatcher
            .invoke(|ctx| {
                ApiRequest::post("/ugcPosts").json(share_body(
                    &ctx.author(),
                    text,
                    MediaCategory::Article,
                    Some(media.clone()),
                    None,
                ))
            })
            .await?;
        Ok(ShareResult {
            post_id: response.restli_id,
        })
    }

    /// Reshare an existing post, optionally with commentary (may be empty)
    pub async fn reshare(&self, share_ref: &str, text: &str) -> Result<ShareResult, CoreError> {
        require_text(share_ref, "post reference")?;
        let original = self.dispatcher.normalize_reference(share_ref);
        let response = self
            .dispatcher
            .invoke(|ctx| {
                ApiRequest::post("/ugcPosts").json(share_body(
                    &ctx.author(),
                    text,
                    MediaCategory::None,
                    None,
                    Some(&original),
                ))
            })
            .await?;
        Ok(ShareResult {
            post_id: response.restli_id,
        })
    }

    /// Upload a local image and share it in a post.
    ///
    /// Three calls: register the upload, PUT the bytes to the returned URL,
    /// then create the post referencing the uploaded asset.
    pub async fn share_image(&self, text: &str, image_path: &Path) -> Result<ShareResult, CoreError> {
        require_text(text, "post text")?;
        if !self.dispatcher.ensure_authenticated() {
            return Err(CoreError::AuthenticationRequired);
        }

        let data = tokio::fs::read(image_path).await.map_err(|e| {
            CoreError::InvalidInput(format!("cannot read image {}: {}", image_path.display(), e))
        })?;
        let content_type = image_content_type(image_path);

        let registered: RegisterUploadResponse = self
            .dispatcher
            .invoke_json(|ctx| {
                ApiRequest::post("/assets?action=registerUpload").json(json!({
                    "registerUploadRequest": {
                        "recipes": [FEEDSHARE_IMAGE_RECIPE],
                        "owner": ctx.author(),
                        "serviceRelationships": [
                            { "relationshipType": "OWNER", "identifier": "urn:li:userGeneratedContent" }
                        ],
                    }
                }))
            })
            .await?;
        let asset = registered.value.asset.clone();
        let upload_url = registered
            .value
            .upload_url()
            .ok_or_else(|| CoreError::InvalidResponse("register upload response has no upload URL".into()))?
            .to_string();
        debug!(%asset, bytes = data.len(), content_type, "Uploading image");

        self.dispatcher
            .invoke(|_| ApiRequest::put_absolute(upload_url.as_str()).bytes(content_type, data.clone()))
            .await?;

        let media = json!([{ "status": "READY", "media": asset }]);
        let response = self
            .dispatcher
            .invoke(|ctx| {
                ApiRequest::post("/ugcPosts").json(share_body(
                    &ctx.author(),
                    text,
                    MediaCategory::Image,
                    Some(media.clone()),
                    None,
                ))
            })
            .await?;
        Ok(ShareResult {
            post_id: response.restli_id,
        })
    }

    /// Delete a post by id or URN
    pub async fn delete_post(&self, post_ref: &str) -> Result<(), CoreError> {
        require_text(post_ref, "post reference")?;
        let post = self.dispatcher.normalize_reference(post_ref);
        self.dispatcher
            .invoke(|_| ApiRequest::delete(format!("/ugcPosts/{}", post.encoded())))
            .await?;
        info!(%post, "Deleted post");
        Ok(())
    }

    // ===== Social actions =====

    pub async fn like_post(&self, post_ref: &str) -> Result<(), CoreError> {
        require_text(post_ref, "post reference")?;
        let post = self.dispatcher.normalize_reference(post_ref);
        self.dispatcher
            .invoke(|ctx| {
                ApiRequest::post(format!("/socialActions/{}/likes", post.encoded()))
                    .json(json!({ "actor": ctx.author() }))
            })
            .await?;
        Ok(())
    }

    pub async fn unlike_post(&self, post_ref: &str) -> Result<(), CoreError> {
        require_text(post_ref, "post reference")?;
        let post = self.dispatcher.normalize_reference(post_ref);
        self.dispatcher
            .invoke(|ctx| {
                ApiRequest::delete(format!(
                    "/socialActions/{}/likes/{}",
                    post.encoded(),
                    ctx.author().encoded()
                ))
            })
            .await?;
        Ok(())
    }

    pub async fn comment_on_post(&self, post_ref: &str, text: &str) -> Result<CommentResult, CoreError> {
        require_text(post_ref, "post reference")?;
        require_text(text, "comment text")?;
        let post = self.dispatcher.normalize_reference(post_ref);
        let response = self
            .dispatcher
            .invoke(|ctx| {
                ApiRequest::post(format!("/socialActions/{}/comments", post.encoded())).json(json!({
                    "actor": ctx.author(),
                    "message": { "text": text },
                }))
            })
            .await?;
        Ok(CommentResult {
            comment_id: response.restli_id,
        })
    }

    // ===== Reading =====

    pub async fn get_post(&self, post_ref: &str) -> Result<UgcPost, CoreError> {
        require_text(post_ref, "post reference")?;
        let post = self.dispatcher.normalize_reference(post_ref);
        self.dispatcher
            .invoke_json(|_| ApiRequest::get(format!("/ugcPosts/{}", post.encoded())))
            .await
    }

    pub async fn get_post_comments(&self, post_ref: &str, count: u32) -> Result<Vec<PostComment>, CoreError> {
        require_text(post_ref, "post reference")?;
        let count = check_count(count)?;
        let post = self.dispatcher.normalize_reference(post_ref);
        let page: Elements<PostComment> = self
            .dispatcher
            .invoke_json(|_| ApiRequest::get(format!("/socialActions/{}/comments?count={}", post.encoded(), count)))
            .await?;
        Ok(page.elements)
    }

    pub async fn get_post_likes(&self, post_ref: &str, count: u32) -> Result<LikesPage, CoreError> {
        require_text(post_ref, "post reference")?;
        let count = check_count(count)?;
        let post = self.dispatcher.normalize_reference(post_ref);
        let page: Elements<PostLike> = self
            .dispatcher
            .invoke_json(|_| ApiRequest::get(format!("/socialActions/{}/likes?count={}", post.encoded(), count)))
            .await?;
        Ok(page.into())
    }

    /// Recent posts by the authorized member.
    /// Needs the `r_member_social` scope, which LinkedIn grants to partner apps only.
    pub async fn list_posts(&self, count: u32) -> Result<Vec<UgcPost>, CoreError> {
        let count = check_count(count)?;
        let page: Elements<UgcPost> = self
            .dispatcher
            .invoke_json(|ctx| {
                ApiRequest::get(format!(
                    "/ugcPosts?q=authors&authors=List({})&count={}",
                    ctx.author().encoded(),
                    count
                ))
            })
            .await?;
        Ok(page.elements)
    }

    /// Post, comments and likes fetched concurrently.
    pub async fn post_summary(&self, post_ref: &str, count: u32) -> Result<PostSummary, CoreError> {
        let (post, comments, likes) = futures::try_join!(
            self.get_post(post_ref),
            self.get_post_comments(post_ref, count),
            self.get_post_likes(post_ref, count),
        )?;
        Ok(PostSummary {
            post,
            comments,
            likes,
        })
    }

    // ===== Profile =====

    pub async fn user_info(&self) -> Result<UserInfo, CoreError> {
        self.dispatcher
            .invoke_json(|_| ApiRequest::get("/userinfo"))
            .await
    }

    pub async fn detailed_profile(&self) -> Result<DetailedProfile, CoreError> {
        self.dispatcher
            .invoke_json(|_| ApiRequest::get("/me?projection=(id,firstName,lastName,headline)"))
            .await
    }
}

fn share_body(
    author: &Urn,
    text: &str,
    category: MediaCategory,
    media: Option<Value>,
    reshared: Option<&Urn>,
) -> Value {
    let mut content = json!({
        "shareCommentary": { "text": text },
        "shareMediaCategory": category.as_str(),
    });
    if let Some(media) = media {
        content["media"] = media;
    }
    if let Some(original) = reshared {
        content["resharedShareUrn"] = json!(original);
    }

    json!({
        "author": author,
        "lifecycleState": "PUBLISHED",
        "specificContent": { "com.linkedin.ugc.ShareContent": content },
        "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" },
    })
}

fn require_text(value: &str, what: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::InvalidInput(format!("{} must not be empty", what)))
    } else {
        Ok(())
    }
}

fn check_count(count: u32) -> Result<u32, CoreError> {
    if (1..=MAX_PAGE_SIZE).contains(&count) {
        Ok(count)
    } else {
        Err(CoreError::InvalidInput(format!(
            "count must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, count
        )))
    }
}

fn image_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
