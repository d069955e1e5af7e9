use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key of the share payload inside `specificContent`.
pub const SHARE_CONTENT_KEY: &str = "com.linkedin.ugc.ShareContent";

/// Key of the upload instructions inside a register-upload response.
pub const MEDIA_UPLOAD_KEY: &str = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UgcPost {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(rename = "lifecycleState", default)]
    pub lifecycle_state: Option<String>,
    #[serde(default)]
    pub created: Option<AuditStamp>,
    #[serde(rename = "specificContent", default)]
    pub specific_content: HashMap<String, ShareContent>,
}

impl UgcPost {
    pub fn share_content(&self) -> Option<&ShareContent> {
        self.specific_content.get(SHARE_CONTENT_KEY)
    }

    /// Commentary text, if the post has any.
    pub fn text(&self) -> Option<&str> {
        self.share_content()
            .and_then(|c| c.share_commentary.as_ref())
            .map(|c| c.text.as_str())
    }

    pub fn created_millis(&self) -> Option<i64> {
        self.created.as_ref().map(|c| c.time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStamp {
    pub time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareContent {
    #[serde(rename = "shareCommentary", default)]
    pub share_commentary: Option<TextValue>,
    #[serde(rename = "shareMediaCategory", default)]
    pub share_media_category: Option<String>,
    #[serde(default)]
    pub media: Vec<ShareMedia>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareMedia {
    #[serde(rename = "originalUrl", default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub media: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostComment {
    #[serde(default)]
    pub id: Option<String>,
    pub actor: String,
    #[serde(default)]
    pub created: Option<AuditStamp>,
    #[serde(default)]
    pub message: Option<TextValue>,
}

impl PostComment {
    pub fn text(&self) -> &str {
        self.message.as_ref().map(|m| m.text.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostLike {
    pub actor: String,
    #[serde(default)]
    pub created: Option<AuditStamp>,
}

/// Collection envelope returned by list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Elements<T> {
    #[serde(default = "Vec::new")]
    pub elements: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LikesPage {
    pub likes: Vec<PostLike>,
    /// Total reported by the API, or the page length when it reports none.
    pub total: u64,
}

impl From<Elements<PostLike>> for LikesPage {
    fn from(page: Elements<PostLike>) -> Self {
        let total = page
            .paging
            .and_then(|p| p.total)
            .unwrap_or(page.elements.len() as u64);
        Self {
            likes: page.elements,
            total,
        }
    }
}

/// Result of a create operation; the id comes from the `x-restli-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareResult {
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentResult {
    pub comment_id: Option<String>,
}

/// A post together with its engagement, fetched concurrently.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub post: UgcPost,
    pub comments: Vec<PostComment>,
    pub likes: LikesPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUploadResponse {
    pub value: RegisteredUpload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUpload {
    pub asset: String,
    #[serde(rename = "uploadMechanism")]
    pub upload_mechanism: HashMap<String, UploadRequest>,
}

impl RegisteredUpload {
    pub fn upload_url(&self) -> Option<&str> {
        self.upload_mechanism
            .get(MEDIA_UPLOAD_KEY)
            .map(|r| r.upload_url.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
}
