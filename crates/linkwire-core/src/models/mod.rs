//! Data models for LinkedIn entities.
//!
//! - `UgcPost`, `PostComment`, `PostLike`: content and engagement
//! - `ShareResult`, `CommentResult`, `PostSummary`: operation results
//! - `UserInfo`, `DetailedProfile`: the authorized member

pub mod post;
pub mod profile;

pub use post::{
    AuditStamp, CommentResult, Elements, LikesPage, Paging, PostComment, PostLike, PostSummary,
    RegisterUploadResponse, RegisteredUpload, ShareContent, ShareMedia, ShareResult, TextValue,
    UgcPost, UploadRequest,
};
pub use profile::{DetailedProfile, Locale, MultiLocaleString, UserInfo};
