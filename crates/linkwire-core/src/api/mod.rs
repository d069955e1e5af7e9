//! REST API access for LinkedIn.
//!
//! - `RequestDispatcher`: authenticated request choke point
//! - `LinkedInClient`: member operations (share, comment, like, read)
//! - `Urn`: canonical resource references
//!
//! Every call carries the session's bearer token and the Rest.li protocol
//! version header.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod urn;

pub use client::{LinkedInClient, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use dispatcher::{ApiRequest, ApiResponse, RequestBody, RequestDispatcher};
pub use error::CoreError;
pub use urn::{Urn, UrnKind, URN_PREFIX};
