//! Data models
//!
//! Database entities (User, Session, Post, Comment, Tag), the input types
//! accepted by the services, and the pagination containers shared by list
//! views and the admin API.

mod comment;
mod pagination;
mod post;
mod session;
mod tag;
mod user;

pub use comment::{gravatar_url, Comment, CommentForm, CommentView, CreateCommentInput};
pub use pagination::{ListParams, PageInfo, PagedResult};
pub use post::{slugify, CreatePostInput, Post, PostStatus, PostSummary, UpdatePostInput};
pub use session::Session;
pub use tag::{Tag, TagWithCount};
pub use user::{CreateUserInput, User};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to whole seconds.
///
/// Every stored timestamp goes through here so that text comparisons on
/// SQLite columns order the same way as the instants they encode.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
