//! Services layer
//!
//! Business rules on top of the repositories: validation, slug handling,
//! comment moderation, mail, and the cached aggregates shown on every page
//! (sidebar, sitemap, feed).

pub mod comment;
pub mod feed;
pub mod markdown;
pub mod password;
pub mod post;
pub mod share;
pub mod sidebar;
pub mod sitemap;
pub mod tag;
pub mod user;
pub mod validation;

pub use comment::{CommentOutcome, CommentService, CommentServiceError};
pub use feed::FeedService;
pub use markdown::{plain_text, truncate_words, MarkdownRenderer};
pub use password::{hash_password, verify_password};
pub use post::{PostList, PostService, PostServiceError};
pub use share::{
    create_mailer, ConsoleMailer, Mailer, OutgoingMail, ShareForm, ShareService,
    ShareServiceError, SmtpMailer,
};
pub use sidebar::{SidebarContext, SidebarPost, SidebarService};
pub use sitemap::SitemapService;
pub use tag::{TagService, TagServiceError};
pub use user::{UserService, UserServiceError};
pub use validation::FieldErrors;

use crate::cache::{CacheLayer, SharedCache};

/// Prefix of every sidebar cache key
pub const SIDEBAR_CACHE_PREFIX: &str = "sidebar:";
pub const SITEMAP_CACHE_KEY: &str = "sitemap";
pub const FEED_CACHE_KEY: &str = "feed";

/// Drop every cached value derived from posts or comments.
///
/// Failures are logged; a stale entry expires with its TTL anyway.
pub async fn invalidate_post_caches(cache: &SharedCache) {
    let sidebar = format!("{}*", SIDEBAR_CACHE_PREFIX);
    if let Err(e) = cache.delete_pattern(&sidebar).await {
        tracing::warn!("Failed to invalidate sidebar cache: {}", e);
    }
    for key in [SITEMAP_CACHE_KEY, FEED_CACHE_KEY] {
        if let Err(e) = cache.delete(key).await {
            tracing::warn!("Failed to invalidate {} cache: {}", key, e);
        }
    }
}
