//! Tag model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Tag {
    /// Public list path for posts with this tag
    pub fn url(&self) -> String {
        format!("/blog/tag/{}/", self.slug)
    }
}

/// Tag with the number of published posts carrying it, for the tag cloud
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagWithCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub tag: Tag,
    pub post_count: i64,
}
