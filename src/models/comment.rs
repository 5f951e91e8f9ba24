//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reader comment on a post. Inactive comments are hidden from the site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub active: bool,
}

/// Raw comment form as submitted by a reader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub body: String,
}

/// Validated comment ready to be stored
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
}

impl CreateCommentInput {
    pub fn from_form(post_id: i64, form: &CommentForm) -> Self {
        Self {
            post_id,
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            body: form.body.trim().to_string(),
        }
    }
}

/// Comment as shown on a post page, with the commenter's avatar
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub avatar_url: String,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        let avatar_url = gravatar_url(&comment.email);
        Self {
            comment,
            avatar_url,
        }
    }
}

/// Gravatar image for an email address, falling back to the mystery person
pub fn gravatar_url(email: &str) -> String {
    let email = email.trim();
    if email.is_empty() {
        return "https://www.gravatar.com/avatar/?d=mp&s=80".to_string();
    }
    let hash = format!("{:x}", md5::compute(email.to_lowercase()));
    format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_url_hashes_normalized_email() {
        assert_eq!(
            gravatar_url(" MyEmailAddress@example.com "),
            "https://www.gravatar.com/avatar/0bc83cb571cd1c50ba6f3e8a78ef1346?d=mp&s=80"
        );
        assert_eq!(gravatar_url(""), "https://www.gravatar.com/avatar/?d=mp&s=80");
    }

    #[test]
    fn test_from_form_trims_fields() {
        let form = CommentForm {
            name: "  Ann ".to_string(),
            email: " ann@example.com".to_string(),
            body: "\nNice post\n".to_string(),
        };
        let input = CreateCommentInput::from_form(4, &form);
        assert_eq!(input.post_id, 4);
        assert_eq!(input.name, "Ann");
        assert_eq!(input.email, "ann@example.com");
        assert_eq!(input.body, "Nice post");
    }

    #[test]
    fn test_form_fields_default_to_empty() {
        let form: CommentForm = serde_json::from_str(r#"{"name":"Ann"}"#).unwrap();
        assert_eq!(form.name, "Ann");
        assert!(form.email.is_empty());
        assert!(form.body.is_empty());
    }
}
