//! User service
//!
//! Account creation and session-based authentication for staff users.
//! Accounts are keyed by email; logging in accepts either the email or the
//! username.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{timestamp_now, CreateUserInput, Session, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::validation::{is_valid_email, normalize_email};
use anyhow::Context;
use std::sync::Arc;

const DEFAULT_SESSION_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_days(user_repo, session_repo, DEFAULT_SESSION_DAYS)
    }

    pub fn with_session_days(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_days,
        }
    }

    /// Create a regular account. Staff and superuser flags default to off.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        self.create(input, false).await
    }

    /// Create an account with staff and superuser flags defaulting to on.
    pub async fn create_superuser(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        self.create(input, true).await
    }

    async fn create(&self, input: CreateUserInput, elevated: bool) -> Result<User, UserServiceError> {
        let email = normalize_email(&input.email);
        if email.is_empty() || !is_valid_email(&email) {
            return Err(UserServiceError::ValidationError(
                "Valid e-mail address not provided!".to_string(),
            ));
        }
        if input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password is required".to_string(),
            ));
        }

        // Username falls back to the email's local part
        let username = match input.username.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            name => name.to_string(),
        };

        if self.user_repo.exists(&email, &username).await? {
            return Err(UserServiceError::UserExists(format!(
                "{} / {}",
                email, username
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User {
            id: 0,
            email,
            username,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            mobile_number: input.mobile_number.trim().to_string(),
            password_hash,
            is_active: true,
            is_staff: input.is_staff.unwrap_or(elevated),
            is_superuser: input.is_superuser.unwrap_or(elevated),
            date_joined: timestamp_now(),
        };

        let created = self.user_repo.create(&user).await?;
        tracing::info!(
            "Created user {} (staff: {}, superuser: {})",
            created.email,
            created.is_staff,
            created.is_superuser
        );
        Ok(created)
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, login: &str, password: &str) -> Result<Session, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid login or password".to_string());

        let user = self.find_by_login(login).await?.ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!("Rejected password for user {}", user.id);
            return Err(invalid());
        }
        if !user.is_active {
            return Err(UserServiceError::AuthenticationError(
                "This account is inactive".to_string(),
            ));
        }

        let session = Session::issue(user.id, self.session_days);
        self.session_repo
            .create(&session)
            .await
            .context("Failed to store session")?;
        Ok(session)
    }

    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User behind a live session token; expired sessions are removed
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self.session_repo.get_by_id(token).await? else {
            return Ok(None);
        };

        if session.is_expired() {
            self.session_repo.delete(token).await?;
            return Ok(None);
        }

        let user = self.user_repo.get_by_id(session.user_id).await?;
        Ok(user.filter(|u| u.is_active))
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self.session_repo.delete_expired().await?;
        if removed > 0 {
            tracing::info!("Removed {} expired session(s)", removed);
        }
        Ok(removed)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await?)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, UserServiceError> {
        let login = login.trim();
        if login.contains('@') {
            if let Some(user) = self.user_repo.get_by_email(&normalize_email(login)).await? {
                return Ok(Some(user));
            }
        }
        Ok(self.user_repo.get_by_username(login).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn service() -> (UserService, Arc<dyn SessionRepository>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        (
            UserService::new(SqlxUserRepository::boxed(pool), sessions.clone()),
            sessions,
        )
    }

    fn input(email: &str, username: &str) -> CreateUserInput {
        CreateUserInput {
            email: email.to_string(),
            username: username.to_string(),
            password: "pa55word".to_string(),
            first_name: "Jane".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_user_defaults() {
        let (svc, _) = service().await;
        let user = svc.create_user(input("Jane@Example.COM", "jane")).await.unwrap();
        assert_eq!(user.email, "Jane@example.com");
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_create_superuser_sets_flags() {
        let (svc, _) = service().await;
        let admin = svc.create_superuser(input("root@example.com", "root")).await.unwrap();
        assert!(admin.is_staff);
        assert!(admin.is_superuser);
    }

    #[tokio::test]
    async fn test_missing_email_rejected() {
        let (svc, _) = service().await;
        let err = svc.create_user(input("", "nobody")).await.unwrap_err();
        match err {
            UserServiceError::ValidationError(msg) => {
                assert_eq!(msg, "Valid e-mail address not provided!")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_rejected_and_username_defaults() {
        let (svc, _) = service().await;
        let user = svc.create_user(input("sam@example.com", "")).await.unwrap();
        assert_eq!(user.username, "sam");

        let err = svc.create_user(input("sam@example.com", "other")).await.unwrap_err();
        assert!(matches!(err, UserServiceError::UserExists(_)));
    }

    #[tokio::test]
    async fn test_login_by_email_or_username() {
        let (svc, _) = service().await;
        let user = svc.create_superuser(input("ed@example.com", "ed")).await.unwrap();

        let by_email = svc.login("ed@EXAMPLE.com", "pa55word").await.unwrap();
        let by_name = svc.login("ed", "pa55word").await.unwrap();
        assert_ne!(by_email.id, by_name.id);

        let resolved = svc.validate_session(&by_email.id).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        assert!(matches!(
            svc.login("ed", "wrong").await,
            Err(UserServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            svc.login("ghost", "pa55word").await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let (svc, _) = service().await;
        svc.create_user(input("lo@example.com", "lo")).await.unwrap();
        let session = svc.login("lo", "pa55word").await.unwrap();

        svc.logout(&session.id).await.unwrap();
        assert!(svc.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_cleaned() {
        let (svc, sessions) = service().await;
        let user = svc.create_user(input("ex@example.com", "ex")).await.unwrap();

        let mut stale = Session::issue(user.id, 1);
        stale.expires_at = Utc::now() - Duration::minutes(5);
        sessions.create(&stale).await.unwrap();

        assert!(svc.validate_session(&stale.id).await.unwrap().is_none());
        assert!(sessions.get_by_id(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let (svc, sessions) = service().await;
        let user = svc.create_user(input("cl@example.com", "cl")).await.unwrap();
        let mut stale = Session::issue(user.id, 1);
        stale.expires_at = Utc::now() - Duration::days(2);
        sessions.create(&stale).await.unwrap();
        svc.login("cl", "pa55word").await.unwrap();

        assert_eq!(svc.cleanup_expired_sessions().await.unwrap(), 1);
    }
}
