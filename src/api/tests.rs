use super::*;
use crate::config::Config;
use crate::db::{create_test_pool, migrations};
use crate::models::{CommentForm, CreatePostInput, CreateUserInput, PostStatus, PostSummary, User};
use crate::services::{Mailer, OutgoingMail};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("connection refused");
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    mailer: Arc<RecordingMailer>,
    staff: User,
}

async fn setup_with_mailer(mailer: RecordingMailer) -> TestApp {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();

    let mut config = Config::default();
    config.site.name = "Jazz Notes".to_string();
    config.site.base_url = "https://blog.example.com".to_string();

    let mailer = Arc::new(mailer);
    let state = AppState::new(&config, pool, mailer.clone()).unwrap();
    let staff = state
        .user_service
        .create_superuser(CreateUserInput {
            email: "ann@example.com".to_string(),
            username: "ann".to_string(),
            password: "s3cret-pass".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    TestApp {
        router: build_router(state.clone()),
        state,
        mailer,
        staff,
    }
}

async fn setup() -> TestApp {
    setup_with_mailer(RecordingMailer::default()).await
}

impl TestApp {
    async fn post(&self, title: &str, day: u32, status: PostStatus, tags: &[&str]) -> PostSummary {
        self.state
            .post_service
            .create(
                self.staff.id,
                CreatePostInput {
                    title: title.to_string(),
                    body: format!("All about **{}**.", title),
                    publish: Some(Utc.with_ymd_and_hms(2024, 3, day, 10, 30, 0).unwrap()),
                    status,
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, String) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, form: &str) -> (StatusCode, String) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, headers, text) = self.send(request).await;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap()
        };
        (status, headers, value)
    }

    async fn login(&self, login: &str, password: &str) -> String {
        let (status, _, body) = self
            .json(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "login": login, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }
}

// ============================================================================
// Pages
// ============================================================================

#[tokio::test]
async fn test_root_redirects_to_blog() {
    let app = setup().await;
    let (status, headers, _) = app.get("/").await;
    assert_eq!(status, StatusCode::PERMANENT_REDIRECT);
    assert_eq!(headers[header::LOCATION], "/blog/");
}

#[tokio::test]
async fn test_post_list_paginates_published_posts() {
    let app = setup().await;
    for day in 1..=4 {
        app.post(&format!("Post {}", day), day, PostStatus::Published, &[])
            .await;
    }
    app.post("Unfinished", 5, PostStatus::Draft, &[]).await;

    let listed = |day: u32| {
        format!(
            r#"<h2><a href="/blog/2024/03/{:02}/post-{}/">Post {}</a></h2>"#,
            day, day, day
        )
    };

    let (status, _, html) = app.get("/blog/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(&listed(4)));
    assert!(html.contains(&listed(3)));
    assert!(html.contains(&listed(2)));
    assert!(!html.contains(&listed(1)));
    assert!(!html.contains("Unfinished"));
    assert!(html.contains("Page 1 of 2."));
    assert!(html.find(&listed(4)).unwrap() < html.find(&listed(3)).unwrap());
    assert!(html.contains("I've written 4 posts so far."));

    let (_, _, html) = app.get("/blog/?page=abc").await;
    assert!(html.contains("Page 1 of 2."));
    assert!(html.contains(&listed(4)));

    for page in ["99", "0", "-1"] {
        let (status, _, html) = app.get(&format!("/blog/?page={}", page)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Page 2 of 2."), "page={}", page);
        assert!(html.contains(&listed(1)), "page={}", page);
        assert!(!html.contains(&listed(4)), "page={}", page);
    }
}

#[tokio::test]
async fn test_empty_blog_is_one_page() {
    let app = setup().await;
    let (status, _, html) = app.get("/blog/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("There are no posts yet."));
    assert!(html.contains("Page 1 of 1."));
}

#[tokio::test]
async fn test_post_list_by_tag() {
    let app = setup().await;
    app.post("Gypsy Swing", 1, PostStatus::Published, &["jazz"]).await;
    app.post("Delta Blues", 2, PostStatus::Published, &["blues"]).await;

    let (status, _, html) = app.get("/blog/tag/jazz/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"Posts tagged with "jazz""#));
    assert!(html.contains("Gypsy Swing"));
    assert!(!html.contains("<h2><a href=\"/blog/2024/03/02/delta-blues/\">"));

    let (status, _, html) = app.get("/blog/tag/polka/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Page not found"));
}

#[tokio::test]
async fn test_post_detail() {
    let app = setup().await;
    let post = app
        .post("Django Reinhardt", 9, PostStatus::Published, &["jazz"])
        .await;
    app.post("Stephane Grappelli", 10, PostStatus::Published, &["jazz"])
        .await;
    app.post("Secret", 9, PostStatus::Draft, &[]).await;
    app.state
        .comment_service
        .submit(
            post.post.id,
            &CommentForm {
                name: "Eve".to_string(),
                email: "eve@example.com".to_string(),
                body: "Great <b>guitar</b> player".to_string(),
            },
        )
        .await
        .unwrap();

    let (status, _, html) = app.get("/blog/2024/03/09/django-reinhardt/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<h1>Django Reinhardt</h1>"));
    assert!(html.contains("<strong>Django Reinhardt</strong>"));
    assert!(html.contains("Published Mar 9, 2024 by Ann Lee"));
    assert!(html.contains("1 comment</h2>"));
    assert!(html.contains("Great &lt;b&gt;guitar&lt;&#x2F;b&gt; player"));
    assert!(html.contains("https://www.gravatar.com/avatar/"));
    assert!(html.contains(r#"<a href="/blog/2024/03/10/stephane-grappelli/">Stephane Grappelli</a>"#));
    assert!(html.contains(r#"action="/blog/1/comment/""#));

    for uri in [
        "/blog/2024/03/08/django-reinhardt/",
        "/blog/2024/03/09/secret/",
        "/blog/2024/march/09/django-reinhardt/",
    ] {
        let (status, _, _) = app.get(uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_comment_submission() {
    let app = setup().await;
    let post = app.post("Swing", 9, PostStatus::Published, &[]).await;
    let uri = format!("/blog/{}/comment/", post.post.id);

    let (status, html) = app
        .post_form(&uri, "name=Eve&email=eve%40example.com&body=Lovely+post")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Your comment has been added."));
    assert!(html.contains(r#"<a href="/blog/2024/03/09/swing/">Back to the post</a>"#));

    let (status, html) = app.post_form(&uri, "name=Eve&email=not-an-email&body=").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Enter a valid email address."));
    assert!(html.contains("This field is required."));
    assert!(html.contains(r#"value="Eve""#));

    let comments = app.state.comment_service.active_for_post(post.post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].body, "Lovely post");

    let (_, _, html) = app.get("/blog/2024/03/09/swing/").await;
    assert!(html.contains("1 comment</h2>"));
}

#[tokio::test]
async fn test_comment_requires_post_and_published_post() {
    let app = setup().await;
    let draft = app.post("Draft", 9, PostStatus::Draft, &[]).await;
    let form = "name=Eve&email=eve%40example.com&body=Hi";

    let (status, _) = app.post_form("/blog/999/comment/", form).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .post_form(&format!("/blog/{}/comment/", draft.post.id), form)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post_form("/blog/abc/comment/", form).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_get_is_method_not_allowed() {
    let app = setup().await;
    let post = app.post("Swing", 9, PostStatus::Published, &[]).await;
    let (status, _, _) = app.get(&format!("/blog/{}/comment/", post.post.id)).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_share_post() {
    let app = setup().await;
    let post = app.post("Swing", 9, PostStatus::Published, &[]).await;
    let uri = format!("/blog/{}/share/", post.post.id);

    let (status, _, html) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"Share "Swing" by e-mail"#));

    let (status, html) = app
        .post_form(
            &uri,
            "name=Ann&email=ann%40example.com&to=bob%40example.com&comments=Must+read",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("E-mail successfully sent"));
    assert!(html.contains("was successfully sent to bob@example.com"));

    let sent = app.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "bob@example.com");
    assert_eq!(sent[0].subject, "Ann recommends you read Swing");
    assert!(sent[0]
        .body
        .contains("https://blog.example.com/blog/2024/03/09/swing/"));
}

#[tokio::test]
async fn test_share_invalid_form_sends_nothing() {
    let app = setup().await;
    let post = app.post("Swing", 9, PostStatus::Published, &[]).await;

    let (status, html) = app
        .post_form(
            &format!("/blog/{}/share/", post.post.id),
            "name=Ann&email=ann%40example.com&to=nobody",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Enter a valid email address."));
    assert!(!html.contains("E-mail successfully sent"));
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_share_delivery_failure_is_reported() {
    let app = setup_with_mailer(RecordingMailer {
        fail: true,
        ..Default::default()
    })
    .await;
    let post = app.post("Swing", 9, PostStatus::Published, &[]).await;

    let (status, html) = app
        .post_form(
            &format!("/blog/{}/share/", post.post.id),
            "name=Ann&email=ann%40example.com&to=bob%40example.com",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("The e-mail could not be sent."));
}

#[tokio::test]
async fn test_share_unknown_post() {
    let app = setup().await;
    let (status, _, html) = app.get("/blog/42/share/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Page not found"));
}

#[tokio::test]
async fn test_unknown_path_renders_404_page() {
    let app = setup().await;
    let (status, headers, html) = app.get("/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(html.contains("The page you requested does not exist."));
    assert!(html.contains("Jazz Notes"));
}

#[tokio::test]
async fn test_sitemap() {
    let app = setup().await;
    app.post("Swing", 9, PostStatus::Published, &[]).await;
    app.post("Hidden", 9, PostStatus::Draft, &[]).await;

    let (status, headers, xml) = app.get("/sitemap.xml").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/xml");
    assert!(xml.contains("<loc>https://blog.example.com/blog/2024/03/09/swing/</loc>"));
    assert!(xml.contains("<changefreq>weekly</changefreq>"));
    assert!(!xml.contains("hidden"));
}

#[tokio::test]
async fn test_feed() {
    let app = setup().await;
    app.post("Swing", 9, PostStatus::Published, &[]).await;

    let (status, headers, xml) = app.get("/blog/feed/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/atom+xml"));
    assert!(xml.contains("Jazz Notes"));
    assert!(xml.contains("https://blog.example.com/blog/2024/03/09/swing/"));
}

#[tokio::test]
async fn test_new_comment_refreshes_cached_sidebar() {
    let app = setup().await;
    let post = app.post("Swing", 9, PostStatus::Published, &[]).await;

    let (_, _, html) = app.get("/blog/").await;
    assert!(!html.contains("Swing</a> (1)"));

    app.post_form(
        &format!("/blog/{}/comment/", post.post.id),
        "name=Eve&email=eve%40example.com&body=Hi",
    )
    .await;
    let (_, _, html) = app.get("/blog/").await;
    assert!(html.contains("Swing</a> (1)"));
}

// ============================================================================
// Auth API
// ============================================================================

#[tokio::test]
async fn test_login_sets_cookie_and_returns_token() {
    let app = setup().await;
    let (status, headers, body) = app
        .json(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "s3cret-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    let cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("session={};", token)));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(body["user"]["email"], "ann@example.com");
    assert_eq!(body["user"]["is_staff"], true);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let app = setup().await;
    let (status, _, body) = app
        .json(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "login": "ann", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_me_and_logout() {
    let app = setup().await;
    let token = app.login("ann", "s3cret-pass").await;

    let (status, _, body) = app.json(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ann");
    assert_eq!(body["full_name"], "Ann Lee");

    let request = Request::get("/api/v1/auth/me")
        .header(header::COOKIE, format!("session={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) = app
        .json(Method::POST, "/api/v1/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(headers[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));

    let (status, _, _) = app.json(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_session() {
    let app = setup().await;
    let (status, _, body) = app.json(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    let (status, _, _) = app
        .json(Method::GET, "/api/v1/auth/me", Some("bogus"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Admin API
// ============================================================================

#[tokio::test]
async fn test_admin_requires_staff() {
    let app = setup().await;
    app.state
        .user_service
        .create_user(CreateUserInput {
            email: "reader@example.com".to_string(),
            password: "reader-pass".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let (status, _, _) = app.json(Method::GET, "/api/v1/admin/posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login("reader@example.com", "reader-pass").await;
    let (status, _, body) = app
        .json(Method::GET, "/api/v1/admin/posts", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_admin_post_lifecycle() {
    let app = setup().await;
    let token = app.login("ann", "s3cret-pass").await;

    let (status, _, created) = app
        .json(
            Method::POST,
            "/api/v1/admin/posts",
            Some(&token),
            Some(json!({
                "title": "Hot Club",
                "body": "Quintette du *Hot Club* de France",
                "publish": "2024-03-09T10:30:00Z",
                "tags": ["jazz", "paris"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "hot-club");
    assert_eq!(created["status"], "draft");
    assert_eq!(created["author_name"], "Ann Lee");
    assert_eq!(created["tags"].as_array().unwrap().len(), 2);
    let id = created["id"].as_i64().unwrap();

    let (_, _, drafts) = app
        .json(Method::GET, "/api/v1/admin/posts?status=draft", Some(&token), None)
        .await;
    assert_eq!(drafts["total"], 1);
    let (status, _, _) = app
        .json(Method::GET, "/api/v1/admin/posts?status=bogus", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, updated) = app
        .json(
            Method::PUT,
            &format!("/api/v1/admin/posts/{}", id),
            Some(&token),
            Some(json!({ "title": "The Hot Club", "status": "published" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "The Hot Club");
    assert_eq!(updated["status"], "published");

    let (status, _, _) = app.get("/blog/2024/03/09/hot-club/").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, fetched) = app
        .json(Method::GET, &format!("/api/v1/admin/posts/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["url"], "/blog/2024/03/09/hot-club/");

    let (status, _, _) = app
        .json(Method::DELETE, &format!("/api/v1/admin/posts/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, body) = app
        .json(Method::DELETE, &format!("/api/v1/admin/posts/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_admin_create_validation_and_conflict() {
    let app = setup().await;
    let token = app.login("ann", "s3cret-pass").await;
    let body = json!({ "title": "Swing", "publish": "2024-03-09T10:30:00Z" });

    let (status, _, _) = app
        .json(Method::POST, "/api/v1/admin/posts", Some(&token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, err) = app
        .json(Method::POST, "/api/v1/admin/posts", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFLICT");
    assert_eq!(err["error"]["details"]["field"], "slug");
    assert_eq!(err["error"]["details"]["slug"], "swing");
    assert_eq!(err["error"]["details"]["publish_date"], "2024-03-09");

    let (status, _, err) = app
        .json(
            Method::POST,
            "/api/v1/admin/posts",
            Some(&token),
            Some(json!({ "title": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_admin_publish() {
    let app = setup().await;
    let token = app.login("ann", "s3cret-pass").await;
    let draft = app.post("Later", 9, PostStatus::Draft, &[]).await;

    let (status, _, body) = app
        .json(
            Method::POST,
            &format!("/api/v1/admin/posts/{}/publish", draft.post.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "published");
}

#[tokio::test]
async fn test_admin_comment_moderation() {
    let app = setup().await;
    let token = app.login("ann", "s3cret-pass").await;
    let post = app.post("Swing", 9, PostStatus::Published, &["jazz"]).await;
    let outcome = app
        .state
        .comment_service
        .submit(
            post.post.id,
            &CommentForm {
                name: "Spammer".to_string(),
                email: "spam@example.com".to_string(),
                body: "Buy now".to_string(),
            },
        )
        .await
        .unwrap();
    let comment_id = outcome.comment.unwrap().id;

    let (status, _, hidden) = app
        .json(
            Method::PUT,
            &format!("/api/v1/admin/comments/{}", comment_id),
            Some(&token),
            Some(json!({ "active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hidden["active"], false);

    let (_, _, html) = app.get("/blog/2024/03/09/swing/").await;
    assert!(!html.contains("Buy now"));

    let (_, _, inactive) = app
        .json(Method::GET, "/api/v1/admin/comments?active=false", Some(&token), None)
        .await;
    assert_eq!(inactive["total"], 1);
    let (_, _, active) = app
        .json(Method::GET, "/api/v1/admin/comments?active=true", Some(&token), None)
        .await;
    assert_eq!(active["total"], 0);

    let (status, _, _) = app
        .json(
            Method::DELETE,
            &format!("/api/v1/admin/comments/{}", comment_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = app
        .json(
            Method::PUT,
            &format!("/api/v1/admin/comments/{}", comment_id),
            Some(&token),
            Some(json!({ "active": true })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, tags) = app
        .json(Method::GET, "/api/v1/admin/tags", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags[0]["slug"], "jazz");
    assert_eq!(tags[0]["post_count"], 1);
}
