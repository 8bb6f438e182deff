use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use lity::web::{self, AppState};
use lity::{Config, Database};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_PASSWORD: &str = "Password123";

fn create_test_db() -> Database {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let id: u32 = rng.gen();
    let name = format!("api_test_db_{}", id);

    let db = Database::open_memory(&name).expect("Failed to create test database");
    db.migrate().expect("Failed to run migrations");
    db
}

fn test_app() -> Router {
    let config = Config::default_for("Test Blog");
    let state = AppState::new(config, create_test_db()).expect("Failed to build state");
    web::router(Arc::new(state))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
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

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({
            "email": format!("{}@example.com", username),
            "username": username,
            "password": TEST_PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn create_post(app: &Router, token: &str, title: &str, published: bool) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/posts",
        Some(token),
        Some(json!({
            "title": title,
            "content": "Long enough content for a post.",
            "tags": ["#Rust", "rust", "Web "],
            "published": published,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_signup_sets_session_cookie() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "email": "cookie@example.com",
                "username": "cookie",
                "password": TEST_PASSWORD,
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn test_https_site_sets_secure_cookie() {
    let mut config = Config::default_for("Test Blog");
    config.site.url = "https://blog.example.com".to_string();
    let state = AppState::new(config, create_test_db()).expect("Failed to build state");
    let app = web::router(Arc::new(state));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "email": "secure@example.com",
                "username": "secure",
                "password": TEST_PASSWORD,
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.contains("Secure"));
}

#[tokio::test]
async fn test_non_numeric_ids_are_not_found() {
    let app = test_app();
    let token = signup(&app, "alice").await;

    let (status, body) = send(&app, Method::GET, "/posts/abc", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/posts/abc",
        Some(&token),
        Some(json!({ "title": "Whatever" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");

    let (status, body) = send(&app, Method::DELETE, "/posts/abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");

    let (status, body) = send(&app, Method::DELETE, "/comments/abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Comment not found");

    let (status, body) = send(&app, Method::GET, "/comments?postId=abc", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");
}

#[tokio::test]
async fn test_signup_rejects_weak_password() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({
            "email": "weak@example.com",
            "username": "weak",
            "password": "short",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_me_requires_session() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let token = signup(&app, "alice").await;
    let (status, body) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_signout_invalidates_token() {
    let app = test_app();
    let token = signup(&app, "alice").await;

    let (status, body) = send(&app, Method::POST, "/auth/signout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Signed out");

    let (status, _) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signin_lockout() {
    let app = test_app();
    signup(&app, "alice").await;

    let bad = json!({ "email": "alice@example.com", "password": "WrongPass456" });
    for _ in 0..5 {
        let (status, body) = send(&app, Method::POST, "/auth/signin", None, Some(bad.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    let good = json!({ "email": "alice@example.com", "password": TEST_PASSWORD });
    let (status, body) = send(&app, Method::POST, "/auth/signin", None, Some(good)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_post_flow() {
    let app = test_app();
    let token = signup(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/posts",
        None,
        Some(json!({ "title": "Nope", "content": "Long enough content." })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let post = create_post(&app, &token, "Hello World", true).await;
    assert_eq!(post["slug"], "hello-world");
    assert_eq!(post["published"], true);
    assert_eq!(post["author"]["username"], "alice");
    let tag_names: Vec<&str> = post["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(tag_names, vec!["rust", "web"]);

    let again = create_post(&app, &token, "Hello World", true).await;
    assert!(again["slug"].as_str().unwrap().starts_with("hello-world-"));

    let (status, body) = send(&app, Method::GET, "/posts/by-slug/hello-world", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], post["id"]);
}

#[tokio::test]
async fn test_create_post_validation() {
    let app = test_app();
    let token = signup(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/posts",
        Some(&token),
        Some(json!({ "title": "   ", "content": "Long enough content." })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title is required");

    let (status, body) = send(
        &app,
        Method::POST,
        "/posts",
        Some(&token),
        Some(json!({ "title": "Short", "content": "tiny" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Content must be at least 10 characters");

    let (status, body) = send(
        &app,
        Method::POST,
        "/posts",
        Some(&token),
        Some(json!({ "title": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_list_posts_filters() {
    let app = test_app();
    let token = signup(&app, "alice").await;
    create_post(&app, &token, "Rust Tips", true).await;
    create_post(&app, &token, "Draft Tips", false).await;

    let (status, body) = send(&app, Method::GET, "/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, Method::GET, "/posts?search=TIPS&tag=Rust", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Rust Tips");

    let (_, body) = send(&app, Method::GET, "/posts?tag=missing", None, None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_draft_hidden_from_others() {
    let app = test_app();
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let draft = create_post(&app, &alice, "Secret", false).await;
    let uri = format!("/posts/{}", draft["id"]);

    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Secret");
}

#[tokio::test]
async fn test_ownership_enforced() {
    let app = test_app();
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let post = create_post(&app, &alice, "Mine", true).await;
    let uri = format!("/posts/{}", post["id"]);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&bob),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&alice),
        Some(json!({ "title": "Renamed", "tags": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "renamed");
    assert!(body["tags"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Post deleted successfully");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_flow() {
    let app = test_app();
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let post = create_post(&app, &alice, "Open", true).await;
    let draft = create_post(&app, &alice, "Closed", false).await;

    let (status, body) = send(&app, Method::GET, "/comments", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "postId is required");

    let (status, _) = send(
        &app,
        Method::POST,
        "/comments",
        Some(&bob),
        Some(json!({ "postId": draft["id"], "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, comment) = send(
        &app,
        Method::POST,
        "/comments",
        Some(&bob),
        Some(json!({ "postId": post["id"], "content": "Nice post" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"]["username"], "bob");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/comments?postId={}", post["id"]),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let uri = format!("/comments/{}", comment["id"]);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment deleted");
}

#[tokio::test]
async fn test_tags_listing() {
    let app = test_app();
    let token = signup(&app, "alice").await;
    create_post(&app, &token, "Tagged", true).await;

    let (status, body) = send(&app, Method::GET, "/tags", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["rust", "web"]));
}

#[tokio::test]
async fn test_profile_update_and_view() {
    let app = test_app();
    let token = signup(&app, "alice").await;
    create_post(&app, &token, "Visible", true).await;
    create_post(&app, &token, "Hidden", false).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/profile",
        Some(&token),
        Some(json!({ "avatar": "not a url" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Avatar must be a valid URL");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/profile",
        Some(&token),
        Some(json!({ "bio": "Writer", "socialLink": "https://example.com/alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Writer");
    assert_eq!(body["socialLink"], "https://example.com/alice");

    let (status, body) = send(&app, Method::GET, "/profile/alice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Writer");
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert!(body.get("email").is_none());

    let (status, body) = send(&app, Method::GET, "/profile/ghost", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}
