//! Integration tests for the public site and the admin panel.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use marques::commands::user::add_user;
use marques::content::{EntryDraft, EntryKind};
use marques::data::Role;
use marques::server::{create_router, AppState};
use marques::Site;

const ADMIN_PASSWORD: &str = "admin-password";
const EDITOR_PASSWORD: &str = "editor-password";
const BOUNDARY: &str = "marques-test-boundary";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct TestSite {
    _dir: TempDir,
    state: AppState,
    router: Router,
}

fn draft(title: &str, slug: &str, status: &str) -> EntryDraft {
    EntryDraft {
        title: title.to_string(),
        slug: slug.to_string(),
        status: status.to_string(),
        body: format!("Body of {}.", title),
        ..EntryDraft::default()
    }
}

/// A site with one page, two published posts, a draft, an admin and an editor
fn create_test_site() -> TestSite {
    create_test_site_with_config(None)
}

/// Same as [`create_test_site`], with `config` written to `marques.yml` first
fn create_test_site_with_config(config: Option<&str>) -> TestSite {
    let dir = TempDir::new().unwrap();
    if let Some(config) = config {
        std::fs::write(dir.path().join("marques.yml"), config).unwrap();
    }
    let site = Site::new(dir.path()).unwrap();
    site.registry().ensure_dirs().unwrap();

    let data = Arc::new(site.open_data().unwrap());
    add_user(&data, "admin", Role::Admin, Some(ADMIN_PASSWORD.to_string()), 16).unwrap();
    add_user(&data, "editor", Role::Editor, Some(EDITOR_PASSWORD.to_string()), 16).unwrap();

    let state = AppState::new(site, data).unwrap();
    state
        .content
        .save(EntryKind::Page, &draft("About Us", "about", "published"), None)
        .unwrap();
    state
        .content
        .save(EntryKind::Post, &draft("First Post", "first-post", "published"), None)
        .unwrap();
    state
        .content
        .save(EntryKind::Post, &draft("Second Post", "second-post", "published"), None)
        .unwrap();
    state
        .content
        .save(EntryKind::Post, &draft("Secret Draft", "secret-draft", "draft"), None)
        .unwrap();

    let router = create_router(state.clone());
    TestSite {
        _dir: dir,
        state,
        router,
    }
}

impl TestSite {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, cookie: Option<&str>, form: &[(&str, &str)]) -> Response {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    async fn post_multipart(
        &self,
        uri: &str,
        cookie: &str,
        csrf_token: Option<&str>,
        file: Option<(&str, &[u8])>,
    ) -> Response {
        let mut body: Vec<u8> = Vec::new();
        if let Some(token) = csrf_token {
            body.extend_from_slice(
                format!(
                    "--{b}\r\nContent-Disposition: form-data; name=\"csrf_token\"\r\n\r\n{t}\r\n",
                    b = BOUNDARY,
                    t = token
                )
                .as_bytes(),
            );
        }
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{n}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    b = BOUNDARY,
                    n = name
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Log in and return the session cookie and the session's CSRF token
    async fn login(&self, username: &str, password: &str) -> (String, String) {
        let form = self.get("/admin/login", None).await;
        assert_eq!(form.status(), StatusCode::OK);
        let login_token = cookie_from(&form, "marques_login_csrf").unwrap();
        let login_cookie = format!("marques_login_csrf={}", login_token);

        let response = self
            .post_form(
                "/admin/login",
                Some(&login_cookie),
                &[
                    ("username", username),
                    ("password", password),
                    ("csrf_token", &login_token),
                    ("next", "/admin"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let token = cookie_from(&response, "marques_session").unwrap();
        let csrf = self.state.sessions.get(&token).unwrap().csrf_token;
        (format!("marques_session={}", token), csrf)
    }
}

fn encode(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, percent_encoding::NON_ALPHANUMERIC).to_string()
}

fn cookie_from(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix(&prefix))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =============================================================================
// PUBLIC SITE
// =============================================================================

#[tokio::test]
async fn test_home_lists_published_posts() {
    let site = create_test_site();

    let response = site.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("First Post"));
    assert!(body.contains("Second Post"));
    assert!(!body.contains("Secret Draft"));
}

#[tokio::test]
async fn test_post_and_page_render() {
    let site = create_test_site();

    let post = site.get("/blog/first-post", None).await;
    assert_eq!(post.status(), StatusCode::OK);
    assert!(body_text(post).await.contains("Body of First Post."));

    let page = site.get("/about", None).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("About Us"));
}

#[tokio::test]
async fn test_drafts_are_not_public() {
    let site = create_test_site();

    let response = site.get("/blog/secret-draft", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_path_renders_themed_404() {
    let site = create_test_site();

    let response = site.get("/no-such-page", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page not found"));
}

#[tokio::test]
async fn test_blog_page_out_of_range() {
    let site = create_test_site();

    assert_eq!(site.get("/blog?page=1", None).await.status(), StatusCode::OK);
    assert_eq!(
        site.get("/blog?page=9", None).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        site.get("/blog?page=zero", None).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_url_mapping_redirects() {
    let site = create_test_site();

    let response = site.get("/index.html", None).await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/");

    let response = site.get("/feed?utm=x", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/blog?utm=x");
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[tokio::test]
async fn test_admin_requires_login() {
    let site = create_test_site();

    let response = site.get("/admin/posts", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login?next=%2Fadmin%2Fposts");
}

#[tokio::test]
async fn test_login_and_dashboard() {
    let site = create_test_site();
    let (cookie, _) = site.login("admin", ADMIN_PASSWORD).await;

    let response = site.get("/admin", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("admin"));
}

#[tokio::test]
async fn test_failed_login() {
    let site = create_test_site();
    let form = site.get("/admin/login", None).await;
    let token = cookie_from(&form, "marques_login_csrf").unwrap();

    let response = site
        .post_form(
            "/admin/login",
            Some(&format!("marques_login_csrf={}", token)),
            &[
                ("username", "admin"),
                ("password", "wrong password"),
                ("csrf_token", &token),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(cookie_from(&response, "marques_session").is_none());
    assert!(body_text(response).await.contains("Invalid username or password."));
}

#[tokio::test]
async fn test_login_without_csrf_cookie_is_forbidden() {
    let site = create_test_site();

    let response = site
        .post_form(
            "/admin/login",
            None,
            &[
                ("username", "admin"),
                ("password", ADMIN_PASSWORD),
                ("csrf_token", "forged"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let site = create_test_site();
    let (cookie, csrf) = site.login("admin", ADMIN_PASSWORD).await;

    let response = site
        .post_form("/admin/logout", Some(&cookie), &[("csrf_token", &csrf)])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = site.get("/admin", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

// =============================================================================
// ADMIN ACTIONS
// =============================================================================

#[tokio::test]
async fn test_state_change_without_csrf_is_forbidden() {
    let site = create_test_site();
    let (cookie, _) = site.login("admin", ADMIN_PASSWORD).await;

    let response = site
        .post_form(
            "/admin/posts",
            Some(&cookie),
            &[("title", "Sneaky"), ("csrf_token", "not-the-token")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(site
        .state
        .content
        .get(EntryKind::Post, "sneaky")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_editor_cannot_manage_users() {
    let site = create_test_site();
    let (cookie, _) = site.login("editor", EDITOR_PASSWORD).await;

    assert_eq!(
        site.get("/admin/users", Some(&cookie)).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        site.get("/admin/settings", Some(&cookie)).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        site.get("/admin/posts", Some(&cookie)).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_create_post_and_rename_adds_redirect() {
    let site = create_test_site();
    let (cookie, csrf) = site.login("admin", ADMIN_PASSWORD).await;

    let response = site
        .post_form(
            "/admin/posts",
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("title", "Launch Notes"),
                ("status", "published"),
                ("tags", "news, release"),
                ("body", "We shipped."),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/posts?notice=created");
    assert_eq!(
        site.get("/blog/launch-notes", None).await.status(),
        StatusCode::OK
    );

    let response = site
        .post_form(
            "/admin/posts/launch-notes",
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("title", "Launch Notes"),
                ("slug", "launch"),
                ("status", "published"),
                ("body", "We shipped."),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = site.get("/blog/launch-notes", None).await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/blog/launch");
    assert_eq!(site.get("/blog/launch", None).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_post_rerenders_form() {
    let site = create_test_site();
    let (cookie, csrf) = site.login("editor", EDITOR_PASSWORD).await;

    let response = site
        .post_form(
            "/admin/posts",
            Some(&cookie),
            &[("csrf_token", &csrf), ("title", ""), ("body", "kept text")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("kept text"));
}

#[tokio::test]
async fn test_last_admin_cannot_be_deleted_or_demoted() {
    let site = create_test_site();
    let (cookie, csrf) = site.login("admin", ADMIN_PASSWORD).await;
    let admin = site.state.data.user_by_username("admin").unwrap().unwrap();

    let response = site
        .post_form(
            &format!("/admin/users/{}/delete", admin.id),
            Some(&cookie),
            &[("csrf_token", &csrf)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = site
        .post_form(
            &format!("/admin/users/{}", admin.id),
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("username", "admin"),
                ("role", "editor"),
                ("password", ""),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        site.state.data.user(admin.id).unwrap().unwrap().role,
        Role::Admin
    );
}

#[tokio::test]
async fn test_password_change_ends_user_sessions() {
    let site = create_test_site();
    let (admin_cookie, csrf) = site.login("admin", ADMIN_PASSWORD).await;
    let (editor_cookie, _) = site.login("editor", EDITOR_PASSWORD).await;
    let editor = site.state.data.user_by_username("editor").unwrap().unwrap();

    let response = site
        .post_form(
            &format!("/admin/users/{}", editor.id),
            Some(&admin_cookie),
            &[
                ("csrf_token", &csrf),
                ("username", "editor"),
                ("role", "editor"),
                ("password", "a brand new password"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        site.get("/admin", Some(&editor_cookie)).await.status(),
        StatusCode::SEE_OTHER
    );
}

#[tokio::test]
async fn test_settings_update_changes_public_title() {
    let site = create_test_site();
    let (cookie, csrf) = site.login("admin", ADMIN_PASSWORD).await;

    let response = site
        .post_form(
            "/admin/settings",
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("site_title", "Harbor Log"),
                ("theme", "default"),
                ("posts_per_page", "1"),
                ("home_page", ""),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let body = body_text(site.get("/blog", None).await).await;
    assert!(body.contains("Harbor Log"));
    assert_eq!(site.get("/blog?page=2", None).await.status(), StatusCode::OK);

    let response = site
        .post_form(
            "/admin/settings",
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("site_title", "Harbor Log"),
                ("theme", "default"),
                ("posts_per_page", "0"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_admin_adds_redirect() {
    let site = create_test_site();
    let (cookie, csrf) = site.login("admin", ADMIN_PASSWORD).await;

    let response = site
        .post_form(
            "/admin/redirects",
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("from", "/old-about"),
                ("to", "/about"),
                ("status", "308"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = site.get("/old-about", None).await;
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(location(&response), "/about");

    let response = site
        .post_form(
            "/admin/redirects",
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("from", "/loop"),
                ("to", "/loop"),
                ("status", "301"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// LOGIN COOKIES
// =============================================================================

#[tokio::test]
async fn test_login_clears_login_csrf_cookie_on_its_path() {
    let site = create_test_site();
    let form = site.get("/admin/login", None).await;
    let token = cookie_from(&form, "marques_login_csrf").unwrap();

    let response = site
        .post_form(
            "/admin/login",
            Some(&format!("marques_login_csrf={}", token)),
            &[
                ("username", "admin"),
                ("password", ADMIN_PASSWORD),
                ("csrf_token", &token),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("marques_login_csrf="))
        .unwrap();
    assert!(cleared.contains("Path=/admin;"));
    assert!(cleared.contains("Max-Age=0"));
}

// =============================================================================
// MEDIA
// =============================================================================

#[tokio::test]
async fn test_media_upload() {
    let site = create_test_site();
    let (cookie, csrf) = site.login("editor", EDITOR_PASSWORD).await;

    let response = site
        .post_multipart(
            "/admin/media",
            &cookie,
            Some(&csrf),
            Some(("Team Photo.PNG", &b"not really a png"[..])),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/admin/media"));

    let names: Vec<String> = site
        .state
        .media
        .list()
        .unwrap()
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec!["team-photo.png".to_string()]);

    let page = site.get("/admin/media", Some(&cookie)).await;
    assert!(body_text(page).await.contains("team-photo.png"));
}

#[tokio::test]
async fn test_media_upload_without_csrf_is_forbidden() {
    let site = create_test_site();
    let (cookie, _) = site.login("editor", EDITOR_PASSWORD).await;

    let response = site
        .post_multipart("/admin/media", &cookie, None, Some(("photo.png", &b"bytes"[..])))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(site.state.media.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_media_upload_over_body_limit() {
    let site = create_test_site_with_config(Some("media:\n  max_upload_bytes: 1024\n"));
    let (cookie, csrf) = site.login("editor", EDITOR_PASSWORD).await;

    let oversized = vec![b'x'; 256 * 1024];
    let response = site
        .post_multipart(
            "/admin/media",
            &cookie,
            Some(&csrf),
            Some(("big.png", oversized.as_slice())),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Under the body limit but over the configured upload size
    let response = site
        .post_multipart(
            "/admin/media",
            &cookie,
            Some(&csrf),
            Some(("medium.png", &oversized[..4096])),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(site.state.media.list().unwrap().is_empty());
}

// =============================================================================
// NAVIGATION
// =============================================================================

fn nav_id(site: &TestSite, label: &str) -> u64 {
    site.state
        .data
        .navigation()
        .unwrap()
        .into_iter()
        .find(|item| item.label == label)
        .map(|item| item.id)
        .unwrap()
}

#[tokio::test]
async fn test_navigation_admin_routes() {
    let site = create_test_site();
    let (cookie, csrf) = site.login("editor", EDITOR_PASSWORD).await;

    let response = site.get("/admin/navigation", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    for (label, url) in [("Docs", "/docs"), ("Shop", "/shop")] {
        let response = site
            .post_form(
                "/admin/navigation",
                Some(&cookie),
                &[
                    ("csrf_token", &csrf),
                    ("label", label),
                    ("url", url),
                    ("position", "10"),
                    ("visible", "on"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    let docs = nav_id(&site, "Docs").to_string();
    let shop = nav_id(&site, "Shop").to_string();

    let response = site
        .post_form(
            "/admin/navigation",
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("label", "Guide"),
                ("url", "/docs/guide"),
                ("parent_id", &docs),
                ("visible", "on"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let guide = nav_id(&site, "Guide");

    // Docs has a child, so it cannot move under Shop
    let response = site
        .post_form(
            &format!("/admin/navigation/{}", docs),
            Some(&cookie),
            &[
                ("csrf_token", &csrf),
                ("label", "Docs"),
                ("url", "/docs"),
                ("parent_id", &shop),
                ("visible", "on"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = site
        .post_form(
            &format!("/admin/navigation/{}/delete", docs),
            Some(&cookie),
            &[("csrf_token", &csrf)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let guide = site.state.data.nav_item(guide).unwrap().unwrap();
    assert_eq!(guide.parent_id, None);
    assert!(site
        .state
        .data
        .navigation()
        .unwrap()
        .iter()
        .all(|item| item.label != "Docs"));
}

#[tokio::test]
async fn test_navigation_requires_csrf() {
    let site = create_test_site();
    let (cookie, _) = site.login("editor", EDITOR_PASSWORD).await;
    let before = site.state.data.navigation().unwrap().len();

    let response = site
        .post_form(
            "/admin/navigation",
            Some(&cookie),
            &[("label", "Docs"), ("url", "/docs")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(site.state.data.navigation().unwrap().len(), before);
}

// =============================================================================
// BLOCKING WORK
// =============================================================================

#[tokio::test]
async fn test_blocking_work_runs_off_the_runtime() {
    let site = create_test_site();
    let slugs: Vec<String> = site
        .state
        .blocking(|s| Ok(s.content.published(EntryKind::Post)?))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.slug)
        .collect();
    assert_eq!(slugs.len(), 2);
    assert!(!slugs.contains(&"secret-draft".to_string()));

    let error = site
        .state
        .blocking(|_| -> anyhow::Result<()> { anyhow::bail!("disk on fire") })
        .await
        .unwrap_err();
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
