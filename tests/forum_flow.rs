use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use kampus::config::Config;
use kampus::db;
use kampus::moderation::{self, BanDuration};
use kampus::routes;
use kampus::state::AppState;

fn test_app() -> (Router, AppState, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let pool = db::create_pool(&tmp.path().join("test.db")).expect("create test database");
    db::run_migrations(&pool).expect("run migrations");

    let state = AppState {
        db: pool,
        config: Config::default(),
    };
    (routes::app(state.clone()), state, tmp)
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

fn form_post(uri: &str, body: String, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect has a Location header")
        .to_str()
        .unwrap()
}

/// Register a user through the real handler; returns the session cookie.
async fn register(app: &Router, username: &str) -> String {
    let body = format!(
        "username={}&password=pw123&university=METU&bio=&terms=yes",
        username
    );
    let response = send(app, form_post("/register", body, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("registration sets a session cookie")
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

fn user_id(state: &AppState, username: &str) -> String {
    let conn = state.db.get().unwrap();
    conn.query_row(
        "SELECT id FROM users WHERE username = ?1",
        rusqlite::params![username],
        |row| row.get(0),
    )
    .unwrap()
}

fn count(state: &AppState, sql: &str, param: &str) -> i64 {
    let conn = state.db.get().unwrap();
    conn.query_row(sql, rusqlite::params![param], |row| row.get(0))
        .unwrap()
}

#[tokio::test]
async fn register_post_comment_and_view_flow() {
    let (app, state, _tmp) = test_app();
    let alice = register(&app, "alice").await;

    // Create a post through the form handler
    let response = send(
        &app,
        form_post(
            "/create",
            "title=Exam+week&content=How+do+you+survive+it&category=question".to_string(),
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let conn = state.db.get().unwrap();
    let post_id: String = conn
        .query_row("SELECT id FROM posts WHERE title = 'Exam week'", [], |row| {
            row.get(0)
        })
        .unwrap();
    drop(conn);

    // The front page renders
    let response = send(&app, get("/", Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Comment on it
    let response = send(
        &app,
        form_post(
            &format!("/add_comment/{}", post_id),
            "content=Coffee+and+denial".to_string(),
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM comments WHERE post_id = ?1", &post_id),
        1
    );

    // Two visits by the same user count a single view
    let response = send(&app, get(&format!("/post/{}", post_id), Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, get(&format!("/post/{}", post_id), Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        count(&state, "SELECT view_count FROM posts WHERE id = ?1", &post_id),
        1
    );

    // Anonymous visits never count
    let response = send(&app, get(&format!("/post/{}", post_id), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        count(&state, "SELECT view_count FROM posts WHERE id = ?1", &post_id),
        1
    );
}

#[tokio::test]
async fn banned_user_is_gated_except_exempt_paths() {
    let (app, state, _tmp) = test_app();
    let bob = register(&app, "bob").await;
    let bob_id = user_id(&state, "bob");

    moderation::apply_ban(&state.db, &bob_id, "spam", BanDuration::Permanent).unwrap();

    // Gated everywhere...
    let response = send(&app, get("/", Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/banned");

    let response = send(&app, get("/create", Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/banned");

    // ...except the appeal page itself
    let response = send(&app, get("/banned", Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::OK);

    // ...and logout, which must stay reachable
    let response = send(&app, get("/logout", Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn banned_user_can_appeal() {
    let (app, state, _tmp) = test_app();
    let bob = register(&app, "bob").await;
    let bob_id = user_id(&state, "bob");

    moderation::apply_ban(&state.db, &bob_id, "spam", BanDuration::SevenDays).unwrap();

    let response = send(
        &app,
        form_post("/banned", "appeal=I+will+behave".to_string(), Some(&bob)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/banned");

    let status = moderation::ban_status(&state.db, &bob_id).unwrap();
    assert_eq!(status.appeal.as_deref(), Some("I will behave"));
}

#[tokio::test]
async fn expired_ban_clears_on_next_request() {
    let (app, state, _tmp) = test_app();
    let bob = register(&app, "bob").await;
    let bob_id = user_id(&state, "bob");

    moderation::apply_ban(&state.db, &bob_id, "spam", BanDuration::OneDay).unwrap();
    let conn = state.db.get().unwrap();
    conn.execute(
        "UPDATE users SET ban_expires_at = ?1 WHERE id = ?2",
        rusqlite::params![
            (chrono::Utc::now() - chrono::Duration::seconds(1)).to_rfc3339(),
            bob_id
        ],
    )
    .unwrap();
    drop(conn);

    // Not redirected; the ban is gone afterwards
    let response = send(&app, get("/", Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        count(&state, "SELECT is_banned FROM users WHERE id = ?1", &bob_id),
        0
    );
}

#[tokio::test]
async fn self_reports_are_rejected_without_a_row() {
    let (app, state, _tmp) = test_app();
    let alice = register(&app, "alice").await;
    let alice_id = user_id(&state, "alice");

    let response = send(
        &app,
        form_post(
            &format!("/report/{}", alice_id),
            "reason=sock+puppet".to_string(),
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM reports WHERE reporter_id = ?1", &alice_id),
        0
    );

    // Same for the user's own post
    send(
        &app,
        form_post(
            "/create",
            "title=Mine&content=Body&category=general".to_string(),
            Some(&alice),
        ),
    )
    .await;
    let conn = state.db.get().unwrap();
    let post_id: String = conn
        .query_row("SELECT id FROM posts WHERE title = 'Mine'", [], |row| {
            row.get(0)
        })
        .unwrap();
    drop(conn);

    let response = send(
        &app,
        form_post(
            &format!("/report_post/{}", post_id),
            "reason=self+promo".to_string(),
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM reports WHERE reporter_id = ?1", &alice_id),
        0
    );
}

#[tokio::test]
async fn admin_routes_are_forbidden_to_regular_users() {
    let (app, state, _tmp) = test_app();
    let alice = register(&app, "alice").await;
    let bob_id = {
        register(&app, "bob").await;
        user_id(&state, "bob")
    };

    let response = send(&app, get("/admin/reports", Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        form_post(
            &format!("/ban/{}", bob_id),
            "reason=no&duration=1_day".to_string(),
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        count(&state, "SELECT is_banned FROM users WHERE id = ?1", &bob_id),
        0
    );
}

#[tokio::test]
async fn admin_can_ban_and_resolve_reports() {
    let (app, state, _tmp) = test_app();
    db::seed_admin(&state.db, "admin", "admin123").unwrap();

    // Log the admin in through the login handler
    let response = send(
        &app,
        form_post("/login", "username=admin&password=admin123".to_string(), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let admin_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let bob_id = user_id(&state, "bob");

    // Alice reports bob
    let response = send(
        &app,
        form_post(
            &format!("/report/{}", bob_id),
            "reason=harassment".to_string(),
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Admin sees the queue and bans bob for a week
    let response = send(&app, get("/admin/reports", Some(&admin_cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        form_post(
            &format!("/ban/{}", bob_id),
            "reason=harassment&duration=7_days".to_string(),
            Some(&admin_cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let status = moderation::ban_status(&state.db, &bob_id).unwrap();
    assert!(status.is_banned);
    assert!(status.expires_at.is_some());

    // Bob is now locked out
    let response = send(&app, get("/", Some(&bob))).await;
    assert_eq!(location(&response), "/banned");

    // Resolve the report
    let conn = state.db.get().unwrap();
    let report_id: String = conn
        .query_row("SELECT id FROM reports LIMIT 1", [], |row| row.get(0))
        .unwrap();
    drop(conn);

    let response = send(
        &app,
        get(&format!("/admin/resolve_report/{}", report_id), Some(&admin_cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        count(&state, "SELECT is_resolved FROM reports WHERE id = ?1", &report_id),
        1
    );
}

#[tokio::test]
async fn deleting_an_account_cascades_everything() {
    let (app, state, _tmp) = test_app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let alice_id = user_id(&state, "alice");
    let bob_id = user_id(&state, "bob");

    // Alice posts; bob interacts with it; bob reports alice
    send(
        &app,
        form_post(
            "/create",
            "title=Hello&content=World&category=general".to_string(),
            Some(&alice),
        ),
    )
    .await;
    let conn = state.db.get().unwrap();
    let post_id: String = conn
        .query_row("SELECT id FROM posts WHERE title = 'Hello'", [], |row| {
            row.get(0)
        })
        .unwrap();
    drop(conn);

    send(
        &app,
        form_post(
            &format!("/add_comment/{}", post_id),
            "content=Nice".to_string(),
            Some(&bob),
        ),
    )
    .await;
    send(&app, get(&format!("/vote/{}/up", post_id), Some(&bob))).await;
    send(&app, get(&format!("/post/{}", post_id), Some(&bob))).await;
    send(
        &app,
        form_post(
            &format!("/report/{}", alice_id),
            "reason=meta".to_string(),
            Some(&bob),
        ),
    )
    .await;

    // Bob deletes his account: his comment, vote, view, and report go too
    let response = send(&app, form_post("/delete_account", String::new(), Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert_eq!(count(&state, "SELECT COUNT(*) FROM users WHERE id = ?1", &bob_id), 0);
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM comments WHERE author_id = ?1", &bob_id),
        0
    );
    assert_eq!(count(&state, "SELECT COUNT(*) FROM votes WHERE user_id = ?1", &bob_id), 0);
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM post_views WHERE user_id = ?1", &bob_id),
        0
    );
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM reports WHERE reporter_id = ?1", &bob_id),
        0
    );

    // Alice deletes hers: the post and its dependents disappear
    let response = send(&app, form_post("/delete_account", String::new(), Some(&alice))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(count(&state, "SELECT COUNT(*) FROM posts WHERE id = ?1", &post_id), 0);
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM comments WHERE post_id = ?1", &post_id),
        0
    );
}

#[tokio::test]
async fn vote_toggle_through_the_handler() {
    let (app, state, _tmp) = test_app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    send(
        &app,
        form_post(
            "/create",
            "title=Votes&content=Body&category=general".to_string(),
            Some(&alice),
        ),
    )
    .await;
    let conn = state.db.get().unwrap();
    let post_id: String = conn
        .query_row("SELECT id FROM posts WHERE title = 'Votes'", [], |row| {
            row.get(0)
        })
        .unwrap();
    drop(conn);

    // up, up again: retracted
    send(&app, get(&format!("/vote/{}/up", post_id), Some(&bob))).await;
    send(&app, get(&format!("/vote/{}/up", post_id), Some(&bob))).await;
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM votes WHERE post_id = ?1", &post_id),
        0
    );

    // up, then down: one row with value -1
    send(&app, get(&format!("/vote/{}/up", post_id), Some(&bob))).await;
    send(&app, get(&format!("/vote/{}/down", post_id), Some(&bob))).await;
    let conn = state.db.get().unwrap();
    let value: i64 = conn
        .query_row(
            "SELECT value FROM votes WHERE post_id = ?1",
            rusqlite::params![post_id],
            |row| row.get(0),
        )
        .unwrap();
    drop(conn);
    assert_eq!(value, -1);

    // unknown direction is rejected at the boundary
    let response = send(&app, get(&format!("/vote/{}/sideways", post_id), Some(&bob))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profane_content_is_rejected_everywhere() {
    let (app, state, _tmp) = test_app();

    // Registration with a profane username bounces back
    let response = send(
        &app,
        form_post(
            "/register",
            "username=idiotking&password=pw&terms=yes".to_string(),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
    assert_eq!(
        count(&state, "SELECT COUNT(*) FROM users WHERE username = ?1", "idiotking"),
        0
    );

    // A profane post is rejected
    let alice = register(&app, "alice").await;
    let response = send(
        &app,
        form_post(
            "/create",
            "title=You+are+all+stupid&content=rant&category=general".to_string(),
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(location(&response), "/create");
    assert_eq!(count(&state, "SELECT COUNT(*) FROM posts WHERE title LIKE ?1", "%stupid%"), 0);
}
