/// Integration tests for the TaskTrack API
///
/// These drive the full router (auth middleware, validation, error
/// envelope, services, in-memory store and WebSocket hub) through
/// `tower::Service`.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{task_body, TestContext};
use serde_json::{json, Value};
use tokio::sync::mpsc::unbounded_channel;
use uuid::Uuid;

#[tokio::test]
async fn test_health_reports_store() {
    let ctx = TestContext::new();

    let response = ctx.send(Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["database"], "connected");
}

#[tokio::test]
async fn test_register_sets_cookie_and_rejects_duplicates() {
    let ctx = TestContext::new();

    let body = json!({ "email": "ada@example.com", "name": "Ada", "password": "secret123" });
    let response = ctx
        .send(Method::POST, "/api/v1/auth/register", None, Some(body.clone()))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["user"]["email"], "ada@example.com");
    assert!(response.body["data"]["user"].get("passwordHash").is_none());

    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=604800"));

    let duplicate = ctx
        .send(Method::POST, "/api/v1/auth/register", None, Some(body))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["success"], false);
    assert_eq!(duplicate.body["error"], "Email already registered");
}

#[tokio::test]
async fn test_register_validation_details() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "nope", "name": "Ada", "password": "123" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let details = response.body["details"].as_array().unwrap();
    let fields: Vec<&str> = details.iter().filter_map(|d| d["field"].as_str()).collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = ctx.call(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_login_outcomes() {
    let ctx = TestContext::new();
    let ada = ctx.register("Ada").await;

    let wrong = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": ada.email, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "Invalid email or password");

    let unknown = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(unknown.body["error"], "Invalid email or password");

    let ok = ctx
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": ada.email.to_uppercase(), "password": "secret123" })),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["message"], "Login successful");
    assert_eq!(ok.body["data"]["user"]["id"], ada.id.to_string());
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let ctx = TestContext::new();

    let missing = ctx.send(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "Authentication required. Please log in.");

    let garbage = ctx
        .send(Method::GET, "/api/v1/tasks", Some("not-a-token"), None)
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["error"], "Invalid token. Please log in again.");

    let expired_token = ctx
        .state
        .services
        .accounts
        .keys()
        .clone()
        .with_lifetime(chrono::Duration::seconds(-120))
        .issue(Uuid::new_v4(), "ghost@example.com")
        .unwrap();
    let expired = ctx
        .send(Method::GET, "/api/v1/notifications", Some(&expired_token), None)
        .await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired.body["error"], "Token expired. Please log in again.");
}

#[tokio::test]
async fn test_cookie_session_and_profile() {
    let ctx = TestContext::new();
    let ada = ctx.register("Ada").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/auth/me")
        .header(header::COOKIE, format!("token={}", ada.token))
        .body(Body::empty())
        .unwrap();
    let me = ctx.call(request).await;

    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["id"], ada.id.to_string());
    assert!(me.body["data"]["createdAt"].is_string());

    let grace = ctx.register("Grace").await;
    let taken = ctx
        .send(
            Method::PUT,
            "/api/v1/auth/profile",
            Some(&ada.token),
            Some(json!({ "email": grace.email })),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);
    assert_eq!(taken.body["error"], "Email already in use");

    let renamed = ctx
        .send(
            Method::PUT,
            "/api/v1/auth/profile",
            Some(&ada.token),
            Some(json!({ "name": "Ada Lovelace" })),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["data"]["name"], "Ada Lovelace");

    let users = ctx
        .send(Method::GET, "/api/v1/auth/users", Some(&ada.token), None)
        .await;
    assert_eq!(users.body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let ctx = TestContext::new();
    let ada = ctx.register("Ada").await;

    let response = ctx
        .send(Method::POST, "/api/v1/auth/logout", Some(&ada.token), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Logged out successfully");
    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_ship_report_scenario() {
    let ctx = TestContext::new();
    let alice = ctx.register("Alice").await;
    let bob = ctx.register("Bob").await;

    // Assigned to someone else: one notification for Bob, none for Alice
    let task = ctx.create_task(&alice, task_body("Ship report", Some(bob.id))).await;
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["status"], "To Do");
    assert_eq!(task["priority"], "High");
    assert_eq!(task["creator"]["id"], alice.id.to_string());
    assert_eq!(task["assignedTo"]["id"], bob.id.to_string());

    let inbox = ctx
        .send(Method::GET, "/api/v1/notifications", Some(&bob.token), None)
        .await;
    assert_eq!(inbox.body["data"]["unreadCount"], 1);
    assert_eq!(
        inbox.body["data"]["notifications"][0]["message"],
        "You have been assigned a new task: \"Ship report\""
    );

    let alice_inbox = ctx
        .send(Method::GET, "/api/v1/notifications", Some(&alice.token), None)
        .await;
    assert_eq!(alice_inbox.body["data"]["unreadCount"], 0);

    // Any user may update
    let updated = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/tasks/{}", task_id),
            Some(&bob.token),
            Some(json!({ "status": "Completed" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["status"], "Completed");

    let audit = ctx
        .send(
            Method::GET,
            &format!("/api/v1/tasks/{}/audit", task_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(audit.body["count"], 2);
    assert_eq!(audit.body["data"][0]["action"], "STATUS_CHANGED");
    assert_eq!(audit.body["data"][0]["previousValue"], "To Do");
    assert_eq!(audit.body["data"][0]["newValue"], "Completed");

    // Only the creator may delete
    let forbidden = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/tasks/{}", task_id),
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let still_there = ctx
        .send(
            Method::GET,
            &format!("/api/v1/tasks/{}", task_id),
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(still_there.status, StatusCode::OK);

    let deleted = ctx
        .send(
            Method::DELETE,
            &format!("/api/v1/tasks/{}", task_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Task deleted successfully");

    let gone = ctx
        .send(
            Method::GET,
            &format!("/api/v1/tasks/{}", task_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["error"], "Task not found");
}

#[tokio::test]
async fn test_unknown_assignee_is_not_found() {
    let ctx = TestContext::new();
    let alice = ctx.register("Alice").await;

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/tasks",
            Some(&alice.token),
            Some(task_body("Ship report", Some(Uuid::new_v4()))),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Assigned user not found");

    let list = ctx
        .send(Method::GET, "/api/v1/tasks", Some(&alice.token), None)
        .await;
    assert_eq!(list.body["count"], 0);
}

#[tokio::test]
async fn test_task_validation_errors() {
    let ctx = TestContext::new();
    let alice = ctx.register("Alice").await;

    let bad_date = ctx
        .send(
            Method::POST,
            "/api/v1/tasks",
            Some(&alice.token),
            Some(json!({ "title": "x", "description": "y", "dueDate": "someday" })),
        )
        .await;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_date.body["details"][0]["field"], "dueDate");

    let bad_priority = ctx
        .send(
            Method::POST,
            "/api/v1/tasks",
            Some(&alice.token),
            Some(json!({ "title": "x", "description": "y", "dueDate": "2030-01-01", "priority": "Whenever" })),
        )
        .await;
    assert_eq!(bad_priority.status, StatusCode::BAD_REQUEST);

    let bad_id = ctx
        .send(Method::GET, "/api/v1/tasks/not-a-uuid", Some(&alice.token), None)
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.body["error"], "Invalid ID format");
}

#[tokio::test]
async fn test_blank_text_fields_are_rejected() {
    let ctx = TestContext::new();
    let alice = ctx.register("Alice").await;

    let blank_title = ctx
        .send(
            Method::POST,
            "/api/v1/tasks",
            Some(&alice.token),
            Some(json!({ "title": "   ", "description": "d", "dueDate": "2030-01-01" })),
        )
        .await;
    assert_eq!(blank_title.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank_title.body["details"][0]["field"], "title");

    let blank_description = ctx
        .send(
            Method::POST,
            "/api/v1/tasks",
            Some(&alice.token),
            Some(json!({ "title": "Ship report", "description": "  ", "dueDate": "2030-01-01" })),
        )
        .await;
    assert_eq!(blank_description.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank_description.body["details"][0]["field"], "description");

    let task = ctx
        .create_task(&alice, json!({ "title": "  Ship report ", "description": " Q3 ", "dueDate": "2030-01-01" }))
        .await;
    assert_eq!(task["title"], "Ship report");
    assert_eq!(task["description"], "Q3");

    let blank_update = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/tasks/{}", task["id"].as_str().unwrap()),
            Some(&alice.token),
            Some(json!({ "title": " " })),
        )
        .await;
    assert_eq!(blank_update.status, StatusCode::BAD_REQUEST);

    let blank_profile = ctx
        .send(
            Method::PUT,
            "/api/v1/auth/profile",
            Some(&alice.token),
            Some(json!({ "name": "   " })),
        )
        .await;
    assert_eq!(blank_profile.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank_profile.body["details"][0]["field"], "name");

    let blank_register = ctx
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "blank@example.com", "name": "   ", "password": "secret123" })),
        )
        .await;
    assert_eq!(blank_register.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank_register.body["details"][0]["field"], "name");
}

#[tokio::test]
async fn test_list_filters_and_dashboard() {
    let ctx = TestContext::new();
    let alice = ctx.register("Alice").await;
    let bob = ctx.register("Bob").await;

    ctx.create_task(&alice, task_body("Mine", None)).await;
    ctx.create_task(&alice, task_body("For Bob", Some(bob.id))).await;
    ctx.create_task(
        &bob,
        json!({
            "title": "Late",
            "description": "Past due",
            "dueDate": "2001-01-01",
            "priority": "Low",
            "assignedToId": alice.id.to_string(),
        }),
    )
    .await;

    let all = ctx
        .send(Method::GET, "/api/v1/tasks", Some(&alice.token), None)
        .await;
    assert_eq!(all.body["count"], 3);

    let assigned = ctx
        .send(
            Method::GET,
            "/api/v1/tasks?assignedToMe=true&sortBy=priority&sortOrder=asc",
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(assigned.body["count"], 1);
    assert_eq!(assigned.body["data"][0]["title"], "For Bob");

    let low = ctx
        .send(Method::GET, "/api/v1/tasks?priority=Low", Some(&bob.token), None)
        .await;
    assert_eq!(low.body["count"], 1);

    let bad_sort = ctx
        .send(Method::GET, "/api/v1/tasks?sortBy=title", Some(&bob.token), None)
        .await;
    assert_eq!(bad_sort.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_sort.body["success"], false);

    let dashboard = ctx
        .send(Method::GET, "/api/v1/tasks/dashboard", Some(&alice.token), None)
        .await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["data"]["assignedToMe"].as_array().unwrap().len(), 1);
    assert_eq!(dashboard.body["data"]["createdByMe"].as_array().unwrap().len(), 2);
    assert_eq!(dashboard.body["data"]["overdue"][0]["title"], "Late");
}

#[tokio::test]
async fn test_notifications_are_private() {
    let ctx = TestContext::new();
    let alice = ctx.register("Alice").await;
    let bob = ctx.register("Bob").await;

    ctx.create_task(&alice, task_body("One", Some(bob.id))).await;
    ctx.create_task(&alice, task_body("Two", Some(bob.id))).await;

    let inbox = ctx
        .send(Method::GET, "/api/v1/notifications", Some(&bob.token), None)
        .await;
    let notification_id = inbox.body["data"]["notifications"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let foreign = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/notifications/{}/read", notification_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    assert_eq!(foreign.body["error"], "Notification not found");

    let own = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/notifications/{}/read", notification_id),
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["data"]["read"], true);

    let all = ctx
        .send(Method::PUT, "/api/v1/notifications/read-all", Some(&bob.token), None)
        .await;
    assert_eq!(all.body["message"], "All notifications marked as read");

    let inbox = ctx
        .send(Method::GET, "/api/v1/notifications", Some(&bob.token), None)
        .await;
    assert_eq!(inbox.body["data"]["unreadCount"], 0);
}

#[tokio::test]
async fn test_update_fans_out_over_hub() {
    let ctx = TestContext::new();
    let alice = ctx.register("Alice").await;
    let bob = ctx.register("Bob").await;
    let task = ctx.create_task(&alice, task_body("Ship report", None)).await;

    let (bob_tx, mut bob_rx) = unbounded_channel();
    let (alice_tx, mut alice_rx) = unbounded_channel();
    ctx.state.hub.registry().register(bob.id, bob_tx);
    ctx.state.hub.registry().register(alice.id, alice_tx);

    let response = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/tasks/{}", task["id"].as_str().unwrap()),
            Some(&alice.token),
            Some(json!({ "assignedToId": bob.id.to_string(), "priority": "Urgent" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let frame: Value = serde_json::from_str(&bob_rx.try_recv().unwrap()).unwrap();
    assert_eq!(frame["event"], "task:updated");
    assert_eq!(frame["data"]["changes"], json!(["priority", "assignee"]));

    let frame: Value = serde_json::from_str(&bob_rx.try_recv().unwrap()).unwrap();
    assert_eq!(frame["event"], "notification:new");
    assert_eq!(frame["data"]["taskId"], task["id"]);

    // Alice sees the broadcast but not Bob's notification
    let frame: Value = serde_json::from_str(&alice_rx.try_recv().unwrap()).unwrap();
    assert_eq!(frame["event"], "task:updated");
    assert!(alice_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_socket_upgrade_requires_token() {
    let ctx = TestContext::new();
    let ada = ctx.register("Ada").await;

    let anonymous = ctx.send(Method::GET, "/ws", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"], "Authentication required. Please log in.");

    let bad = ctx.send(Method::GET, "/ws?token=garbage", None, None).await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);

    // Authenticated, but a plain request cannot be upgraded
    let plain = ctx
        .send(Method::GET, &format!("/ws?token={}", ada.token), None, None)
        .await;
    assert_ne!(plain.status, StatusCode::UNAUTHORIZED);
    assert!(plain.status.is_client_error());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let ctx = TestContext::new();

    let response = ctx.send(Method::GET, "/api/v1/nothing", None, None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Route GET /api/v1/nothing not found");
}
