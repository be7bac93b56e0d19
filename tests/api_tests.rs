//! API integration tests
//!
//! Requests go through the full router (extractors, envelope, error
//! mapping) backed by the in-memory repository.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use lending_server::{api, repository::Repository, AppConfig, AppState};

struct TestApp {
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        Self {
            state: AppState::new(AppConfig::default(), Repository::in_memory()),
        }
    }

    fn router(&self) -> Router {
        api::create_router(self.state.clone())
    }

    async fn send(
        &self,
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

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Sign up an account and return its id and token
    async fn sign_up(&self, email: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({
                    "name": "Test User",
                    "email": email,
                    "password": "Secret123",
                    "role": role
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        (
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
            body["data"]["token"].as_str().unwrap().to_string(),
        )
    }

    async fn create_book(&self, teacher_token: &str, isbn: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/books",
                Some(teacher_token),
                Some(json!({
                    "author": "Frank Herbert",
                    "title": "Dune",
                    "category": "Science fiction",
                    "isbn": isbn
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn borrow(&self, token: &str, book_id: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/loans",
            Some(token),
            Some(json!({ "bookId": book_id })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn test_unknown_route_returns_not_found_envelope() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/nothing-here", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_signup_then_signin() {
    let app = TestApp::new();
    let (user_id, _) = app.sign_up("reader@school.test", "STUDENT").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/signin",
            None,
            Some(json!({ "email": "Reader@School.test", "password": "Secret123" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["id"], user_id.as_str());
    assert_eq!(body["data"]["user"]["role"], "STUDENT");
    assert!(body["data"]["token"].is_string());
    assert!(body["data"]["user"].get("password").is_none());
}

#[tokio::test]
async fn test_signup_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.sign_up("dup@school.test", "STUDENT").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({
                "name": "Other",
                "email": "dup@school.test",
                "password": "Secret123",
                "role": "TEACHER"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_signin_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.sign_up("reader@school.test", "STUDENT").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/signin",
            None,
            Some(json!({ "email": "reader@school.test", "password": "Wrong1234" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AUTHENTICATION_ERROR");
}

#[tokio::test]
async fn test_signup_weak_password_lists_field_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({
                "name": "Weak",
                "email": "weak@school.test",
                "password": "password",
                "role": "STUDENT"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/users/me", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token not provided");
}

#[tokio::test]
async fn test_expired_token_is_reported_as_expired() {
    let app = TestApp::new();
    let (user_id, _) = app.sign_up("late@school.test", "STUDENT").await;

    let stale = app
        .state
        .services
        .tokens
        .issue_at(Uuid::parse_str(&user_id).unwrap(), Utc::now() - Duration::days(8))
        .unwrap();

    let (status, body) = app.send(Method::GET, "/api/users/me", Some(&stale), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Expired token");
}

#[tokio::test]
async fn test_garbage_token_is_invalid() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::GET, "/api/users/me", Some("not.a.token"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_student_cannot_create_book() {
    let app = TestApp::new();
    let (_, student) = app.sign_up("student@school.test", "STUDENT").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&student),
            Some(json!({
                "author": "Frank Herbert",
                "title": "Dune",
                "category": "Science fiction",
                "isbn": "9780441172719"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AUTHENTICATION_ERROR");
}

#[tokio::test]
async fn test_student_with_invalid_book_body_is_still_unauthorized() {
    let app = TestApp::new();
    let (_, teacher) = app.sign_up("teacher@school.test", "TEACHER").await;
    let (_, student) = app.sign_up("student@school.test", "STUDENT").await;
    let book_id = app.create_book(&teacher, "9780441172719").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&student),
            Some(json!({ "author": "A", "title": "T", "category": "C", "isbn": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AUTHENTICATION_ERROR");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/books/edit/{}", book_id),
            Some(&student),
            Some(json!({ "isbn": "1" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AUTHENTICATION_ERROR");

    let (status, _) = app
        .send(Method::PUT, "/api/books/edit/not-a-uuid", Some(&student), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_teacher_creates_book_and_bad_isbn_is_rejected() {
    let app = TestApp::new();
    let (_, teacher) = app.sign_up("teacher@school.test", "TEACHER").await;

    let book_id = app.create_book(&teacher, "9780441172719").await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/books/{}", book_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Dune");
    assert_eq!(body["data"]["loans"], json!([]));

    let (status, body) = app
        .send(
            Method::POST,
            "/api/books",
            Some(&teacher),
            Some(json!({
                "author": "Frank Herbert",
                "title": "Dune Messiah",
                "category": "Science fiction",
                "isbn": "123"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "isbn");
}

#[tokio::test]
async fn test_get_book_with_malformed_id_is_validation_error() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/books/42", None, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_checkout_lifecycle() {
    let app = TestApp::new();
    let (_, teacher) = app.sign_up("teacher@school.test", "TEACHER").await;
    let (_, alice) = app.sign_up("alice@school.test", "STUDENT").await;
    let (_, bob) = app.sign_up("bob@school.test", "STUDENT").await;
    let book_id = app.create_book(&teacher, "9780441172719").await;

    let (status, body) = app.borrow(&alice, &book_id).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["bookId"], book_id.as_str());
    assert!(body["data"]["returnDate"].is_null());
    let loan_id = body["data"]["id"].as_str().unwrap().to_string();

    // The book is taken, whoever asks
    let (status, _) = app.borrow(&bob, &book_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.borrow(&alice, &book_id).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(Method::PUT, &format!("/api/loans/{}/return", loan_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["data"]["returnDate"].is_string());

    let (status, body) = app
        .send(Method::PUT, &format!("/api/loans/{}/return", loan_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Loan already completed");

    let (status, _) = app.borrow(&bob, &book_id).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_checkout_unknown_book_is_not_found() {
    let app = TestApp::new();
    let (_, alice) = app.sign_up("alice@school.test", "STUDENT").await;

    let (status, body) = app.borrow(&alice, &Uuid::new_v4().to_string()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_fourth_open_loan_is_refused() {
    let app = TestApp::new();
    let (_, teacher) = app.sign_up("teacher@school.test", "TEACHER").await;
    let (_, alice) = app.sign_up("alice@school.test", "STUDENT").await;

    let isbns = ["9780000000001", "9780000000002", "9780000000003", "9780000000004"];
    let mut books = Vec::new();
    for isbn in isbns {
        books.push(app.create_book(&teacher, isbn).await);
    }

    for book_id in &books[..3] {
        let (status, _) = app.borrow(&alice, book_id).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.borrow(&alice, &books[3]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("maximum limit"));
}

#[tokio::test]
async fn test_return_with_explicit_date() {
    let app = TestApp::new();
    let (_, teacher) = app.sign_up("teacher@school.test", "TEACHER").await;
    let (_, alice) = app.sign_up("alice@school.test", "STUDENT").await;
    let book_id = app.create_book(&teacher, "9780441172719").await;

    let (_, body) = app.borrow(&alice, &book_id).await;
    let loan_id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/loans/{}/return", loan_id);

    let too_early = (Utc::now() - Duration::days(1)).to_rfc3339();
    let (status, _) = app
        .send(Method::PUT, &uri, Some(&alice), Some(json!({ "returnDate": too_early })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let later = (Utc::now() + Duration::hours(1)).to_rfc3339();
    let (status, body) = app
        .send(Method::PUT, &uri, Some(&alice), Some(json!({ "returnDate": later })))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn test_malformed_return_date_leaves_loan_open() {
    let app = TestApp::new();
    let (_, teacher) = app.sign_up("teacher@school.test", "TEACHER").await;
    let (_, alice) = app.sign_up("alice@school.test", "STUDENT").await;
    let book_id = app.create_book(&teacher, "9780441172719").await;

    let (_, body) = app.borrow(&alice, &book_id).await;
    let loan_id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/loans/{}/return", loan_id);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&alice), Some(json!({ "returnDate": "yesterday-ish" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    // Still open, so the book cannot be borrowed by someone else
    let (_, bob) = app.sign_up("bob@school.test", "STUDENT").await;
    let (status, _) = app.borrow(&bob, &book_id).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.send(Method::PUT, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn test_loans_listing_requires_token() {
    let app = TestApp::new();

    let (status, _) = app.send(Method::GET, "/api/loans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_history_is_teacher_only() {
    let app = TestApp::new();
    let (_, teacher) = app.sign_up("teacher@school.test", "TEACHER").await;
    let (alice_id, alice) = app.sign_up("alice@school.test", "STUDENT").await;
    let book_id = app.create_book(&teacher, "9780441172719").await;
    app.borrow(&alice, &book_id).await;

    let uri = format!("/api/users/{}/loans", alice_id);

    let (status, _) = app.send(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(Method::GET, &uri, Some(&teacher), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleted_account_token_stops_working() {
    let app = TestApp::new();
    let (_, alice) = app.sign_up("alice@school.test", "STUDENT").await;

    let (status, _) = app
        .send(Method::DELETE, "/api/users/delete/me", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/api/users/me", Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found");
}
