//! API handlers for the lending REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::User,
    services::AuthContext,
    AppState,
};

/// Extractor for the authenticated caller, resolved from the bearer token
pub struct AuthenticatedUser(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let ctx = state.services.auth.authenticate(header).await?;
        Ok(AuthenticatedUser(ctx))
    }
}

/// Extractor for a caller holding the TEACHER role.
///
/// Runs with the request parts, so the role gate is decided before any
/// body extractor gets a chance to reject the payload.
pub struct TeacherUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for TeacherUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(ctx) = AuthenticatedUser::from_request_parts(parts, state).await?;
        let user = state.services.access.require_teacher(&ctx).await?;
        Ok(TeacherUser(user))
    }
}

/// JSON body that has been deserialized and passed its `Validate` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// JSON body that may be omitted entirely.
///
/// An empty body yields `None`; anything else must parse and validate,
/// otherwise the request is rejected like `ValidatedJson`.
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }

        let Json(value) = Json::<T>::from_bytes(&bytes)
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        value.validate()?;
        Ok(OptionalJson(Some(value)))
    }
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: Some(message.into()),
        })
    }
}

/// Parse an identifier taken from the request path
pub fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation(format!("Invalid identifier: {}", raw)))
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE, AUTHORIZATION]);

    let api = Router::new()
        // Authentication
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::get_current_user))
        .route("/users/edit/me", put(users::edit_current_user))
        .route("/users/delete/me", delete(users::delete_current_user))
        .route("/users/:id/loans", get(users::user_loans_history))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/:id", get(books::get_book))
        .route("/books/edit/:id", put(books::update_book))
        .route("/books/delete/:id", delete(books::delete_book))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/:id/return", put(loans::return_loan));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .fallback(route_not_found)
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
