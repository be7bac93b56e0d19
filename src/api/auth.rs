//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{SignIn, SignUp, User, UserProfile},
};

use super::{ApiResponse, ValidatedJson};

/// Account created together with its first session token
#[derive(Serialize, ToSchema)]
pub struct SignUpResponse {
    pub user: User,
    pub token: String,
}

/// Profile of the signed-in user and a fresh session token
#[derive(Serialize, ToSchema)]
pub struct SignInResponse {
    pub user: UserProfile,
    pub token: String,
}

/// Create a new account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignUp,
    responses(
        (status = 201, description = "User created", body = SignUpResponse),
        (status = 400, description = "Invalid data"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn sign_up(
    State(state): State<crate::AppState>,
    ValidatedJson(request): ValidatedJson<SignUp>,
) -> AppResult<(StatusCode, Json<ApiResponse<SignUpResponse>>)> {
    let (user, token) = state.services.auth.sign_up(request).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(SignUpResponse { user, token }, "User created successfully"),
    ))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    tag = "auth",
    request_body = SignIn,
    responses(
        (status = 200, description = "Logged in", body = SignInResponse),
        (status = 400, description = "Invalid data"),
        (status = 401, description = "Incorrect email or password")
    )
)]
pub async fn sign_in(
    State(state): State<crate::AppState>,
    ValidatedJson(request): ValidatedJson<SignIn>,
) -> AppResult<Json<ApiResponse<SignInResponse>>> {
    let (user, token) = state.services.auth.sign_in(request).await?;

    Ok(ApiResponse::new(
        SignInResponse {
            user: UserProfile::from(&user),
            token,
        },
        "Logged in successfully",
    ))
}
