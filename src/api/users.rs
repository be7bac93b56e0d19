//! User endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{user::UpdateUser, Loan, User},
};

use super::{parse_id, ApiResponse, AuthenticatedUser, TeacherUser, ValidatedJson};

/// List every account (teacher only)
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users, newest first", body = Vec<User>),
        (status = 401, description = "Not authenticated or not a teacher")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    TeacherUser(_teacher): TeacherUser,
) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.services.users.list_users().await?;
    Ok(ApiResponse::new(users, "All users"))
}

/// Get the current user
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.services.users.current(&ctx).await?;
    Ok(ApiResponse::new(user, "User found"))
}

/// Edit the current user's name or email
#[utoipa::path(
    put,
    path = "/api/users/edit/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid data"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn edit_current_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    ValidatedJson(changes): ValidatedJson<UpdateUser>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.services.users.update_current(&ctx, changes).await?;
    Ok(ApiResponse::new(user, "User updated successfully"))
}

/// Delete the current user's account
#[utoipa::path(
    delete,
    path = "/api/users/delete/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User deleted"),
        (status = 409, description = "User has loans on record")
    )
)]
pub async fn delete_current_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    state.services.users.delete_current(&ctx).await?;
    Ok(ApiResponse::new(None, "User deleted successfully"))
}

/// Full loan history of a user (teacher only)
#[utoipa::path(
    get,
    path = "/api/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "User ID (UUID)")
    ),
    responses(
        (status = 200, description = "Loans ordered by loan date", body = Vec<Loan>),
        (status = 401, description = "Not authenticated or not a teacher"),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_loans_history(
    State(state): State<crate::AppState>,
    TeacherUser(_teacher): TeacherUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Loan>>>> {
    let user_id = parse_id(&id)?;
    let loans = state.services.loans.get_user_loans(user_id).await?;
    let message = if loans.is_empty() {
        "No history"
    } else {
        "User loans history"
    };

    Ok(ApiResponse::new(loans, message))
}
