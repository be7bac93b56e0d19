//! Loan endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::{CreateLoan, ReturnLoan},
        Loan,
    },
};

use super::{parse_id, ApiResponse, AuthenticatedUser, OptionalJson, ValidatedJson};

/// List all loans
#[utoipa::path(
    get,
    path = "/api/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All loans", body = Vec<Loan>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_ctx): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<Loan>>>> {
    let loans = state.services.loans.list_loans().await?;
    Ok(ApiResponse::new(loans, "All loans"))
}

/// Borrow a book for the authenticated user
#[utoipa::path(
    post,
    path = "/api/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Invalid data"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book already on loan or loan limit reached")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(ctx): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateLoan>,
) -> AppResult<(StatusCode, Json<ApiResponse<Loan>>)> {
    let loan = state.services.loans.checkout(ctx.user_id, request.book_id).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(loan, "Loan created successfully"),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    put,
    path = "/api/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Loan ID (UUID)")
    ),
    request_body(content = ReturnLoan, description = "Optional body; the return date defaults to now"),
    responses(
        (status = 200, description = "Loan returned", body = Loan),
        (status = 400, description = "Malformed body or return date before the loan date"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan already completed")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_ctx): AuthenticatedUser,
    Path(id): Path<String>,
    OptionalJson(body): OptionalJson<ReturnLoan>,
) -> AppResult<Json<ApiResponse<Loan>>> {
    let return_date = body.and_then(|request| request.return_date);
    let loan = state.services.loans.complete(parse_id(&id)?, return_date).await?;

    Ok(ApiResponse::new(loan, "Loan returned"))
}
