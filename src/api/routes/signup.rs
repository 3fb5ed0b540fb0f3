//! Sign-up Routes
//!
//! - POST /api/signup - Create the account and its profile row
//! - POST /api/signup/profile - Finish a profile write that failed earlier,
//!   addressed by the account id returned with `PROFILE_NOT_SAVED`

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{ProfileRetryRequest, SignUpResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::auth::SignUpRequest;

/// POST /api/signup
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<SignUpResponse>)> {
    let registration = state.signup.submit(&req).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id: registration.account.id,
            email: registration.account.email,
        }),
    ))
}

/// POST /api/signup/profile
///
/// Idempotent: an existing profile for the email is left alone. Accounts
/// without a failed profile write get 404.
pub async fn complete_profile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProfileRetryRequest>,
) -> ApiResult<StatusCode> {
    let written = state.signup.complete_profile(&req.account_id).await?;
    tracing::debug!(account_id = %req.account_id, written, "Profile retry handled");
    Ok(StatusCode::NO_CONTENT)
}
