//! Auth Routes
//!
//! - GET /api/auth/callback - Exchange the authorization code, set the session cookie
//! - GET /home - Session guard

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{CallbackParams, HomeResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::{self, CallbackOutcome, GuardDecision};

/// GET /api/auth/callback?code=...
///
/// 307 to the landing page with the session cookie, or 500 with the
/// platform's message.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Response> {
    let outcome = auth::complete_sign_in(
        state.backend.as_ref(),
        params.code.as_deref(),
        &state.config.landing_path,
    )
    .await;

    match outcome {
        CallbackOutcome::Redirect { location, session } => {
            let cookie = auth::session_cookie(
                &state.config.session_cookie,
                &session,
                state.config.secure_cookie,
            );
            Ok((
                [(header::SET_COOKIE, cookie)],
                Redirect::temporary(&location),
            )
                .into_response())
        }
        CallbackOutcome::Failed { message } => Err(ApiError::AuthCallback(message)),
    }
}

/// GET /home
///
/// Identity of the signed-in user, or a redirect to sign-up.
pub async fn home(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let token = auth::access_token(&headers, &state.config.session_cookie);

    match auth::check_session(state.backend.as_ref(), token.as_deref()).await {
        GuardDecision::Authenticated(user) => Json(HomeResponse {
            message: format!("Signed in as {}", user.email),
            email: user.email,
        })
        .into_response(),
        GuardDecision::SignUpRequired => {
            tracing::debug!(to = %state.config.signup_path, "No session, redirecting to sign-up");
            Redirect::temporary(&state.config.signup_path).into_response()
        }
    }
}
