//! Memo Routes
//!
//! - GET /api/memos - List memos, newest first
//! - POST /api/memos - Create a memo
//! - DELETE /api/memos/:id - Delete a memo

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{CreateMemoRequest, MemoListResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/memos
pub async fn list_memos(State(state): State<Arc<AppState>>) -> ApiResult<Json<MemoListResponse>> {
    let memos = state.memos.fetch_recent().await?;

    Ok(Json(MemoListResponse {
        count: memos.len(),
        memos,
    }))
}

/// POST /api/memos
///
/// Blank content is ignored: 204 and no backend call.
pub async fn create_memo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMemoRequest>,
) -> ApiResult<Response> {
    if req.content.trim().is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let memo = state.memos.insert(&req.content).await?;
    tracing::debug!(memo_id = memo.id, "Memo created");

    Ok((StatusCode::CREATED, Json(memo)).into_response())
}

/// DELETE /api/memos/:id
pub async fn delete_memo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.memos.delete(id).await?;
    tracing::debug!(memo_id = id, "Memo deleted");
    Ok(StatusCode::NO_CONTENT)
}
