use crate::{
    api::models::posts::{IngestResponse, PostEdit, PostResponse, RejectResponse, RestoreResponse},
    errors::Result,
    types::{PostId, UserId},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};

/// Ingest recent tweets
#[utoipa::path(
    post,
    path = "/users/{user_id}/ingest",
    tag = "posts",
    summary = "Ingest recent tweets",
    description = "Fetch the user's recent tweets from the source platform and store the \
                   ones not seen before as pending posts. Safe to call repeatedly.",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
    ),
    responses(
        (status = 200, description = "Ingest result", body = IngestResponse),
        (status = 404, description = "User not found"),
        (status = 412, description = "Farcaster account has no verified Twitter handle"),
        (status = 502, description = "Source platform unavailable"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn ingest(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<IngestResponse>> {
    let new_post_count = state.coordinator.ingest(user_id).await?;
    Ok(Json(IngestResponse { new_post_count }))
}

/// Reject a pending post
#[utoipa::path(
    post,
    path = "/users/{user_id}/posts/{post_id}/reject",
    tag = "posts",
    summary = "Reject a pending post",
    description = "Decline a pending post so it is skipped when its thread is approved. \
                   No financial effect.",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
        ("post_id" = String, Path, description = "Post id (UUID)"),
    ),
    responses(
        (status = 200, description = "Post rejected", body = RejectResponse),
        (status = 403, description = "Post belongs to another user"),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Post is not pending"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn reject_post(State(state): State<AppState>, Path((user_id, post_id)): Path<(UserId, PostId)>) -> Result<Json<RejectResponse>> {
    state.coordinator.reject(user_id, post_id).await?;
    Ok(Json(RejectResponse { success: true }))
}

/// Restore rejected posts
#[utoipa::path(
    post,
    path = "/users/{user_id}/posts/restore",
    tag = "posts",
    summary = "Restore rejected posts",
    description = "Bring every rejected post of the user back to pending. Idempotent.",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
    ),
    responses(
        (status = 200, description = "Restore result", body = RestoreResponse),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn restore_posts(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<RestoreResponse>> {
    let restored_count = state.coordinator.restore_rejected(user_id).await?;
    Ok(Json(RestoreResponse { restored_count }))
}

/// Edit a post before publishing
#[utoipa::path(
    patch,
    path = "/users/{user_id}/posts/{post_id}",
    tag = "posts",
    summary = "Edit a post before publishing",
    description = "Rewrite a post's text (and optionally its media) while it is pending, \
                   rejected or failed. Edited text is published verbatim, with no \
                   mention rewriting.",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
        ("post_id" = String, Path, description = "Post id (UUID)"),
    ),
    responses(
        (status = 200, description = "Updated post", body = PostResponse),
        (status = 403, description = "Post belongs to another user"),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Post already published or in flight"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn edit_post(
    State(state): State<AppState>,
    Path((user_id, post_id)): Path<(UserId, PostId)>,
    Json(data): Json<PostEdit>,
) -> Result<Json<PostResponse>> {
    let post = state.coordinator.edit(user_id, post_id, &data.into()).await?;
    Ok(Json(PostResponse::from(post)))
}
