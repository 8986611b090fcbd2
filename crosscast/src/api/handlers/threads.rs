use crate::{
    api::models::threads::{ApproveResponse, ThreadResponse},
    errors::Result,
    types::{ConversationId, UserId},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
};

/// Preview a thread
#[utoipa::path(
    get,
    path = "/users/{user_id}/threads/{conversation_id}",
    tag = "threads",
    summary = "Preview a thread",
    description = "Assemble the posts of a conversation in publish order, with the fixed \
                   cost approving it would incur.",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
        ("conversation_id" = String, Path, description = "Conversation id (root tweet id)"),
    ),
    responses(
        (status = 200, description = "The thread", body = ThreadResponse),
        (status = 403, description = "Thread belongs to another user"),
        (status = 404, description = "No posts for this conversation"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn get_thread(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(UserId, ConversationId)>,
) -> Result<Json<ThreadResponse>> {
    let thread = state.coordinator.thread(user_id, &conversation_id).await?;
    Ok(Json(ThreadResponse::from(thread)))
}

/// Approve and publish a thread
#[utoipa::path(
    post,
    path = "/users/{user_id}/threads/{conversation_id}/approve",
    tag = "threads",
    summary = "Approve and publish a thread",
    description = "Approve every pending post of a thread and publish them to Farcaster \
                   in order, each cast replying to the previous one. The fixed thread \
                   cost is charged only when the whole thread publishes; a free cast \
                   credit is consumed instead when one remains.",
    params(
        ("user_id" = i64, Path, description = "Twitter numeric user id"),
        ("conversation_id" = String, Path, description = "Conversation id (root tweet id)"),
    ),
    responses(
        (status = 200, description = "Publish result", body = ApproveResponse),
        (status = 400, description = "Account has no Farcaster signer"),
        (status = 402, description = "Spend denied", body = crate::errors::DeniedBody),
        (status = 403, description = "Thread belongs to another user"),
        (status = 404, description = "No posts for this conversation"),
        (status = 409, description = "Thread already decided or claimed by a concurrent approval"),
        (status = 502, description = "Farcaster publish failed"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn approve_thread(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(UserId, ConversationId)>,
) -> Result<Json<ApproveResponse>> {
    let outcome = state.coordinator.approve_thread(user_id, &conversation_id).await?;

    Ok(Json(ApproveResponse {
        published_posts: outcome.published.into_iter().map(Into::into).collect(),
        cost_charged: outcome.cost_charged,
    }))
}
