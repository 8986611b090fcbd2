//! API models for threads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::posts::PostResponse;
use crate::threads::ThreadGroup;
use crate::types::ConversationId;

/// A thread with its publishing state and the cost to approve it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadResponse {
    pub conversation_id: ConversationId,
    /// Posts in publish order
    pub posts: Vec<PostResponse>,
    /// Number of posts still awaiting a decision
    pub pending_count: usize,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    pub can_publish: bool,
}

impl From<ThreadGroup> for ThreadResponse {
    fn from(thread: ThreadGroup) -> Self {
        let pending_count = thread.pending_posts().len();
        let can_publish = thread.can_publish();
        Self {
            conversation_id: thread.conversation_id,
            pending_count,
            total_cost: thread.total_cost,
            can_publish,
            posts: thread.posts.into_iter().map(PostResponse::from).collect(),
        }
    }
}

/// Result of approving a thread
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApproveResponse {
    /// Posts published by this approval, in publish order
    pub published_posts: Vec<PostResponse>,
    /// Amount debited from the balance; zero for free casts
    #[schema(value_type = String)]
    pub cost_charged: Decimal,
}
