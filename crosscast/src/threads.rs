//! Thread reconstruction and cost computation.
//!
//! Posts sharing a conversation id form a thread. Ordering puts explicitly
//! positioned posts first (by position), then positionless ones, tiebreaking
//! by source timestamp and finally internal id so the order is total and
//! stable across assemblies.

use rust_decimal::Decimal;

use crate::db::models::posts::{PostDBResponse, PostStatus};
use crate::types::ConversationId;

#[derive(Debug, Clone)]
pub struct ThreadGroup {
    pub conversation_id: ConversationId,
    /// All posts of the conversation, in publish order
    pub posts: Vec<PostDBResponse>,
    /// Fixed per-thread charge, independent of thread length
    pub total_cost: Decimal,
}

impl ThreadGroup {
    /// Build a thread from the stored posts of one conversation.
    /// Returns `None` when there are no posts to group.
    pub fn assemble(conversation_id: ConversationId, mut posts: Vec<PostDBResponse>, cost_per_thread: Decimal) -> Option<Self> {
        if posts.is_empty() {
            return None;
        }

        posts.sort_by(|a, b| publish_order_key(a).cmp(&publish_order_key(b)));

        Some(Self {
            conversation_id,
            posts,
            total_cost: cost_per_thread,
        })
    }

    /// The posts still awaiting a publish decision, in publish order
    pub fn pending_posts(&self) -> Vec<&PostDBResponse> {
        self.posts.iter().filter(|post| post.status == PostStatus::Pending).collect()
    }

    /// A thread can be approved while at least one post is pending
    pub fn can_publish(&self) -> bool {
        self.posts.iter().any(|post| post.status == PostStatus::Pending)
    }
}

fn publish_order_key(post: &PostDBResponse) -> (bool, i32, chrono::DateTime<chrono::Utc>, uuid::Uuid) {
    (
        post.thread_position.is_none(),
        post.thread_position.unwrap_or(0),
        post.source_created_at,
        post.id,
    )
}
