//! Database models for posts.

use crate::types::{ConversationId, PostId, TweetId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Publish pipeline status of a post.
///
/// Legal transitions: `pending -> approved -> cast`, `pending -> rejected`,
/// `rejected -> pending` (restore), `approved -> failed`. `cast` is terminal;
/// `failed` is terminal for the core (manual re-approval is a product action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "post_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    Approved,
    Cast,
    Rejected,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Approved => "approved",
            PostStatus::Cast => "cast",
            PostStatus::Rejected => "rejected",
            PostStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media attachment carried along with a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

/// Database request for upserting a post during ingestion.
///
/// Keyed on `tweet_id`: re-ingesting the same tweet refreshes source-side
/// linkage but never touches local status, edits, or cast results.
#[derive(Debug, Clone)]
pub struct PostUpsertDBRequest {
    pub tweet_id: TweetId,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub thread_position: Option<i32>,
    pub content: String,
    pub media: Vec<MediaRef>,
    pub is_retweet: bool,
    pub quoted_tweet_id: Option<TweetId>,
    pub source_created_at: DateTime<Utc>,
}

/// Database request for editing a post's content
#[derive(Debug, Clone)]
pub struct PostEditDBRequest {
    pub content: String,
    pub media: Option<Vec<MediaRef>>,
}

/// Database response for a post
#[derive(Debug, Clone)]
pub struct PostDBResponse {
    pub id: PostId,
    pub tweet_id: TweetId,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub thread_position: Option<i32>,
    pub content: String,
    pub media: Vec<MediaRef>,
    pub is_retweet: bool,
    pub quoted_tweet_id: Option<TweetId>,
    pub status: PostStatus,
    pub cast_hash: Option<String>,
    pub cast_url: Option<String>,
    pub edited: bool,
    pub edit_count: i32,
    pub source_created_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
