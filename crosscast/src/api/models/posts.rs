//! API models for posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::posts::{MediaRef, PostDBResponse, PostEditDBRequest, PostStatus};
use crate::types::{ConversationId, PostId, TweetId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    #[schema(value_type = uuid::Uuid)]
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
}

impl From<PostDBResponse> for PostResponse {
    fn from(post: PostDBResponse) -> Self {
        Self {
            id: post.id,
            tweet_id: post.tweet_id,
            user_id: post.user_id,
            conversation_id: post.conversation_id,
            thread_position: post.thread_position,
            content: post.content,
            media: post.media,
            is_retweet: post.is_retweet,
            quoted_tweet_id: post.quoted_tweet_id,
            status: post.status,
            cast_hash: post.cast_hash,
            cast_url: post.cast_url,
            edited: post.edited,
            edit_count: post.edit_count,
            source_created_at: post.source_created_at,
        }
    }
}

/// Request to edit a post's content before publishing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostEdit {
    pub content: String,
    /// When present, replaces the attached media
    #[serde(default)]
    pub media: Option<Vec<MediaRef>>,
}

impl From<PostEdit> for PostEditDBRequest {
    fn from(edit: PostEdit) -> Self {
        Self {
            content: edit.content,
            media: edit.media,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    /// Number of posts newly stored by this ingest
    pub new_post_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RejectResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestoreResponse {
    pub restored_count: u64,
}
