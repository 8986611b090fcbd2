//! Database repository for posts.
//!
//! All status changes go through conditional updates ("set status X only if
//! currently Y") so that concurrent publish attempts race safely: the loser
//! of a transition sees zero rows affected and treats it as a benign no-op.

use crate::types::{abbrev_uuid, ConversationId, PostId, UserId};
use crate::{
    db::{
        errors::Result,
        models::posts::{MediaRef, PostDBResponse, PostEditDBRequest, PostStatus, PostUpsertDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Post {
    pub id: PostId,
    pub tweet_id: String,
    pub user_id: UserId,
    pub conversation_id: String,
    pub thread_position: Option<i32>,
    pub content: String,
    pub media: Json<Vec<MediaRef>>,
    pub is_retweet: bool,
    pub quoted_tweet_id: Option<String>,
    pub status: PostStatus,
    pub cast_hash: Option<String>,
    pub cast_url: Option<String>,
    pub edited: bool,
    pub edit_count: i32,
    pub source_created_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Post plus the "was this row just inserted" marker from the upsert
#[derive(Debug, FromRow)]
struct UpsertedPost {
    #[sqlx(flatten)]
    post: Post,
    inserted: bool,
}

impl From<Post> for PostDBResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            tweet_id: post.tweet_id,
            user_id: post.user_id,
            conversation_id: post.conversation_id,
            thread_position: post.thread_position,
            content: post.content,
            media: post.media.0,
            is_retweet: post.is_retweet,
            quoted_tweet_id: post.quoted_tweet_id,
            status: post.status,
            cast_hash: post.cast_hash,
            cast_url: post.cast_url,
            edited: post.edited,
            edit_count: post.edit_count,
            source_created_at: post.source_created_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

pub struct Posts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Posts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Idempotent ingestion upsert keyed on the tweet id.
    ///
    /// Re-ingesting refreshes thread linkage from the source but preserves
    /// local state: status and cast results are never touched, and content is
    /// only refreshed while the post has not been edited locally.
    ///
    /// Returns the stored post and whether a new row was created.
    #[instrument(skip(self, request), fields(tweet_id = %request.tweet_id), err)]
    pub async fn upsert(&mut self, request: &PostUpsertDBRequest) -> Result<(PostDBResponse, bool)> {
        let row = sqlx::query_as::<_, UpsertedPost>(
            r#"
            INSERT INTO posts
                (id, tweet_id, user_id, conversation_id, thread_position, content,
                 media, is_retweet, quoted_tweet_id, source_created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (tweet_id) DO UPDATE SET
                conversation_id = EXCLUDED.conversation_id,
                thread_position = EXCLUDED.thread_position,
                is_retweet = EXCLUDED.is_retweet,
                quoted_tweet_id = EXCLUDED.quoted_tweet_id,
                content = CASE WHEN posts.edited THEN posts.content ELSE EXCLUDED.content END,
                media = CASE WHEN posts.edited THEN posts.media ELSE EXCLUDED.media END,
                updated_at = NOW()
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.tweet_id)
        .bind(request.user_id)
        .bind(&request.conversation_id)
        .bind(request.thread_position)
        .bind(&request.content)
        .bind(Json(&request.media))
        .bind(request.is_retweet)
        .bind(&request.quoted_tweet_id)
        .bind(request.source_created_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok((row.post.into(), row.inserted))
    }

    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: PostId) -> Result<Option<PostDBResponse>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(post.map(PostDBResponse::from))
    }

    /// All posts of a conversation. Thread ordering is applied by the
    /// assembler, not here.
    #[instrument(skip(self), err)]
    pub async fn list_by_conversation(&mut self, conversation_id: &ConversationId) -> Result<Vec<PostDBResponse>> {
        let posts = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE conversation_id = $1 ORDER BY created_at, id")
            .bind(conversation_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(posts.into_iter().map(PostDBResponse::from).collect())
    }

    /// Claim every pending post of a conversation for publishing, atomically.
    ///
    /// A single conditional UPDATE makes the claim all-or-nothing under
    /// concurrency: of two racing approvals one gets every pending post and
    /// the other gets none, so a thread can never be split between two
    /// publishers or charged twice.
    #[instrument(skip(self), err)]
    pub async fn claim_pending(&mut self, conversation_id: &ConversationId, user_id: UserId) -> Result<Vec<PostDBResponse>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET status = 'approved', updated_at = NOW()
            WHERE conversation_id = $1 AND user_id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(posts.into_iter().map(PostDBResponse::from).collect())
    }

    /// Conditionally move a post from `from` to `to`. Returns false when the
    /// post was not in `from` anymore - the caller lost the race and must
    /// treat it as already-advanced, not as an error.
    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn transition(&mut self, id: PostId, from: PostStatus, to: PostStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record a successful publish: `approved -> cast` plus the returned
    /// hash/url, in one conditional statement so the cast-hash invariant and
    /// the transition commit together.
    #[instrument(skip(self, cast_hash, cast_url), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_cast(&mut self, id: PostId, cast_hash: &str, cast_url: &str) -> Result<Option<PostDBResponse>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET status = 'cast', cast_hash = $2, cast_url = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'approved'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(cast_hash)
        .bind(cast_url)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(post.map(PostDBResponse::from))
    }

    /// Bulk-restore every rejected post of a user back to pending.
    /// Restoring with nothing rejected is a no-op, not an error.
    #[instrument(skip(self), err)]
    pub async fn restore_rejected(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE posts SET status = 'pending', updated_at = NOW() WHERE user_id = $1 AND status = 'rejected'")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// Apply a content edit. Status is guarded here as well as in the
    /// coordinator: edits are only legal outside a publish in flight.
    #[instrument(skip(self, request), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn edit(&mut self, id: PostId, request: &PostEditDBRequest) -> Result<Option<PostDBResponse>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET
                content = $2,
                media = CASE WHEN $3 THEN $4 ELSE media END,
                edited = TRUE,
                edit_count = edit_count + 1,
                updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'rejected', 'failed')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.content)
        .bind(request.media.is_some())
        .bind(Json(request.media.clone().unwrap_or_default()))
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(post.map(PostDBResponse::from))
    }
}
