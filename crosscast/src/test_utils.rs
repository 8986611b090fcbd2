//! Shared fixtures for unit and integration tests.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::clients::RawPost;
use crate::clients::dummy::{DummyCast, DummyDirectory, DummySource};
use crate::db::models::posts::{PostDBResponse, PostStatus};
use crate::db::models::users::UserDBResponse;
use crate::mentions::MentionResolver;
use crate::publish::PublishCoordinator;
use crate::types::{PostId, UserId};
use crate::{AppState, Config, build_router};
use std::sync::Arc;

/// Test server wired to dummy platform clients. The source platform serves no
/// posts; use [`create_test_app_with_source`] for ingestion tests.
pub async fn create_test_app(pool: PgPool) -> axum_test::TestServer {
    create_test_app_with_source(pool, DummySource::default()).await
}

pub async fn create_test_app_with_source(pool: PgPool, source: DummySource) -> axum_test::TestServer {
    let config = Config::default();
    let directory = Arc::new(DummyDirectory::with_entries([("alice", "alice.eth")]));

    let coordinator = Arc::new(PublishCoordinator::new(
        pool.clone(),
        config.billing.clone(),
        config.ingest.clone(),
        Arc::new(source),
        Arc::new(DummyCast::new()),
        MentionResolver::new(directory),
    ));

    let state = AppState::builder().db(pool).config(config).coordinator(coordinator).build();
    let router = build_router(state).expect("failed to build router");
    axum_test::TestServer::new(router).expect("failed to create test server")
}

/// In-memory post for pure assembler tests
pub fn make_post(tweet_id: &str, conversation_id: &str, thread_position: Option<i32>, source_created_at: DateTime<Utc>) -> PostDBResponse {
    PostDBResponse {
        id: Uuid::new_v4(),
        tweet_id: tweet_id.to_string(),
        user_id: 777,
        conversation_id: conversation_id.to_string(),
        thread_position,
        content: format!("content of {tweet_id}"),
        media: vec![],
        is_retweet: false,
        quoted_tweet_id: None,
        status: PostStatus::Pending,
        cast_hash: None,
        cast_url: None,
        edited: false,
        edit_count: 0,
        source_created_at,
        created_at: source_created_at,
        updated_at: source_created_at,
    }
}

/// Raw source-platform post for ingestion tests
pub fn raw_post(tweet_id: &str, conversation_id: &str, content: &str, created_at: DateTime<Utc>) -> RawPost {
    RawPost {
        tweet_id: tweet_id.to_string(),
        conversation_id: conversation_id.to_string(),
        content: content.to_string(),
        media: vec![],
        is_retweet: false,
        quoted_tweet_id: None,
        created_at,
    }
}

/// Builder for a user row with the financial state a test needs
pub struct TestUser {
    id: UserId,
    fid: i64,
    balance: Decimal,
    spending_approved: bool,
    spending_limit: Option<Decimal>,
    free_casts: i32,
}

impl TestUser {
    pub fn new() -> Self {
        Self {
            id: 777,
            fid: 42,
            balance: Decimal::ZERO,
            spending_approved: false,
            spending_limit: None,
            free_casts: 0,
        }
    }

    pub fn id(mut self, id: UserId) -> Self {
        self.id = id;
        self
    }

    pub fn fid(mut self, fid: i64) -> Self {
        self.fid = fid;
        self
    }

    pub fn balance(mut self, balance: &str) -> Self {
        self.balance = Decimal::from_str(balance).unwrap();
        self
    }

    pub fn approved(mut self) -> Self {
        self.spending_approved = true;
        self
    }

    pub fn limit(mut self, limit: &str) -> Self {
        self.spending_limit = Some(Decimal::from_str(limit).unwrap());
        self
    }

    pub fn free_casts(mut self, n: i32) -> Self {
        self.free_casts = n;
        self
    }

    pub async fn create(self, pool: &PgPool) -> UserDBResponse {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, fid, twitter_handle, farcaster_username, signer_uuid, balance,
                 spending_approved, spending_limit, free_casts_given, free_casts_remaining)
            VALUES ($1, $2, 'alice', 'alice.eth', 'signer-test', $3, $4, $5, $6, $6)
            "#,
        )
        .bind(self.id)
        .bind(self.fid)
        .bind(self.balance)
        .bind(self.spending_approved)
        .bind(self.spending_limit)
        .bind(self.free_casts)
        .execute(pool)
        .await
        .expect("failed to insert test user");

        let mut conn = pool.acquire().await.unwrap();
        crate::db::handlers::Users::new(&mut conn)
            .get_by_id(self.id)
            .await
            .unwrap()
            .expect("test user should exist")
    }
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn create_test_user(pool: &PgPool) -> UserDBResponse {
    TestUser::new().create(pool).await
}

/// Insert `count` pending posts forming one thread, positions 1..=count.
/// Returns the post ids in thread order.
pub async fn seed_thread(pool: &PgPool, user_id: UserId, conversation_id: &str, count: i32) -> Vec<PostId> {
    let mut ids = Vec::with_capacity(count as usize);
    for position in 1..=count {
        let id = Uuid::new_v4();
        let created = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, position as u32).unwrap();
        sqlx::query(
            r#"
            INSERT INTO posts
                (id, tweet_id, user_id, conversation_id, thread_position, content,
                 media, is_retweet, source_created_at)
            VALUES ($1, $2, $3, $4, $5, $6, '[]', FALSE, $7)
            "#,
        )
        .bind(id)
        .bind(format!("{conversation_id}-tweet-{position}"))
        .bind(user_id)
        .bind(conversation_id)
        .bind(position)
        .bind(format!("post {position} of {conversation_id}"))
        .bind(created)
        .execute(pool)
        .await
        .expect("failed to insert test post");
        ids.push(id);
    }
    ids
}
