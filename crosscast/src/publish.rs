//! The publish coordinator.
//!
//! Drives each post through `pending -> approved -> cast` exactly once and
//! keeps the financial state consistent while doing it. The rules that make
//! this safe under concurrency and partial failure:
//!
//! - A thread's pending posts are claimed with one all-or-nothing conditional
//!   update before any external call; the loser of a racing approval claims
//!   nothing and gets a conflict.
//! - Every status change is conditional on the current status, so a commit
//!   can never be applied twice.
//! - The charge lands in the same transaction as the final post's `cast`
//!   commit, and only when the whole thread published. A thread that fails
//!   partway costs nothing.
//! - The Farcaster write API is the source of truth across crashes: we would
//!   rather leave a published cast uncharged than charge for one that never
//!   went out.

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::{
    clients::{CastPlatform, RawPost, SourcePlatform},
    config::{BillingConfig, IngestConfig},
    db::{
        errors::DbError,
        handlers::{Posts, Users, users as user_commits},
        models::posts::{PostDBResponse, PostEditDBRequest, PostStatus, PostUpsertDBRequest},
        models::users::UserDBResponse,
    },
    errors::{Error, Result},
    mentions::MentionResolver,
    spend::{self, Authorization, Funding},
    threads::ThreadGroup,
    types::{ConversationId, PostId, UserId},
};

/// Result of a successful thread approval
#[derive(Debug)]
pub struct PublishOutcome {
    /// The posts published by this call, in publish order
    pub published: Vec<PostDBResponse>,
    /// Amount actually debited (zero when a free cast funded the publish)
    pub cost_charged: Decimal,
}

/// Result of a promo claim
#[derive(Debug)]
pub struct PromoOutcome {
    pub cast_hash: String,
    pub free_casts_granted: i32,
    pub already_claimed: bool,
}

pub struct PublishCoordinator {
    db: PgPool,
    billing: BillingConfig,
    ingest: IngestConfig,
    source: Arc<dyn SourcePlatform>,
    cast: Arc<dyn CastPlatform>,
    mentions: MentionResolver,
}

impl PublishCoordinator {
    pub fn new(
        db: PgPool,
        billing: BillingConfig,
        ingest: IngestConfig,
        source: Arc<dyn SourcePlatform>,
        cast: Arc<dyn CastPlatform>,
        mentions: MentionResolver,
    ) -> Self {
        Self {
            db,
            billing,
            ingest,
            source,
            cast,
            mentions,
        }
    }

    async fn user(&self, user_id: UserId) -> Result<UserDBResponse> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        Users::new(&mut conn).get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: user_id.to_string(),
        })
    }

    /// Fetch the user's recent tweets and store the ones we have not seen.
    /// Returns the number of newly created posts; re-running against the same
    /// upstream data returns zero and changes nothing.
    #[instrument(skip(self), err)]
    pub async fn ingest(&self, user_id: UserId) -> Result<u64> {
        let user = self.user(user_id).await?;

        let handle = self
            .source
            .verified_handle(user.fid)
            .await?
            .ok_or(Error::NotVerified { fid: user.fid })?;

        let raw_posts = self.source.recent_posts(&handle, self.ingest.effective_page_size()).await?;
        let positions = thread_positions(&raw_posts);

        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let mut posts = Posts::new(&mut conn);

        let mut created = 0;
        for (raw, position) in raw_posts.into_iter().zip(positions) {
            let request = PostUpsertDBRequest {
                tweet_id: raw.tweet_id,
                user_id,
                conversation_id: raw.conversation_id,
                thread_position: position,
                content: raw.content,
                media: raw.media,
                is_retweet: raw.is_retweet,
                quoted_tweet_id: raw.quoted_tweet_id,
                source_created_at: raw.created_at,
            };
            let (_, inserted) = posts.upsert(&request).await?;
            if inserted {
                created += 1;
            }
        }

        tracing::info!(user_id, created, "ingest complete");
        Ok(created)
    }

    /// Assemble a thread for preview
    #[instrument(skip(self), err)]
    pub async fn thread(&self, user_id: UserId, conversation_id: &ConversationId) -> Result<ThreadGroup> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let posts = Posts::new(&mut conn).list_by_conversation(conversation_id).await?;

        if posts.iter().any(|post| post.user_id != user_id) {
            return Err(Error::Unauthorized);
        }

        ThreadGroup::assemble(conversation_id.clone(), posts, self.billing.thread_cost).ok_or_else(|| Error::NotFound {
            resource: "Thread".to_string(),
            id: conversation_id.clone(),
        })
    }

    /// Approve and synchronously publish every pending post of a thread.
    ///
    /// The spend gate is consulted first with the fixed thread cost; a denial
    /// comes back before any state changes. On allow, the pending posts are
    /// claimed atomically and published in order, each cast replying to the
    /// previous one.
    #[instrument(skip(self), err)]
    pub async fn approve_thread(&self, user_id: UserId, conversation_id: &ConversationId) -> Result<PublishOutcome> {
        let user = self.user(user_id).await?;
        let thread = self.thread(user_id, conversation_id).await?;

        if !thread.can_publish() {
            return Err(Error::InvalidState {
                action: "approve",
                status: "already decided".to_string(),
            });
        }

        let signer_uuid = user.signer_uuid.clone().ok_or_else(|| Error::BadRequest {
            message: "Account has no Farcaster signer; connect one before publishing".to_string(),
        })?;

        let funding = match spend::authorize(&user, thread.total_cost) {
            Authorization::Allow(funding) => funding,
            Authorization::Deny(reason) => return Err(Error::Denied(reason)),
        };

        // Claim the whole thread or nothing. An empty claim means a
        // concurrent approval got there first.
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let mut claimed = Posts::new(&mut conn).claim_pending(conversation_id, user_id).await?;
        drop(conn);

        if claimed.is_empty() {
            return Err(Error::InvalidState {
                action: "approve",
                status: PostStatus::Approved.to_string(),
            });
        }

        // Publish in thread order; claim_pending returns rows unordered
        let order: HashMap<PostId, usize> = thread.posts.iter().enumerate().map(|(i, post)| (post.id, i)).collect();
        claimed.sort_by_key(|post| order.get(&post.id).copied().unwrap_or(usize::MAX));

        // A partially published thread resumes by replying to its last cast
        let mut parent = thread
            .posts
            .iter()
            .rev()
            .find(|post| post.status == PostStatus::Cast)
            .and_then(|post| post.cast_hash.clone());

        let total = claimed.len();
        let mut published = Vec::with_capacity(total);
        let mut cost_charged = Decimal::ZERO;

        for (index, post) in claimed.iter().enumerate() {
            let text = self.mentions.resolve(&post.content, post.edited).await;

            let receipt = match self.cast.publish(&signer_uuid, &text, &post.media, parent.as_deref()).await {
                Ok(receipt) => receipt,
                Err(error) => {
                    self.fail_rest(&claimed[index..]).await?;
                    return Err(error.into());
                }
            };

            let is_final = index + 1 == total;
            if is_final {
                // Commit the last cast and the charge together
                let mut tx = self.db.begin().await.map_err(DbError::from)?;
                let committed = Posts::new(&mut tx).mark_cast(post.id, &receipt.hash, &receipt.url).await?;
                let Some(committed) = committed else {
                    tx.rollback().await.map_err(DbError::from)?;
                    return Err(Error::InvalidState {
                        action: "commit",
                        status: "no longer approved".to_string(),
                    });
                };

                match funding {
                    Funding::FreeCast => {
                        if !user_commits::consume_free_cast(&mut tx, user_id).await? {
                            tracing::warn!(user_id, "free cast disappeared between authorize and commit, publishing uncharged");
                        }
                    }
                    Funding::Balance => {
                        if user_commits::debit_balance(&mut tx, user_id, thread.total_cost).await? {
                            cost_charged = thread.total_cost;
                        } else {
                            tracing::warn!(user_id, "balance or limit changed between authorize and commit, publishing uncharged");
                        }
                    }
                }

                tx.commit().await.map_err(DbError::from)?;
                published.push(committed);
            } else {
                let mut conn = self.db.acquire().await.map_err(DbError::from)?;
                let committed = Posts::new(&mut conn).mark_cast(post.id, &receipt.hash, &receipt.url).await?;
                match committed {
                    Some(committed) => published.push(committed),
                    None => {
                        return Err(Error::InvalidState {
                            action: "commit",
                            status: "no longer approved".to_string(),
                        });
                    }
                }
            }

            parent = Some(receipt.hash);
        }

        tracing::info!(user_id, %conversation_id, published = published.len(), %cost_charged, "thread published");
        Ok(PublishOutcome { published, cost_charged })
    }

    /// Mark the given claimed posts failed. Later posts would have replied to
    /// a parent that never published, so the whole tail goes down together.
    async fn fail_rest(&self, remaining: &[PostDBResponse]) -> Result<()> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let mut posts = Posts::new(&mut conn);
        for post in remaining {
            posts.transition(post.id, PostStatus::Approved, PostStatus::Failed).await?;
        }
        Ok(())
    }

    /// Decline a pending post. No financial effect.
    #[instrument(skip(self), err)]
    pub async fn reject(&self, user_id: UserId, post_id: PostId) -> Result<()> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let mut posts = Posts::new(&mut conn);

        let post = posts.get_by_id(post_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Post".to_string(),
            id: post_id.to_string(),
        })?;
        if post.user_id != user_id {
            return Err(Error::Unauthorized);
        }

        if posts.transition(post_id, PostStatus::Pending, PostStatus::Rejected).await? {
            Ok(())
        } else {
            Err(Error::InvalidState {
                action: "reject",
                status: post.status.to_string(),
            })
        }
    }

    /// Bring every rejected post of a user back to pending. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn restore_rejected(&self, user_id: UserId) -> Result<u64> {
        self.user(user_id).await?;

        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let restored = Posts::new(&mut conn).restore_rejected(user_id).await?;
        Ok(restored)
    }

    /// Edit a post's content before (or after a failed) publish
    #[instrument(skip(self, request), err)]
    pub async fn edit(&self, user_id: UserId, post_id: PostId, request: &PostEditDBRequest) -> Result<PostDBResponse> {
        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let mut posts = Posts::new(&mut conn);

        let post = posts.get_by_id(post_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Post".to_string(),
            id: post_id.to_string(),
        })?;
        if post.user_id != user_id {
            return Err(Error::Unauthorized);
        }

        posts.edit(post_id, request).await?.ok_or_else(|| Error::InvalidState {
            action: "edit",
            status: post.status.to_string(),
        })
    }

    /// Publish the promotional cast and grant its free credits, at most once
    /// per user. A second claim reports the existing cast without publishing
    /// or granting again.
    #[instrument(skip(self), err)]
    pub async fn claim_promo(&self, user_id: UserId) -> Result<PromoOutcome> {
        let user = self.user(user_id).await?;

        if let Some(cast_hash) = user.promo_cast_hash {
            return Ok(PromoOutcome {
                cast_hash,
                free_casts_granted: 0,
                already_claimed: true,
            });
        }

        let signer_uuid = user.signer_uuid.ok_or_else(|| Error::BadRequest {
            message: "Account has no Farcaster signer; connect one before publishing".to_string(),
        })?;

        let receipt = self.cast.publish(&signer_uuid, &self.billing.promo_text, &[], None).await?;

        let mut conn = self.db.acquire().await.map_err(DbError::from)?;
        let mut users = Users::new(&mut conn);
        match users.grant_promo(user_id, &receipt.hash, self.billing.promo_free_casts).await? {
            Some(_) => Ok(PromoOutcome {
                cast_hash: receipt.hash,
                free_casts_granted: self.billing.promo_free_casts,
                already_claimed: false,
            }),
            None => {
                // Raced with another claim; report theirs
                let user = users.get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
                    resource: "User".to_string(),
                    id: user_id.to_string(),
                })?;
                Ok(PromoOutcome {
                    cast_hash: user.promo_cast_hash.unwrap_or(receipt.hash),
                    free_casts_granted: 0,
                    already_claimed: true,
                })
            }
        }
    }
}

/// Infer 1-based thread positions for a fetched page.
///
/// Positions are only assigned when the page contains the conversation root
/// (the tweet whose id equals the conversation id); a partial tail of a
/// thread would otherwise get misnumbered, so those posts stay positionless
/// and sort by timestamp instead.
fn thread_positions(raw_posts: &[RawPost]) -> Vec<Option<i32>> {
    let mut by_conversation: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, raw) in raw_posts.iter().enumerate() {
        by_conversation.entry(raw.conversation_id.as_str()).or_default().push(index);
    }

    let mut positions = vec![None; raw_posts.len()];
    for (conversation_id, mut indices) in by_conversation {
        indices.sort_by_key(|&i| (raw_posts[i].created_at, raw_posts[i].tweet_id.clone()));
        let has_root = raw_posts[indices[0]].tweet_id == conversation_id;
        if !has_root {
            continue;
        }
        for (position, index) in indices.into_iter().enumerate() {
            positions[index] = Some(position as i32 + 1);
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::dummy::{DummyCast, DummyDirectory, DummySource};
    use crate::test_utils::{create_test_user, raw_post, seed_thread, TestUser};
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn billing() -> BillingConfig {
        BillingConfig {
            thread_cost: dec("0.10"),
            initial_free_casts: 0,
            promo_free_casts: 5,
            promo_text: "promo".to_string(),
        }
    }

    fn coordinator_with(pool: PgPool, source: DummySource, cast: Arc<DummyCast>) -> PublishCoordinator {
        let directory = Arc::new(DummyDirectory::with_entries([("alice", "alice.eth")]));
        PublishCoordinator::new(
            pool,
            billing(),
            IngestConfig::default(),
            Arc::new(source),
            cast,
            MentionResolver::new(directory),
        )
    }

    fn coordinator(pool: PgPool, cast: Arc<DummyCast>) -> PublishCoordinator {
        coordinator_with(pool, DummySource::default(), cast)
    }

    async fn balances(pool: &PgPool, user_id: UserId) -> (Decimal, Decimal, i32) {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_id(user_id).await.unwrap().unwrap();
        (user.balance, user.total_spent, user.free_casts_remaining)
    }

    async fn post_statuses(pool: &PgPool, conversation_id: &str) -> Vec<PostStatus> {
        let mut conn = pool.acquire().await.unwrap();
        let mut posts = Posts::new(&mut conn)
            .list_by_conversation(&conversation_id.to_string())
            .await
            .unwrap();
        posts.sort_by_key(|p| p.thread_position);
        posts.iter().map(|p| p.status).collect()
    }

    #[test]
    fn positions_assigned_only_with_the_root_present() {
        let at = |h| Utc.with_ymd_and_hms(2026, 8, 1, h, 0, 0).unwrap();
        let raws = vec![
            raw_post("t2", "t1", "second", at(2)),
            raw_post("t1", "t1", "first", at(1)),
            raw_post("t9", "t5", "tail without root", at(3)),
        ];

        let positions = thread_positions(&raws);
        assert_eq!(positions, vec![Some(2), Some(1), None]);
    }

    #[sqlx::test]
    async fn ingest_is_idempotent(pool: PgPool) {
        let user = create_test_user(&pool).await;
        let at = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let source = DummySource::with_posts(
            "alice",
            vec![raw_post("t1", "t1", "hello", at), raw_post("t2", "t1", "again", at)],
        );

        let coordinator = coordinator_with(pool.clone(), source, Arc::new(DummyCast::new()));

        assert_eq!(coordinator.ingest(user.id).await.unwrap(), 2);
        assert_eq!(coordinator.ingest(user.id).await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn unverified_account_cannot_ingest(pool: PgPool) {
        let user = create_test_user(&pool).await;
        let coordinator = coordinator_with(pool, DummySource::default(), Arc::new(DummyCast::new()));

        let err = coordinator.ingest(user.id).await.unwrap_err();
        assert!(matches!(err, Error::NotVerified { .. }));
    }

    #[sqlx::test]
    async fn free_cast_funds_a_publish_without_touching_balance(pool: PgPool) {
        let user = TestUser::new().free_casts(1).balance("0.50").create(&pool).await;
        seed_thread(&pool, user.id, "conv", 1).await;

        let cast = Arc::new(DummyCast::new());
        let outcome = coordinator(pool.clone(), cast.clone()).approve_thread(user.id, &"conv".to_string()).await.unwrap();

        assert_eq!(outcome.published.len(), 1);
        assert_eq!(outcome.cost_charged, Decimal::ZERO);

        let (balance, total_spent, free_remaining) = balances(&pool, user.id).await;
        assert_eq!(balance, dec("0.50"));
        assert_eq!(total_spent, Decimal::ZERO);
        assert_eq!(free_remaining, 0);
        assert_eq!(cast.published().len(), 1);
    }

    #[sqlx::test]
    async fn balance_publish_charges_exactly_the_thread_cost(pool: PgPool) {
        let user = TestUser::new().approved().balance("1.00").create(&pool).await;
        seed_thread(&pool, user.id, "conv", 3).await;

        let outcome = coordinator(pool.clone(), Arc::new(DummyCast::new()))
            .approve_thread(user.id, &"conv".to_string())
            .await
            .unwrap();

        assert_eq!(outcome.published.len(), 3);
        assert_eq!(outcome.cost_charged, dec("0.10"));

        let (balance, total_spent, _) = balances(&pool, user.id).await;
        assert_eq!(balance, dec("0.90"));
        assert_eq!(total_spent, dec("0.10"));
        assert_eq!(post_statuses(&pool, "conv").await, vec![PostStatus::Cast; 3]);
    }

    #[sqlx::test]
    async fn insufficient_balance_is_denied_without_state_change(pool: PgPool) {
        let user = TestUser::new().approved().balance("0.05").create(&pool).await;
        seed_thread(&pool, user.id, "conv", 1).await;

        let err = coordinator(pool.clone(), Arc::new(DummyCast::new()))
            .approve_thread(user.id, &"conv".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Denied(crate::spend::DenyReason::InsufficientBalance)));
        assert_eq!(post_statuses(&pool, "conv").await, vec![PostStatus::Pending]);
        let (balance, _, _) = balances(&pool, user.id).await;
        assert_eq!(balance, dec("0.05"));
    }

    #[sqlx::test]
    async fn partial_failure_charges_nothing(pool: PgPool) {
        let user = TestUser::new().approved().balance("1.00").create(&pool).await;
        seed_thread(&pool, user.id, "conv", 3).await;

        // Second publish call fails, so post 1 goes out and 2/3 do not
        let cast = Arc::new(DummyCast::failing_from(2));
        let err = coordinator(pool.clone(), cast)
            .approve_thread(user.id, &"conv".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream { .. }));
        assert_eq!(
            post_statuses(&pool, "conv").await,
            vec![PostStatus::Cast, PostStatus::Failed, PostStatus::Failed]
        );

        let (balance, total_spent, _) = balances(&pool, user.id).await;
        assert_eq!(balance, dec("1.00"));
        assert_eq!(total_spent, Decimal::ZERO);
    }

    #[sqlx::test]
    async fn replies_chain_to_their_parents(pool: PgPool) {
        let user = TestUser::new().approved().balance("1.00").create(&pool).await;
        seed_thread(&pool, user.id, "conv", 3).await;

        let cast = Arc::new(DummyCast::new());
        coordinator(pool, cast.clone()).approve_thread(user.id, &"conv".to_string()).await.unwrap();

        let published = cast.published();
        assert_eq!(published[0].parent, None);
        assert_eq!(published[1].parent.as_deref(), Some("0xdummy0001"));
        assert_eq!(published[2].parent.as_deref(), Some("0xdummy0002"));
    }

    #[sqlx::test]
    async fn concurrent_approvals_publish_and_charge_once(pool: PgPool) {
        let user = TestUser::new().approved().balance("1.00").create(&pool).await;
        seed_thread(&pool, user.id, "conv", 2).await;

        let cast = Arc::new(DummyCast::new());
        let coordinator = Arc::new(coordinator(pool.clone(), cast.clone()));

        let conv = "conv".to_string();
        let (a, b) = tokio::join!(
            coordinator.approve_thread(user.id, &conv),
            coordinator.approve_thread(user.id, &conv),
        );

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|&&ok| ok).count();
        assert_eq!(successes, 1, "exactly one approval must win");
        assert_eq!(cast.published().len(), 2, "the thread must publish once");

        let (balance, total_spent, _) = balances(&pool, user.id).await;
        assert_eq!(balance, dec("0.90"));
        assert_eq!(total_spent, dec("0.10"));
    }

    #[sqlx::test]
    async fn mentions_are_rewritten_before_publishing(pool: PgPool) {
        let user = TestUser::new().free_casts(1).create(&pool).await;
        seed_thread(&pool, user.id, "conv", 1).await;
        sqlx::query("UPDATE posts SET content = 'shoutout to @alice' WHERE conversation_id = 'conv'")
            .execute(&pool)
            .await
            .unwrap();

        let cast = Arc::new(DummyCast::new());
        coordinator(pool, cast.clone()).approve_thread(user.id, &"conv".to_string()).await.unwrap();

        assert_eq!(cast.published()[0].text, "shoutout to @alice.eth");
    }

    #[sqlx::test]
    async fn reject_and_restore_round_trip(pool: PgPool) {
        let user = TestUser::new().create(&pool).await;
        let post_ids = seed_thread(&pool, user.id, "conv", 2).await;

        let coordinator = coordinator(pool.clone(), Arc::new(DummyCast::new()));
        coordinator.reject(user.id, post_ids[0]).await.unwrap();
        assert_eq!(post_statuses(&pool, "conv").await, vec![PostStatus::Rejected, PostStatus::Pending]);

        // Rejecting again conflicts
        let err = coordinator.reject(user.id, post_ids[0]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        assert_eq!(coordinator.restore_rejected(user.id).await.unwrap(), 1);
        assert_eq!(post_statuses(&pool, "conv").await, vec![PostStatus::Pending; 2]);

        // Nothing left to restore
        assert_eq!(coordinator.restore_rejected(user.id).await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn another_users_post_is_off_limits(pool: PgPool) {
        let owner = TestUser::new().create(&pool).await;
        let intruder = TestUser::new().id(999).fid(999).create(&pool).await;
        let post_ids = seed_thread(&pool, owner.id, "conv", 1).await;

        let coordinator = coordinator(pool, Arc::new(DummyCast::new()));
        let err = coordinator.reject(intruder.id, post_ids[0]).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[sqlx::test]
    async fn edits_are_blocked_while_published(pool: PgPool) {
        let user = TestUser::new().free_casts(1).create(&pool).await;
        let post_ids = seed_thread(&pool, user.id, "conv", 1).await;

        let coordinator = coordinator(pool.clone(), Arc::new(DummyCast::new()));
        let request = PostEditDBRequest {
            content: "reworded".to_string(),
            media: None,
        };

        let edited = coordinator.edit(user.id, post_ids[0], &request).await.unwrap();
        assert_eq!(edited.content, "reworded");
        assert!(edited.edited);
        assert_eq!(edited.edit_count, 1);

        coordinator.approve_thread(user.id, &"conv".to_string()).await.unwrap();
        let err = coordinator.edit(user.id, post_ids[0], &request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[sqlx::test]
    async fn promo_grants_credits_at_most_once(pool: PgPool) {
        let user = TestUser::new().create(&pool).await;
        let coordinator = coordinator(pool.clone(), Arc::new(DummyCast::new()));

        let first = coordinator.claim_promo(user.id).await.unwrap();
        assert!(!first.already_claimed);
        assert_eq!(first.free_casts_granted, 5);

        let second = coordinator.claim_promo(user.id).await.unwrap();
        assert!(second.already_claimed);
        assert_eq!(second.free_casts_granted, 0);
        assert_eq!(second.cast_hash, first.cast_hash);

        let (_, _, free_remaining) = balances(&pool, user.id).await;
        assert_eq!(free_remaining, 5);
    }
}
