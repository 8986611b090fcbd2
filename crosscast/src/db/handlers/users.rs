//! Database repository for users.
//!
//! Financial fields (balance, total_spent, free cast counters) are only ever
//! mutated through the commit helpers at the bottom of this file, which run
//! inside the publish coordinator's transaction, and through the promo grant.

use crate::types::UserId;
use crate::{
    db::{
        errors::Result,
        models::users::{SpendingUpdateDBRequest, UserCreateDBRequest, UserDBResponse},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub fid: i64,
    pub twitter_handle: String,
    pub farcaster_username: Option<String>,
    pub signer_uuid: Option<String>,
    pub balance: Decimal,
    pub spending_approved: bool,
    pub spending_limit: Option<Decimal>,
    pub total_spent: Decimal,
    pub free_casts_given: i32,
    pub free_casts_remaining: i32,
    pub promo_cast_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            fid: user.fid,
            twitter_handle: user.twitter_handle,
            farcaster_username: user.farcaster_username,
            signer_uuid: user.signer_uuid,
            balance: user.balance,
            spending_approved: user.spending_approved,
            spending_limit: user.spending_limit,
            total_spent: user.total_spent,
            free_casts_given: user.free_casts_given,
            free_casts_remaining: user.free_casts_remaining,
            promo_cast_hash: user.promo_cast_hash,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Create a user on first sign-in, or refresh linkage fields if the row
    /// already exists. New accounts receive their initial free cast grant;
    /// existing accounts keep all financial state untouched.
    #[instrument(skip(self, request), fields(user_id = request.id), err)]
    pub async fn create_or_get(&mut self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (id, fid, twitter_handle, farcaster_username, signer_uuid,
                 free_casts_given, free_casts_remaining)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (id) DO UPDATE SET
                twitter_handle = EXCLUDED.twitter_handle,
                farcaster_username = COALESCE(EXCLUDED.farcaster_username, users.farcaster_username),
                signer_uuid = COALESCE(EXCLUDED.signer_uuid, users.signer_uuid),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.fid)
        .bind(&request.twitter_handle)
        .bind(&request.farcaster_username)
        .bind(&request.signer_uuid)
        .bind(request.initial_free_casts)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user.into())
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    /// Update spending controls (approval flag and/or limit)
    #[instrument(skip(self, request), err)]
    pub async fn update_spending(&mut self, id: UserId, request: &SpendingUpdateDBRequest) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                spending_approved = COALESCE($2, spending_approved),
                spending_limit = CASE WHEN $3 THEN $4 ELSE spending_limit END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.spending_approved)
        .bind(request.spending_limit.is_some())
        .bind(request.spending_limit.flatten())
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user.map(UserDBResponse::from))
    }

    /// Record the promotional cast and grant its free credits, at most once.
    /// Returns `None` if the promo was already claimed.
    #[instrument(skip(self, cast_hash), err)]
    pub async fn grant_promo(&mut self, id: UserId, cast_hash: &str, free_casts: i32) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                promo_cast_hash = $2,
                free_casts_given = free_casts_given + $3,
                free_casts_remaining = free_casts_remaining + $3,
                updated_at = NOW()
            WHERE id = $1 AND promo_cast_hash IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(cast_hash)
        .bind(free_casts)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user.map(UserDBResponse::from))
    }
}

/// Consume one free cast credit. Returns false if none remained - callers must
/// treat that as a failed authorization, not an error.
pub async fn consume_free_cast(conn: &mut PgConnection, user_id: UserId) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            free_casts_remaining = free_casts_remaining - 1,
            updated_at = NOW()
        WHERE id = $1 AND free_casts_remaining > 0
        "#,
    )
    .bind(user_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Deduct `amount` from the balance and add it to total_spent, re-checking
/// balance and limit under the row lock so a stale advisory authorization can
/// never overdraw. Returns false when the conditions no longer hold.
pub async fn debit_balance(conn: &mut PgConnection, user_id: UserId, amount: Decimal) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            balance = balance - $2,
            total_spent = total_spent + $2,
            updated_at = NOW()
        WHERE id = $1
          AND balance >= $2
          AND (spending_limit IS NULL OR total_spent + $2 <= spending_limit)
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
