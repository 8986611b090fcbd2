//! Database models for users.

use crate::types::{Fid, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating (or re-fetching) a user on first sign-in
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub id: UserId,
    pub fid: Fid,
    pub twitter_handle: String,
    pub farcaster_username: Option<String>,
    pub signer_uuid: Option<String>,
    /// Free casts granted to brand-new accounts (config-driven)
    pub initial_free_casts: i32,
}

/// Database request for updating a user's spending controls
#[derive(Debug, Clone, Default)]
pub struct SpendingUpdateDBRequest {
    pub spending_approved: Option<bool>,
    /// `Some(None)` clears the limit, `None` leaves it untouched
    pub spending_limit: Option<Option<Decimal>>,
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub fid: Fid,
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
