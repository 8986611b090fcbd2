//! API models for user accounts and spending controls.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::db::models::users::{SpendingUpdateDBRequest, UserCreateDBRequest, UserDBResponse};
use crate::types::{Fid, UserId};

/// Request to create (or re-link) an account. Sent by the sign-in
/// collaborator after it has authenticated the user on both platforms.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCreate {
    /// Twitter numeric user id
    pub id: UserId,
    /// Farcaster id
    pub fid: Fid,
    pub twitter_handle: String,
    #[serde(default)]
    pub farcaster_username: Option<String>,
    /// Farcaster signer credential used to publish on the user's behalf
    #[serde(default)]
    pub signer_uuid: Option<String>,
}

impl UserCreate {
    pub fn into_db_request(self, initial_free_casts: i32) -> UserCreateDBRequest {
        UserCreateDBRequest {
            id: self.id,
            fid: self.fid,
            twitter_handle: self.twitter_handle,
            farcaster_username: self.farcaster_username,
            signer_uuid: self.signer_uuid,
            initial_free_casts,
        }
    }
}

/// Request to update spending controls.
///
/// `spending_limit` distinguishes "absent" (leave unchanged) from `null`
/// (remove the limit).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SpendingUpdate {
    #[serde(default)]
    pub spending_approved: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub spending_limit: Option<Option<Decimal>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl From<SpendingUpdate> for SpendingUpdateDBRequest {
    fn from(update: SpendingUpdate) -> Self {
        Self {
            spending_approved: update.spending_approved,
            spending_limit: update.spending_limit,
        }
    }
}

/// Financial state snapshot of an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub fid: Fid,
    pub twitter_handle: String,
    pub farcaster_username: Option<String>,
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub spending_approved: bool,
    #[schema(value_type = Option<String>)]
    pub spending_limit: Option<Decimal>,
    #[schema(value_type = String)]
    pub total_spent: Decimal,
    pub free_casts_given: i32,
    pub free_casts_remaining: i32,
    /// Whether the promotional cast has been claimed
    pub promo_claimed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(user: UserDBResponse) -> Self {
        Self {
            id: user.id,
            fid: user.fid,
            twitter_handle: user.twitter_handle,
            farcaster_username: user.farcaster_username,
            balance: user.balance,
            spending_approved: user.spending_approved,
            spending_limit: user.spending_limit,
            total_spent: user.total_spent,
            free_casts_given: user.free_casts_given,
            free_casts_remaining: user.free_casts_remaining,
            promo_claimed: user.promo_cast_hash.is_some(),
            created_at: user.created_at,
        }
    }
}

/// Response for a promo claim
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromoResponse {
    pub cast_hash: String,
    pub free_casts_granted: i32,
    pub already_claimed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spending_limit_null_clears_while_absent_preserves() {
        let absent: SpendingUpdate = serde_json::from_str(r#"{"spending_approved": true}"#).unwrap();
        assert_eq!(absent.spending_limit, None);

        let null: SpendingUpdate = serde_json::from_str(r#"{"spending_limit": null}"#).unwrap();
        assert_eq!(null.spending_limit, Some(None));

        let set: SpendingUpdate = serde_json::from_str(r#"{"spending_limit": "5.00"}"#).unwrap();
        assert_eq!(set.spending_limit, Some(Some(Decimal::new(500, 2))));
    }
}
