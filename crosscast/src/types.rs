//! Common type definitions.
//!
//! Entity identifiers:
//!
//! - [`UserId`]: Twitter numeric user id, the primary identity of an account
//! - [`Fid`]: the same account's Farcaster id
//! - [`PostId`]: internal post identifier
//! - [`TweetId`]: source-platform post id (Twitter snowflakes are serialized
//!   as strings by the v2 API, so they stay strings here)
//! - [`ConversationId`]: Twitter conversation id shared by all posts of a thread

use uuid::Uuid;

pub type UserId = i64;
pub type Fid = i64;
pub type PostId = Uuid;
pub type TweetId = String;
pub type ConversationId = String;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
