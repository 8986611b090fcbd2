//! External platform clients.
//!
//! This module defines the traits the publish pipeline depends on:
//! [`SourcePlatform`] (the Twitter read side), [`CastPlatform`] (the Farcaster
//! write side) and [`HandleDirectory`] (Twitter handle to Farcaster username
//! lookup). Each has an HTTP implementation and a dummy implementation,
//! selected from configuration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    config::{CastConfig, DirectoryConfig, SourceConfig},
    db::models::posts::MediaRef,
    types::{ConversationId, Fid, TweetId},
};

pub mod directory;
pub mod dummy;
pub mod farcaster;
pub mod twitter;

/// Create the tweet-reading client from configuration.
///
/// This is the single point where config becomes a client instance; adding a
/// new source platform means adding a match arm here.
pub fn create_source(config: &SourceConfig) -> Arc<dyn SourcePlatform> {
    match config {
        SourceConfig::Twitter(twitter) => Arc::new(twitter::TwitterClient::from(twitter.clone())),
        SourceConfig::Dummy(dummy) => Arc::new(dummy::DummySource::from(dummy.clone())),
    }
}

/// Create the cast-publishing client from configuration
pub fn create_cast(config: &CastConfig) -> Arc<dyn CastPlatform> {
    match config {
        CastConfig::Farcaster(farcaster) => Arc::new(farcaster::FarcasterClient::from(farcaster.clone())),
        CastConfig::Dummy(_) => Arc::new(dummy::DummyCast::new()),
    }
}

/// Create the handle-directory client from configuration
pub fn create_directory(config: &DirectoryConfig) -> Arc<dyn HandleDirectory> {
    match config {
        DirectoryConfig::Http(http) => Arc::new(directory::HttpDirectory::from(http.clone())),
        DirectoryConfig::Dummy(dummy) => Arc::new(dummy::DummyDirectory::from(dummy.clone())),
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the platform clients.
///
/// Everything here maps to an upstream failure at the service boundary; the
/// `what` label names the service for the 502 body and the logs.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{what} API returned {status}: {message}")]
    Api { what: &'static str, status: u16, message: String },

    #[error("{what} request failed: {source}")]
    Transport {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected {what} response: {message}")]
    Decode { what: &'static str, message: String },
}

impl ClientError {
    pub fn what(&self) -> &'static str {
        match self {
            ClientError::Api { what, .. } | ClientError::Transport { what, .. } | ClientError::Decode { what, .. } => what,
        }
    }
}

/// A tweet as fetched from the source platform, before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPost {
    pub tweet_id: TweetId,
    pub conversation_id: ConversationId,
    pub content: String,
    pub media: Vec<MediaRef>,
    pub is_retweet: bool,
    pub quoted_tweet_id: Option<TweetId>,
    pub created_at: DateTime<Utc>,
}

/// A successfully published cast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastReceipt {
    pub hash: String,
    pub url: String,
}

/// Read access to the source platform (Twitter)
#[async_trait]
pub trait SourcePlatform: Send + Sync {
    /// The Twitter handle this Farcaster identity has verified, if any
    async fn verified_handle(&self, fid: Fid) -> Result<Option<String>>;

    /// Most recent tweets for a handle, newest first, including retweet and
    /// quote linkage. Does not filter retweets; ingestion decides what to keep.
    async fn recent_posts(&self, handle: &str, limit: u32) -> Result<Vec<RawPost>>;
}

/// Write access to the cast platform (Farcaster).
///
/// The write API has no idempotency key, so callers must claim the post in
/// the database before calling [`CastPlatform::publish`].
#[async_trait]
pub trait CastPlatform: Send + Sync {
    /// Publish a cast, optionally as a reply to `parent` (a cast hash)
    async fn publish(&self, signer_uuid: &str, text: &str, media: &[MediaRef], parent: Option<&str>) -> Result<CastReceipt>;
}

/// Twitter handle to Farcaster username lookup
#[async_trait]
pub trait HandleDirectory: Send + Sync {
    /// `Ok(Some(username))` when the handle maps to a Farcaster user,
    /// `Ok(None)` when the directory positively knows it does not, and `Err`
    /// only for transport/availability failures.
    async fn lookup(&self, handle: &str) -> Result<Option<String>>;
}
