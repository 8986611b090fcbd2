//! Dummy platform clients.
//!
//! In-process stand-ins for the external APIs, selectable from configuration
//! for local development and reused heavily by unit tests: they record what
//! was published and can be told to fail partway through a thread.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    clients::{CastPlatform, CastReceipt, ClientError, HandleDirectory, RawPost, Result, SourcePlatform},
    config::{DummyDirectoryConfig, DummySourceConfig},
    db::models::posts::MediaRef,
    types::Fid,
};

/// Source platform serving a fixed set of posts
#[derive(Default)]
pub struct DummySource {
    verified_handle: Option<String>,
    posts: Vec<RawPost>,
}

impl From<DummySourceConfig> for DummySource {
    fn from(config: DummySourceConfig) -> Self {
        Self {
            verified_handle: config.verified_handle,
            posts: Vec::new(),
        }
    }
}

impl DummySource {
    pub fn with_posts(verified_handle: &str, posts: Vec<RawPost>) -> Self {
        Self {
            verified_handle: Some(verified_handle.to_string()),
            posts,
        }
    }
}

#[async_trait]
impl SourcePlatform for DummySource {
    async fn verified_handle(&self, _fid: Fid) -> Result<Option<String>> {
        Ok(self.verified_handle.clone())
    }

    async fn recent_posts(&self, handle: &str, limit: u32) -> Result<Vec<RawPost>> {
        if self.verified_handle.as_deref() != Some(handle) {
            return Ok(Vec::new());
        }
        Ok(self.posts.iter().take(limit as usize).cloned().collect())
    }
}

/// A cast recorded by [`DummyCast`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCast {
    pub signer_uuid: String,
    pub text: String,
    pub parent: Option<String>,
}

/// Cast platform that hands out sequential hashes and remembers every publish.
///
/// `fail_from` makes the nth publish (1-based) and everything after it fail,
/// which is how the partial-thread-failure paths are exercised.
#[derive(Default)]
pub struct DummyCast {
    sequence: AtomicU64,
    fail_from: Option<u64>,
    published: Mutex<Vec<RecordedCast>>,
}

impl DummyCast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_from(nth: u64) -> Self {
        Self {
            fail_from: Some(nth),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<RecordedCast> {
        self.published.lock().expect("dummy cast lock poisoned").clone()
    }
}

#[async_trait]
impl CastPlatform for DummyCast {
    async fn publish(&self, signer_uuid: &str, text: &str, _media: &[MediaRef], parent: Option<&str>) -> Result<CastReceipt> {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(fail_from) = self.fail_from
            && n >= fail_from
        {
            return Err(ClientError::Api {
                what: "farcaster",
                status: 503,
                message: "dummy cast platform configured to fail".to_string(),
            });
        }

        self.published.lock().expect("dummy cast lock poisoned").push(RecordedCast {
            signer_uuid: signer_uuid.to_string(),
            text: text.to_string(),
            parent: parent.map(str::to_string),
        });

        let hash = format!("0xdummy{n:04}");
        let url = format!("https://dummy.cast/{hash}");
        Ok(CastReceipt { hash, url })
    }
}

/// Directory backed by a fixed handle map, with per-handle failure injection
#[derive(Default)]
pub struct DummyDirectory {
    entries: HashMap<String, String>,
    failing: HashSet<String>,
}

impl From<DummyDirectoryConfig> for DummyDirectory {
    fn from(config: DummyDirectoryConfig) -> Self {
        Self {
            entries: config.entries,
            failing: HashSet::new(),
        }
    }
}

impl DummyDirectory {
    pub fn with_entries<const N: usize>(entries: [(&str, &str); N]) -> Self {
        Self {
            entries: entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            failing: HashSet::new(),
        }
    }

    pub fn failing_for(mut self, handle: &str) -> Self {
        self.failing.insert(handle.to_lowercase());
        self
    }
}

#[async_trait]
impl HandleDirectory for DummyDirectory {
    async fn lookup(&self, handle: &str) -> Result<Option<String>> {
        let key = handle.to_lowercase();
        if self.failing.contains(&key) {
            return Err(ClientError::Api {
                what: "directory",
                status: 503,
                message: "dummy directory configured to fail".to_string(),
            });
        }
        Ok(self.entries.get(&key).cloned())
    }
}
