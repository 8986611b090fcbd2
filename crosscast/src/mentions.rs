//! Mention rewriting.
//!
//! Tweets mention people by Twitter handle; casts should mention the same
//! people by Farcaster username. The resolver scans text for `@handle`
//! tokens, resolves each distinct handle through the [`HandleDirectory`]
//! behind an in-process cache, and rewrites the ones that resolve. A handle
//! that cannot be resolved, for whatever reason, is left exactly as written:
//! a degraded mention is better than a failed publish.

use moka::{Expiry, future::Cache};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

use crate::clients::HandleDirectory;

/// Handles that resolved stay cached for a day
const POSITIVE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Handles known absent are retried after an hour, since people do link
/// their accounts over time
const NEGATIVE_TTL: Duration = Duration::from_secs(60 * 60);

const CACHE_CAPACITY: u64 = 100_000;

// A leading [^\w@] keeps email addresses and already-doubled @@ out
static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|[^\w@])@(\w{1,15})").expect("mention regex is valid"));

struct MentionExpiry;

impl Expiry<String, Option<String>> for MentionExpiry {
    fn expire_after_create(&self, _key: &String, value: &Option<String>, _created_at: Instant) -> Option<Duration> {
        Some(if value.is_some() { POSITIVE_TTL } else { NEGATIVE_TTL })
    }
}

enum Resolution {
    Resolved(String),
    Absent,
    /// Directory unavailable: leave the mention alone and cache nothing
    Unavailable,
}

pub struct MentionResolver {
    directory: Arc<dyn HandleDirectory>,
    cache: Cache<String, Option<String>>,
}

impl MentionResolver {
    pub fn new(directory: Arc<dyn HandleDirectory>) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .expire_after(MentionExpiry)
            .build();

        Self { directory, cache }
    }

    /// Rewrite every resolvable `@twitterhandle` in `text` to the
    /// corresponding `@farcasterusername`. Never fails: unresolvable mentions
    /// pass through verbatim. With the `already_converted` hint set the text
    /// is returned unchanged.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn resolve(&self, text: &str, already_converted: bool) -> String {
        if already_converted {
            return text.to_string();
        }

        let mut handles: Vec<String> = MENTION
            .captures_iter(text)
            .map(|caps| caps[2].to_lowercase())
            .collect();
        handles.sort();
        handles.dedup();

        if handles.is_empty() {
            return text.to_string();
        }

        let lookups = handles.iter().map(|handle| self.resolve_handle(handle));
        let resolutions: HashMap<String, Resolution> = handles.iter().cloned().zip(futures::future::join_all(lookups).await).collect();

        MENTION
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let prefix = &caps[1];
                match resolutions.get(&caps[2].to_lowercase()) {
                    Some(Resolution::Resolved(username)) => format!("{prefix}@{username}"),
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    async fn resolve_handle(&self, handle: &str) -> Resolution {
        if let Some(cached) = self.cache.get(handle).await {
            return match cached {
                Some(username) => Resolution::Resolved(username),
                None => Resolution::Absent,
            };
        }

        match self.directory.lookup(handle).await {
            Ok(result) => {
                self.cache.insert(handle.to_string(), result.clone()).await;
                match result {
                    Some(username) => Resolution::Resolved(username),
                    None => Resolution::Absent,
                }
            }
            Err(error) => {
                tracing::warn!(handle, %error, "directory lookup failed, leaving mention as-is");
                Resolution::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::dummy::DummyDirectory;
    use crate::clients::{ClientError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resolver(directory: DummyDirectory) -> MentionResolver {
        MentionResolver::new(Arc::new(directory))
    }

    #[tokio::test]
    async fn rewrites_known_handles() {
        let resolver = resolver(DummyDirectory::with_entries([("alice", "alice.eth"), ("bob", "bob-fc")]));

        let out = resolver.resolve("shipping with @alice and @bob today", false).await;
        assert_eq!(out, "shipping with @alice.eth and @bob-fc today");
    }

    #[tokio::test]
    async fn unknown_handles_pass_through() {
        let resolver = resolver(DummyDirectory::with_entries([("alice", "alice.eth")]));

        let out = resolver.resolve("cc @alice @stranger", false).await;
        assert_eq!(out, "cc @alice.eth @stranger");
    }

    #[tokio::test]
    async fn handle_matching_is_case_insensitive() {
        let resolver = resolver(DummyDirectory::with_entries([("alice", "alice.eth")]));

        let out = resolver.resolve("hi @Alice", false).await;
        assert_eq!(out, "hi @alice.eth");
    }

    #[tokio::test]
    async fn already_converted_text_is_untouched() {
        let resolver = resolver(DummyDirectory::with_entries([("alice", "alice.eth")]));

        let out = resolver.resolve("hi @alice", true).await;
        assert_eq!(out, "hi @alice");
    }

    #[tokio::test]
    async fn email_addresses_are_not_mentions() {
        let resolver = resolver(DummyDirectory::with_entries([("example", "nope")]));

        let out = resolver.resolve("mail me at bob@example.com", false).await;
        assert_eq!(out, "mail me at bob@example.com");
    }

    #[tokio::test]
    async fn directory_failure_degrades_instead_of_failing() {
        let directory = DummyDirectory::with_entries([("alice", "alice.eth"), ("bob", "bob-fc")]).failing_for("bob");
        let resolver = resolver(directory);

        let out = resolver.resolve("ping @alice and @bob", false).await;
        assert_eq!(out, "ping @alice.eth and @bob");
    }

    struct CountingDirectory {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl HandleDirectory for CountingDirectory {
        async fn lookup(&self, handle: &str) -> Result<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            match handle {
                "alice" => Ok(Some("alice.eth".to_string())),
                "down" => Err(ClientError::Api {
                    what: "directory",
                    status: 503,
                    message: "down".to_string(),
                }),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn repeated_handles_hit_the_cache() {
        let directory = Arc::new(CountingDirectory { lookups: AtomicUsize::new(0) });
        let resolver = MentionResolver::new(directory.clone());

        resolver.resolve("hey @alice", false).await;
        resolver.resolve("again @alice @alice", false).await;

        assert_eq!(directory.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn negative_results_are_cached_too() {
        let directory = Arc::new(CountingDirectory { lookups: AtomicUsize::new(0) });
        let resolver = MentionResolver::new(directory.clone());

        resolver.resolve("hey @stranger", false).await;
        resolver.resolve("hey @stranger", false).await;

        assert_eq!(directory.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_lookups_are_not_cached() {
        let directory = Arc::new(CountingDirectory { lookups: AtomicUsize::new(0) });
        let resolver = MentionResolver::new(directory.clone());

        resolver.resolve("hey @down", false).await;
        resolver.resolve("hey @down", false).await;

        // Each resolve retried the directory because failures leave no entry
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 2);
    }
}
