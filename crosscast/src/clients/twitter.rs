//! Twitter read client.
//!
//! Fetches a user's recent tweets through the v2 API, and resolves the
//! Twitter handle a Farcaster account has verified through the Farcaster
//! identity API (verified accounts live on the Farcaster side, not Twitter's).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    clients::{ClientError, RawPost, Result, SourcePlatform},
    config::TwitterSourceConfig,
    db::models::posts::{MediaKind, MediaRef},
    types::Fid,
};

const WHAT: &str = "twitter";

pub struct TwitterClient {
    http: reqwest::Client,
    base_url: url::Url,
    bearer_token: String,
    identity_base_url: url::Url,
    identity_api_key: String,
}

impl From<TwitterSourceConfig> for TwitterClient {
    fn from(config: TwitterSourceConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client construction only fails on invalid TLS backends");

        Self {
            http,
            base_url: config.base_url,
            bearer_token: config.bearer_token,
            identity_base_url: config.identity_base_url,
            identity_api_key: config.identity_api_key,
        }
    }
}

// Twitter v2 wire shapes, reduced to the fields we read

#[derive(Debug, Deserialize)]
struct UserLookupResponse {
    data: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    conversation_id: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    referenced_tweets: Vec<ReferencedTweet>,
    attachments: Option<Attachments>,
}

#[derive(Debug, Deserialize)]
struct ReferencedTweet {
    #[serde(rename = "type")]
    kind: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    media_key: String,
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
    preview_image_url: Option<String>,
}

// Farcaster identity API shapes (verified accounts per fid)

#[derive(Debug, Deserialize)]
struct BulkUsersResponse {
    #[serde(default)]
    users: Vec<FarcasterUser>,
}

#[derive(Debug, Deserialize)]
struct FarcasterUser {
    #[serde(default)]
    verified_accounts: Vec<VerifiedAccount>,
}

#[derive(Debug, Deserialize)]
struct VerifiedAccount {
    platform: String,
    username: String,
}

impl TwitterClient {
    fn api_error(status: reqwest::StatusCode, body: String) -> ClientError {
        ClientError::Api {
            what: WHAT,
            status: status.as_u16(),
            message: body,
        }
    }

    fn transport(source: reqwest::Error) -> ClientError {
        ClientError::Transport { what: WHAT, source }
    }

    async fn user_id_for_handle(&self, handle: &str) -> Result<Option<String>> {
        let url = self
            .base_url
            .join(&format!("2/users/by/username/{handle}"))
            .map_err(|e| ClientError::Decode {
                what: WHAT,
                message: e.to_string(),
            })?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(Self::transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::api_error(status, response.text().await.unwrap_or_default()));
        }

        let lookup: UserLookupResponse = response.json().await.map_err(Self::transport)?;
        Ok(lookup.data.map(|user| user.id))
    }
}

#[async_trait]
impl SourcePlatform for TwitterClient {
    #[instrument(skip(self), err)]
    async fn verified_handle(&self, fid: Fid) -> Result<Option<String>> {
        let url = self
            .identity_base_url
            .join(&format!("v2/farcaster/user/bulk?fids={fid}"))
            .map_err(|e| ClientError::Decode {
                what: WHAT,
                message: e.to_string(),
            })?;

        let response = self
            .http
            .get(url)
            .header("x-api-key", &self.identity_api_key)
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::api_error(status, response.text().await.unwrap_or_default()));
        }

        let bulk: BulkUsersResponse = response.json().await.map_err(Self::transport)?;
        let handle = bulk
            .users
            .into_iter()
            .flat_map(|user| user.verified_accounts)
            .find(|account| account.platform == "x")
            .map(|account| account.username);

        Ok(handle)
    }

    #[instrument(skip(self), fields(handle = %handle), err)]
    async fn recent_posts(&self, handle: &str, limit: u32) -> Result<Vec<RawPost>> {
        let Some(user_id) = self.user_id_for_handle(handle).await? else {
            return Ok(Vec::new());
        };

        let url = self
            .base_url
            .join(&format!("2/users/{user_id}/tweets"))
            .map_err(|e| ClientError::Decode {
                what: WHAT,
                message: e.to_string(),
            })?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("max_results", limit.to_string()),
                ("tweet.fields", "conversation_id,created_at,referenced_tweets,attachments".to_string()),
                ("expansions", "attachments.media_keys".to_string()),
                ("media.fields", "url,preview_image_url,type".to_string()),
            ])
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::api_error(status, response.text().await.unwrap_or_default()));
        }

        let timeline: TimelineResponse = response.json().await.map_err(Self::transport)?;

        let media_by_key: std::collections::HashMap<&str, &Media> =
            timeline.includes.media.iter().map(|media| (media.media_key.as_str(), media)).collect();

        let posts = timeline
            .data
            .into_iter()
            .map(|tweet| {
                let media = tweet
                    .attachments
                    .as_ref()
                    .map(|attachments| {
                        attachments
                            .media_keys
                            .iter()
                            .filter_map(|key| media_by_key.get(key.as_str()))
                            .filter_map(|media| {
                                let kind = match media.kind.as_str() {
                                    "photo" => MediaKind::Photo,
                                    "video" | "animated_gif" => MediaKind::Video,
                                    _ => return None,
                                };
                                // Videos only carry a preview image on the timeline endpoint
                                let url = media.url.clone().or_else(|| media.preview_image_url.clone())?;
                                Some(MediaRef { url, kind })
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                let is_retweet = tweet.referenced_tweets.iter().any(|r| r.kind == "retweeted");
                let quoted_tweet_id = tweet
                    .referenced_tweets
                    .iter()
                    .find(|r| r.kind == "quoted")
                    .map(|r| r.id.clone());

                RawPost {
                    tweet_id: tweet.id,
                    conversation_id: tweet.conversation_id,
                    content: tweet.text,
                    media,
                    is_retweet,
                    quoted_tweet_id,
                    created_at: tweet.created_at,
                }
            })
            .collect();

        Ok(posts)
    }
}
