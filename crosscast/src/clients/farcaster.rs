//! Farcaster write client.
//!
//! Publishes casts through a Neynar-style managed-signer API. The write API
//! has no idempotency key; callers claim the post in the database before
//! calling [`CastPlatform::publish`] so a retry never double-posts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    clients::{CastPlatform, CastReceipt, ClientError, Result},
    config::FarcasterCastConfig,
    db::models::posts::MediaRef,
};

const WHAT: &str = "farcaster";

pub struct FarcasterClient {
    http: reqwest::Client,
    base_url: url::Url,
    api_key: String,
    cast_url_base: String,
}

impl From<FarcasterCastConfig> for FarcasterClient {
    fn from(config: FarcasterCastConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client construction only fails on invalid TLS backends");

        Self {
            http,
            base_url: config.base_url,
            api_key: config.api_key,
            cast_url_base: config.cast_url_base.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PublishCastRequest<'a> {
    signer_uuid: &'a str,
    text: &'a str,
    embeds: Vec<Embed<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublishCastResponse {
    cast: PublishedCast,
}

#[derive(Debug, Deserialize)]
struct PublishedCast {
    hash: String,
}

#[async_trait]
impl CastPlatform for FarcasterClient {
    #[instrument(skip(self, signer_uuid, text, media), fields(text_len = text.len(), parent = ?parent), err)]
    async fn publish(&self, signer_uuid: &str, text: &str, media: &[MediaRef], parent: Option<&str>) -> Result<CastReceipt> {
        let url = self.base_url.join("v2/farcaster/cast").map_err(|e| ClientError::Decode {
            what: WHAT,
            message: e.to_string(),
        })?;

        let request = PublishCastRequest {
            signer_uuid,
            text,
            embeds: media.iter().map(|m| Embed { url: &m.url }).collect(),
            parent,
        };

        let response = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { what: WHAT, source })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ClientError::Api {
                what: WHAT,
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let published: PublishCastResponse = response
            .json()
            .await
            .map_err(|source| ClientError::Transport { what: WHAT, source })?;

        let hash = published.cast.hash;
        let url = format!("{}/{hash}", self.cast_url_base);

        Ok(CastReceipt { hash, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::posts::MediaKind;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> FarcasterClient {
        FarcasterClient::from(FarcasterCastConfig {
            base_url: url::Url::parse(&server.uri()).unwrap(),
            api_key: "test-key".to_string(),
            cast_url_base: "https://warpcast.example/~/conversations".to_string(),
            timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn publishes_cast_with_media_and_parent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/farcaster/cast"))
            .and(header("x-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "signer_uuid": "signer-1",
                "text": "gm",
                "embeds": [{"url": "https://pbs.example/a.jpg"}],
                "parent": "0xparent"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cast": {"hash": "0xabc123"}
            })))
            .mount(&server)
            .await;

        let media = vec![MediaRef { url: "https://pbs.example/a.jpg".to_string(), kind: MediaKind::Photo }];
        let receipt = client_for(&server)
            .publish("signer-1", "gm", &media, Some("0xparent"))
            .await
            .unwrap();

        assert_eq!(receipt.hash, "0xabc123");
        assert_eq!(receipt.url, "https://warpcast.example/~/conversations/0xabc123");
    }

    #[tokio::test]
    async fn parent_is_omitted_for_thread_roots() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/farcaster/cast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cast": {"hash": "0xroot"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = client_for(&server).publish("signer-1", "first", &[], None).await.unwrap();
        assert_eq!(receipt.hash, "0xroot");
    }

    #[tokio::test]
    async fn rejected_cast_surfaces_as_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/farcaster/cast"))
            .respond_with(ResponseTemplate::new(402).set_body_string("signer not funded"))
            .mount(&server)
            .await;

        let err = client_for(&server).publish("signer-1", "gm", &[], None).await.unwrap_err();
        match err {
            ClientError::Api { status, message, .. } => {
                assert_eq!(status, 402);
                assert!(message.contains("signer not funded"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
