//! Handle directory client.
//!
//! Maps a Twitter handle to the Farcaster username of the account that has
//! verified it. A 404 is a positive "known absent" answer and is cached as
//! such by the mention resolver; only transport failures are errors.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    clients::{ClientError, HandleDirectory, Result},
    config::HttpDirectoryConfig,
};

const WHAT: &str = "directory";

pub struct HttpDirectory {
    http: reqwest::Client,
    base_url: url::Url,
    api_key: Option<String>,
}

impl From<HttpDirectoryConfig> for HttpDirectory {
    fn from(config: HttpDirectoryConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client construction only fails on invalid TLS backends");

        Self {
            http,
            base_url: config.base_url,
            api_key: config.api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    username: String,
}

#[async_trait]
impl HandleDirectory for HttpDirectory {
    #[instrument(skip(self), err)]
    async fn lookup(&self, handle: &str) -> Result<Option<String>> {
        let url = self.base_url.join("lookup").map_err(|e| ClientError::Decode {
            what: WHAT,
            message: e.to_string(),
        })?;

        let mut request = self.http.get(url).query(&[("handle", handle)]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|source| ClientError::Transport { what: WHAT, source })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(ClientError::Api {
                what: WHAT,
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|source| ClientError::Transport { what: WHAT, source })?;

        Ok(Some(lookup.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpDirectory {
        HttpDirectory::from(HttpDirectoryConfig {
            base_url: url::Url::parse(&server.uri()).unwrap(),
            api_key: None,
            timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn known_handle_resolves_to_username() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("handle", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"username": "alice.eth"})))
            .mount(&server)
            .await;

        let result = client_for(&server).lookup("alice").await.unwrap();
        assert_eq!(result.as_deref(), Some("alice.eth"));
    }

    #[tokio::test]
    async fn missing_handle_is_known_absent_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lookup"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server).lookup("nobody").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn outage_is_an_error_not_an_absence() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lookup"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).lookup("alice").await.unwrap_err();
        match err {
            ClientError::Api { status, .. } => assert_eq!(status, 503),
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
