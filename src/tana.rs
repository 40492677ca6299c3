use crate::batch::Envelope;
use crate::error::SyncError;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://europe-west1-tagr-prod.cloudfunctions.net/addToNodeV2";
pub const TOKEN_ENV: &str = "TANA_API_TOKEN";

/// Status and raw body of one API call; interpretation is left to the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }

    /// Node ids from a `{"children":[{"nodeId":..}, ..]}` body, in response order.
    pub fn node_ids(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Created {
            #[serde(rename = "nodeId")]
            node_id: String,
        }

        #[derive(Deserialize)]
        struct CreatedNodes {
            #[serde(default)]
            children: Vec<Created>,
        }

        let parsed: CreatedNodes = serde_json::from_str(&self.body)
            .with_context(|| format!("failed to parse api response: {}", self.body))?;
        Ok(parsed.children.into_iter().map(|c| c.node_id).collect())
    }
}

#[async_trait::async_trait]
pub trait TanaApi: Send + Sync {
    async fn post(&self, envelope: &Envelope<'_>) -> Result<ApiResponse>;
}

pub struct TanaClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl TanaClient {
    pub fn new_with_timeout(endpoint: &str, token: &str, timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(SyncError::MissingToken.into());
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { http, endpoint: endpoint.to_string(), token: token.trim().to_string() })
    }
}

#[async_trait::async_trait]
impl TanaApi for TanaClient {
    async fn post(&self, envelope: &Envelope<'_>) -> Result<ApiResponse> {
        log::debug!("POST {} target={:?} nodes={}", self.endpoint, envelope.target_node_id, envelope.nodes.len());
        let res = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("request timed out: {}", e)
                } else {
                    anyhow::anyhow!("network error: {}", e)
                }
            })?;
        let status = res.status().as_u16();
        let body = res.text().await.context("reading api response body")?;
        log::debug!("response status={} body_len={}", status, body.len());
        Ok(ApiResponse { status, body })
    }
}

/// Resolves the token from the flag, then `TANA_API_TOKEN` (after loading `.env`).
pub fn resolve_token(cli_token: Option<&str>) -> Result<String> {
    dotenvy::dotenv().ok();
    let token = cli_token
        .map(str::to_string)
        .or_else(|| std::env::var(TOKEN_ENV).ok())
        .filter(|t| !t.trim().is_empty());
    token.ok_or_else(|| SyncError::MissingToken.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_positionally() {
        let resp = ApiResponse {
            status: 200,
            body: r#"{"children":[{"nodeId":"a1","name":"X"},{"nodeId":"b2"}]}"#.into(),
        };
        assert!(resp.is_ok());
        assert_eq!(resp.node_ids().unwrap(), vec!["a1".to_string(), "b2".to_string()]);
    }

    #[test]
    fn missing_children_is_empty() {
        let resp = ApiResponse { status: 200, body: "{}".into() };
        assert!(resp.node_ids().unwrap().is_empty());
    }

    #[test]
    fn garbage_body_is_a_parse_error() {
        let resp = ApiResponse { status: 200, body: "<html>".into() };
        assert!(resp.node_ids().unwrap_err().to_string().contains("failed to parse"));
    }

    #[test]
    fn client_requires_token() {
        let err = TanaClient::new_with_timeout(DEFAULT_ENDPOINT, "  ", Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err.downcast_ref::<SyncError>(), Some(SyncError::MissingToken)));
    }

    #[tokio::test]
    async fn truncated_body_is_an_error() {
        use std::io::{Read, Write};
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/addToNodeV2", listener.local_addr().unwrap());
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            stream.write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\nshort").unwrap();
        });

        let client = TanaClient::new_with_timeout(&endpoint, "tok", Duration::from_secs(5)).unwrap();
        let nodes: Vec<crate::nodes::ApiNode> = Vec::new();
        let err = client.post(&Envelope::new(crate::batch::Target::Inbox, &nodes)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("reading api response body"));
        server.join().unwrap();
    }

    #[test]
    fn flag_token_wins() {
        assert_eq!(resolve_token(Some("tok")).unwrap(), "tok");
    }
}
