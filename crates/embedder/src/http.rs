use crate::{EmbedError, Embedder};
use async_trait::async_trait;
use core_types::config::EmbedderConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn from_config(cfg: &EmbedderConfig, dimensions: usize) -> Result<Self, EmbedError> {
        let endpoint = cfg
            .endpoint
            .clone()
            .ok_or_else(|| EmbedError::Config("http backend needs embedder.endpoint".into()))?;

        let api_key = cfg.api_key_env.as_deref().and_then(|var| match std::env::var(var) {
            Ok(key) => Some(key),
            Err(_) => {
                warn!(var, "api key variable not set; sending unauthenticated requests");
                None
            }
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            model: cfg.model.clone(),
            api_key,
            dimensions,
        })
    }

    fn request_body<'a>(&'a self, text: &'a str) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            model: &self.model,
            input: [text],
        }
    }
}

fn parse_response(body: &str) -> Result<Vec<f32>, EmbedError> {
    let parsed: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| EmbedError::Malformed(e.to_string()))?;
    parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| EmbedError::Malformed("response contained no embeddings".into()))
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> &'static str {
        "http"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut req = self.client.post(&self.endpoint).json(&self.request_body(text));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let vector = parse_response(&body)?;
        debug!(len = vector.len(), chars = text.len(), "remote embedding received");
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> HttpEmbedder {
        let cfg = EmbedderConfig {
            endpoint: Some("http://127.0.0.1:9/v1/embeddings".into()),
            model: "test-model".into(),
            ..EmbedderConfig::default()
        };
        HttpEmbedder::from_config(&cfg, 3).expect("client")
    }

    #[test]
    fn request_matches_openai_shape() {
        let e = embedder();
        let json = serde_json::to_value(e.request_body("hello")).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["input"][0], "hello");
    }

    #[test]
    fn first_embedding_is_returned() {
        let body = r#"{"object":"list","data":[{"index":0,"embedding":[0.1,0.2,0.3]}],"model":"m"}"#;
        assert_eq!(parse_response(body).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn empty_or_invalid_responses_are_malformed() {
        assert!(matches!(parse_response(r#"{"data":[]}"#), Err(EmbedError::Malformed(_))));
        assert!(matches!(parse_response("not json"), Err(EmbedError::Malformed(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_request_error() {
        let err = embedder().embed("text").await.unwrap_err();
        assert!(matches!(err, EmbedError::Request(_)));
    }
}
