use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::language::LanguageTag;
use super::{GenerateRequest, ModelHealth, ModelOutput, TranslationModel, Tokenizer};

#[derive(Debug, Serialize)]
struct TokenizeRequest<'a> {
    text: &'a str,
    lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    count: usize,
}

/// Client for a model server exposing `/tokenize`, `/generate` and `/health`.
pub struct HttpModel {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, ModelError> {
        let url = format!("{}{}", self.endpoint, path);
        debug!("Sending model request to: {}", url);

        let response = self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        self.decode(response).await
    }

    async fn decode<R: DeserializeOwned>(&self, response: reqwest::Response) -> std::result::Result<R, ModelError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, error_text));
        }

        response.json::<R>().await
            .map_err(|e| ModelError::Malformed(format!("Failed to parse response: {}", e)))
    }

    fn classify(&self, err: reqwest::Error) -> ModelError {
        match ModelError::from_http(err) {
            ModelError::Timeout(_) => ModelError::Timeout(self.timeout),
            other => other,
        }
    }
}

/// Map a non-success status from the model server to a tagged error.
fn status_error(status: StatusCode, body: String) -> ModelError {
    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            ModelError::Unavailable(format!("model server returned {}: {}", status, body))
        }
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => {
            ModelError::Timeout(Duration::ZERO)
        }
        StatusCode::BAD_REQUEST if body.to_lowercase().contains("language") => {
            ModelError::UnsupportedLanguage(body)
        }
        _ => ModelError::Failed(format!("model server returned {}: {}", status, body)),
    }
}

#[async_trait]
impl Tokenizer for HttpModel {
    async fn count_tokens(&self, text: &str, lang: &LanguageTag) -> std::result::Result<usize, ModelError> {
        let request = TokenizeRequest { text, lang: lang.as_str() };
        let response: TokenizeResponse = self.post_json("/tokenize", &request).await?;
        Ok(response.count)
    }
}

#[async_trait]
impl TranslationModel for HttpModel {
    async fn translate(&self, request: &GenerateRequest) -> std::result::Result<ModelOutput, ModelError> {
        let output: ModelOutput = self.post_json("/generate", request).await?;
        if output.text.trim().is_empty() {
            return Err(ModelError::Malformed("Empty translation received".to_string()));
        }
        Ok(output)
    }

    async fn health(&self) -> std::result::Result<ModelHealth, ModelError> {
        let url = format!("{}/health", self.endpoint);
        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        // The server answers 503 with a body while the model is loading
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(ModelHealth {
                status: "loading".to_string(),
                model_loaded: false,
                tokenizer_loaded: false,
            });
        }

        let health: ModelHealth = self.decode(response).await?;
        if health.is_ready() {
            info!("Model server at {} is healthy", self.endpoint);
        }
        Ok(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, "loading".into()).kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(status_error(StatusCode::GATEWAY_TIMEOUT, String::new()).kind(), ErrorKind::Timeout);
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "Invalid language code: 'xx'".into()),
            ModelError::UnsupportedLanguage(_)
        ));
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "oops".into()).kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let mut config = crate::config::Config::default().model;
        config.endpoint = "http://localhost:8000/".to_string();
        let model = HttpModel::new(&config).unwrap();
        assert_eq!(model.endpoint, "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let mut config = crate::config::Config::default().model;
        // Reserved port with nothing listening
        config.endpoint = "http://127.0.0.1:9".to_string();
        config.request_timeout_secs = 2;
        let model = HttpModel::new(&config).unwrap();
        let err = model.count_tokens("hello", &"eng_Latn".into()).await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err:?}");
    }
}
