use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error, trace};
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::request::ChatCompletionRequest;

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiModelsResponse
{   #[serde(default)]
    pub data: Vec<ModelData>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelData
{   #[serde(default)]
    pub id: Option<String>
}

/// HTTP client for the OpenAI REST API
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   http_client: reqwest::Client
  , api_base: String
  , api_key: String
}

impl OpenAiClient
{   /// Create a client for `api_key` using the provider settings
    pub fn new(
      api_key: impl Into<String>
    , config: &ProviderConfig
    ) -> Result<Self>
    {   let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        if config.no_proxy
        {   builder = builder.no_proxy();
        }
        let http_client = builder.build()?;
        debug!("Creating OpenAiClient for {}", config.api_base());
        Ok(Self::with_http_client(http_client, api_key, config.api_base()))
    }

    /// Create a client around an existing reqwest client
    pub fn with_http_client(
      http_client: reqwest::Client
    , api_key: impl Into<String>
    , api_base: impl Into<String>
    ) -> Self
    {   OpenAiClient
        {   http_client
          , api_base: api_base.into().trim_end_matches('/').to_string()
          , api_key: api_key.into()
        }
    }

    async fn check_status(response: reqwest::Response)
      -> Result<reqwest::Response>
    {   let status = response.status();
        trace!("OpenAI response status: {}", status);
        if status.is_success()
        {   return Ok(response);
        }

        let body = response.text().await
          .unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<serde_json::Value>(&body)
          .ok()
          .and_then(|v| v.pointer("/error/message")
            .and_then(|m| m.as_str())
            .map(str::to_string))
          .unwrap_or(body);
        error!("OpenAI API error ({}): {}", status, message);
        Err(Error::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl super::ChatCompletionApi for OpenAiClient
{   async fn list_models(&self) -> Result<Vec<String>>
    {   debug!("Fetching available OpenAI models");
        let response = self.http_client
          .get(format!("{}/models", self.api_base))
          .bearer_auth(&self.api_key)
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            Error::from(e)
          })?;

        let models: OpenAiModelsResponse
          = Self::check_status(response).await?.json().await?;

        let names: Vec<String> = models.data
          .into_iter()
          .filter_map(|m| m.id)
          .collect();
        debug!("Retrieved {} models", names.len());
        Ok(names)
    }

    async fn create_chat_completion(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<serde_json::Value>
    {   trace!("OpenAI request: {:?}", request);
        let response = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .bearer_auth(&self.api_key)
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::from(e)
          })?;

        let raw: serde_json::Value
          = Self::check_status(response).await?.json().await?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::providers::ChatCompletionApi;
    use crate::request::ChatMessage;
    use crate::error::ApiErrorKind;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiClient
    {   OpenAiClient::with_http_client(
          reqwest::Client::builder().no_proxy().build().unwrap()
        , "test-key"
        , server.uri()
        )
    }

    fn request() -> ChatCompletionRequest
    {   ChatCompletionRequest
        {   model: "gpt-4".into()
          , messages: vec![ChatMessage::user("Hello")]
          , n: 2
          , temperature: 0.7
          , max_tokens: 128
        }
    }

    #[tokio::test]
    async fn lists_model_ids_skipping_missing_ones()
    {   let server = MockServer::start().await;
        Mock::given(method("GET"))
          .and(path("/models"))
          .and(header("authorization", "Bearer test-key"))
          .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({
              "object": "list"
            , "data": [
                { "id": "gpt-4", "owned_by": "openai" }
              , { "owned_by": "nobody" }
              , { "id": "gpt-3.5-turbo" }
              ]
            })
          ))
          .expect(1)
          .mount(&server)
          .await;

        let models = client(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["gpt-4", "gpt-3.5-turbo"]);
    }

    #[tokio::test]
    async fn sends_wire_request_and_returns_raw_payload()
    {   let server = MockServer::start().await;
        let payload = serde_json::json!({
          "id": "chatcmpl-1"
        , "choices": [
            { "index": 0, "message": { "role": "assistant", "content": "a" } }
          , { "index": 1, "message": { "role": "assistant", "content": "b" } }
          ]
        });
        Mock::given(method("POST"))
          .and(path("/chat/completions"))
          .and(body_partial_json(serde_json::json!({
            "model": "gpt-4"
          , "n": 2
          , "max_tokens": 128
          , "messages": [{ "role": "user", "content": "Hello" }]
          })))
          .respond_with(
            ResponseTemplate::new(200).set_body_json(payload.clone())
          )
          .expect(1)
          .mount(&server)
          .await;

        let raw = client(&server)
          .create_chat_completion(&request())
          .await
          .unwrap();
        assert_eq!(raw, payload);
    }

    #[tokio::test]
    async fn error_status_is_classified_with_provider_message()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .and(path("/chat/completions"))
          .respond_with(ResponseTemplate::new(429).set_body_json(
            serde_json::json!({
              "error": { "message": "Rate limit reached" }
            })
          ))
          .mount(&server)
          .await;

        let err = client(&server)
          .create_chat_completion(&request())
          .await
          .unwrap_err();
        assert_eq!(
          err
        , Error::Api
          {   kind: ApiErrorKind::RateLimit
            , status: 429
            , message: "Rate limit reached".into()
          }
        );
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn bad_request_is_not_transient()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .and(path("/chat/completions"))
          .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
          .mount(&server)
          .await;

        let err = client(&server)
          .create_chat_completion(&request())
          .await
          .unwrap_err();
        assert!(matches!(
          err
        , Error::Api { kind: ApiErrorKind::InvalidRequest, .. }
        ));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn slow_response_maps_to_timeout()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .and(path("/chat/completions"))
          .respond_with(
            ResponseTemplate::new(200)
              .set_body_json(serde_json::json!({ "choices": [] }))
              .set_delay(Duration::from_millis(500))
          )
          .mount(&server)
          .await;

        let http = reqwest::Client::builder()
          .no_proxy()
          .timeout(Duration::from_millis(50))
          .build()
          .unwrap();
        let client = OpenAiClient::with_http_client(
          http, "test-key", server.uri()
        );
        let err = client.create_chat_completion(&request())
          .await
          .unwrap_err();
        assert_eq!(err, Error::Timeout);
    }
}
