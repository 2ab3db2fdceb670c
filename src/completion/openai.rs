//! OpenAI-compatible chat completion provider (OpenAI, OpenRouter)

use super::{parse_http_error, CompletionError, CompletionProvider, GenerationConfig, Message};
use crate::utils::http::{
    execute_with_retry, CompletionHeaders, HttpClient, HttpClientConfig, ProviderHeaders,
};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

/// Provider speaking the `/chat/completions` protocol
pub struct OpenAiProvider {
    name: &'static str,
    http_client: HttpClient,
    base_url: String,
    headers: HeaderMap,
    generation: GenerationConfig,
}

impl OpenAiProvider {
    /// Provider for api.openai.com (or a compatible `base_url`)
    pub fn openai(
        api_key: String,
        base_url: Option<String>,
        generation: GenerationConfig,
    ) -> Result<Self, CompletionError> {
        Self::with_config(
            "openai",
            &api_key,
            base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            CompletionHeaders::new(),
            generation,
            HttpClientConfig::for_completion(),
        )
    }

    /// Provider for OpenRouter, which also wants attribution headers
    pub fn openrouter(
        api_key: String,
        base_url: Option<String>,
        generation: GenerationConfig,
    ) -> Result<Self, CompletionError> {
        Self::with_config(
            "openrouter",
            &api_key,
            base_url.unwrap_or_else(|| OPENROUTER_BASE_URL.to_string()),
            CompletionHeaders::with_attribution("https://github.com/your-org/astra", "ASTRA"),
            generation,
            HttpClientConfig::for_completion(),
        )
    }

    pub fn with_config(
        name: &'static str,
        api_key: &str,
        base_url: String,
        headers: CompletionHeaders,
        generation: GenerationConfig,
        client_config: HttpClientConfig,
    ) -> Result<Self, CompletionError> {
        let headers = headers
            .create_headers(api_key)
            .map_err(|e| CompletionError::Authentication {
                message: format!("API key is not a valid header value: {}", e),
            })?;

        Ok(Self {
            name,
            http_client: HttpClient::new(client_config)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            generation,
        })
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Reply text of the first choice; missing or null content is an empty reply
fn extract_content(body: &Value) -> Result<String, CompletionError> {
    if let Some(error) = body.get("error") {
        return Err(CompletionError::RequestFailed {
            status: 400,
            message: error.to_string(),
        });
    }
    let choice = body["choices"][0]
        .as_object()
        .ok_or_else(|| CompletionError::InvalidResponse {
            message: "No choices in response".to_string(),
        })?;
    Ok(choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        self.name
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let client = self.http_client.client();
        let url = self.endpoint();
        let url = &url;
        let headers = &self.headers;
        let model = self.generation.model.as_str();
        let request = CompletionRequest {
            model,
            messages,
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
        };
        let request = &request;

        tracing::debug!(
            "requesting completion from {} ({} messages)",
            self.name,
            messages.len()
        );

        execute_with_retry(
            move || async move {
                let response = client
                    .post(url)
                    .headers(headers.clone())
                    .json(request)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(parse_http_error(status, &body, model));
                }

                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| CompletionError::InvalidResponse {
                        message: format!("Failed to parse completion response: {}", e),
                    })?;
                extract_content(&body)
            },
            &self.http_client.retry_config(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let body = serde_json::to_value(CompletionRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            temperature: 0.5,
            max_tokens: 500,
        })
        .unwrap();

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "hi"}));
        assert_eq!(body["max_tokens"], 500);
    }

    #[test]
    fn test_extract_content() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "Hello!"}}]});
        assert_eq!(extract_content(&body).unwrap(), "Hello!");

        let empty = json!({"choices": [{"message": {"role": "assistant", "content": null}}]});
        assert_eq!(extract_content(&empty).unwrap(), "");

        assert!(matches!(
            extract_content(&json!({"choices": []})),
            Err(CompletionError::InvalidResponse { .. })
        ));
        assert!(matches!(
            extract_content(&json!({"error": {"message": "quota"}})),
            Err(CompletionError::RequestFailed { .. })
        ));
    }

    #[test]
    fn test_constructors() {
        let provider = OpenAiProvider::openrouter("key".into(), None, GenerationConfig::default()).unwrap();
        assert_eq!(provider.provider_name(), "openrouter");
        assert_eq!(provider.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
        assert!(provider.headers.contains_key("x-title"));

        let provider = OpenAiProvider::openai(
            "key".into(),
            Some("http://localhost:8080/v1/".into()),
            GenerationConfig::default(),
        )
        .unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(provider.generation().max_tokens, 500);
    }
}
