//! Google Generative AI (Gemini) API provider

use crate::{
    error::{Error, Result},
    providers::ChatProvider,
    stream::{ChunkStream, FinishReason, ResponseChunk},
    types::{Context, GenerationConfig, Model},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

/// Google Generative AI client
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleProvider {
    /// Create a new Google provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn build_request(&self, context: &Context, config: &GenerationConfig) -> GeminiRequest {
        let contents = context
            .turns
            .iter()
            .map(|turn| GeminiContent {
                role: Some(turn.role.as_str().to_string()),
                parts: vec![GeminiPart {
                    text: turn.text.clone(),
                }],
            })
            .collect();

        let system_instruction = context
            .system_instruction
            .as_ref()
            .map(|instruction| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: instruction.clone(),
                }],
            });

        let generation_config = if config.temperature.is_none() && config.max_output_tokens.is_none()
        {
            None
        } else {
            Some(GeminiGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            })
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }
}

#[async_trait]
impl ChatProvider for GoogleProvider {
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        config: &GenerationConfig,
    ) -> Result<ChunkStream> {
        if self.api_key.trim().is_empty() {
            return Err(Error::InvalidApiKey);
        }

        let request = self.build_request(context, config);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            model.base_url, model.id
        );
        tracing::debug!(url = %url, turns = context.turns.len(), "opening Gemini stream");

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let key = reqwest::header::HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::InvalidApiKey)?;
        headers.insert("x-goog-api-key", key);

        // Add model-specific headers
        for (key, value) in &model.headers {
            let name = key
                .parse::<reqwest::header::HeaderName>()
                .map_err(|e| Error::InvalidConfig(format!("header name {:?}: {}", key, e)))?;
            let val = value
                .parse::<reqwest::header::HeaderValue>()
                .map_err(|e| Error::InvalidConfig(format!("header {:?} value: {}", key, e)))?;
            headers.insert(name, val);
        }

        let request_builder = self.client.post(&url).headers(headers).json(&request);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source)))
    }
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = Result<ResponseChunk>> {
    stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.is_empty() || msg.data == "[DONE]" {
                        continue;
                    }

                    match parse_chunk(&msg.data) {
                        Ok(chunk) => {
                            let is_final = chunk.is_final();
                            yield Ok(chunk);
                            if is_final {
                                break;
                            }
                        }
                        Err(e) => {
                            event_source.close();
                            yield Err(e);
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    event_source.close();
                    yield Err(map_sse_error(e).await);
                    return;
                }
            }
        }
        event_source.close();
    }
}

/// Decode one SSE `data:` payload into a chunk
fn parse_chunk(data: &str) -> Result<ResponseChunk> {
    match serde_json::from_str::<GeminiStreamResponse>(data) {
        Ok(response) if response.error.is_none() => {
            let mut text = String::new();
            let mut finish_reason = None;
            for candidate in &response.candidates {
                if let Some(ref content) = candidate.content {
                    for part in &content.parts {
                        if let Some(ref t) = part.text {
                            text.push_str(t);
                        }
                    }
                }
                if let Some(ref reason) = candidate.finish_reason {
                    finish_reason = Some(FinishReason::from_api(reason));
                }
            }
            Ok(ResponseChunk {
                text: (!text.is_empty()).then_some(text),
                finish_reason,
            })
        }
        Ok(response) => Err(api_error(response.error.unwrap_or_default())),
        Err(e) => Err(Error::UnexpectedResponse(format!(
            "Failed to parse chunk: {}",
            e
        ))),
    }
}

/// Turn an event-source failure into a provider error, reading the body of
/// non-success responses for the API's own message.
async fn map_sse_error(err: reqwest_eventsource::Error) -> Error {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            status_error(status, &body)
        }
        reqwest_eventsource::Error::Transport(e) => Error::Http(e),
        other => Error::Sse(other.to_string()),
    }
}

/// Error for a non-success HTTP status with the given response body
fn status_error(status: reqwest::StatusCode, body: &str) -> Error {
    let detail = parse_error_body(body).unwrap_or_else(|| GeminiError {
        code: Some(status.as_u16()),
        message: if body.is_empty() {
            status.to_string()
        } else {
            body.to_string()
        },
        status: None,
    });
    if matches!(status.as_u16(), 401 | 403) {
        return Error::Auth(detail.message);
    }
    api_error(detail)
}

fn parse_error_body(body: &str) -> Option<GeminiError> {
    match serde_json::from_str::<GeminiErrorBody>(body).ok()? {
        GeminiErrorBody::Many(mut list) => list.pop().map(|response| response.error),
        GeminiErrorBody::One(response) => Some(response.error),
    }
}

fn api_error(detail: GeminiError) -> Error {
    let error_type = detail
        .status
        .or_else(|| detail.code.map(|c| c.to_string()))
        .unwrap_or_else(|| "unknown".to_string());
    let err = Error::api(error_type, detail.message);
    if err.is_auth_failure() {
        match err {
            Error::Api { message, .. } => Error::Auth(message),
            other => other,
        }
    } else {
        err
    }
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

/// Streaming endpoints sometimes wrap the error object in an array. The list
/// form is tried first: a derived struct also deserializes from a sequence.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiErrorBody {
    Many(Vec<GeminiErrorResponse>),
    One(GeminiErrorResponse),
}

#[derive(Debug, Default, Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Turn;

    #[test]
    fn test_request_shape() {
        let provider = GoogleProvider::new("key");
        let mut ctx = Context::with_system("You are the admissions assistant.");
        ctx.push(Turn::user("What is tuition?"));
        let config = GenerationConfig {
            temperature: Some(0.7),
            max_output_tokens: None,
        };

        let json = serde_json::to_value(provider.build_request(&ctx, &config)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "What is tuition?");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are the admissions assistant."
        );
        assert!(json["systemInstruction"].get("role").is_none());
        let temperature = json["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_request_without_generation_config() {
        let provider = GoogleProvider::new("key");
        let json = serde_json::to_value(
            provider.build_request(&Context::default(), &GenerationConfig::default()),
        )
        .unwrap();
        assert!(json.get("generationConfig").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_parse_text_chunk() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Tuition is "}],"role":"model"}}]}"#;
        let chunk = parse_chunk(data).unwrap();
        assert_eq!(chunk.text.as_deref(), Some("Tuition is "));
        assert!(!chunk.is_final());
    }

    #[test]
    fn test_parse_final_chunk_without_text() {
        let data = r#"{"candidates":[{"content":{"parts":[],"role":"model"},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":5}}"#;
        let chunk = parse_chunk(data).unwrap();
        assert_eq!(chunk.text, None);
        assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_parse_error_payload() {
        let data = r#"{"error":{"code":500,"message":"Internal error","status":"INTERNAL"}}"#;
        match parse_chunk(data).unwrap_err() {
            Error::Api {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "INTERNAL");
                assert_eq!(message, "Internal error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_key_payload_is_auth() {
        let body = r#"[{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}]"#;
        let detail = parse_error_body(body).unwrap();
        assert!(matches!(api_error(detail), Error::Auth(_)));
    }

    #[test]
    fn test_array_error_body_keeps_detail() {
        let body = r#"[{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}]"#;
        let detail = parse_error_body(body).unwrap();
        assert_eq!(detail.code, Some(429));
        assert_eq!(detail.message, "Quota exceeded");
        assert_eq!(detail.status.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn test_object_error_body_keeps_detail() {
        let body = r#"{"error":{"code":503,"message":"Overloaded","status":"UNAVAILABLE"}}"#;
        let detail = parse_error_body(body).unwrap();
        assert_eq!(detail.status.as_deref(), Some("UNAVAILABLE"));
        assert_eq!(detail.message, "Overloaded");
    }

    #[test]
    fn test_bad_request_with_invalid_key_is_auth() {
        let body = r#"[{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}]"#;
        let err = status_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(err.is_auth_failure());
        match err {
            Error::Auth(message) => assert!(message.starts_with("API key not valid")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_error_with_plain_body() {
        match status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "upstream down") {
            Error::Api {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "500");
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            status_error(reqwest::StatusCode::FORBIDDEN, ""),
            Error::Auth(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_model_header_rejected() {
        let provider = GoogleProvider::new("key");
        let mut model = Model::default();
        model.headers.insert("bad header".into(), "x".into());
        let result = provider
            .stream(&model, &Context::default(), &GenerationConfig::default())
            .await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_garbage_chunk_is_unexpected() {
        assert!(matches!(
            parse_chunk("not json").unwrap_err(),
            Error::UnexpectedResponse(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_key_rejected_before_request() {
        let provider = GoogleProvider::new("   ");
        let result = provider
            .stream(&Model::default(), &Context::default(), &GenerationConfig::default())
            .await;
        assert!(matches!(result, Err(Error::InvalidApiKey)));
    }
}
