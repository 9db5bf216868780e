//! Minimal OpenAI client for the recommendation step.
//!
//! We only call chat.completions and parse the reply as JSON after removing an
//! optional code fence. Calls log model name, latency, and token usage (not
//! contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::config::env_or;
use crate::error::GenerationError;
use crate::util::{strip_code_fence, trunc_for_log};

const RECOMMEND_TEMPERATURE: f32 = 0.7;

/// A rendered prompt. `system` is omitted from the request when empty.
#[derive(Clone, Debug, Default)]
pub struct Prompt {
  pub system: String,
  pub user: String,
}

/// What the model is asked to return. Picks stay untyped until they are
/// checked against the candidate pool, so one malformed pick cannot sink the
/// rest.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RecommendationReply {
  pub weaknesses: Vec<String>,
  #[serde(default)]
  pub recommended: Vec<Value>,
}

#[async_trait]
pub trait StructuredGenerator: Send + Sync {
  async fn generate_structured(&self, prompt: &Prompt) -> Result<RecommendationReply, GenerationError>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = env_or("OPENAI_BASE_URL", "https://api.openai.com/v1");
    let model = env_or("OPENAI_MODEL", "gpt-4o-mini");
    let timeout = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(60);

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  /// Plain-text chat completion; returns the trimmed first choice.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model))]
  async fn chat_text(&self, prompt: &Prompt, temperature: f32) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let mut messages = Vec::with_capacity(2);
    if !prompt.system.is_empty() {
      messages.push(ChatMessageReq { role: "system".into(), content: prompt.system.clone() });
    }
    messages.push(ChatMessageReq { role: "user".into(), content: prompt.user.clone() });
    let req = ChatCompletionRequest { model: self.model.clone(), messages, temperature };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "judge-tracker/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(GenerationError::Upstream { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .unwrap_or_default()
      .trim()
      .to_string();
    if text.is_empty() {
      return Err(GenerationError::EmptyReply);
    }
    Ok(text)
  }
}

#[async_trait]
impl StructuredGenerator for OpenAI {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.user.len()))]
  async fn generate_structured(&self, prompt: &Prompt) -> Result<RecommendationReply, GenerationError> {
    let start = std::time::Instant::now();
    let text = self.chat_text(prompt, RECOMMEND_TEMPERATURE).await;
    let elapsed = start.elapsed();
    let text = match text {
      Ok(t) => {
        info!(?elapsed, reply_len = t.len(), "Model response received");
        t
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed");
        return Err(e);
      }
    };
    parse_reply(&text)
  }
}

/// Strip the optional fence and parse. No fallback on malformed output.
pub fn parse_reply(text: &str) -> Result<RecommendationReply, GenerationError> {
  serde_json::from_str::<RecommendationReply>(strip_code_fence(text)).map_err(|e| {
    error!(error = %e, reply = %trunc_for_log(text, 200), "Model reply is not the expected JSON");
    GenerationError::Json(e)
  })
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use httpmock::prelude::*;

  fn client(base_url: String) -> OpenAI {
    OpenAI { client: reqwest::Client::new(), api_key: "sk-test".into(), base_url, model: "gpt-4o-mini".into() }
  }

  #[test]
  fn fenced_reply_parses() {
    let reply = parse_reply(
      "```json\n{\"weaknesses\":[\"그리디\",\"DP\",\"그래프\"],\"recommended\":[{\"problemId\":1932,\"title\":\"정수 삼각형\",\"tier\":12,\"tags\":[\"DP\"]}]}\n```",
    )
    .unwrap();
    assert_eq!(reply.weaknesses.len(), 3);
    assert_eq!(reply.recommended[0]["problemId"], 1932);
  }

  #[test]
  fn ill_typed_pick_does_not_fail_the_reply() {
    let reply = parse_reply(
      r#"{"weaknesses":["a","b","c"],"recommended":[{"problemId":1932,"title":"정수 삼각형","tier":12,"tags":[]},{"problemId":"1933","title":"x","tier":"Gold 5","tags":[]}]}"#,
    )
    .unwrap();
    assert_eq!(reply.recommended.len(), 2);
  }

  #[test]
  fn prose_reply_is_json_error() {
    assert!(matches!(parse_reply("Sure! Here are some problems."), Err(GenerationError::Json(_))));
  }

  #[tokio::test]
  async fn sends_single_user_message_at_fixed_temperature() {
    let server = MockServer::start_async().await;
    let m = server
      .mock_async(|when, then| {
        when
          .method(POST)
          .path("/chat/completions")
          .header("authorization", "Bearer sk-test")
          .json_body(serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "추천해줘"}],
            "temperature": 0.7
          }));
        then.status(200).json_body(serde_json::json!({
          "choices": [{"message": {"role": "assistant", "content": "{\"weaknesses\":[\"a\",\"b\",\"c\"],\"recommended\":[]}"}}],
          "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }));
      })
      .await;

    let oa = client(server.base_url());
    let reply = oa.generate_structured(&Prompt { system: String::new(), user: "추천해줘".into() }).await.unwrap();
    m.assert_async().await;
    assert_eq!(reply.weaknesses, vec!["a", "b", "c"]);
    assert!(reply.recommended.is_empty());
  }

  #[tokio::test]
  async fn upstream_error_message_is_extracted() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(401).json_body(serde_json::json!({"error": {"message": "Incorrect API key provided"}}));
      })
      .await;

    let err = client(server.base_url()).generate_structured(&Prompt::default()).await.unwrap_err();
    match err {
      GenerationError::Upstream { status, message } => {
        assert_eq!(status.as_u16(), 401);
        assert_eq!(message, "Incorrect API key provided");
      }
      other => panic!("unexpected error: {other}"),
    }
  }
}
