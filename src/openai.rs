//! Typed request and wire response shapes for the OpenAI-compatible endpoints.

use serde::{Deserialize, Serialize};

/// Which generation endpoint a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    ChatCompletions,
    Completions,
}

impl EndpointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointKind::ChatCompletions => "chat_completions",
            EndpointKind::Completions => "completions",
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            EndpointKind::ChatCompletions => "chatcmpl",
            EndpointKind::Completions => "cmpl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptInput {
    Messages(Vec<ChatMessage>),
    Text(String),
}

impl PromptInput {
    pub fn kind(&self) -> EndpointKind {
        match self {
            PromptInput::Messages(_) => EndpointKind::ChatCompletions,
            PromptInput::Text(_) => EndpointKind::Completions,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: i64,
    pub min_p: f64,
    pub n: u32,
    pub best_of: u32,
    pub use_beam_search: bool,
    pub length_penalty: f64,
    pub early_stopping: bool,
    pub min_tokens: u64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 1.0,
            top_k: -1,
            min_p: 0.0,
            n: 1,
            best_of: 1,
            use_beam_search: false,
            length_penalty: 1.0,
            early_stopping: false,
            min_tokens: 0,
        }
    }
}

/// A fully defaulted, schema-checked generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub input: PromptInput,
    pub sampling: SamplingParams,
    /// Effective limit; `max_completion_tokens` already folded in for chat.
    pub max_tokens: Option<u64>,
    pub stream: bool,
    pub stop: Vec<String>,
}

impl GenerationRequest {
    pub fn kind(&self) -> EndpointKind {
        self.input.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChoice {
    pub index: u32,
    pub text: String,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<TextChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionResponse {
    Chat(ChatCompletionResponse),
    Text(TextCompletionResponse),
}

impl CompletionResponse {
    pub fn usage(&self) -> Usage {
        match self {
            CompletionResponse::Chat(r) => r.usage,
            CompletionResponse::Text(r) => r.usage,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChunkChoice {
    pub index: u32,
    pub delta: ChatDelta,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChunkChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<TextChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamChunk {
    Chat(ChatCompletionChunk),
    Text(TextCompletionChunk),
}

impl StreamChunk {
    pub fn id(&self) -> &str {
        match self {
            StreamChunk::Chat(c) => &c.id,
            StreamChunk::Text(c) => &c.id,
        }
    }

    /// Text carried by the single choice of this chunk.
    pub fn content(&self) -> &str {
        match self {
            StreamChunk::Chat(c) => c
                .choices
                .first()
                .and_then(|choice| choice.delta.content.as_deref())
                .unwrap_or_default(),
            StreamChunk::Text(c) => c
                .choices
                .first()
                .map(|choice| choice.text.as_str())
                .unwrap_or_default(),
        }
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        match self {
            StreamChunk::Chat(c) => c.choices.first().and_then(|choice| choice.finish_reason),
            StreamChunk::Text(c) => c.choices.first().and_then(|choice| choice.finish_reason),
        }
    }
}
