//! Deterministic mock generation and response shaping.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::openai::{
    ChatChoice, ChatChunkChoice, ChatCompletionChunk, ChatCompletionResponse, ChatDelta,
    ChatMessage, CompletionResponse, EndpointKind, FinishReason, GenerationRequest, PromptInput,
    StreamChunk, TextChoice, TextCompletionChunk, TextCompletionResponse, Usage,
};

const ECHO_PREFIX_CHARS: usize = 50;

/// Identity shared by every piece of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseIdentity {
    pub id: String,
    pub created: u64,
}

impl ResponseIdentity {
    pub fn fresh(kind: EndpointKind) -> Self {
        Self {
            id: format!("{}-{}", kind.id_prefix(), Uuid::new_v4().simple()),
            created: unix_timestamp(),
        }
    }
}

/// Word-level mock generation for one request, before any wire shaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockGeneration {
    pub tokens: Vec<String>,
    pub finish_reason: FinishReason,
    pub prompt_tokens: u64,
}

impl MockGeneration {
    pub fn for_request(request: &GenerationRequest) -> Self {
        let (prompt_tokens, last_input) = match &request.input {
            PromptInput::Messages(messages) => (
                messages.iter().map(|m| word_count(&m.content)).sum::<u64>(),
                messages.last().map(|m| m.content.as_str()).unwrap_or_default(),
            ),
            PromptInput::Text(prompt) => (word_count(prompt), prompt.as_str()),
        };

        let reply = mock_reply(last_input);
        let reply = truncate_at_stop(&reply, &request.stop);
        let mut tokens: Vec<String> = reply.split_whitespace().map(str::to_string).collect();

        let mut finish_reason = FinishReason::Stop;
        if let Some(limit) = request.max_tokens {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            if tokens.len() > limit {
                tokens.truncate(limit);
                finish_reason = FinishReason::Length;
            }
        }

        Self {
            tokens,
            finish_reason,
            prompt_tokens,
        }
    }

    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn completion_tokens(&self) -> u64 {
        self.tokens.len() as u64
    }
}

/// Output of the builder: one complete body or a lazy chunk sequence.
#[derive(Debug)]
pub enum BuiltResponse {
    Complete(CompletionResponse),
    Stream(ChunkStream),
}

pub fn build(request: &GenerationRequest) -> BuiltResponse {
    build_with(request, ResponseIdentity::fresh(request.kind()))
}

pub fn build_with(request: &GenerationRequest, identity: ResponseIdentity) -> BuiltResponse {
    let generation = MockGeneration::for_request(request);
    if request.stream {
        BuiltResponse::Stream(ChunkStream::new(request, generation, identity))
    } else {
        BuiltResponse::Complete(complete_response(request, &generation, identity))
    }
}

fn complete_response(
    request: &GenerationRequest,
    generation: &MockGeneration,
    identity: ResponseIdentity,
) -> CompletionResponse {
    let n = request.sampling.n;
    let text = generation.text();
    let usage = Usage::new(
        generation.prompt_tokens,
        generation.completion_tokens() * u64::from(n),
    );
    let finish_reason = Some(generation.finish_reason);

    match request.kind() {
        EndpointKind::ChatCompletions => CompletionResponse::Chat(ChatCompletionResponse {
            id: identity.id,
            object: "chat.completion".to_string(),
            created: identity.created,
            model: request.model.clone(),
            choices: (0..n)
                .map(|index| ChatChoice {
                    index,
                    message: ChatMessage {
                        role: "assistant".to_string(),
                        content: text.clone(),
                    },
                    finish_reason,
                })
                .collect(),
            usage,
        }),
        EndpointKind::Completions => CompletionResponse::Text(TextCompletionResponse {
            id: identity.id,
            object: "text_completion".to_string(),
            created: identity.created,
            model: request.model.clone(),
            choices: (0..n)
                .map(|index| TextChoice {
                    index,
                    text: text.clone(),
                    finish_reason,
                })
                .collect(),
            usage,
        }),
    }
}

/// Finite, single-pass sequence of stream chunks for one response.
///
/// Every chunk carries the same id and timestamp; only the last one has a
/// finish reason. An empty generation still yields one (empty) final chunk.
#[derive(Debug)]
pub struct ChunkStream {
    kind: EndpointKind,
    model: String,
    identity: ResponseIdentity,
    tokens: std::vec::IntoIter<String>,
    finish_reason: FinishReason,
    usage: Usage,
    emitted: usize,
    total: usize,
}

impl ChunkStream {
    fn new(
        request: &GenerationRequest,
        generation: MockGeneration,
        identity: ResponseIdentity,
    ) -> Self {
        let usage = Usage::new(generation.prompt_tokens, generation.completion_tokens());
        let total = generation.tokens.len().max(1);
        Self {
            kind: request.kind(),
            model: request.model.clone(),
            identity,
            tokens: generation.tokens.into_iter(),
            finish_reason: generation.finish_reason,
            usage,
            emitted: 0,
            total,
        }
    }

    /// Token accounting for the whole stream, known before emission.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    fn chunk(
        &self,
        content: String,
        first: bool,
        finish_reason: Option<FinishReason>,
    ) -> StreamChunk {
        match self.kind {
            EndpointKind::ChatCompletions => StreamChunk::Chat(ChatCompletionChunk {
                id: self.identity.id.clone(),
                object: "chat.completion.chunk".to_string(),
                created: self.identity.created,
                model: self.model.clone(),
                choices: vec![ChatChunkChoice {
                    index: 0,
                    delta: ChatDelta {
                        role: first.then(|| "assistant".to_string()),
                        content: Some(content),
                    },
                    finish_reason,
                }],
            }),
            EndpointKind::Completions => StreamChunk::Text(TextCompletionChunk {
                id: self.identity.id.clone(),
                object: "text_completion.chunk".to_string(),
                created: self.identity.created,
                model: self.model.clone(),
                choices: vec![TextChoice {
                    index: 0,
                    text: content,
                    finish_reason,
                }],
            }),
        }
    }
}

impl Iterator for ChunkStream {
    type Item = StreamChunk;

    fn next(&mut self) -> Option<StreamChunk> {
        if self.emitted >= self.total {
            return None;
        }
        let first = self.emitted == 0;
        self.emitted += 1;
        let last = self.emitted == self.total;

        let mut content = self.tokens.next().unwrap_or_default();
        if !last {
            content.push(' ');
        }
        let finish_reason = last.then_some(self.finish_reason);
        Some(self.chunk(content, first, finish_reason))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.emitted;
        (remaining, Some(remaining))
    }
}

fn mock_reply(input: &str) -> String {
    let lower = input.to_lowercase();
    let greets = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "hello" || word == "hi");

    if lower.contains("capital") && lower.contains("france") {
        "The capital of France is Paris.".to_string()
    } else if lower.contains("weather") {
        "I'm an AI and don't have access to real-time weather data.".to_string()
    } else if greets {
        "Hello! How can I assist you today?".to_string()
    } else {
        let echoed: String = input.chars().take(ECHO_PREFIX_CHARS).collect();
        format!("This is a mock response from Furiosa LLM. Your prompt was: {echoed}...")
    }
}

fn truncate_at_stop(text: &str, stop: &[String]) -> String {
    let cut = stop
        .iter()
        .filter_map(|sequence| text.find(sequence.as_str()))
        .min()
        .unwrap_or(text.len());
    text[..cut].to_string()
}

fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
