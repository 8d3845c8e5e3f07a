//! Schema checks for generation request bodies.
//!
//! Decoding is a single pass over the JSON object that records every field
//! problem it finds, then either yields a fully defaulted [`GenerationRequest`]
//! or the complete list of [`FieldError`]s.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    error::ServiceError,
    model::ModelCatalog,
    openai::{ChatMessage, EndpointKind, GenerationRequest, PromptInput, SamplingParams},
};

pub const CHAT_ROLES: &[&str] = &["system", "user", "assistant", "tool", "developer"];
pub const MAX_STOP_SEQUENCES: usize = 4;
pub const MAX_CHOICES: i64 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    MissingField,
    TypeMismatch,
    OutOfRange,
    UnknownModel,
}

impl FieldErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            FieldErrorKind::MissingField => "missing_field",
            FieldErrorKind::TypeMismatch => "type_mismatch",
            FieldErrorKind::OutOfRange => "out_of_range",
            FieldErrorKind::UnknownModel => "model_not_found",
        }
    }

    /// Lower ranks win when a request carries several kinds of error.
    fn rank(self) -> u8 {
        match self {
            FieldErrorKind::MissingField | FieldErrorKind::TypeMismatch => 0,
            FieldErrorKind::UnknownModel => 1,
            FieldErrorKind::OutOfRange => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.0))]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// The error that decides the response status and `param`.
    pub fn primary(&self) -> Option<&FieldError> {
        self.0.iter().min_by_key(|e| e.kind.rank())
    }

    pub fn has(&self, field: &str, kind: FieldErrorKind) -> bool {
        self.0.iter().any(|e| e.field == field && e.kind == kind)
    }
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decode and check a raw request body for the given endpoint.
pub fn validate(
    kind: EndpointKind,
    raw: &[u8],
    catalog: &ModelCatalog,
) -> Result<GenerationRequest, ServiceError> {
    let body: Value =
        serde_json::from_slice(raw).map_err(|e| ServiceError::JsonParse(e.to_string()))?;
    let Value::Object(fields) = &body else {
        return Err(ServiceError::MalformedBody(format!(
            "request body must be a JSON object, got {}",
            json_type_name(&body)
        )));
    };
    Ok(validate_fields(kind, fields, catalog)?)
}

pub fn validate_fields(
    kind: EndpointKind,
    fields: &Map<String, Value>,
    catalog: &ModelCatalog,
) -> Result<GenerationRequest, ValidationErrors> {
    let mut checker = FieldChecker::new(fields);

    let model = checker.required_str("model");
    if let Some(model) = model {
        if !catalog.contains(model) {
            checker.push(
                "model",
                FieldErrorKind::UnknownModel,
                format!("model '{model}' does not exist"),
            );
        }
    }

    let input = match kind {
        EndpointKind::ChatCompletions => checker.messages().map(PromptInput::Messages),
        EndpointKind::Completions => checker
            .required_str("prompt")
            .map(|prompt| PromptInput::Text(prompt.to_string())),
    };

    let sampling = checker.sampling_params();

    let max_tokens = checker.non_negative("max_tokens");
    let max_completion_tokens = match kind {
        EndpointKind::ChatCompletions => checker.non_negative("max_completion_tokens"),
        EndpointKind::Completions => None,
    };
    let max_tokens = max_completion_tokens.or(max_tokens);
    if let Some(limit) = max_tokens {
        if sampling.min_tokens > limit {
            checker.out_of_range("min_tokens", "must not exceed max_tokens");
        }
    }

    let stream = checker.boolean("stream", false);
    if stream && sampling.n > 1 {
        checker.out_of_range("n", "n > 1 is not supported when stream is true");
    }

    let stop = checker.stop();

    match (model, input) {
        (Some(model), Some(input)) if checker.errors.is_empty() => Ok(GenerationRequest {
            model: model.to_string(),
            input,
            sampling,
            max_tokens,
            stream,
            stop,
        }),
        _ => Err(ValidationErrors(checker.errors)),
    }
}

struct FieldChecker<'a> {
    fields: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldChecker<'a> {
    fn new(fields: &'a Map<String, Value>) -> Self {
        Self {
            fields,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, field: impl Into<String>, kind: FieldErrorKind, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            kind,
            reason: reason.into(),
        });
    }

    fn missing(&mut self, field: impl Into<String>) {
        self.push(field, FieldErrorKind::MissingField, "field required");
    }

    fn type_mismatch(&mut self, field: impl Into<String>, expected: &str) {
        self.push(field, FieldErrorKind::TypeMismatch, format!("expected {expected}"));
    }

    fn out_of_range(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.push(field, FieldErrorKind::OutOfRange, reason);
    }

    /// Explicit `null` counts as absent.
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    fn required_str(&mut self, name: &str) -> Option<&'a str> {
        match self.get(name) {
            None => {
                self.missing(name);
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.type_mismatch(name, "a string");
                None
            }
        }
    }

    fn float(&mut self, name: &str, default: f64) -> f64 {
        match self.get(name) {
            None => default,
            Some(value) => value.as_f64().unwrap_or_else(|| {
                self.type_mismatch(name, "a number");
                default
            }),
        }
    }

    /// Integral floats such as `50.0` count as integers.
    fn integer(&mut self, name: &str) -> Option<i64> {
        let value = self.get(name)?;
        if let Some(int) = value.as_i64() {
            return Some(int);
        }
        let Some(float) = value.as_f64() else {
            self.type_mismatch(name, "an integer");
            return None;
        };
        if float.fract() != 0.0 {
            self.type_mismatch(name, "an integer");
            return None;
        }
        if float < i64::MIN as f64 || float >= i64::MAX as f64 {
            self.out_of_range(name, "is outside the 64-bit integer range");
            return None;
        }
        Some(float as i64)
    }

    fn non_negative(&mut self, name: &str) -> Option<u64> {
        let value = self.integer(name)?;
        if value < 0 {
            self.out_of_range(name, "must be greater than or equal to 0");
            return None;
        }
        Some(value as u64)
    }

    fn boolean(&mut self, name: &str, default: bool) -> bool {
        match self.get(name) {
            None => default,
            Some(value) => value.as_bool().unwrap_or_else(|| {
                self.type_mismatch(name, "a boolean");
                default
            }),
        }
    }

    fn sampling_params(&mut self) -> SamplingParams {
        let defaults = SamplingParams::default();

        let temperature = self.float("temperature", defaults.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            self.out_of_range("temperature", "must be between 0 and 2");
        }

        let top_p = self.float("top_p", defaults.top_p);
        if !(top_p > 0.0 && top_p <= 1.0) {
            self.out_of_range("top_p", "must be in (0, 1]");
        }

        let top_k = self.integer("top_k").unwrap_or(defaults.top_k);
        if top_k == 0 || top_k < -1 {
            self.out_of_range("top_k", "must be -1 (disabled) or at least 1");
        }

        let min_p = self.float("min_p", defaults.min_p);
        if !(0.0..=1.0).contains(&min_p) {
            self.out_of_range("min_p", "must be between 0 and 1");
        }

        let mut n = self.integer("n").unwrap_or(1);
        if !(1..=MAX_CHOICES).contains(&n) {
            self.out_of_range("n", format!("must be between 1 and {MAX_CHOICES}"));
            n = 1;
        }

        let mut best_of = self.integer("best_of").unwrap_or(n);
        if best_of < n {
            self.out_of_range("best_of", "must be greater than or equal to n");
            best_of = n;
        } else if best_of > MAX_CHOICES {
            self.out_of_range("best_of", format!("must be at most {MAX_CHOICES}"));
            best_of = n;
        }

        let use_beam_search = self.boolean("use_beam_search", defaults.use_beam_search);
        let length_penalty = self.float("length_penalty", defaults.length_penalty);
        let early_stopping = self.boolean("early_stopping", defaults.early_stopping);
        let min_tokens = self.non_negative("min_tokens").unwrap_or(defaults.min_tokens);

        SamplingParams {
            temperature,
            top_p,
            top_k,
            min_p,
            n: n as u32,
            best_of: best_of as u32,
            use_beam_search,
            length_penalty,
            early_stopping,
            min_tokens,
        }
    }

    fn messages(&mut self) -> Option<Vec<ChatMessage>> {
        let Some(value) = self.get("messages") else {
            self.missing("messages");
            return None;
        };
        let Some(items) = value.as_array() else {
            self.type_mismatch("messages", "an array of messages");
            return None;
        };
        if items.is_empty() {
            self.out_of_range("messages", "must contain at least one message");
            return None;
        }

        let mut messages = Vec::with_capacity(items.len());
        let mut complete = true;
        for (idx, item) in items.iter().enumerate() {
            match self.message(idx, item) {
                Some(message) => messages.push(message),
                None => complete = false,
            }
        }
        complete.then_some(messages)
    }

    fn message(&mut self, idx: usize, item: &Value) -> Option<ChatMessage> {
        let path = format!("messages[{idx}]");
        let Some(obj) = item.as_object() else {
            self.type_mismatch(path, "an object");
            return None;
        };

        let role = match obj.get("role").filter(|v| !v.is_null()) {
            None => {
                self.missing(format!("{path}.role"));
                None
            }
            Some(Value::String(role)) if CHAT_ROLES.contains(&role.as_str()) => Some(role.clone()),
            Some(Value::String(_)) => {
                self.out_of_range(
                    format!("{path}.role"),
                    format!("must be one of {}", CHAT_ROLES.join(", ")),
                );
                None
            }
            Some(_) => {
                self.type_mismatch(format!("{path}.role"), "a string");
                None
            }
        };

        let content = match obj.get("content").filter(|v| !v.is_null()) {
            None => {
                self.missing(format!("{path}.content"));
                None
            }
            Some(value) => {
                let text = message_text(value);
                if text.is_none() {
                    self.type_mismatch(
                        format!("{path}.content"),
                        "a string or an array of text parts",
                    );
                }
                text
            }
        };

        Some(ChatMessage {
            role: role?,
            content: content?,
        })
    }

    fn stop(&mut self) -> Vec<String> {
        let sequences = match self.get("stop") {
            None => Vec::new(),
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => {
                if items.len() > MAX_STOP_SEQUENCES {
                    self.out_of_range(
                        "stop",
                        format!("at most {MAX_STOP_SEQUENCES} stop sequences are allowed"),
                    );
                    return Vec::new();
                }
                let mut sequences = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) => sequences.push(s.to_string()),
                        None => self.type_mismatch(format!("stop[{idx}]"), "a string"),
                    }
                }
                sequences
            }
            Some(_) => {
                self.type_mismatch("stop", "a string or an array of strings");
                Vec::new()
            }
        };
        sequences.into_iter().filter(|s| !s.is_empty()).collect()
    }
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let mut texts = Vec::with_capacity(parts.len());
            for part in parts {
                let obj = part.as_object()?;
                if obj.get("type").and_then(Value::as_str) != Some("text") {
                    return None;
                }
                texts.push(obj.get("text")?.as_str()?);
            }
            Some(texts.join(" "))
        }
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
