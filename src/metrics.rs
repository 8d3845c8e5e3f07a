//! Request counters exported in the Prometheus text exposition format.

use std::collections::BTreeMap;
use std::fmt::{Display, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::openai::{EndpointKind, Usage};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Default)]
struct ModelCounters {
    success: AtomicU64,
    prompt_tokens: AtomicU64,
    generation_tokens: AtomicU64,
    running: AtomicU64,
}

/// Shared counters. The model set is fixed at construction, so only the
/// atomics themselves are ever mutated.
#[derive(Debug)]
pub struct ServerMetrics {
    received_chat: AtomicU64,
    received_completions: AtomicU64,
    models: BTreeMap<String, ModelCounters>,
}

impl ServerMetrics {
    pub fn new<'a>(model_ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            received_chat: AtomicU64::new(0),
            received_completions: AtomicU64::new(0),
            models: model_ids
                .into_iter()
                .map(|id| (id.to_string(), ModelCounters::default()))
                .collect(),
        }
    }

    pub fn record_received(&self, endpoint: EndpointKind) {
        self.received(endpoint).fetch_add(1, Ordering::Relaxed);
    }

    pub fn received_total(&self, endpoint: EndpointKind) -> u64 {
        self.received(endpoint).load(Ordering::Relaxed)
    }

    fn received(&self, endpoint: EndpointKind) -> &AtomicU64 {
        match endpoint {
            EndpointKind::ChatCompletions => &self.received_chat,
            EndpointKind::Completions => &self.received_completions,
        }
    }

    pub fn record_success(&self, model: &str, usage: Usage) {
        if let Some(counters) = self.models.get(model) {
            counters.success.fetch_add(1, Ordering::Relaxed);
            counters
                .prompt_tokens
                .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
            counters
                .generation_tokens
                .fetch_add(usage.completion_tokens, Ordering::Relaxed);
        }
    }

    /// Marks a request as running until the returned guard is dropped.
    pub fn track_running(self: &Arc<Self>, model: &str) -> RunningGuard {
        if let Some(counters) = self.models.get(model) {
            counters.running.fetch_add(1, Ordering::Relaxed);
        }
        RunningGuard {
            metrics: Arc::clone(self),
            model: model.to_string(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        family(
            &mut out,
            "furiosa_llm_num_requests_running",
            "Number of requests running on RNGD",
            "gauge",
        );
        for (model, counters) in &self.models {
            let running = counters.running.load(Ordering::Relaxed);
            sample(&mut out, "furiosa_llm_num_requests_running", model, None, running);
        }

        family(
            &mut out,
            "furiosa_llm_num_requests_waiting",
            "Number of requests waiting to be processed",
            "gauge",
        );
        for model in self.models.keys() {
            sample(&mut out, "furiosa_llm_num_requests_waiting", model, None, 0);
        }

        family(
            &mut out,
            "furiosa_llm_request_received_total",
            "Number of received requests in total",
            "counter",
        );
        for endpoint in [EndpointKind::ChatCompletions, EndpointKind::Completions] {
            let _ = writeln!(
                out,
                "furiosa_llm_request_received_total{{endpoint=\"{}\"}} {}",
                endpoint.as_str(),
                self.received_total(endpoint)
            );
        }

        let per_model: [(&str, &str, fn(&ModelCounters) -> &AtomicU64); 3] = [
            (
                "furiosa_llm_request_success_total",
                "Number of successfully processed requests",
                |c| &c.success,
            ),
            (
                "furiosa_llm_prompt_tokens_total",
                "Total number of prefill tokens processed",
                |c| &c.prompt_tokens,
            ),
            (
                "furiosa_llm_generation_tokens_total",
                "Total number of generation tokens processed",
                |c| &c.generation_tokens,
            ),
        ];
        for (name, help, counter) in per_model {
            family(&mut out, name, help, "counter");
            for (model, counters) in &self.models {
                sample(&mut out, name, model, None, counter(counters).load(Ordering::Relaxed));
            }
        }

        family(
            &mut out,
            "furiosa_llm_kv_cache_usage_perc",
            "KV-cache usage percentage",
            "gauge",
        );
        for model in self.models.keys() {
            let device = Some(("device_index", "0"));
            sample(&mut out, "furiosa_llm_kv_cache_usage_perc", model, device, 0.0);
        }

        out
    }
}

fn family(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

fn sample(
    out: &mut String,
    name: &str,
    model: &str,
    extra: Option<(&str, &str)>,
    value: impl Display,
) {
    let _ = write!(out, "{name}{{model_name=\"{}\"", escape_label(model));
    if let Some((key, val)) = extra {
        let _ = write!(out, ",{key}=\"{}\"", escape_label(val));
    }
    let _ = writeln!(out, "}} {value}");
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

pub struct RunningGuard {
    metrics: Arc<ServerMetrics>,
    model: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if let Some(counters) = self.metrics.models.get(&self.model) {
            counters.running.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
