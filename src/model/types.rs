use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub owned_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    // Furiosa-LLM extensions
    pub artifact_id: Option<String>,
    pub max_prompt_len: Option<u32>,
    pub max_context_len: Option<u32>,
    pub runtime_config: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub furiosa_llm: String,
    pub furiosa_compiler: String,
    pub furiosa_runtime: String,
}
