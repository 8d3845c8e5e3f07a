use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use crate::{
    config::AppConfig,
    model::{ModelInfo, ModelList, VersionInfo},
};

const OWNER: &str = "furiosa-ai";

struct BuiltinModel {
    id: &'static str,
    artifact_id: &'static str,
}

const BUILTIN_MODELS: &[BuiltinModel] = &[
    BuiltinModel {
        id: "furiosa-ai/Llama-3.1-8B-Instruct-FP8",
        artifact_id: "llama-3.1-8b-instruct-fp8-v1",
    },
    BuiltinModel {
        id: "furiosa-ai/DeepSeek-R1-Distill-Llama-8B",
        artifact_id: "deepseek-r1-distill-llama-8b-v1",
    },
];

/// Immutable model and version metadata, loaded once at startup.
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
    version: VersionInfo,
}

impl ModelCatalog {
    pub fn initialize(config: &AppConfig) -> Self {
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut models: Vec<ModelInfo> = BUILTIN_MODELS
            .iter()
            .map(|builtin| builtin_info(builtin, created))
            .collect();

        let alias = config.served_model_name.as_str();
        if !models.iter().any(|m| m.id == alias) {
            let mut entry = builtin_info(&BUILTIN_MODELS[0], created);
            entry.id = alias.to_string();
            entry.root = Some(BUILTIN_MODELS[0].id.to_string());
            models.push(entry);
        }

        Self {
            models,
            version: VersionInfo {
                furiosa_llm: config.furiosa_llm_version.clone(),
                furiosa_compiler: config.furiosa_compiler_version.clone(),
                furiosa_runtime: config.furiosa_runtime_version.clone(),
            },
        }
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.get(model_id).is_some()
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == model_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.id.as_str())
    }

    pub fn list(&self) -> ModelList {
        ModelList {
            object: "list".to_string(),
            data: self.models.clone(),
        }
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }
}

fn builtin_info(builtin: &BuiltinModel, created: u64) -> ModelInfo {
    ModelInfo {
        id: builtin.id.to_string(),
        object: "model".to_string(),
        created,
        owned_by: OWNER.to_string(),
        root: None,
        artifact_id: Some(builtin.artifact_id.to_string()),
        max_prompt_len: Some(4096),
        max_context_len: Some(8192),
        runtime_config: Some(json!({ "bucket_size": 128, "tensor_parallel_size": 4 })),
    }
}
