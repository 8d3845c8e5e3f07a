use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub served_model_name: String,
    pub furiosa_llm_version: String,
    pub furiosa_compiler_version: String,
    pub furiosa_runtime_version: String,
    pub max_request_bytes: usize,
    pub cors_permissive: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            served_model_name: "furiosa-llm".to_string(),
            furiosa_llm_version: "0.1.0".to_string(),
            furiosa_compiler_version: "2025.3.1".to_string(),
            furiosa_runtime_version: "2025.3.1".to_string(),
            max_request_bytes: 1024 * 1024,
            cors_permissive: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Builds a config from any variable source; unparseable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let listen_addr = lookup("SERVER_ADDR")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.listen_addr);

        let served_model_name = lookup("SERVED_MODEL_NAME")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.served_model_name);

        let furiosa_llm_version =
            lookup("FURIOSA_LLM_VERSION").unwrap_or(defaults.furiosa_llm_version);
        let furiosa_compiler_version =
            lookup("FURIOSA_COMPILER_VERSION").unwrap_or(defaults.furiosa_compiler_version);
        let furiosa_runtime_version =
            lookup("FURIOSA_RUNTIME_VERSION").unwrap_or(defaults.furiosa_runtime_version);

        let max_request_bytes = lookup("MAX_REQUEST_BYTES")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.max_request_bytes);
        let cors_permissive = lookup("CORS_PERMISSIVE")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.cors_permissive);

        Self {
            listen_addr,
            served_model_name,
            furiosa_llm_version,
            furiosa_compiler_version,
            furiosa_runtime_version,
            max_request_bytes,
            cors_permissive,
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_listen_on_local_port_8000() {
        let config = AppConfig::default();
        assert_eq!(config.listen_addr.port(), 8000);
        assert!(config.listen_addr.ip().is_loopback());
        assert_eq!(config.served_model_name, "furiosa-llm");
        assert!(!config.cors_permissive);
    }

    #[test]
    fn flag_parsing_accepts_common_truthy_values() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]);
        let defaults = AppConfig::default();
        assert_eq!(config.listen_addr, defaults.listen_addr);
        assert_eq!(config.max_request_bytes, 1024 * 1024);
        assert_eq!(config.furiosa_llm_version, defaults.furiosa_llm_version);
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            ("SERVER_ADDR", "0.0.0.0:9100"),
            ("SERVED_MODEL_NAME", "my-model"),
            ("FURIOSA_LLM_VERSION", "2.0.0"),
            ("MAX_REQUEST_BYTES", "4096"),
            ("CORS_PERMISSIVE", "true"),
        ]);
        assert_eq!(config.listen_addr.port(), 9100);
        assert!(config.listen_addr.ip().is_unspecified());
        assert_eq!(config.served_model_name, "my-model");
        assert_eq!(config.furiosa_llm_version, "2.0.0");
        assert_eq!(config.max_request_bytes, 4096);
        assert!(config.cors_permissive);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = config_from(&[
            ("SERVER_ADDR", "not-an-address"),
            ("MAX_REQUEST_BYTES", "lots"),
            ("SERVED_MODEL_NAME", "   "),
            ("CORS_PERMISSIVE", "maybe"),
        ]);
        let defaults = AppConfig::default();
        assert_eq!(config.listen_addr, defaults.listen_addr);
        assert_eq!(config.max_request_bytes, defaults.max_request_bytes);
        assert_eq!(config.served_model_name, "furiosa-llm");
        assert!(!config.cors_permissive);
    }
}
