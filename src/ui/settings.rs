use serde::{Deserialize, Serialize};

/// User-editable configuration, persisted as JSON by `settings_io`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub endpoint: String,
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Inline key; takes precedence over `api_key_env` when set.
    pub api_key: Option<String>,

    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,

    pub ui_scale: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.together.xyz/v1/chat/completions".into(),
            model: "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free".into(),
            api_key_env: "TOGETHER_API_KEY".into(),
            api_key: None,
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 0.9,
            timeout_secs: 120,
            ui_scale: 1.0,
        }
    }
}

impl AppSettings {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let s: AppSettings = serde_json::from_str(r#"{"model":"local-model"}"#).unwrap();
        assert_eq!(s.model, "local-model");
        assert_eq!(s.max_tokens, 4096);
    }

    #[test]
    fn inline_key_wins() {
        let s = AppSettings {
            api_key: Some("  k-123 ".into()),
            api_key_env: "IDEA_FORGE_TEST_UNSET_VAR".into(),
            ..Default::default()
        };
        assert_eq!(s.resolve_api_key().as_deref(), Some("k-123"));
    }

    #[test]
    fn blank_inline_key_uses_env_lookup() {
        let s = AppSettings {
            api_key: Some("   ".into()),
            api_key_env: "IDEA_FORGE_TEST_UNSET_VAR".into(),
            ..Default::default()
        };
        assert_eq!(s.resolve_api_key(), None);
    }
}
