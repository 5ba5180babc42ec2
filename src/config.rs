use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "MediScript";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// SQLite file holding prescriptions and statistics.
pub const DATABASE_FILE: &str = "mediscript.db";

/// Chat-completion endpoint used when no override is configured.
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// How long a dictation turn listens before auto-stopping.
pub const DEFAULT_DICTATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Get the application data directory
/// ~/MediScript/ when a home directory exists, else ./MediScript
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the prescription database.
pub fn database_path() -> PathBuf {
    app_data_dir().join(DATABASE_FILE)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,mediscript_lib=debug"
    } else {
        "info"
    }
}

/// Remote generation settings. The credential is not part of this: the
/// shell injects it into the generator at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            temperature: DEFAULT_LLM_TEMPERATURE,
            max_tokens: DEFAULT_LLM_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl GenerationSettings {
    /// Defaults, overridden by `MEDISCRIPT_LLM_ENDPOINT`,
    /// `MEDISCRIPT_LLM_MODEL` and `MEDISCRIPT_LLM_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(endpoint) = lookup("MEDISCRIPT_LLM_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            settings.endpoint = endpoint.trim().to_string();
        }
        if let Some(model) = lookup("MEDISCRIPT_LLM_MODEL").filter(|v| !v.trim().is_empty()) {
            settings.model = model.trim().to_string();
        }
        match lookup("MEDISCRIPT_LLM_TIMEOUT_SECS").map(|v| v.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => settings.timeout = Duration::from_secs(secs),
            Some(_) => tracing::warn!("Ignoring invalid MEDISCRIPT_LLM_TIMEOUT_SECS"),
            None => {}
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with(DATABASE_FILE));
    }

    #[test]
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with("MediScript"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn default_generation_settings() {
        let s = GenerationSettings::default();
        assert_eq!(s.endpoint, DEFAULT_LLM_ENDPOINT);
        assert_eq!(s.model, "llama-3.3-70b-versatile");
        assert!((s.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(s.max_tokens, 2000);
        assert_eq!(s.timeout, Duration::from_secs(30));
    }

    #[test]
    fn lookup_overrides_settings() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MEDISCRIPT_LLM_ENDPOINT", "http://localhost:8080/v1/chat/completions"),
            ("MEDISCRIPT_LLM_MODEL", " local-model "),
            ("MEDISCRIPT_LLM_TIMEOUT_SECS", "12"),
        ]);
        let s = GenerationSettings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(s.model, "local-model");
        assert_eq!(s.timeout, Duration::from_secs(12));
        assert_eq!(s.max_tokens, DEFAULT_LLM_MAX_TOKENS);
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        let s = GenerationSettings::from_lookup(|k| {
            (k == "MEDISCRIPT_LLM_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(s.timeout, Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS));

        let s = GenerationSettings::from_lookup(|k| {
            (k == "MEDISCRIPT_LLM_TIMEOUT_SECS").then(|| "0".to_string())
        });
        assert_eq!(s.timeout, Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS));
    }
}
