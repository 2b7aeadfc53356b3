//! Configuration management for faqdesk.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - A YAML config file (`faqdesk.yaml` in the working directory, or the path
//!   given by `--config` / `FAQDESK_CONFIG`)
//! - Environment variables
//! - Command-line flags (applied with [`AppConfig::with_overrides`])

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "faqdesk.yaml";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the knowledge-base documents
    pub corpus_dir: PathBuf,

    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Log line format
    pub log_format: LogFormat,

    /// Generation provider settings
    pub llm: LlmSettings,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Chunking and search settings
    pub retrieval: RetrievalSettings,

    /// Escalation settings
    pub confidence: ConfidenceSettings,

    /// Session retention settings
    pub sessions: SessionSettings,

    /// Optional directory with prompt template overrides
    pub prompts_dir: Option<PathBuf>,
}

/// Generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider name ("ollama", "anthropic")
    pub provider: String,

    /// Model identifier; `None` picks the provider default
    pub model: Option<String>,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// API key, never written back to disk
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum tokens to generate per answer
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: None,
            endpoint: None,
            api_key: None,
            max_tokens: 1024,
            temperature: 0.3,
            timeout_secs: 120,
        }
    }
}

impl LlmSettings {
    /// Model to request, falling back to the provider default.
    pub fn model_name(&self) -> &str {
        if let Some(ref model) = self.model {
            return model;
        }
        match self.provider.as_str() {
            "anthropic" | "claude" => "claude-3-5-haiku-latest",
            _ => "llama3.2",
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider name ("hash", "ollama")
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// Maximum texts per embedding request
    #[serde(rename = "batchSize")]
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            batch_size: 64,
        }
    }
}

/// Chunking and search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Maximum chunk size in characters
    #[serde(rename = "chunkSize")]
    pub chunk_size: usize,

    /// Overlap setting; 0 disables overlap carrying between chunks
    #[serde(rename = "chunkOverlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per query
    #[serde(rename = "topK")]
    pub top_k: usize,

    /// Minimum cosine similarity for a retrieved chunk
    #[serde(rename = "similarityThreshold")]
    pub similarity_threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            similarity_threshold: 0.3,
        }
    }
}

/// Escalation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSettings {
    /// Answers scoring below this are escalated to a human
    pub threshold: f64,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self { threshold: 0.6 }
    }
}

/// Session retention settings. Both limits are off by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Keep only the newest N messages per session
    #[serde(rename = "maxHistoryMessages")]
    pub max_history_messages: Option<usize>,

    /// Drop sessions idle for longer than this many seconds
    #[serde(rename = "idleTtlSecs")]
    pub idle_ttl_secs: Option<u64>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(rename = "corpusDir")]
    corpus_dir: Option<String>,
    #[serde(rename = "promptsDir")]
    prompts_dir: Option<String>,
    logging: Option<LoggingConfig>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    confidence: Option<ConfidenceSettings>,
    sessions: Option<SessionSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from(".knowledge_sources"),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_format: LogFormat::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            confidence: ConfidenceSettings::default(),
            sessions: SessionSettings::default(),
            prompts_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional YAML file and the environment.
    ///
    /// Environment variables:
    /// - `FAQDESK_CONFIG`: Path to config file (when `config_file` is `None`)
    /// - `FAQDESK_CORPUS_DIR`: Knowledge-base directory
    /// - `FAQDESK_PROVIDER`: Generation provider
    /// - `FAQDESK_MODEL`: Model identifier
    /// - `FAQDESK_API_KEY`: API key for the generation provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use faqdesk_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Corpus: {:?}", config.corpus_dir);
    /// ```
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let mut config = Self::default();

        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("FAQDESK_CONFIG").ok().map(PathBuf::from));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                config = config.merge_yaml(&path)?;
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    config = config.merge_yaml(&path)?;
                }
            }
        }

        // Environment variables override YAML config
        if let Ok(dir) = std::env::var("FAQDESK_CORPUS_DIR") {
            config.corpus_dir = PathBuf::from(dir);
        }

        if let Ok(provider) = std::env::var("FAQDESK_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("FAQDESK_MODEL") {
            config.llm.model = Some(model);
        }

        if let Ok(key) = std::env::var("FAQDESK_API_KEY") {
            config.llm.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        if let Ok(format) = std::env::var("FAQDESK_LOG_FORMAT") {
            config.log_format = LogFormat::parse(&format)?;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone().merge_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        result.config_file = Some(path.to_path_buf());

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    fn merge_str(mut self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let file: ConfigFile = serde_yaml::from_str(contents)?;

        if let Some(dir) = file.corpus_dir {
            self.corpus_dir = PathBuf::from(dir);
        }

        if let Some(dir) = file.prompts_dir {
            self.prompts_dir = Some(PathBuf::from(dir));
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = format;
            }
        }

        if let Some(llm) = file.llm {
            self.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }
        if let Some(confidence) = file.confidence {
            self.confidence = confidence;
        }
        if let Some(sessions) = file.sessions {
            self.sessions = sessions;
        }

        Ok(self)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and environment.
    pub fn with_overrides(
        mut self,
        corpus_dir: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(dir) = corpus_dir {
            self.corpus_dir = dir;
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = Some(model);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Resolve the API key for the active generation provider.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.llm.api_key {
            return Some(key.clone());
        }

        match self.llm.provider.as_str() {
            "anthropic" | "claude" => std::env::var("ANTHROPIC_API_KEY").ok(),
            _ => None,
        }
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        let known_llm = ["ollama", "anthropic", "claude"];
        if !known_llm.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                known_llm.join(", ")
            )));
        }

        let known_embedding = ["hash", "ollama"];
        if !known_embedding.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedding.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.chunk_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if !(-1.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(AppError::Config(format!(
                "Similarity threshold must be within [-1, 1], got {}",
                self.retrieval.similarity_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence.threshold) {
            return Err(AppError::Config(format!(
                "Confidence threshold must be within [0, 1], got {}",
                self.confidence.threshold
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "Temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }

        if matches!(self.llm.provider.as_str(), "anthropic" | "claude")
            && self.resolve_api_key().is_none()
        {
            return Err(AppError::Config(
                "API key not found: set FAQDESK_API_KEY or ANTHROPIC_API_KEY".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model_name(), "llama3.2");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.confidence.threshold, 0.6);
        assert!(config.sessions.max_history_messages.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_provider_default_model() {
        let mut settings = LlmSettings::default();
        settings.provider = "anthropic".to_string();
        assert!(settings.model_name().starts_with("claude"));

        settings.model = Some("custom".to_string());
        assert_eq!(settings.model_name(), "custom");
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some(PathBuf::from("/srv/kb")),
            Some("anthropic".to_string()),
            Some("claude-sonnet".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.corpus_dir, PathBuf::from("/srv/kb"));
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.model_name(), "claude-sonnet");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_partial_yaml() {
        let yaml = r#"
corpusDir: /data/faq
retrieval:
  topK: 3
confidence:
  threshold: 0.7
sessions:
  maxHistoryMessages: 20
logging:
  color: false
  format: json
"#;
        let config = AppConfig::default().merge_str(yaml).unwrap();
        assert_eq!(config.corpus_dir, PathBuf::from("/data/faq"));
        assert_eq!(config.retrieval.top_k, 3);
        // Unspecified fields in a section keep their defaults
        assert_eq!(config.retrieval.chunk_size, 1000);
        assert_eq!(config.confidence.threshold, 0.7);
        assert_eq!(config.sessions.max_history_messages, Some(20));
        assert!(config.no_color);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let yaml = "logging:\n  format: xml\n";
        assert!(AppConfig::default().merge_str(yaml).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, "embedding:\n  dimensions: 128\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.embedding.dimensions, 128);
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load(Some(&temp.path().join("missing.yaml")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_thresholds() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.confidence.threshold = 1.5;
        assert!(config.validate().is_err());

        config.confidence.threshold = 0.6;
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_anthropic_with_key() {
        let mut config = AppConfig::default();
        config.llm.provider = "anthropic".to_string();
        config.llm.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_api_key(), Some("sk-test".to_string()));
    }
}
