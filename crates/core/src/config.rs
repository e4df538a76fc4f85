//! Configuration management for the cookbook assistant.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.cookbook/config.yaml` or `COOKBOOK_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: relative paths (index directory,
//! source document, prompt overrides) are resolved against the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];
const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .cookbook/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion provider ("openai" or "ollama")
    pub provider: String,

    /// Completion model identifier
    pub model: String,

    /// Custom completion endpoint (base URL)
    pub endpoint: Option<String>,

    /// Sampling temperature, sent only when set
    pub temperature: Option<f32>,

    /// Maximum tokens to generate, sent only when set
    pub max_tokens: Option<u32>,

    /// API key for OpenAI-backed providers
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Embedding provider settings
    pub embedding: EmbeddingConfig,

    /// Vector index settings
    pub index: IndexConfig,

    /// Cookbook document to ingest
    pub source_document: PathBuf,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum texts per embedding request
    #[serde(rename = "batchSize", default = "default_batch_size")]
    pub batch_size: usize,

    /// Custom provider endpoint (base URL)
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

/// Vector index and chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Directory holding the persisted index (relative to workspace)
    pub directory: PathBuf,

    /// Collection (table) name inside the directory
    pub collection: String,

    /// Maximum chunk length in characters
    #[serde(rename = "chunkSize")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(rename = "chunkOverlap")]
    pub chunk_overlap: usize,

    /// Default number of chunks to retrieve
    #[serde(rename = "topK")]
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("vectorstore/lancedb"),
            collection: "cookbook-recipes".to_string(),
            chunk_size: 800,
            chunk_overlap: 100,
            top_k: 5,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingConfig>,
    index: Option<IndexSection>,
    source: Option<SourceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    temperature: Option<f32>,
    #[serde(rename = "maxTokens")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexSection {
    directory: Option<PathBuf>,
    collection: Option<String>,
    #[serde(rename = "chunkSize")]
    chunk_size: Option<usize>,
    #[serde(rename = "chunkOverlap")]
    chunk_overlap: Option<usize>,
    #[serde(rename = "topK")]
    top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SourceSection {
    document: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-5-nano".to_string(),
            endpoint: None,
            temperature: None,
            max_tokens: None,
            api_key: None,
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            source_document: PathBuf::from("data/source/COOKBOOK.pdf"),
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `COOKBOOK_WORKSPACE`: Override workspace path
    /// - `COOKBOOK_CONFIG`: Path to config file
    /// - `COOKBOOK_PROVIDER`: Completion provider
    /// - `COOKBOOK_MODEL`: Completion model
    /// - `OPENAI_API_KEY`: API key for OpenAI-backed providers
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use cookbook_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_dir());
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("COOKBOOK_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("COOKBOOK_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        config.apply_file_and_env()
    }

    /// Re-read the config file and environment after the workspace or config
    /// file location changed (e.g. via CLI flags).
    pub fn apply_file_and_env(mut self) -> AppResult<Self> {
        if !self.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                self.workspace
            )));
        }

        let config_path = self
            .config_file
            .clone()
            .unwrap_or_else(|| self.cookbook_dir().join("config.yaml"));

        if config_path.exists() {
            self = self.merge_yaml(&config_path)?;
        } else if self.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        if let Ok(provider) = std::env::var("COOKBOOK_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("COOKBOOK_MODEL") {
            self.model = model;
        }

        self.api_key = std::env::var(OPENAI_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(self)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            result.endpoint = llm.endpoint.or(result.endpoint);
            result.temperature = llm.temperature.or(result.temperature);
            result.max_tokens = llm.max_tokens.or(result.max_tokens);
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(index) = config_file.index {
            if let Some(directory) = index.directory {
                result.index.directory = directory;
            }
            if let Some(collection) = index.collection {
                result.index.collection = collection;
            }
            if let Some(chunk_size) = index.chunk_size {
                result.index.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = index.chunk_overlap {
                result.index.chunk_overlap = chunk_overlap;
            }
            if let Some(top_k) = index.top_k {
                result.index.top_k = top_k;
            }
        }

        if let Some(document) = config_file.source.and_then(|s| s.document) {
            result.source_document = document;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the config file and environment.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        log_format: Option<LogFormat>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = log_format;
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .cookbook directory.
    pub fn cookbook_dir(&self) -> PathBuf {
        self.workspace.join(".cookbook")
    }

    /// Absolute location of the persisted index directory.
    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.index.directory)
    }

    /// Absolute location of the source document.
    pub fn source_path(&self) -> PathBuf {
        self.resolve(&self.source_document)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Whether any configured provider talks to OpenAI.
    pub fn uses_openai(&self) -> bool {
        self.provider.eq_ignore_ascii_case("openai")
            || self.embedding.provider.eq_ignore_ascii_case("openai")
    }

    /// Ensure the credentials the configured providers need are present.
    ///
    /// Called at request entry; a missing key is fatal for that request.
    pub fn require_credentials(&self) -> AppResult<()> {
        if self.uses_openai() && self.api_key.is_none() {
            return Err(AppError::Config(format!(
                "Server misconfigured: {} is not set. \
                 Export it (or add it to your shell profile) and retry.",
                OPENAI_API_KEY_ENV
            )));
        }
        Ok(())
    }

    /// Validate provider names and chunking settings.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let embedding_provider = self.embedding.provider.to_lowercase();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding dimensions and batchSize must be greater than zero".to_string(),
            ));
        }

        if self.index.chunk_size == 0 || self.index.chunk_overlap >= self.index.chunk_size {
            return Err(AppError::Config(format!(
                "Invalid chunking: chunkSize={} chunkOverlap={} (overlap must be smaller than size)",
                self.index.chunk_size, self.index.chunk_overlap
            )));
        }

        if self.index.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.index.collection.trim().is_empty() {
            return Err(AppError::Config(
                "Index collection name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
