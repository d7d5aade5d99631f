use std::path::{Path, PathBuf};

use homedir::my_home;
use serde::{Deserialize, Serialize};

use crate::{dictionary, semantic, storage::BackendLocal, vocab};

const CONFIG_FILE: &str = "config.yaml";

/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// Default dictionary request timeout in seconds
const DEFAULT_DICTIONARY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_INDEX_FILE: &str = "words.idx";
const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid utf8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("{0}")]
    Invalid(String),

    #[error("could not determine home directory")]
    NoHomeDir,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Index artifact, relative paths resolve against the base directory
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Words embedded per encoder call during a build
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Neighbors returned by `query` when no `-k` is given
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            index_file: default_index_file(),
            batch_size: default_batch_size(),
            download_timeout_secs: default_download_timeout_secs(),
            neighbors: default_neighbors(),
        }
    }
}

fn default_model() -> String {
    semantic::DEFAULT_MODEL.to_string()
}

fn default_index_file() -> String {
    DEFAULT_INDEX_FILE.to_string()
}

fn default_batch_size() -> usize {
    semantic::DEFAULT_BATCH_SIZE
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_neighbors() -> usize {
    crate::compose::NEIGHBORS_PER_WORD
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    vocab::DEFAULT_DELIMITER as char
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DictionaryConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_dictionary_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_dictionary_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    dictionary::DEFAULT_API_URL.to_string()
}

fn default_dictionary_timeout_secs() -> u64 {
    DEFAULT_DICTIONARY_TIMEOUT_SECS
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuizConfig {
    /// CSV path or http(s) URL
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub community_label: Option<String>,

    #[serde(default)]
    pub community_url: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            community_label: None,
            community_url: None,
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub semantic: SemanticConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub dictionary: DictionaryConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub web: WebConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

/// `LEXIS_BASE_PATH`, or `~/.local/share/lexis`.
pub fn base_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var("LEXIS_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()
        .map_err(|_| ConfigError::NoHomeDir)?
        .ok_or(ConfigError::NoHomeDir)?;

    Ok(home.join(".local/share/lexis"))
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        let sem = &self.semantic;
        if sem.model.trim().is_empty() {
            return Err(ConfigError::Invalid("semantic.model must not be empty".into()));
        }
        if sem.index_file.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "semantic.index_file must not be empty".into(),
            ));
        }
        if sem.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "semantic.batch_size must be greater than 0".into(),
            ));
        }
        if sem.download_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "semantic.download_timeout_secs must be greater than 0".into(),
            ));
        }

        if !self.vocabulary.delimiter.is_ascii() {
            return Err(ConfigError::Invalid(format!(
                "vocabulary.delimiter must be a single ascii character, got '{}'",
                self.vocabulary.delimiter
            )));
        }

        if self.dictionary.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "dictionary.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.web.community_label.is_some() != self.web.community_url.is_some() {
            return Err(ConfigError::Invalid(
                "web.community_label and web.community_url must be set together".into(),
            ));
        }

        Ok(())
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&base_path()?)
    }

    pub fn load_with(base_path: &Path) -> Result<Self, ConfigError> {
        let store = BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE)?)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let store = BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;

        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_path.join(&self.semantic.index_file)
    }

    pub fn delimiter(&self) -> u8 {
        self.vocabulary.delimiter as u8
    }
}
