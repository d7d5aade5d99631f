//! Word definitions from the Free Dictionary API.
//!
//! The presentation layer depends on `DefinitionLookup` only, so rendering
//! can be tested without network access.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::compose::capitalize;

pub const DEFAULT_API_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en_US";

/// Shown instead of meanings when the lookup itself failed.
pub const LOOKUP_FAILED_MESSAGE: &str =
    "An error occurred. Wait a few seconds and try again. If the error persists, contact the developer.";

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("unexpected status {status} for '{word}'")]
    Status { word: String, status: StatusCode },

    #[error("malformed dictionary response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("dictionary returned no entries for '{0}'")]
    Empty(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordDefinition {
    pub word: String,
    pub phonetics: Vec<String>,
    pub meanings: Vec<String>,
}

impl WordDefinition {
    /// Placeholder used when the lookup failed.
    pub fn unavailable(word: &str) -> Self {
        Self {
            word: capitalize(word),
            phonetics: vec![],
            meanings: vec![LOOKUP_FAILED_MESSAGE.to_string()],
        }
    }

    /// Markdown message body: bold word, phonetics, blank line, meanings.
    pub fn to_markdown(&self) -> String {
        let mut message = format!("*{}*\n", self.word);
        if !self.phonetics.is_empty() {
            message.push_str(&self.phonetics.join(", "));
            message.push('\n');
        }
        message.push('\n');
        message.push_str(&self.meanings.join("\n"));
        message
    }
}

pub trait DefinitionLookup: Send + Sync {
    fn lookup(&self, word: &str) -> Result<WordDefinition, DictionaryError>;
}

pub struct FreeDictionary {
    client: reqwest::blocking::Client,
    api_url: String,
}

impl FreeDictionary {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, DictionaryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

impl DefinitionLookup for FreeDictionary {
    fn lookup(&self, word: &str) -> Result<WordDefinition, DictionaryError> {
        let url = format!("{}/{}", self.api_url, word);
        let resp = self.client.get(&url).send()?;
        let status = resp.status();
        let body = resp.text()?;

        log::debug!("dictionary lookup '{word}' -> {status}");

        parse_response(word, status, &body)
    }
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    word: String,
    #[serde(default)]
    phonetics: Vec<ApiPhonetic>,
    #[serde(default)]
    meanings: Vec<ApiMeaning>,
}

#[derive(Debug, Deserialize)]
struct ApiPhonetic {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMeaning {
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<ApiDefinition>,
}

#[derive(Debug, Deserialize)]
struct ApiDefinition {
    definition: String,
}

#[derive(Debug, Deserialize)]
struct ApiNotFound {
    title: String,
}

/// Interpret a dictionary API response.
///
/// A 404 is not an error: the service's title ("No Definitions Found")
/// becomes the single meaning.
pub fn parse_response(word: &str, status: StatusCode, body: &str) -> Result<WordDefinition, DictionaryError> {
    match status {
        StatusCode::OK => {
            let entries: Vec<ApiEntry> = serde_json::from_str(body)?;
            let entry = entries
                .into_iter()
                .next()
                .ok_or_else(|| DictionaryError::Empty(word.to_string()))?;
            Ok(from_entry(entry))
        }
        StatusCode::NOT_FOUND => {
            let not_found: ApiNotFound = serde_json::from_str(body)?;
            Ok(WordDefinition {
                word: capitalize(word),
                phonetics: vec![],
                meanings: vec![not_found.title],
            })
        }
        status => Err(DictionaryError::Status {
            word: word.to_string(),
            status,
        }),
    }
}

fn from_entry(entry: ApiEntry) -> WordDefinition {
    let phonetics = entry
        .phonetics
        .into_iter()
        .filter_map(|p| p.text)
        .filter(|text| !text.is_empty())
        .collect();

    let meanings = entry
        .meanings
        .iter()
        .flat_map(|part| {
            part.definitions
                .iter()
                .map(move |d| (part.part_of_speech.as_str(), d.definition.as_str()))
        })
        .enumerate()
        .map(|(idx, (part_of_speech, definition))| {
            format!("{}: {}. {}", idx + 1, part_of_speech, definition)
        })
        .collect();

    WordDefinition {
        word: capitalize(&entry.word),
        phonetics,
        meanings,
    }
}
