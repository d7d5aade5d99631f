//! Quiz questions from a spreadsheet export.
//!
//! Expected CSV header:
//! `id,question,option_1,option_2,option_3,option_4,correct,explanation`
//!
//! `correct` is 1-based in the sheet; empty trailing options are allowed
//! as long as at least two remain.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const MIN_OPTIONS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("question {id}: {message}")]
    InvalidRow { id: u32, message: String },

    #[error("question id {0} appears more than once")]
    DuplicateId(u32),
}

#[derive(Debug, Deserialize)]
struct QuizRow {
    id: u32,
    question: String,
    option_1: Option<String>,
    option_2: Option<String>,
    option_3: Option<String>,
    option_4: Option<String>,
    correct: usize,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// 0-based index into `options`
    pub correct_option: usize,
    pub explanation: String,
}

impl QuizQuestion {
    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_option]
    }
}

impl TryFrom<QuizRow> for QuizQuestion {
    type Error = QuizError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        let invalid = |message: String| QuizError::InvalidRow {
            id: row.id,
            message,
        };

        let question = row.question.trim().to_string();
        if question.is_empty() {
            return Err(invalid("question text is empty".to_string()));
        }

        let options: Vec<String> = [&row.option_1, &row.option_2, &row.option_3, &row.option_4]
            .into_iter()
            .map(|o| o.as_deref().map(str::trim).unwrap_or_default())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if options.len() < MIN_OPTIONS {
            return Err(invalid(format!(
                "needs at least {MIN_OPTIONS} options, got {}",
                options.len()
            )));
        }

        if row.correct == 0 || row.correct > options.len() {
            return Err(invalid(format!(
                "correct option {} is outside 1..={}",
                row.correct,
                options.len()
            )));
        }

        Ok(QuizQuestion {
            id: row.id,
            question,
            options,
            correct_option: row.correct - 1,
            explanation: row.explanation.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuizBank {
    questions: BTreeMap<u32, QuizQuestion>,
}

impl QuizBank {
    /// Load from a local path or an http(s) URL.
    pub fn load(source: &str, timeout: Duration) -> Result<Self, QuizError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::from_url(source, timeout)
        } else {
            Self::from_path(Path::new(source))
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, QuizError> {
        let reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_path(path)?;
        Self::collect(reader)
    }

    pub fn from_url(url: &str, timeout: Duration) -> Result<Self, QuizError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        let body = client.get(url).send()?.error_for_status()?.bytes()?;
        Self::from_reader(body.as_ref())
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, QuizError> {
        Self::collect(csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(rdr))
    }

    fn collect<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, QuizError> {
        let mut questions = BTreeMap::new();

        for row in reader.deserialize::<QuizRow>() {
            let question = QuizQuestion::try_from(row?)?;
            let id = question.id;
            if questions.insert(id, question).is_some() {
                return Err(QuizError::DuplicateId(id));
            }
        }

        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&QuizQuestion> {
        self.questions.get(&id)
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&QuizQuestion> {
        self.questions.values().choose(rng)
    }
}
