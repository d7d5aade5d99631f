use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod compose;
mod config;
mod dictionary;
mod eid;
mod quiz;
mod render;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod vocab;
mod web;

use compose::Composer;
use config::Config;
use dictionary::{DefinitionLookup, FreeDictionary};
use quiz::QuizBank;
use render::{LinkButton, LinkOptions};
use semantic::{EmbeddingModel, Encoder, IndexBuilder, IndexStorage, QueryEngine};
use vocab::Vocabulary;

const DEFAULT_LOG_FILTER: &str = "lexis=info,tower_http=info";

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_encoder(config: &Config) -> anyhow::Result<Arc<dyn Encoder>> {
    let model = EmbeddingModel::new(
        &config.semantic.model,
        config.base_path().to_path_buf(),
        Some(Duration::from_secs(config.semantic.download_timeout_secs)),
    )?;

    Ok(Arc::new(model))
}

fn open_engine(config: &Config) -> anyhow::Result<QueryEngine> {
    let storage = IndexStorage::new(config.index_path());
    if !storage.exists() {
        bail!(
            "word index not found at {}, run `lexis build --words <PATH>` first",
            storage.path().display()
        );
    }

    let encoder = load_encoder(config)?;
    Ok(QueryEngine::open(encoder, &storage)?)
}

fn open_dictionary(config: &Config) -> anyhow::Result<Arc<dyn DefinitionLookup>> {
    let dictionary = FreeDictionary::new(
        &config.dictionary.api_url,
        Duration::from_secs(config.dictionary.timeout_secs),
    )?;

    Ok(Arc::new(dictionary))
}

fn load_quiz(config: &Config) -> anyhow::Result<Option<QuizBank>> {
    let Some(source) = &config.quiz.source else {
        return Ok(None);
    };

    let bank = QuizBank::load(source, Duration::from_secs(config.dictionary.timeout_secs))
        .with_context(|| format!("failed to load quiz from {source}"))?;

    if bank.is_empty() {
        log::warn!("quiz source {source} has no questions");
    } else {
        log::info!("quiz ready with {} questions", bank.len());
    }

    Ok(Some(bank))
}

fn link_options(config: &Config) -> LinkOptions {
    let community = match (&config.web.community_label, &config.web.community_url) {
        (Some(label), Some(url)) => Some(LinkButton {
            label: label.clone(),
            url: url.clone(),
        }),
        _ => None,
    };

    LinkOptions { community }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();
    let config = Config::load()?;

    match args.command {
        cli::Command::Build {
            words,
            delimiter,
            quiet,
        } => {
            let delimiter = match delimiter {
                Some(c) if c.is_ascii() => c as u8,
                Some(c) => bail!("delimiter must be a single ascii character, got '{c}'"),
                None => config.delimiter(),
            };

            let (vocab, _) = Vocabulary::load(&words, delimiter)?;
            let encoder = load_encoder(&config)?;
            let storage = IndexStorage::new(config.index_path());

            let report = IndexBuilder::new(encoder.as_ref())
                .batch_size(config.semantic.batch_size)
                .show_progress(!quiet)
                .build_and_publish(&vocab, &storage)?;

            println!(
                "{} words indexed with {} ({} dimensions) into {}",
                report.entries,
                report.model,
                report.dimensions,
                storage.path().display()
            );
            Ok(())
        }

        cli::Command::Info {} => {
            let storage = IndexStorage::new(config.index_path());
            let header = storage.read_header()?;

            let info = serde_json::json!({
                "path": storage.path(),
                "version": header.version,
                "model_id": header.model_id_short(),
                "dimensions": header.dimensions,
                "entries": header.entry_count,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }

        cli::Command::Query { text, k } => {
            let engine = open_engine(&config)?;
            let result = engine.query(&text, k.unwrap_or(config.semantic.neighbors))?;

            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }

        cli::Command::Compose { text } => {
            let composer = Composer::new(open_engine(&config)?);

            println!("{}", serde_json::to_string_pretty(&composer.compose(&text))?);
            Ok(())
        }

        cli::Command::Define { text } => {
            let composer = Composer::new(open_engine(&config)?);
            let dictionary = open_dictionary(&config)?;

            let candidates = composer.compose(&text);
            let results =
                render::render_candidates(&candidates, dictionary.as_ref(), &link_options(&config));

            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }

        cli::Command::Quiz { id } => {
            let Some(bank) = load_quiz(&config)? else {
                bail!("quiz.source is not set in config.yaml");
            };

            let question = match id {
                Some(id) => bank.get(id).with_context(|| format!("question {id} not found"))?,
                None => bank
                    .random(&mut rand::rng())
                    .context("quiz has no questions")?,
            };

            let output = serde_json::json!({
                "question": question,
                "answer": question.correct_answer(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }

        cli::Command::Daemon { listen } => {
            let state = web::SharedState {
                composer: Composer::new(open_engine(&config)?),
                dictionary: open_dictionary(&config)?,
                quiz: load_quiz(&config)?.map(Arc::new),
                links: link_options(&config),
            };

            let listen = listen.unwrap_or_else(|| config.web.listen.clone());
            web::start_daemon(&listen, state)
        }
    }
}
