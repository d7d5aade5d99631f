//! Inline results: one selectable card per candidate.

use std::thread;

use serde::Serialize;

use crate::compose::{capitalize, CandidateList};
use crate::dictionary::{DefinitionLookup, WordDefinition};
use crate::eid::Eid;
use crate::vocab::is_clean_word;

const YOUGLISH_LABEL: &str = "🔍 Youglish";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    /// Extra button shown above the pronunciation link on every result.
    pub community: Option<LinkButton>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineResult {
    pub id: Eid,
    pub title: String,
    pub description: String,
    /// Markdown body sent when the result is picked
    pub message: String,
    pub url: String,
    pub buttons: Vec<LinkButton>,
}

/// Pronunciation examples for `text` on youglish.
pub fn youglish_url(text: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
    format!("https://youglish.com/pronounce/{encoded}/english")
}

/// Render one candidate. Single words are looked up; phrases are shown as-is.
pub fn render_candidate(
    candidate: &str,
    dictionary: &dyn DefinitionLookup,
    links: &LinkOptions,
) -> InlineResult {
    let title = capitalize(candidate);
    let url = youglish_url(&title);

    let (message, description) = if is_clean_word(&title) {
        let definition = dictionary.lookup(&title.to_lowercase()).unwrap_or_else(|err| {
            log::warn!("definition for '{}' unavailable: {}", title, err);
            WordDefinition::unavailable(&title)
        });
        (definition.to_markdown(), definition.meanings.join("\n"))
    } else {
        (format!("*{title}*"), String::new())
    };

    let mut buttons = Vec::with_capacity(2);
    if let Some(community) = &links.community {
        buttons.push(community.clone());
    }
    buttons.push(LinkButton {
        label: YOUGLISH_LABEL.to_string(),
        url: url.clone(),
    });

    InlineResult {
        id: Eid::new(),
        title,
        description,
        message,
        url,
        buttons,
    }
}

/// Render every candidate, looking definitions up concurrently.
///
/// Output order matches candidate order.
pub fn render_candidates(
    candidates: &CandidateList,
    dictionary: &dyn DefinitionLookup,
    links: &LinkOptions,
) -> Vec<InlineResult> {
    thread::scope(|s| {
        let handles: Vec<_> = candidates
            .iter()
            .map(|candidate| s.spawn(move || render_candidate(candidate, dictionary, links)))
            .collect();

        handles
            .into_iter()
            .zip(candidates.iter())
            .map(|(handle, candidate)| {
                handle.join().unwrap_or_else(|_| {
                    log::error!("rendering '{}' panicked", candidate);
                    render_candidate(candidate, &Unavailable, links)
                })
            })
            .collect()
    })
}

/// Lookup that always fails, used after a rendering thread panicked.
struct Unavailable;

impl DefinitionLookup for Unavailable {
    fn lookup(&self, word: &str) -> Result<WordDefinition, crate::dictionary::DictionaryError> {
        Err(crate::dictionary::DictionaryError::Empty(word.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{DictionaryError, LOOKUP_FAILED_MESSAGE};
    use std::sync::Mutex;

    struct FakeDictionary {
        calls: Mutex<Vec<String>>,
    }

    impl FakeDictionary {
        fn new() -> Self {
            Self {
                calls: Mutex::new(vec![]),
            }
        }
    }

    impl DefinitionLookup for FakeDictionary {
        fn lookup(&self, word: &str) -> Result<WordDefinition, DictionaryError> {
            self.calls.lock().unwrap().push(word.to_string());
            if word == "broken" {
                return Err(DictionaryError::Empty(word.to_string()));
            }
            Ok(WordDefinition {
                word: capitalize(word),
                phonetics: vec![format!("/{word}/")],
                meanings: vec![format!("1: noun. A {word}."), "2: verb. To do it.".to_string()],
            })
        }
    }

    #[test]
    fn test_youglish_url_is_form_encoded() {
        assert_eq!(
            youglish_url("The cat sat"),
            "https://youglish.com/pronounce/The+cat+sat/english"
        );
        assert_eq!(
            youglish_url("Rock&roll?"),
            "https://youglish.com/pronounce/Rock%26roll%3F/english"
        );
    }

    #[test]
    fn test_render_word_includes_definition() {
        let dict = FakeDictionary::new();
        let result = render_candidate("kitten", &dict, &LinkOptions::default());

        assert_eq!(result.title, "Kitten");
        assert_eq!(result.description, "1: noun. A kitten.\n2: verb. To do it.");
        assert_eq!(
            result.message,
            "*Kitten*\n/kitten/\n\n1: noun. A kitten.\n2: verb. To do it."
        );
        assert_eq!(result.url, "https://youglish.com/pronounce/Kitten/english");
        assert_eq!(dict.calls.lock().unwrap().as_slice(), ["kitten"]);
    }

    #[test]
    fn test_render_phrase_skips_lookup() {
        let dict = FakeDictionary::new();
        let result = render_candidate("The cat sat", &dict, &LinkOptions::default());

        assert_eq!(result.title, "The cat sat");
        assert_eq!(result.message, "*The cat sat*");
        assert!(result.description.is_empty());
        assert!(dict.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_render_failed_lookup_degrades() {
        let dict = FakeDictionary::new();
        let result = render_candidate("broken", &dict, &LinkOptions::default());

        assert_eq!(result.title, "Broken");
        assert_eq!(result.description, LOOKUP_FAILED_MESSAGE);
    }

    #[test]
    fn test_buttons() {
        let dict = FakeDictionary::new();
        let links = LinkOptions {
            community: Some(LinkButton {
                label: "💬 Community".to_string(),
                url: "https://t.me/example".to_string(),
            }),
        };

        let result = render_candidate("owl", &dict, &links);
        assert_eq!(result.buttons.len(), 2);
        assert_eq!(result.buttons[0].label, "💬 Community");
        assert_eq!(result.buttons[1].url, result.url);

        let result = render_candidate("owl", &dict, &LinkOptions::default());
        assert_eq!(result.buttons.len(), 1);
        assert_eq!(result.buttons[0].label, YOUGLISH_LABEL);
    }

    #[test]
    fn test_render_candidates_keeps_order() {
        let dict = FakeDictionary::new();
        let candidates = CandidateList::from_iter(["cat", "kitten", "feline", "tabby", "dog"]);

        let results = render_candidates(&candidates, &dict, &LinkOptions::default());
        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();

        assert_eq!(titles, ["Cat", "Kitten", "Feline", "Tabby", "Dog"]);
        assert_eq!(dict.calls.lock().unwrap().len(), 5);

        let mut ids: Vec<_> = results.iter().map(|r| r.id.to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }
}
