//! Heuristic part-of-speech tagging and lemmatization for normalized text.
//!
//! Input is expected to be the output of [`crate::normalize`]: lowercase
//! words separated by single spaces. Tags come from closed-class word lists
//! (English stop words), small open-class lexicons, and suffix rules; every
//! remaining word is treated as a noun.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Coarse part-of-speech tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PartOfSpeech {
    Noun,
    Adjective,
    Verb,
    Adverb,
    /// Determiners, pronouns, prepositions, conjunctions, auxiliaries
    Function,
}

/// A word with its tag and lemma
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedToken {
    pub text: String,
    pub pos: PartOfSpeech,
    pub lemma: String,
}

impl TaggedToken {
    pub fn is_noun(&self) -> bool {
        self.pos == PartOfSpeech::Noun
    }
}

/// Assigns tags and lemmas to the words of a normalized text
pub trait Tagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<TaggedToken>;

    /// Maximal runs of adjectives followed by at least one noun
    fn noun_chunks(&self, tokens: &[TaggedToken]) -> Vec<Vec<TaggedToken>> {
        let mut chunks = Vec::new();
        let mut current: Vec<TaggedToken> = Vec::new();

        for token in tokens {
            match token.pos {
                PartOfSpeech::Adjective => {
                    if current.last().is_some_and(TaggedToken::is_noun) {
                        chunks.push(std::mem::take(&mut current));
                    }
                    current.push(token.clone());
                }
                PartOfSpeech::Noun => current.push(token.clone()),
                _ => {
                    if current.last().is_some_and(TaggedToken::is_noun) {
                        chunks.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                }
            }
        }

        if current.last().is_some_and(TaggedToken::is_noun) {
            chunks.push(current);
        }

        chunks
    }
}

const ADJECTIVES: &[&str] = &[
    "amazing", "awesome", "bad", "beautiful", "best", "better", "big", "bright", "cheap",
    "clear", "crisp", "decent", "dim", "easy", "excellent", "expensive", "fantastic", "fast",
    "fine", "good", "great", "happy", "hard", "heavy", "high", "horrible", "huge", "large",
    "light", "long", "loud", "low", "main", "new", "nice", "old", "perfect", "poor", "quick",
    "sharp", "short", "slim", "slow", "small", "smooth", "solid", "terrible", "thin", "tiny",
    "worse", "worst", "wrong",
];

const VERBS: &[&str] = &[
    "bought", "buy", "came", "come", "died", "dies", "feel", "feels", "felt", "get", "gets",
    "give", "gives", "go", "goes", "got", "hate", "hated", "keep", "keeps", "know", "last",
    "lasts", "like", "liked", "love", "loved", "loves", "make", "makes", "made", "need",
    "needs", "recommend", "return", "returned", "say", "see", "seems", "take", "takes",
    "think", "try", "tried", "use", "used", "uses", "want", "wanted", "work", "worked",
    "works",
];

const ADJECTIVE_SUFFIXES: &[&str] = &["ful", "ous", "ive", "able", "ible", "less", "ish"];

const NOUN_ENDINGS_KEEP: &[&str] = &["ss", "us", "is", "ics", "news"];

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("children", "child"),
    ("feet", "foot"),
    ("men", "man"),
    ("mice", "mouse"),
    ("people", "person"),
    ("teeth", "tooth"),
    ("women", "woman"),
];

/// Lexicon and suffix based [`Tagger`]
pub struct LexiconTagger {
    function_words: HashSet<String>,
    adjectives: HashSet<&'static str>,
    verbs: HashSet<&'static str>,
    irregular: HashMap<&'static str, &'static str>,
}

impl LexiconTagger {
    /// Create a tagger using the English stop-word list as function words
    pub fn new() -> Self {
        let function_words = stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .map(|w| w.to_string())
            .filter(|w| !ADJECTIVES.contains(&w.as_str()) && !VERBS.contains(&w.as_str()))
            .collect();

        Self {
            function_words,
            adjectives: ADJECTIVES.iter().copied().collect(),
            verbs: VERBS.iter().copied().collect(),
            irregular: IRREGULAR_PLURALS.iter().copied().collect(),
        }
    }

    fn pos_of(&self, word: &str) -> PartOfSpeech {
        if self.adjectives.contains(word) {
            return PartOfSpeech::Adjective;
        }
        if self.verbs.contains(word) {
            return PartOfSpeech::Verb;
        }
        if self.function_words.contains(word) || word.len() < 2 {
            return PartOfSpeech::Function;
        }
        if word.len() > 4 && word.ends_with("ly") {
            return PartOfSpeech::Adverb;
        }
        if word.len() > 5 && (word.ends_with("ing") || word.ends_with("ed")) {
            return PartOfSpeech::Verb;
        }
        if word.len() > 5 && ADJECTIVE_SUFFIXES.iter().any(|s| word.ends_with(s)) {
            return PartOfSpeech::Adjective;
        }
        PartOfSpeech::Noun
    }

    /// Singular form of a noun
    pub fn lemmatize_noun(&self, word: &str) -> String {
        if let Some(singular) = self.irregular.get(word) {
            return (*singular).to_string();
        }
        if NOUN_ENDINGS_KEEP.iter().any(|e| word.ends_with(e)) {
            return word.to_string();
        }
        if word.len() > 4 && word.ends_with("ies") {
            return format!("{}y", &word[..word.len() - 3]);
        }
        if word.len() > 4
            && ["ches", "shes", "xes", "sses"]
                .iter()
                .any(|e| word.ends_with(e))
        {
            return word[..word.len() - 2].to_string();
        }
        if word.len() > 3 && word.ends_with('s') {
            return word[..word.len() - 1].to_string();
        }
        word.to_string()
    }
}

impl Default for LexiconTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl Tagger for LexiconTagger {
    fn tag(&self, text: &str) -> Vec<TaggedToken> {
        text.split_whitespace()
            .map(|word| {
                let pos = self.pos_of(word);
                let lemma = if pos == PartOfSpeech::Noun {
                    self.lemmatize_noun(word)
                } else {
                    word.to_string()
                };
                TaggedToken {
                    text: word.to_string(),
                    pos,
                    lemma,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<(String, PartOfSpeech)> {
        LexiconTagger::new()
            .tag(text)
            .into_iter()
            .map(|t| (t.text, t.pos))
            .collect()
    }

    #[test]
    fn test_basic_tagging() {
        let tagged = tags("the battery is incredibly great");
        assert_eq!(tagged[0].1, PartOfSpeech::Function);
        assert_eq!(tagged[1].1, PartOfSpeech::Noun);
        assert_eq!(tagged[2].1, PartOfSpeech::Function);
        assert_eq!(tagged[3].1, PartOfSpeech::Adverb);
        assert_eq!(tagged[4].1, PartOfSpeech::Adjective);
    }

    #[test]
    fn test_lemmatize_noun() {
        let tagger = LexiconTagger::new();
        assert_eq!(tagger.lemmatize_noun("batteries"), "battery");
        assert_eq!(tagger.lemmatize_noun("cameras"), "camera");
        assert_eq!(tagger.lemmatize_noun("glass"), "glass");
        assert_eq!(tagger.lemmatize_noun("boxes"), "box");
        assert_eq!(tagger.lemmatize_noun("children"), "child");
        assert_eq!(tagger.lemmatize_noun("bus"), "bus");
    }

    #[test]
    fn test_noun_chunks() {
        let tagger = LexiconTagger::new();
        let tokens = tagger.tag("great battery and slow charger");
        let chunks: Vec<String> = tagger
            .noun_chunks(&tokens)
            .iter()
            .map(|c| {
                c.iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        assert_eq!(chunks, vec!["great battery", "slow charger"]);
    }

    #[test]
    fn test_dangling_adjective_is_not_a_chunk() {
        let tagger = LexiconTagger::new();
        let tokens = tagger.tag("screen is great");
        let chunks = tagger.noun_chunks(&tokens);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0][0].text, "screen");
    }
}
