//! Best-effort topic label for a single text

use std::collections::HashMap;

use crate::normalize::normalize;
use crate::phrasing::make_topic_label;
use crate::tagger::Tagger;

const MAX_CHUNK_WORDS: usize = 3;
const MIN_CANDIDATE_LEN: usize = 3;
const TOP_CANDIDATES: usize = 3;

/// Candidate topic terms of `text`, most frequent first.
///
/// Candidates are noun chunks of at most three words (joined with `_`) and
/// lemmatized nouns, each at least three characters long. Ties keep the
/// order of first appearance.
pub fn rank_candidates(text: &str, tagger: &dyn Tagger) -> Vec<(String, usize)> {
    let cleaned = normalize(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let tokens = tagger.tag(&cleaned);
    let mut candidates = Vec::new();

    for chunk in tagger.noun_chunks(&tokens) {
        if chunk.len() > MAX_CHUNK_WORDS {
            continue;
        }
        let phrase = chunk
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if phrase.len() >= MIN_CANDIDATE_LEN {
            candidates.push(phrase.replace(' ', "_"));
        }
    }

    candidates.extend(
        tokens
            .iter()
            .filter(|t| t.is_noun() && t.text.len() >= MIN_CANDIDATE_LEN)
            .map(|t| t.lemma.clone()),
    );

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for candidate in &candidates {
        let count = counts.entry(candidate.as_str()).or_insert(0);
        if *count == 0 {
            order.push(candidate.as_str());
        }
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|term| (term.to_string(), counts[term]))
        .collect();
    // stable sort keeps first-appearance order for ties
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Topic labels for a single text: one label built from the top three
/// candidates, or nothing when the text has no usable candidates.
pub fn extract_text_topics(text: &str, tagger: &dyn Tagger) -> Vec<String> {
    let top: Vec<String> = rank_candidates(text, tagger)
        .into_iter()
        .take(TOP_CANDIDATES)
        .map(|(term, _)| term)
        .collect();

    if top.is_empty() {
        return Vec::new();
    }

    let label = make_topic_label(&top);
    tracing::debug!(label = %label, "Extracted single-text topic");
    vec![label]
}
