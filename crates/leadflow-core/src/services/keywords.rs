//! Search-term extraction for natural-language lead queries

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Filler words stripped from queries such as "companies that need automation"
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "of", "in", "on", "at", "for", "to", "with", "by",
        "from", "that", "which", "who", "whose", "are", "is", "be", "being", "have", "has",
        "need", "needs", "needing", "want", "wants", "looking", "look", "seeking", "find",
        "me", "show", "list", "get", "some", "any", "all", "companies", "company",
        "businesses", "business", "firms", "firm", "organizations", "organization",
        "startups", "startup",
    ]
    .into_iter()
    .collect()
});

/// Lower-case the query and drop stop words (whole words, punctuation-insensitive)
///
/// Kept tokens are emitted as written, so `c++` or `node.js` survive intact.
/// Never yields an empty term: if nothing survives, the original query is
/// returned untouched.
pub fn extract_keywords(query: &str) -> String {
    let lowered = query.to_lowercase();

    let keywords: Vec<&str> = lowered
        .split_whitespace()
        .filter(|token| !is_stop_word(token))
        .collect();

    if keywords.is_empty() {
        return query.to_string();
    }

    keywords.join(" ")
}

/// Tokens made only of punctuation count as filler too
fn is_stop_word(token: &str) -> bool {
    let word = token.trim_matches(|c: char| !c.is_alphanumeric());
    word.is_empty() || STOP_WORDS.contains(word)
}
