//! Keyword extraction for relevance hints and auto-tagging.

/// Common English words that carry no retrieval signal.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "can", "shall", "to", "of",
    "in", "for", "on", "with", "at", "by", "from", "as", "into", "through", "during", "before",
    "after", "over", "and", "but", "or", "nor", "not", "so", "yet", "both", "either", "neither",
    "each", "every", "all", "any", "few", "more", "most", "other", "some", "such", "no", "only",
    "own", "same", "than", "too", "very", "just", "about", "above", "below", "between", "i", "me",
    "my", "we", "our", "you", "your", "he", "him", "his", "she", "her", "it", "its", "they", "them",
    "their", "this", "that", "these", "those", "what", "which", "who", "whom", "when", "where",
    "why", "how", "if", "then", "because", "while", "although", "though",
];

/// Tokens this short are never keywords.
const MIN_KEYWORD_CHARS: usize = 3;

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Extract distinct keywords from free text, in order of first appearance.
///
/// The text is lowercased and split on anything that is not alphanumeric or
/// `_`. Tokens of two characters or fewer and stopwords are dropped.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();

    for token in lowered.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
        if token.chars().count() < MIN_KEYWORD_CHARS || is_stopword(token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }

    keywords
}
