//! Keyword extraction for discussion search queries.
//!
//! Known technical terms found in the prompt score a flat [`TECHNICAL_TERM_SCORE`];
//! every other token longer than three characters that is not a stop word scores
//! its frequency. The top [`MAX_KEYWORDS`] candidates become search terms.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Upper bound on returned keywords
pub const MAX_KEYWORDS: usize = 5;

/// Fixed score for a matched technical term
pub const TECHNICAL_TERM_SCORE: usize = 3;

const TECHNICAL_TERMS: &[&str] = &[
    "react", "vue", "angular", "svelte", "next.js", "node.js", "nodejs", "deno",
    "typescript", "javascript", "python", "rust", "golang", "java", "kotlin", "swift",
    "c++", "webassembly", "wasm", "docker", "kubernetes", "terraform", "aws", "azure",
    "gcp", "serverless", "microservices", "graphql", "rest api", "grpc", "websocket",
    "database", "postgresql", "postgres", "mysql", "sqlite", "mongodb", "redis",
    "elasticsearch", "kafka", "machine learning", "deep learning", "llm", "ai",
    "neural network", "devops", "ci/cd", "git", "linux", "security", "authentication",
    "encryption", "performance", "scalability", "caching", "testing", "frontend",
    "backend", "css", "html", "api", "compiler", "blockchain", "open source",
];

const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "because", "been", "before",
    "being", "below", "between", "both", "build", "building", "built", "could", "does",
    "doing", "down", "during", "each", "even", "every", "from", "further", "have",
    "having", "here", "into", "just", "know", "like", "make", "making", "many", "more",
    "most", "much", "must", "need", "only", "other", "over", "really", "same", "should",
    "some", "such", "than", "that", "their", "theirs", "them", "then", "there", "these",
    "they", "thing", "things", "this", "those", "through", "under", "until", "using",
    "very", "want", "were", "what", "when", "where", "which", "while", "will", "with",
    "within", "without", "would", "write", "writing", "your", "yours",
];

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("valid non-word regex");
    static ref STOP_SET: HashSet<&'static str> = STOP_WORDS.iter().copied().collect();
}

/// Turns a prompt (and optional title) into a short ranked list of search terms
#[derive(Debug, Clone, Default)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract at most [`MAX_KEYWORDS`] search terms; empty input yields `[]`
    pub fn extract(&self, prompt: &str, title: Option<&str>) -> Vec<String> {
        let mut text = prompt.to_lowercase();
        if let Some(title) = title {
            text.push(' ');
            text.push_str(&title.to_lowercase());
        }

        if text.trim().is_empty() {
            return Vec::new();
        }

        // (term, score), in encounter order
        let mut candidates: Vec<(String, usize)> = Self::technical_terms(&text)
            .into_iter()
            .map(|term| (term.to_string(), TECHNICAL_TERM_SCORE))
            .collect();

        // Pieces of matched terms ("machine learning", "node.js") are not counted again
        let technical: HashSet<&str> = candidates
            .iter()
            .flat_map(|(term, _)| NON_WORD.split(term))
            .filter(|piece| !piece.is_empty())
            .collect();

        let mut frequency: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for token in NON_WORD.split(&text) {
            if token.chars().count() <= 3
                || STOP_SET.contains(token)
                || technical.contains(token)
            {
                continue;
            }
            let count = frequency.entry(token).or_insert(0);
            if *count == 0 {
                order.push(token);
            }
            *count += 1;
        }

        candidates.extend(
            order
                .into_iter()
                .map(|token| (token.to_string(), frequency[token])),
        );

        // Stable: ties keep encounter order
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates.truncate(MAX_KEYWORDS);

        candidates.into_iter().map(|(term, _)| term).collect()
    }

    /// Technical terms present as whole words, ordered by first occurrence
    fn technical_terms(text: &str) -> Vec<&'static str> {
        let mut found: Vec<(usize, &'static str)> = TECHNICAL_TERMS
            .iter()
            .filter_map(|term| find_whole_word(text, term).map(|pos| (pos, *term)))
            .collect();
        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, term)| term).collect()
    }
}

/// Byte offset of the first occurrence of `term` not embedded in a longer word
fn find_whole_word(text: &str, term: &str) -> Option<usize> {
    text.match_indices(term).map(|(pos, _)| pos).find(|&pos| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + term.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technical_term_pieces_not_repeated() {
        let extractor = KeywordExtractor::new();
        assert_eq!(
            extractor.extract("Intro to machine learning with Node.js", None),
            vec!["machine learning", "node.js", "intro"]
        );
    }

    #[test]
    fn test_empty_input() {
        let extractor = KeywordExtractor::new();
        assert!(extractor.extract("", None).is_empty());
        assert!(extractor.extract("   \n\t", None).is_empty());
        assert!(extractor.extract(" ", Some("  ")).is_empty());
    }

    #[test]
    fn test_react_prompt() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract("Building scalable React applications", None);

        assert_eq!(keywords[0], "react");
        assert!(keywords.contains(&"scalable".to_string()));
        assert!(keywords.contains(&"applications".to_string()));
        assert!(!keywords.contains(&"building".to_string()));
    }

    #[test]
    fn test_technical_terms_outrank_generic() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract(
            "Notes on tuning tuning tuning and Rust with Kubernetes",
            None,
        );

        // tuning appears 3 times, same score as the technical terms, but later
        assert_eq!(keywords, vec!["rust", "kubernetes", "tuning", "notes"]);
    }

    #[test]
    fn test_title_is_included() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract("A short note", Some("Postgres indexing strategies"));

        assert!(keywords.contains(&"postgres".to_string()));
        assert!(keywords.contains(&"indexing".to_string()));
    }

    #[test]
    fn test_at_most_five() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract(
            "rust python docker redis graphql kafka linux compiler",
            None,
        );
        assert_eq!(keywords.len(), MAX_KEYWORDS);
        assert_eq!(keywords[0], "rust");
    }

    #[test]
    fn test_whole_word_matching() {
        let extractor = KeywordExtractor::new();
        // "ai" inside "maintainers" and "git" inside "digital" must not match
        let keywords = extractor.extract("maintainers of digital gardens", None);
        assert!(!keywords.contains(&"ai".to_string()));
        assert!(!keywords.contains(&"git".to_string()));
        assert!(keywords.contains(&"maintainers".to_string()));
    }

    #[test]
    fn test_punctuated_terms() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract("Migrating a Node.js service to Next.js", None);
        assert!(keywords.contains(&"node.js".to_string()));
        assert!(keywords.contains(&"next.js".to_string()));
    }

    #[test]
    fn test_deterministic() {
        let extractor = KeywordExtractor::new();
        let prompt = "Caching strategies for GraphQL servers and GraphQL clients";
        assert_eq!(extractor.extract(prompt, None), extractor.extract(prompt, None));
    }
}
