//! Query expansion for synonym-style questions.
//!
//! Dense retrieval struggles when the question asks for "another name for X" and the document
//! states "X is also called Y": the question and the passage share few tokens. Expansion
//! rewrites such questions into several phrasings centered on the core term before searching.
//! Questions outside this class fall back to the original query plus the bare core term, which
//! degrades to ordinary single-query retrieval.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static CORE_TERM_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

// Phrasings that mark synonym-seeking questions; the first match wins.
const CORE_TERM_PREFIXES: [&str; 6] = [
    "another name for",
    "other name for",
    "alternate name for",
    "alternative name for",
    "synonym for",
    "also called",
];

fn core_term_patterns() -> &'static [Regex] {
    CORE_TERM_PATTERNS.get_or_init(|| {
        CORE_TERM_PREFIXES
            .iter()
            .map(|prefix| {
                Regex::new(&format!(r"{prefix}\s+(.+)"))
                    .expect("core-term pattern must be a valid regex")
            })
            .collect()
    })
}

/// Extract the main term from a synonym-style question.
///
/// The query is lowercased before matching; the first matching pattern's capture, stripped of
/// surrounding whitespace and trailing `?.,`, becomes the core term. When no pattern matches
/// the core term is the whole query stripped of surrounding whitespace and `?.` characters.
pub(crate) fn extract_core_term(query: &str) -> String {
    let lowered = query.to_lowercase();

    for pattern in core_term_patterns() {
        if let Some(captures) = pattern.captures(&lowered)
            && let Some(term) = captures.get(1)
        {
            return term
                .as_str()
                .trim()
                .trim_matches(|c| matches!(c, ' ' | '?' | '.' | ','))
                .to_string();
        }
    }

    query
        .trim()
        .trim_matches(|c| matches!(c, ' ' | '?' | '.'))
        .to_string()
}

/// Expand a user query into multiple unique phrasings to improve recall.
///
/// The original query always comes first, followed by the bare core term and templated
/// rewordings of it. Duplicates are removed preserving first occurrence; empty strings are
/// dropped.
pub(crate) fn expand_query(query: &str) -> Vec<String> {
    let core_term = extract_core_term(query);

    let candidates = [
        query.to_string(),
        core_term.clone(),
        format!("{core_term} also called"),
        format!("{core_term} also known as"),
        format!("{core_term} referred to as"),
        format!("{core_term} also named"),
        format!("{core_term} is called"),
        format!("alternate name for {core_term}"),
        format!("synonym of {core_term}"),
        format!("{core_term} aka"),
        format!("{core_term} is also called"),
    ];

    let mut seen = HashSet::new();
    let mut expansions = Vec::new();
    for candidate in candidates {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            expansions.push(trimmed.to_string());
        }
    }

    expansions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_core_term_from_synonym_question() {
        assert_eq!(
            extract_core_term("What is another name for mitochondria?"),
            "mitochondria"
        );
        assert_eq!(extract_core_term("Other name for ATP?"), "atp");
        assert_eq!(
            extract_core_term("What is the alternate name for glycolysis?"),
            "glycolysis"
        );
    }

    #[test]
    fn first_matching_pattern_wins() {
        // "another name for" appears before "also called" in the pattern order.
        assert_eq!(
            extract_core_term("another name for what is also called ATP"),
            "what is also called atp"
        );
    }

    #[test]
    fn falls_back_to_stripped_query() {
        assert_eq!(
            extract_core_term("  How does photosynthesis work?  "),
            "How does photosynthesis work"
        );
    }

    #[test]
    fn expansion_starts_with_original_query() {
        let query = "What is another name for mitochondria?";
        let expansions = expand_query(query);
        assert_eq!(expansions[0], query);
        assert!(expansions.contains(&"mitochondria".to_string()));
        assert!(expansions.contains(&"mitochondria also called".to_string()));
        assert!(expansions.contains(&"alternate name for mitochondria".to_string()));
    }

    #[test]
    fn expansion_contains_no_duplicates() {
        let expansions = expand_query("mitochondria");
        let unique: HashSet<&String> = expansions.iter().collect();
        assert_eq!(unique.len(), expansions.len());
    }

    #[test]
    fn plain_query_falls_back_to_bare_term() {
        let expansions = expand_query("glycolysis");
        // Query and core term are equal, so the bare term dedupes into the first slot.
        assert_eq!(expansions[0], "glycolysis");
        assert!(expansions.iter().all(|e| !e.is_empty()));
    }
}
