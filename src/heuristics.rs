//! Ready-made scoring sieves for sparse keyword evidence.
//!
//! These are the numeric heuristics the resolver is parameterized over: set
//! overlap against lemmas, definitions, node properties, and ontology-path
//! similarity against other words' senses. Each one follows the sieve
//! contract — score candidates, never touch resolution state.

use std::collections::{BTreeSet, VecDeque};

use crate::node::{NodeArena, NodeId};
use crate::sense::{Keyword, SenseHandle, SenseRef};
use crate::sieve::{apply_score, DependentContext, DependentSieve, IndependentSieve};

/// Tokens ignored when tokenizing definition glosses.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "before", "being", "below", "between", "both", "but", "by", "can", "did",
    "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had",
    "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "just", "more", "most", "my", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "you", "your",
];

// ---------------------------------------------------------------------------
// Set-overlap primitives
// ---------------------------------------------------------------------------

/// Jaccard index of two token sets: `|a ∩ b| / |a ∪ b|`.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Jaccard overlap of `words` against `keywords`; no keywords means no score.
pub fn direct_overlap(words: &BTreeSet<String>, keywords: &BTreeSet<String>) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    jaccard(words, keywords)
}

/// Cosine-style overlap: `|a ∩ b| / (|a| · |b|)`; either set empty means 0.
pub fn cosine_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    a.intersection(b).count() as f64 / (a.len() * b.len()) as f64
}

/// Flatten keyword evidence into comparable string tokens.
pub fn keyword_tokens(keywords: &BTreeSet<Keyword>) -> BTreeSet<String> {
    keywords.iter().map(Keyword::token).collect()
}

fn lemma_overlap(sense: &dyn SenseHandle, keywords: &BTreeSet<String>) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let lemmas: BTreeSet<String> = sense.lemmas().into_iter().collect();
    direct_overlap(&lemmas, keywords)
}

/// Best lemma overlap anywhere in the hyponym neighborhood below `sense`.
fn hyponym_overlap(sense: &dyn SenseHandle, keywords: &BTreeSet<String>) -> f64 {
    let mut best = lemma_overlap(sense, keywords);
    let mut seen: BTreeSet<String> = BTreeSet::new();
    seen.insert(sense.canonical_name());
    let mut queue: VecDeque<SenseRef> = sense.hyponyms().into();
    while let Some(hyp) = queue.pop_front() {
        if seen.insert(hyp.canonical_name()) {
            best = best.max(lemma_overlap(hyp.as_ref(), keywords));
            queue.extend(hyp.hyponyms());
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Independent sieves
// ---------------------------------------------------------------------------

/// Scores candidates on lemma overlap, then on the best overlap in their
/// hyponym neighborhood. Two scores per candidate in append mode, best-of in
/// replace mode.
#[derive(Debug, Default)]
pub struct LemmaSieve;

impl IndependentSieve for LemmaSieve {
    fn score(
        &self,
        arena: &mut NodeArena,
        _word: &str,
        keywords: &BTreeSet<Keyword>,
        candidates: &[NodeId],
        replace: bool,
    ) {
        let tokens = keyword_tokens(keywords);
        for &candidate in candidates {
            let Some(sense) = arena.node(candidate).payload.sense().cloned() else {
                continue;
            };
            apply_score(arena, candidate, lemma_overlap(sense.as_ref(), &tokens), replace);
            apply_score(
                arena,
                candidate,
                hyponym_overlap(sense.as_ref(), &tokens),
                replace,
            );
        }
    }
}

/// Scores candidates on keyword overlap with their definition gloss
/// (stopwords dropped, tokens lowercased).
#[derive(Debug, Default)]
pub struct DefinitionSieve;

impl IndependentSieve for DefinitionSieve {
    fn score(
        &self,
        arena: &mut NodeArena,
        _word: &str,
        keywords: &BTreeSet<Keyword>,
        candidates: &[NodeId],
        replace: bool,
    ) {
        let tokens = keyword_tokens(keywords);
        for &candidate in candidates {
            let Some(sense) = arena.node(candidate).payload.sense().cloned() else {
                continue;
            };
            let gloss: BTreeSet<String> = sense
                .definition()
                .split_whitespace()
                .filter(|t| !STOPWORDS.contains(t))
                .map(|t| t.to_lowercase())
                .collect();
            apply_score(arena, candidate, direct_overlap(&gloss, &tokens), replace);
        }
    }
}

/// Scores candidates on keyword overlap with the properties already attached
/// to the candidate node.
#[derive(Debug, Default)]
pub struct PropertySieve;

impl IndependentSieve for PropertySieve {
    fn score(
        &self,
        arena: &mut NodeArena,
        _word: &str,
        keywords: &BTreeSet<Keyword>,
        candidates: &[NodeId],
        replace: bool,
    ) {
        let tokens = keyword_tokens(keywords);
        for &candidate in candidates {
            let properties = arena.properties(candidate).clone();
            apply_score(arena, candidate, direct_overlap(&properties, &tokens), replace);
        }
    }
}

// ---------------------------------------------------------------------------
// Dependent sieves
// ---------------------------------------------------------------------------

fn best_similarity(sense: &dyn SenseHandle, others: &[SenseRef]) -> f64 {
    others
        .iter()
        .map(|o| sense.similarity(o.as_ref()))
        .fold(0.0, f64::max)
}

/// Scores each candidate by its best ontology-path similarity to any of the
/// other words' senses. No other senses, no scores.
#[derive(Debug, Default)]
pub struct PathSieve;

impl DependentSieve for PathSieve {
    fn score(
        &self,
        arena: &mut NodeArena,
        candidates: &[NodeId],
        context: &DependentContext,
        replace: bool,
    ) {
        if context.other_senses.is_empty() {
            return;
        }
        for &candidate in candidates {
            let Some(sense) = arena.node(candidate).payload.sense().cloned() else {
                continue;
            };
            let score = best_similarity(sense.as_ref(), &context.other_senses);
            apply_score(arena, candidate, score, replace);
        }
    }
}

/// Like [`PathSieve`], but normalizes the per-candidate similarities by their
/// sum, so the scores form a distribution over the candidate list.
#[derive(Debug, Default)]
pub struct ClusterMaxSieve;

impl DependentSieve for ClusterMaxSieve {
    fn score(
        &self,
        arena: &mut NodeArena,
        candidates: &[NodeId],
        context: &DependentContext,
        replace: bool,
    ) {
        if context.other_senses.is_empty() {
            return;
        }
        let mut raw = Vec::with_capacity(candidates.len());
        for &candidate in candidates {
            let score = match arena.node(candidate).payload.sense() {
                Some(sense) => best_similarity(sense.as_ref(), &context.other_senses),
                None => 0.0,
            };
            raw.push(score);
        }
        let total: f64 = raw.iter().sum();
        if total.abs() <= 0.001 {
            return;
        }
        for (&candidate, score) in candidates.iter().zip(raw) {
            apply_score(arena, candidate, score / total, replace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{SenseSpec, StaticOntology};
    use crate::sense::{CandidateGenerator, SenseRef};

    fn fixture() -> StaticOntology {
        StaticOntology::from_specs(vec![
            SenseSpec {
                name: "entity.n.01".into(),
                lemmas: vec!["entity".into()],
                definition: "that which exists".into(),
                parent: None,
            },
            SenseSpec {
                name: "animal.n.01".into(),
                lemmas: vec!["animal".into(), "creature".into()],
                definition: "a living organism that moves".into(),
                parent: Some("entity.n.01".into()),
            },
            SenseSpec {
                name: "dog.n.01".into(),
                lemmas: vec!["dog".into(), "hound".into()],
                definition: "a domesticated animal that barks".into(),
                parent: Some("animal.n.01".into()),
            },
            SenseSpec {
                name: "cat.n.01".into(),
                lemmas: vec!["cat".into()],
                definition: "a small domesticated animal that purrs".into(),
                parent: Some("animal.n.01".into()),
            },
            SenseSpec {
                name: "dog.n.02".into(),
                lemmas: vec!["dog".into(), "pawl".into()],
                definition: "a hinged catch in a machine".into(),
                parent: Some("entity.n.01".into()),
            },
        ])
        .unwrap()
    }

    fn keywords(tokens: &[&str]) -> BTreeSet<Keyword> {
        tokens
            .iter()
            .map(|t| Keyword::Text(t.to_string()))
            .collect()
    }

    #[test]
    fn jaccard_basics() {
        let a: BTreeSet<String> = ["x", "y"].map(String::from).into();
        let b: BTreeSet<String> = ["y", "z"].map(String::from).into();
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(jaccard(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn direct_overlap_needs_keywords() {
        let words: BTreeSet<String> = ["x"].map(String::from).into();
        assert_eq!(direct_overlap(&words, &BTreeSet::new()), 0.0);
    }

    #[test]
    fn cosine_overlap_basics() {
        let a: BTreeSet<String> = ["x", "y"].map(String::from).into();
        let b: BTreeSet<String> = ["y"].map(String::from).into();
        assert!((cosine_overlap(&a, &b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn lemma_sieve_prefers_matching_lemma() {
        let ontology = fixture();
        let mut arena = NodeArena::new();
        let candidates: Vec<NodeId> = ontology
            .generate("dog")
            .into_iter()
            .map(|s| arena.alloc_sense(s))
            .collect();
        assert_eq!(candidates.len(), 2);

        LemmaSieve.score(&mut arena, "dog", &keywords(&["hound"]), &candidates, true);

        // dog.n.01 carries the "hound" lemma, dog.n.02 does not.
        let s1 = arena.primary_score(candidates[0]);
        let s2 = arena.primary_score(candidates[1]);
        assert!(s1 > s2, "expected {s1} > {s2}");
    }

    #[test]
    fn definition_sieve_matches_gloss_tokens() {
        let ontology = fixture();
        let mut arena = NodeArena::new();
        let candidates: Vec<NodeId> = ontology
            .generate("dog")
            .into_iter()
            .map(|s| arena.alloc_sense(s))
            .collect();

        DefinitionSieve.score(
            &mut arena,
            "dog",
            &keywords(&["barks", "domesticated"]),
            &candidates,
            true,
        );
        assert!(arena.primary_score(candidates[0]) > arena.primary_score(candidates[1]));
    }

    #[test]
    fn property_sieve_scores_attached_properties() {
        let mut arena = NodeArena::new();
        let a = arena.alloc_label("a");
        let b = arena.alloc_label("b");
        arena.add_property(a, "graspable");

        PropertySieve.score(&mut arena, "w", &keywords(&["graspable"]), &[a, b], true);
        assert!(arena.primary_score(a) > 0.0);
        assert_eq!(arena.primary_score(b), 0.0);
    }

    #[test]
    fn path_sieve_rewards_nearby_senses() {
        let ontology = fixture();
        let mut arena = NodeArena::new();
        let candidates: Vec<NodeId> = ontology
            .generate("dog")
            .into_iter()
            .map(|s| arena.alloc_sense(s))
            .collect();
        let cat: Vec<SenseRef> = ontology.generate("cat");

        let context = DependentContext {
            other_senses: cat,
            keywords: BTreeSet::new(),
            other_keywords: BTreeSet::new(),
        };
        PathSieve.score(&mut arena, &candidates, &context, true);

        // dog.n.01 shares the animal.n.01 ancestor with cat.n.01.
        assert!(arena.primary_score(candidates[0]) > arena.primary_score(candidates[1]));
    }

    #[test]
    fn cluster_max_scores_sum_to_one() {
        let ontology = fixture();
        let mut arena = NodeArena::new();
        let candidates: Vec<NodeId> = ontology
            .generate("dog")
            .into_iter()
            .map(|s| arena.alloc_sense(s))
            .collect();

        let context = DependentContext {
            other_senses: ontology.generate("cat"),
            keywords: BTreeSet::new(),
            other_keywords: BTreeSet::new(),
        };
        ClusterMaxSieve.score(&mut arena, &candidates, &context, false);

        let total: f64 = candidates
            .iter()
            .map(|&c| arena.primary_score(c))
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn dependent_sieves_need_context() {
        let mut arena = NodeArena::new();
        let id = arena.alloc_label("x");
        let context = DependentContext {
            other_senses: vec![],
            keywords: BTreeSet::new(),
            other_keywords: BTreeSet::new(),
        };
        PathSieve.score(&mut arena, &[id], &context, false);
        assert!(arena.scores(id).is_empty());
    }
}
