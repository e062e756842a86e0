//! The scoring sieve contract.
//!
//! A sieve is one pluggable scoring pass over a word's candidate senses. It
//! mutates candidate score lists and nothing else; acceptance is always the
//! resolver's call. Three invocation modes exist:
//!
//! - **independent** — scores a word's candidates from that word's own
//!   keyword evidence alone.
//! - **dependent** — scores a word's candidates against a snapshot of *other*
//!   words' candidates/keywords, once per word.
//! - **dependent-repeat** — same signature, but the resolver re-runs the whole
//!   pass (with a fresh snapshot of currently accepted answers) until a round
//!   produces no new acceptance.

use std::collections::BTreeSet;

use crate::node::{NodeArena, NodeId};
use crate::sense::{Keyword, SenseRef};

/// Scores candidates from the word's own keyword evidence.
pub trait IndependentSieve {
    fn score(
        &self,
        arena: &mut NodeArena,
        word: &str,
        keywords: &BTreeSet<Keyword>,
        candidates: &[NodeId],
        replace: bool,
    );
}

/// Scores candidates against other words' senses and keywords.
pub trait DependentSieve {
    fn score(
        &self,
        arena: &mut NodeArena,
        candidates: &[NodeId],
        context: &DependentContext,
        replace: bool,
    );
}

/// Immutable snapshot handed to a dependent sieve invocation.
///
/// The resolver rebuilds it once per round and never mutates it mid-round, so
/// a fixpoint pass sees one consistent view of the other words.
#[derive(Debug, Clone)]
pub struct DependentContext {
    /// Senses from other words: all their candidates (one-off mode) or their
    /// currently accepted answers (repeat mode), deduplicated and sorted by
    /// canonical name.
    pub other_senses: Vec<SenseRef>,
    /// This word's keyword evidence.
    pub keywords: BTreeSet<Keyword>,
    /// Keyword evidence of all other words.
    pub other_keywords: BTreeSet<Keyword>,
}

/// A configured sieve: the scoring pass plus its invocation mode.
pub enum Sieve {
    Independent(Box<dyn IndependentSieve>),
    Dependent(Box<dyn DependentSieve>),
    DependentRepeat(Box<dyn DependentSieve>),
}

impl Sieve {
    pub fn independent(sieve: impl IndependentSieve + 'static) -> Self {
        Sieve::Independent(Box::new(sieve))
    }

    pub fn dependent(sieve: impl DependentSieve + 'static) -> Self {
        Sieve::Dependent(Box::new(sieve))
    }

    pub fn dependent_repeat(sieve: impl DependentSieve + 'static) -> Self {
        Sieve::DependentRepeat(Box::new(sieve))
    }
}

impl std::fmt::Debug for Sieve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sieve::Independent(_) => write!(f, "Sieve::Independent"),
            Sieve::Dependent(_) => write!(f, "Sieve::Dependent"),
            Sieve::DependentRepeat(_) => write!(f, "Sieve::DependentRepeat"),
        }
    }
}

/// Record one sieve score on a candidate.
///
/// Without `replace` the score is appended to the candidate's list. With
/// `replace` it overwrites the list, but only if it beats the current primary
/// score, so a replace-mode pipeline keeps each candidate's best score at
/// index 0.
pub fn apply_score(arena: &mut NodeArena, candidate: NodeId, score: f64, replace: bool) {
    if !replace {
        arena.set_score(candidate, score, false);
    } else if arena.primary_score(candidate) < score {
        arena.set_score(candidate, score, true);
    }
}
