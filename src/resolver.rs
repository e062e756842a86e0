//! Sense resolution orchestration.
//!
//! [`SenseResolver`] owns one resolution run: it generates candidate senses
//! for every ambiguous word, drives the configured sieve pipeline, applies
//! the acceptance policy, and leaves behind a word to [`Resolution`] mapping
//! plus the [`NodeArena`] the forest builder continues from.
//!
//! Resolution outcomes are data states, never errors: a word that cannot be
//! settled ends as [`Resolution::NoCandidate`] or stays
//! [`Resolution::Unresolved`], and the caller always receives a complete
//! answer set.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ResolveError;
use crate::input::{to_space_format, AmbiguousWord, EvalReport};
use crate::node::{NodeArena, NodeId};
use crate::sense::{CandidateGenerator, Keyword, SenseChooser, SenseLookup, SenseRef};
use crate::sieve::{DependentContext, Sieve};

/// Fitted-model outputs above this are numeric instability, not scores.
pub const INSTABILITY_LIMIT: f64 = 10_000.0;
/// Substituted for an unstable fitted-model output.
pub const INSTABILITY_SENTINEL: f64 = -1.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which resolution strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// No scoring: accept the sole candidate (or, in multi-parent mode, the
    /// full candidate list).
    Default,
    /// Run every sieve in its declared mode, pruning after each pass.
    MultiSieve,
    /// Run every sieve exactly once, then pick the best-scoring candidate.
    ClusterProb,
}

/// A fitted scoring model evaluated over a candidate's full score vector.
pub trait ScoreModel {
    fn predict(&self, scores: &[f64]) -> f64;
}

/// Acceptance threshold: a plain numeric cutoff, or a fitted model that ranks
/// candidates by their whole score vector.
pub enum Alpha {
    Threshold(f64),
    Fitted(Box<dyn ScoreModel>),
}

impl std::fmt::Debug for Alpha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alpha::Threshold(t) => write!(f, "Alpha::Threshold({t})"),
            Alpha::Fitted(_) => write!(f, "Alpha::Fitted"),
        }
    }
}

/// Resolver configuration. All fields change observable behavior.
#[derive(Debug)]
pub struct ResolverConfig {
    pub method: Method,
    pub alpha: Alpha,
    /// Permit a word to accept several equally-scored senses, and nodes to
    /// carry several parents in the forest.
    pub multi_parent: bool,
    /// Fall back to a [`SenseChooser`] for words the sieves leave unresolved.
    pub hand_cluster: bool,
    /// Skip acceptance entirely and return the full scored candidate sets.
    pub no_prune: bool,
}

impl ResolverConfig {
    pub fn new(method: Method, alpha: Alpha) -> Self {
        Self {
            method,
            alpha,
            multi_parent: false,
            hand_cluster: false,
            no_prune: false,
        }
    }

    pub fn multi_parent(mut self, on: bool) -> Self {
        self.multi_parent = on;
        self
    }

    pub fn hand_cluster(mut self, on: bool) -> Self {
        self.hand_cluster = on;
        self
    }

    pub fn no_prune(mut self, on: bool) -> Self {
        self.no_prune = on;
        self
    }
}

// ---------------------------------------------------------------------------
// Resolution state
// ---------------------------------------------------------------------------

/// Where one word's resolution stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not yet settled.
    Unresolved,
    /// Settled negatively: no candidate was generated or accepted.
    NoCandidate,
    /// One accepted sense node.
    Single(NodeId),
    /// Several accepted sense nodes (multi-parent mode).
    Multiple(Vec<NodeId>),
}

impl Resolution {
    /// Accepted candidate nodes, empty for unresolved/no-candidate.
    pub fn accepted(&self) -> Vec<NodeId> {
        match self {
            Resolution::Unresolved | Resolution::NoCandidate => vec![],
            Resolution::Single(id) => vec![*id],
            Resolution::Multiple(ids) => ids.clone(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Resolution::Single(_) | Resolution::Multiple(_))
    }
}

/// One word's saved answer, by canonical sense name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SavedAnswer {
    Unresolved,
    NoCandidate,
    Single { sense: String },
    Multiple { senses: Vec<String> },
}

/// Serializable resolution state for round-tripping a run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SavedResolution {
    pub entries: Vec<SavedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedEntry {
    pub word: String,
    pub answer: SavedAnswer,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Orchestrates one resolution run over a word set.
#[derive(Debug)]
pub struct SenseResolver {
    config: ResolverConfig,
    arena: NodeArena,
    words: Vec<AmbiguousWord>,
    /// Candidate nodes per word, parallel to `words`.
    candidates: Vec<Vec<NodeId>>,
    /// Answers per word, parallel to `words`.
    answers: Vec<Resolution>,
}

impl SenseResolver {
    pub fn new(words: Vec<AmbiguousWord>, config: ResolverConfig) -> Self {
        let n = words.len();
        Self {
            config,
            arena: NodeArena::new(),
            words,
            candidates: vec![Vec::new(); n],
            answers: vec![Resolution::Unresolved; n],
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn words(&self) -> &[AmbiguousWord] {
        &self.words
    }

    pub fn answers(&self) -> &[Resolution] {
        &self.answers
    }

    /// The answer for a word, by label.
    pub fn answer(&self, word: &str) -> Option<&Resolution> {
        self.words
            .iter()
            .position(|w| w.word == word)
            .map(|i| &self.answers[i])
    }

    /// Candidate nodes generated for a word.
    pub fn candidates(&self, word: &str) -> &[NodeId] {
        self.words
            .iter()
            .position(|w| w.word == word)
            .map(|i| self.candidates[i].as_slice())
            .unwrap_or(&[])
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    /// Run the configured pipeline.
    pub fn resolve(
        &mut self,
        generator: &dyn CandidateGenerator,
        sieves: &[Sieve],
        chooser: Option<&dyn SenseChooser>,
    ) -> Result<(), ResolveError> {
        if matches!(self.config.method, Method::MultiSieve)
            && matches!(self.config.alpha, Alpha::Fitted(_))
        {
            return Err(ResolveError::InvalidConfig {
                message: "multi-sieve pruning compares scores against a numeric \
                          threshold; a fitted model only works with cluster-prob."
                    .into(),
            });
        }
        if self.config.hand_cluster && chooser.is_none() {
            return Err(ResolveError::ChooserMissing);
        }

        info!(
            words = self.words.len(),
            method = ?self.config.method,
            alpha = ?self.config.alpha,
            "resolving word senses"
        );

        for i in 0..self.words.len() {
            let senses = generator.generate(&self.words[i].word);
            debug!(word = %self.words[i].word, candidates = senses.len(), "generated candidates");
            self.candidates[i] = senses
                .into_iter()
                .map(|s| self.arena.alloc_sense(s))
                .collect();
            self.answers[i] = Resolution::Unresolved;
        }

        match self.config.method {
            Method::Default => self.resolve_default(),
            Method::MultiSieve => self.resolve_multi_sieve(sieves),
            Method::ClusterProb => self.resolve_cluster_prob(sieves),
        }

        if self.config.hand_cluster && !self.config.no_prune {
            // Checked above; hand clustering never runs without a chooser.
            if let Some(chooser) = chooser {
                self.resolve_by_hand(chooser);
            }
        }
        Ok(())
    }

    // -- method: default ----------------------------------------------------

    fn resolve_default(&mut self) {
        for i in 0..self.words.len() {
            if self.config.multi_parent {
                self.answers[i] = if self.candidates[i].is_empty() {
                    Resolution::NoCandidate
                } else {
                    Resolution::Multiple(self.candidates[i].clone())
                };
            } else if self.candidates[i].len() == 1 {
                self.answers[i] = Resolution::Single(self.candidates[i][0]);
            }
        }
    }

    // -- method: multi-sieve ------------------------------------------------

    fn resolve_multi_sieve(&mut self, sieves: &[Sieve]) {
        for sieve in sieves {
            match sieve {
                Sieve::Independent(s) => {
                    for i in self.unresolved_indices() {
                        let keywords = self.words[i].keywords.clone();
                        let word = self.words[i].word.clone();
                        let candidates = self.candidates[i].clone();
                        s.score(&mut self.arena, &word, &keywords, &candidates, true);
                    }
                    self.prune();
                }
                Sieve::Dependent(s) => {
                    for i in self.unresolved_indices() {
                        let ctx = self.dependent_context(i, false);
                        let candidates = self.candidates[i].clone();
                        s.score(&mut self.arena, &candidates, &ctx, true);
                    }
                    self.prune();
                }
                Sieve::DependentRepeat(s) => loop {
                    let pending = self.unresolved_indices();
                    if pending.is_empty() {
                        break;
                    }
                    for i in pending {
                        let ctx = self.dependent_context(i, true);
                        let candidates = self.candidates[i].clone();
                        s.score(&mut self.arena, &candidates, &ctx, true);
                    }
                    if !self.prune() {
                        break;
                    }
                },
            }
        }

        if self.config.no_prune {
            self.return_raw_candidates();
        }
    }

    /// Indices of words still eligible for scoring: no accepted answer and
    /// not yet settled negatively.
    fn unresolved_indices(&self) -> Vec<usize> {
        (0..self.words.len())
            .filter(|&i| self.answers[i] == Resolution::Unresolved)
            .collect()
    }

    /// Snapshot of the other words' senses and keywords for one dependent
    /// sieve invocation. With `accepted_only`, other senses are the currently
    /// accepted answers (repeat mode); otherwise all of their candidates.
    fn dependent_context(&self, word_idx: usize, accepted_only: bool) -> DependentContext {
        let mut by_name: BTreeMap<String, SenseRef> = BTreeMap::new();
        let mut other_keywords: BTreeSet<Keyword> = BTreeSet::new();
        for j in 0..self.words.len() {
            if j == word_idx {
                continue;
            }
            other_keywords.extend(self.words[j].keywords.iter().cloned());
            let nodes = if accepted_only {
                self.answers[j].accepted()
            } else {
                self.candidates[j].clone()
            };
            for node in nodes {
                if let Some(sense) = self.arena.node(node).payload.sense() {
                    by_name.insert(sense.canonical_name(), sense.clone());
                }
            }
        }
        DependentContext {
            other_senses: by_name.into_values().collect(),
            keywords: self.words[word_idx].keywords.clone(),
            other_keywords,
        }
    }

    /// Threshold acceptance pass over every still-unresolved word.
    ///
    /// A word accepted by an earlier pass is never revisited; replacement and
    /// tie-promotion happen among candidates of the same word within one
    /// pass. Returns whether any answer changed, which drives the
    /// dependent-repeat fixpoint loop.
    fn prune(&mut self) -> bool {
        let alpha = match self.config.alpha {
            Alpha::Threshold(a) => a,
            // Rejected in resolve(); unreachable in practice.
            Alpha::Fitted(_) => return false,
        };

        let mut changed = false;
        for i in self.unresolved_indices() {
            if self.candidates[i].is_empty() {
                self.answers[i] = Resolution::NoCandidate;
                continue;
            }

            for pos in 0..self.candidates[i].len() {
                let candidate = self.candidates[i][pos];
                let score = self.arena.primary_score(candidate);
                if score <= alpha {
                    continue;
                }
                changed |= self.accept(i, candidate, score);
            }
        }
        changed
    }

    /// Fold one above-threshold candidate into the word's answer.
    fn accept(&mut self, word_idx: usize, candidate: NodeId, score: f64) -> bool {
        match self.answers[word_idx].clone() {
            Resolution::Unresolved | Resolution::NoCandidate => {
                debug!(word = %self.words[word_idx].word, node = %candidate, score, "accepted");
                self.answers[word_idx] = Resolution::Single(candidate);
                true
            }
            Resolution::Single(current) => {
                let current_score = self.arena.primary_score(current);
                if !self.config.multi_parent {
                    // Ties keep the first-seen candidate.
                    if score > current_score {
                        self.answers[word_idx] = Resolution::Single(candidate);
                        return true;
                    }
                    false
                } else if score == current_score {
                    self.answers[word_idx] = Resolution::Multiple(vec![current, candidate]);
                    true
                } else if score > current_score {
                    self.answers[word_idx] = Resolution::Single(candidate);
                    true
                } else {
                    false
                }
            }
            Resolution::Multiple(mut list) => {
                // The first element is the list's representative score.
                let rep_score = self.arena.primary_score(list[0]);
                if score == rep_score {
                    list.push(candidate);
                    self.answers[word_idx] = Resolution::Multiple(list);
                    true
                } else if score > rep_score {
                    self.answers[word_idx] = Resolution::Single(candidate);
                    true
                } else {
                    false
                }
            }
        }
    }

    // -- method: cluster-prob -----------------------------------------------

    fn resolve_cluster_prob(&mut self, sieves: &[Sieve]) {
        for sieve in sieves {
            match sieve {
                Sieve::Independent(s) => {
                    for i in self.unresolved_indices() {
                        let keywords = self.words[i].keywords.clone();
                        let word = self.words[i].word.clone();
                        let candidates = self.candidates[i].clone();
                        s.score(&mut self.arena, &word, &keywords, &candidates, false);
                    }
                }
                // No fixpoint here: a repeat sieve runs exactly once.
                Sieve::Dependent(s) | Sieve::DependentRepeat(s) => {
                    for i in self.unresolved_indices() {
                        let ctx = self.dependent_context(i, false);
                        let candidates = self.candidates[i].clone();
                        s.score(&mut self.arena, &candidates, &ctx, false);
                    }
                }
            }
        }

        if self.config.no_prune {
            self.return_raw_candidates();
            return;
        }
        for i in self.unresolved_indices() {
            self.pick_best(i);
        }
    }

    /// Accept the best-scoring candidate for one word.
    ///
    /// With a numeric alpha the maximum primary score must clear the
    /// threshold. With a fitted model the best evaluated score is always
    /// accepted and written back as the candidate's only score; unstable
    /// model outputs are replaced by a low sentinel first.
    fn pick_best(&mut self, word_idx: usize) {
        if self.candidates[word_idx].is_empty() {
            self.answers[word_idx] = Resolution::NoCandidate;
            return;
        }

        match &self.config.alpha {
            Alpha::Fitted(model) => {
                let mut best: Option<(NodeId, f64)> = None;
                for &candidate in &self.candidates[word_idx] {
                    let mut value = model.predict(self.arena.scores(candidate));
                    if value > INSTABILITY_LIMIT {
                        debug!(node = %candidate, value, "unstable model output");
                        value = INSTABILITY_SENTINEL;
                    }
                    if best.map(|(_, b)| value > b).unwrap_or(true) {
                        best = Some((candidate, value));
                    }
                }
                // Candidate list is non-empty, so best is always set.
                if let Some((candidate, value)) = best {
                    self.arena.set_scores(candidate, vec![value]);
                    self.answers[word_idx] = Resolution::Single(candidate);
                }
            }
            Alpha::Threshold(alpha) => {
                let mut best: Option<(NodeId, f64)> = None;
                for &candidate in &self.candidates[word_idx] {
                    let score = self.arena.primary_score(candidate);
                    if best.map(|(_, b)| score > b).unwrap_or(true) {
                        best = Some((candidate, score));
                    }
                }
                self.answers[word_idx] = match best {
                    Some((candidate, score)) if score > *alpha => Resolution::Single(candidate),
                    _ => Resolution::NoCandidate,
                };
            }
        }
    }

    // -- hand resolution -----------------------------------------------------

    fn resolve_by_hand(&mut self, chooser: &dyn SenseChooser) {
        for i in self.unresolved_indices() {
            let candidates = &self.candidates[i];
            self.answers[i] = match candidates.len() {
                0 => Resolution::NoCandidate,
                1 => Resolution::Single(candidates[0]),
                _ => {
                    let senses: Vec<SenseRef> = candidates
                        .iter()
                        .filter_map(|&c| self.arena.node(c).payload.sense().cloned())
                        .collect();
                    match chooser.choose(&self.words[i].word, &senses) {
                        Some(idx) => Resolution::Single(candidates[idx]),
                        None => Resolution::NoCandidate,
                    }
                }
            };
        }
    }

    /// Replace every answer with the full scored candidate set.
    fn return_raw_candidates(&mut self) {
        for i in 0..self.words.len() {
            self.answers[i] = Resolution::Multiple(self.candidates[i].clone());
        }
    }

    // -- output / state -----------------------------------------------------

    /// Render answers as `Word:sense` lines, `Word:False` for words without
    /// an accepted sense. Multi-answers are comma-joined.
    pub fn render_answers(&self) -> String {
        let mut out = String::new();
        for (i, word) in self.words.iter().enumerate() {
            let label = to_space_format(&word.word);
            let answer = match &self.answers[i] {
                Resolution::Unresolved | Resolution::NoCandidate => "False".to_string(),
                Resolution::Single(id) => self.arena.key(*id),
                Resolution::Multiple(ids) => ids
                    .iter()
                    .map(|&id| self.arena.key(id))
                    .collect::<Vec<_>>()
                    .join(","),
            };
            out.push_str(&label);
            out.push(':');
            out.push_str(&answer);
            out.push('\n');
        }
        out
    }

    /// Snapshot the answer mapping as serializable data.
    pub fn export_state(&self) -> SavedResolution {
        let entries = self
            .words
            .iter()
            .zip(&self.answers)
            .map(|(word, answer)| SavedEntry {
                word: word.word.clone(),
                answer: match answer {
                    Resolution::Unresolved => SavedAnswer::Unresolved,
                    Resolution::NoCandidate => SavedAnswer::NoCandidate,
                    Resolution::Single(id) => SavedAnswer::Single {
                        sense: self.arena.key(*id),
                    },
                    Resolution::Multiple(ids) => SavedAnswer::Multiple {
                        senses: ids.iter().map(|&id| self.arena.key(id)).collect(),
                    },
                },
            })
            .collect();
        SavedResolution { entries }
    }

    /// Restore answers from a snapshot, allocating fresh sense nodes through
    /// the lookup. Words absent from the current set are appended.
    pub fn import_state(
        &mut self,
        saved: &SavedResolution,
        lookup: &dyn SenseLookup,
    ) -> Result<(), ResolveError> {
        for entry in &saved.entries {
            let idx = match self.words.iter().position(|w| w.word == entry.word) {
                Some(idx) => idx,
                None => {
                    self.words.push(AmbiguousWord::new(entry.word.clone()));
                    self.candidates.push(Vec::new());
                    self.answers.push(Resolution::Unresolved);
                    self.words.len() - 1
                }
            };
            self.answers[idx] = match &entry.answer {
                SavedAnswer::Unresolved => Resolution::Unresolved,
                SavedAnswer::NoCandidate => Resolution::NoCandidate,
                SavedAnswer::Single { sense } => {
                    Resolution::Single(self.restore_sense(sense, lookup)?)
                }
                SavedAnswer::Multiple { senses } => Resolution::Multiple(
                    senses
                        .iter()
                        .map(|s| self.restore_sense(s, lookup))
                        .collect::<Result<_, _>>()?,
                ),
            };
        }
        Ok(())
    }

    fn restore_sense(
        &mut self,
        name: &str,
        lookup: &dyn SenseLookup,
    ) -> Result<NodeId, ResolveError> {
        let sense = lookup
            .lookup(name)
            .ok_or_else(|| ResolveError::UnknownSense { name: name.into() })?;
        Ok(self.arena.alloc_sense(sense))
    }

    /// Score the answers against the words' gold sets.
    pub fn evaluate(&self) -> EvalReport {
        let mut report = EvalReport::default();
        for (i, word) in self.words.iter().enumerate() {
            if let Some(gold) = &word.gold {
                let got: Vec<String> = self.answers[i]
                    .accepted()
                    .iter()
                    .map(|&id| self.arena.key(id))
                    .collect();
                report.tally(&word.word, got, gold);
            }
        }
        report
    }
}
