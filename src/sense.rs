//! External-ontology contracts.
//!
//! The resolver never talks to a lexical ontology directly; it goes through the
//! traits here. [`SenseHandle`] is an opaque handle onto one sense (one meaning
//! of a word) in a WordNet-like hierarchy, [`CandidateGenerator`] produces the
//! candidate senses for an ambiguous word, [`SenseLookup`] resolves a canonical
//! name back to a handle, and [`SenseChooser`] is the synchronous decision port
//! for hand resolution. Any ontology backend can plug in behind these traits;
//! [`crate::ontology::StaticOntology`] is the built-in one.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::sync::Arc;

use rand::seq::SliceRandom;

/// Shared handle onto a sense in the external ontology.
pub type SenseRef = Arc<dyn SenseHandle>;

/// One sense (meaning) in the external lexical ontology.
///
/// Two handles denote the *same* sense iff their canonical names are equal;
/// that string is the merge key everywhere in the crate.
pub trait SenseHandle: std::fmt::Debug {
    /// Canonical string identity, e.g. `"run.v.01"`.
    fn canonical_name(&self) -> String;

    /// Lemma / synonym tokens for this sense.
    fn lemmas(&self) -> Vec<String>;

    /// Definition gloss as tokenizable text.
    fn definition(&self) -> String;

    /// Ancestor chain in the ontology, ordered root-first, excluding `self`.
    fn ancestors(&self) -> Vec<SenseRef>;

    /// Direct descendant senses (for local-neighborhood heuristics).
    fn hyponyms(&self) -> Vec<SenseRef>;

    /// Pairwise similarity against another handle, in `[0, 1]`.
    fn similarity(&self, other: &dyn SenseHandle) -> f64;
}

/// Produces the ordered candidate senses for an ambiguous word.
pub trait CandidateGenerator {
    fn generate(&self, word: &str) -> Vec<SenseRef>;
}

/// Resolves a canonical sense name back to a handle.
///
/// Used for opportunistic sense-reference keywords in word lists and for
/// restoring saved resolution state.
pub trait SenseLookup {
    fn lookup(&self, canonical: &str) -> Option<SenseRef>;
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// A piece of keyword evidence attached to an ambiguous word.
///
/// Usually a free-text token, but word lists may name senses directly
/// (`"run.v.01"`); those are parsed into direct references when the lookup
/// succeeds. Ordering and equality go through [`Keyword::token`] so keyword
/// sets stay deterministic.
#[derive(Debug, Clone)]
pub enum Keyword {
    /// Plain evidence token.
    Text(String),
    /// Direct reference to an ontology sense.
    Sense(SenseRef),
}

impl Keyword {
    /// The comparable string form: the text itself, or the sense's canonical name.
    pub fn token(&self) -> String {
        match self {
            Keyword::Text(t) => t.clone(),
            Keyword::Sense(s) => s.canonical_name(),
        }
    }

    /// The sense handle, when this keyword is a direct reference.
    pub fn as_sense(&self) -> Option<&SenseRef> {
        match self {
            Keyword::Text(_) => None,
            Keyword::Sense(s) => Some(s),
        }
    }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
    }
}

impl Eq for Keyword {}

impl PartialOrd for Keyword {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyword {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token().cmp(&other.token())
    }
}

// ---------------------------------------------------------------------------
// Generation filters
// ---------------------------------------------------------------------------

/// Wraps a generator with an external filtering policy (e.g. restrict to a
/// part of speech, or require descent from a named ancestor).
pub struct FilteredGenerator<G> {
    inner: G,
    filter: Box<dyn Fn(&SenseRef) -> bool>,
}

impl<G: CandidateGenerator> FilteredGenerator<G> {
    pub fn new(inner: G, filter: impl Fn(&SenseRef) -> bool + 'static) -> Self {
        Self {
            inner,
            filter: Box::new(filter),
        }
    }
}

impl<G: CandidateGenerator> CandidateGenerator for FilteredGenerator<G> {
    fn generate(&self, word: &str) -> Vec<SenseRef> {
        self.inner
            .generate(word)
            .into_iter()
            .filter(|s| (self.filter)(s))
            .collect()
    }
}

/// Filter predicate requiring descent from (or identity with) a named ancestor.
pub fn descends_from(ancestor: &str) -> impl Fn(&SenseRef) -> bool + 'static {
    let ancestor = ancestor.to_string();
    move |sense: &SenseRef| {
        sense.canonical_name() == ancestor
            || sense
                .ancestors()
                .iter()
                .any(|a| a.canonical_name() == ancestor)
    }
}

// ---------------------------------------------------------------------------
// Hand-resolution decision port
// ---------------------------------------------------------------------------

/// Synchronous decision port for hand resolution.
///
/// Invoked by the resolver for words the sieves could not settle when hand
/// clustering is enabled. Returning `None` abstains, which marks the word
/// no-candidate.
pub trait SenseChooser {
    /// Pick one of `candidates` for `word`, or abstain.
    ///
    /// The returned index is into the `candidates` slice as given.
    fn choose(&self, word: &str, candidates: &[SenseRef]) -> Option<usize>;
}

/// Interactive chooser that prompts on stdout and reads a choice from stdin.
///
/// Candidates are shuffled before display so the author is not biased by
/// generation order; the reported index maps back to the original slice.
/// The last menu entry always abstains.
#[derive(Debug, Default)]
pub struct ConsoleChooser;

impl ConsoleChooser {
    pub fn new() -> Self {
        Self
    }

    fn render_menu(word: &str, order: &[usize], candidates: &[SenseRef]) -> String {
        let mut menu = format!("Choose a sense for {word}:\n");
        for (row, &idx) in order.iter().enumerate() {
            let sense = &candidates[idx];
            let _ = writeln!(
                menu,
                "{row} {} ({}): {}",
                sense.canonical_name(),
                sense.lemmas().join(","),
                sense.definition()
            );
        }
        let _ = writeln!(menu, "{} None", order.len());
        menu
    }
}

impl SenseChooser for ConsoleChooser {
    fn choose(&self, word: &str, candidates: &[SenseRef]) -> Option<usize> {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.shuffle(&mut rand::thread_rng());

        let stdin = std::io::stdin();
        loop {
            print!("{}", Self::render_menu(word, &order, candidates));
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                return None;
            }
            match line.trim().parse::<usize>() {
                Ok(row) if row < order.len() => return Some(order[row]),
                Ok(row) if row == order.len() => return None,
                _ => println!("Invalid choice"),
            }
        }
    }
}

/// Deterministic chooser for tests and scripted runs.
///
/// Maps a word to the canonical name of the sense to pick; words without an
/// entry (or whose entry matches no candidate) abstain.
#[derive(Debug, Default)]
pub struct ScriptedChooser {
    picks: BTreeMap<String, String>,
}

impl ScriptedChooser {
    /// A chooser that abstains on every word.
    pub fn abstaining() -> Self {
        Self::default()
    }

    pub fn new(picks: BTreeMap<String, String>) -> Self {
        Self { picks }
    }

    /// Add a scripted pick for `word`.
    pub fn pick(mut self, word: impl Into<String>, sense: impl Into<String>) -> Self {
        self.picks.insert(word.into(), sense.into());
        self
    }
}

impl SenseChooser for ScriptedChooser {
    fn choose(&self, word: &str, candidates: &[SenseRef]) -> Option<usize> {
        let wanted = self.picks.get(word)?;
        candidates
            .iter()
            .position(|c| &c.canonical_name() == wanted)
    }
}
