//! Built-in in-memory ontology.
//!
//! [`StaticOntology`] is a self-contained WordNet-like sense hierarchy loaded
//! from JSON: an array of senses, each with a canonical `name`
//! (`"dog.n.01"`), `lemmas`, a `definition` gloss, and an optional `parent`
//! name. It implements every external contract the resolver needs —
//! [`SenseHandle`] for its senses, [`CandidateGenerator`] with the word-form
//! fallback precedence (direct form, compound form, per-fragment), and
//! [`SenseLookup`] for sense-reference keywords and state restore.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::OntologyError;
use crate::input::compound_word;
use crate::sense::{CandidateGenerator, SenseHandle, SenseLookup, SenseRef};

/// One sense as written in an ontology file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenseSpec {
    /// Canonical name, e.g. `"dog.n.01"`.
    pub name: String,
    /// Lemma/synonym tokens. The first dot-segment of `name` is always
    /// registered as a lemma, listed or not.
    #[serde(default)]
    pub lemmas: Vec<String>,
    /// Definition gloss.
    #[serde(default)]
    pub definition: String,
    /// Canonical name of the hypernym, absent for roots.
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug)]
struct SenseEntry {
    name: String,
    lemmas: Vec<String>,
    definition: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug)]
struct Inner {
    entries: Vec<SenseEntry>,
    by_name: HashMap<String, usize>,
    /// Lowercased lemma → sense indices, in file order.
    by_lemma: HashMap<String, Vec<usize>>,
}

/// Immutable sense hierarchy shared by all handles it hands out.
#[derive(Debug, Clone)]
pub struct StaticOntology {
    inner: Arc<Inner>,
}

impl StaticOntology {
    /// Build an ontology from sense specs, validating name uniqueness,
    /// parent references, and acyclicity.
    pub fn from_specs(specs: Vec<SenseSpec>) -> Result<Self, OntologyError> {
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            if by_name.insert(spec.name.clone(), idx).is_some() {
                return Err(OntologyError::DuplicateSense {
                    sense: spec.name.clone(),
                });
            }
        }

        let mut entries: Vec<SenseEntry> = Vec::with_capacity(specs.len());
        for spec in &specs {
            let parent = match &spec.parent {
                None => None,
                Some(parent_name) => Some(*by_name.get(parent_name).ok_or_else(|| {
                    OntologyError::UnknownParent {
                        sense: spec.name.clone(),
                        parent: parent_name.clone(),
                    }
                })?),
            };
            entries.push(SenseEntry {
                name: spec.name.clone(),
                lemmas: spec.lemmas.clone(),
                definition: spec.definition.clone(),
                parent,
                children: Vec::new(),
            });
        }

        for idx in 0..entries.len() {
            if let Some(parent) = entries[idx].parent {
                entries[parent].children.push(idx);
            }
        }

        // Walk each parent chain; a chain longer than the entry count loops.
        for (idx, entry) in entries.iter().enumerate() {
            let mut cursor = entry.parent;
            let mut steps = 0;
            while let Some(up) = cursor {
                steps += 1;
                if steps > entries.len() {
                    return Err(OntologyError::Cycle {
                        sense: entries[idx].name.clone(),
                    });
                }
                cursor = entries[up].parent;
            }
        }

        let mut by_lemma: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            let mut lemmas: Vec<String> =
                entry.lemmas.iter().map(|l| l.to_lowercase()).collect();
            if let Some(label) = entry.name.split('.').next() {
                let label = label.to_lowercase();
                if !lemmas.contains(&label) {
                    lemmas.push(label);
                }
            }
            for lemma in lemmas {
                by_lemma.entry(lemma).or_default().push(idx);
            }
        }

        Ok(Self {
            inner: Arc::new(Inner {
                entries,
                by_name,
                by_lemma,
            }),
        })
    }

    /// Parse an ontology from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, OntologyError> {
        let specs: Vec<SenseSpec> =
            serde_json::from_str(json).map_err(|e| OntologyError::Parse {
                message: e.to_string(),
            })?;
        Self::from_specs(specs)
    }

    /// Load an ontology from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OntologyError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| OntologyError::Io { source })?;
        Self::from_json_str(&text)
    }

    /// Number of senses.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn handle(&self, index: usize) -> SenseRef {
        Arc::new(OntologySense {
            inner: Arc::clone(&self.inner),
            index,
        })
    }
}

impl SenseLookup for StaticOntology {
    fn lookup(&self, canonical: &str) -> Option<SenseRef> {
        self.inner.by_name.get(canonical).map(|&idx| self.handle(idx))
    }
}

impl CandidateGenerator for StaticOntology {
    /// Word-form fallback precedence: the word itself, its compound form, and
    /// each underscore fragment, deduplicated in first-hit order.
    fn generate(&self, word: &str) -> Vec<SenseRef> {
        let mut forms: Vec<String> = vec![word.to_lowercase(), compound_word(word)];
        forms.extend(word.split('_').map(|f| f.to_lowercase()));

        let mut seen: HashSet<usize> = HashSet::new();
        let mut result: Vec<SenseRef> = Vec::new();
        for form in forms {
            if let Some(indices) = self.inner.by_lemma.get(&form) {
                for &idx in indices {
                    if seen.insert(idx) {
                        result.push(self.handle(idx));
                    }
                }
            }
        }
        result
    }
}

/// Handle onto one sense of a [`StaticOntology`].
#[derive(Debug, Clone)]
struct OntologySense {
    inner: Arc<Inner>,
    index: usize,
}

impl OntologySense {
    fn entry(&self) -> &SenseEntry {
        &self.inner.entries[self.index]
    }

    /// Root-first name path, including this sense.
    fn path_names(&self) -> Vec<String> {
        let mut path: Vec<String> = Vec::new();
        let mut cursor = Some(self.index);
        while let Some(idx) = cursor {
            path.push(self.inner.entries[idx].name.clone());
            cursor = self.inner.entries[idx].parent;
        }
        path.reverse();
        path
    }
}

impl SenseHandle for OntologySense {
    fn canonical_name(&self) -> String {
        self.entry().name.clone()
    }

    fn lemmas(&self) -> Vec<String> {
        self.entry().lemmas.clone()
    }

    fn definition(&self) -> String {
        self.entry().definition.clone()
    }

    fn ancestors(&self) -> Vec<SenseRef> {
        let mut chain: Vec<usize> = Vec::new();
        let mut cursor = self.entry().parent;
        while let Some(idx) = cursor {
            chain.push(idx);
            cursor = self.inner.entries[idx].parent;
        }
        chain.reverse();
        chain
            .into_iter()
            .map(|idx| {
                Arc::new(OntologySense {
                    inner: Arc::clone(&self.inner),
                    index: idx,
                }) as SenseRef
            })
            .collect()
    }

    fn hyponyms(&self) -> Vec<SenseRef> {
        self.entry()
            .children
            .iter()
            .map(|&idx| {
                Arc::new(OntologySense {
                    inner: Arc::clone(&self.inner),
                    index: idx,
                }) as SenseRef
            })
            .collect()
    }

    /// Wu-Palmer-style similarity: `2·depth(lcs) / (depth(a) + depth(b))`
    /// over root-first paths, 0 when the senses share no ancestor.
    fn similarity(&self, other: &dyn SenseHandle) -> f64 {
        let mine = self.path_names();
        let mut theirs: Vec<String> =
            other.ancestors().iter().map(|a| a.canonical_name()).collect();
        theirs.push(other.canonical_name());

        let common = mine
            .iter()
            .zip(theirs.iter())
            .take_while(|(a, b)| a == b)
            .count();
        if common == 0 {
            return 0.0;
        }
        2.0 * common as f64 / (mine.len() + theirs.len()) as f64
    }
}
