//! Word lists and word-form normalization.
//!
//! Input is one ambiguous word per line, `word` or `word:keyword1,keyword2,...`.
//! Word labels arrive in whatever casing the source material used (CamelCase
//! identifiers, "Spaced Names", `snake_case`) and are normalized to the
//! ontology's snake_case form. A keyword that looks like a sense identifier
//! (contains a `.`) is opportunistically parsed into a direct sense reference;
//! a failed lookup silently keeps it as plain text.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::InputError;
use crate::sense::{Keyword, SenseLookup};

// ---------------------------------------------------------------------------
// Word-form transforms
// ---------------------------------------------------------------------------

fn camel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[A-Z][^A-Z]*").expect("static regex"))
}

fn digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// Normalize a label to the ontology's snake_case form.
///
/// Space-delimited words are joined (`"Physical Object"` → `"physical_object"`);
/// a single CamelCase token is split on its capitals (`"PickUp"` → `"pick_up"`).
pub fn to_ontology_format(label: &str) -> String {
    let label = label.trim();
    let parts: Vec<&str> = label.split(' ').filter(|p| !p.is_empty()).collect();
    let parts = if parts.len() == 1 {
        let camel: Vec<&str> = camel_re()
            .find_iter(label)
            .map(|m| m.as_str())
            .collect();
        if camel.is_empty() { parts } else { camel }
    } else {
        parts
    };
    parts
        .iter()
        .map(|p| p.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Truncate at the first digit run, so `"Pillar1"` becomes `"Pillar"`.
pub fn strip_trailing_digits(word: &str) -> &str {
    match digit_re().find(word) {
        Some(m) => &word[..m.start()],
        None => word,
    }
}

/// `"physical_object"` → `"Physical Object"`.
pub fn to_space_format(word: &str) -> String {
    word.split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"physical_object"` → `"PhysicalObject"`.
pub fn to_camel_format(word: &str) -> String {
    word.split('_').map(capitalize).collect()
}

/// `"physical_object"` → `"physicalobject"` (compound lookup form).
pub fn compound_word(word: &str) -> String {
    word.split('_')
        .map(|p| p.to_lowercase())
        .collect()
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Ambiguous words
// ---------------------------------------------------------------------------

/// One input word with its keyword evidence and optional gold answers.
#[derive(Debug, Clone, Default)]
pub struct AmbiguousWord {
    /// Normalized word label.
    pub word: String,
    /// Sparse keyword evidence; empty means none.
    pub keywords: BTreeSet<Keyword>,
    /// Acceptable sense names for evaluation; an empty set expects no
    /// resolution. `None` means unevaluated.
    pub gold: Option<BTreeSet<String>>,
}

impl AmbiguousWord {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Default::default()
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|k| Keyword::Text(k.into()))
            .collect();
        self
    }

    pub fn with_gold<I, S>(mut self, gold: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gold = Some(gold.into_iter().map(Into::into).collect());
        self
    }
}

/// Parse a word list from text.
///
/// Blank lines are skipped. With a lookup, keywords containing a `.` are
/// tried as direct sense references; misses fall back to plain text.
pub fn parse_word_list(
    text: &str,
    lookup: Option<&dyn SenseLookup>,
) -> Result<Vec<AmbiguousWord>, InputError> {
    let mut words = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (label, keyword_part) = match line.split_once(':') {
            Some((l, k)) => (l, Some(k)),
            None => (line, None),
        };
        let word = strip_trailing_digits(&to_ontology_format(label)).to_string();
        if word.is_empty() {
            return Err(InputError::MalformedLine {
                line_no: idx + 1,
                line: raw.to_string(),
            });
        }

        let mut keywords = BTreeSet::new();
        if let Some(part) = keyword_part {
            for entry in part.split(',') {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }
                keywords.insert(parse_keyword(entry, lookup));
            }
        }

        words.push(AmbiguousWord {
            word,
            keywords,
            gold: None,
        });
    }
    Ok(words)
}

/// Parse a word list from a file.
pub fn parse_word_file(
    path: impl AsRef<Path>,
    lookup: Option<&dyn SenseLookup>,
) -> Result<Vec<AmbiguousWord>, InputError> {
    let text =
        std::fs::read_to_string(path).map_err(|source| InputError::Io { source })?;
    parse_word_list(&text, lookup)
}

fn parse_keyword(entry: &str, lookup: Option<&dyn SenseLookup>) -> Keyword {
    if entry.contains('.') {
        if let Some(lookup) = lookup {
            if let Some(sense) = lookup.lookup(entry) {
                return Keyword::Sense(sense);
            }
        }
    }
    Keyword::Text(entry.to_string())
}

/// Add shared keyword evidence to every word in the list.
pub fn add_keywords(words: &mut [AmbiguousWord], extra: &BTreeSet<Keyword>) {
    for word in words {
        word.keywords.extend(extra.iter().cloned());
    }
}

// ---------------------------------------------------------------------------
// Evaluation against gold answers
// ---------------------------------------------------------------------------

/// An answer that disagreed with the gold set.
#[derive(Debug, Clone)]
pub struct Mismatch {
    pub word: String,
    /// Accepted sense names, empty when nothing was resolved.
    pub got: Vec<String>,
    pub expected: BTreeSet<String>,
}

/// Resolution quality against the words' gold answers.
///
/// Only words carrying a gold set participate. `missed` counts expected
/// senses the resolver left unresolved; `false_hits` counts resolutions for
/// words whose gold set expects none.
#[derive(Debug, Clone, Default)]
pub struct EvalReport {
    pub total: usize,
    pub correct: usize,
    pub missed: usize,
    pub false_hits: usize,
    pub incorrect: usize,
    pub mismatches: Vec<Mismatch>,
}

impl EvalReport {
    fn rate(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64
        }
    }

    pub fn correct_rate(&self) -> f64 {
        self.rate(self.correct)
    }

    pub fn missed_rate(&self) -> f64 {
        self.rate(self.missed)
    }

    pub fn false_hit_rate(&self) -> f64 {
        self.rate(self.false_hits)
    }

    /// Score one word's answer against its gold set.
    pub(crate) fn tally(&mut self, word: &str, got: Vec<String>, expected: &BTreeSet<String>) {
        self.total += 1;
        match (got.is_empty(), expected.is_empty()) {
            (true, true) => self.correct += 1,
            (true, false) => self.missed += 1,
            (false, true) => {
                self.false_hits += 1;
                self.push_mismatch(word, got, expected);
            }
            (false, false) => {
                if got.iter().any(|g| expected.contains(g)) {
                    self.correct += 1;
                } else {
                    self.incorrect += 1;
                    self.push_mismatch(word, got, expected);
                }
            }
        }
    }

    fn push_mismatch(&mut self, word: &str, got: Vec<String>, expected: &BTreeSet<String>) {
        self.mismatches.push(Mismatch {
            word: word.to_string(),
            got,
            expected: expected.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_splits_to_snake() {
        assert_eq!(to_ontology_format("PickUp"), "pick_up");
        assert_eq!(to_ontology_format("Physical Object"), "physical_object");
        assert_eq!(to_ontology_format("  run  "), "run");
    }

    #[test]
    fn digits_truncate_word() {
        assert_eq!(strip_trailing_digits("Pillar1"), "Pillar");
        assert_eq!(strip_trailing_digits("box12lid"), "box");
        assert_eq!(strip_trailing_digits("door"), "door");
    }

    #[test]
    fn round_trip_formats() {
        assert_eq!(to_space_format("physical_object"), "Physical Object");
        assert_eq!(to_camel_format("physical_object"), "PhysicalObject");
        assert_eq!(compound_word("physical_object"), "physicalobject");
    }

    #[test]
    fn parse_words_and_keywords() {
        let text = "PickUp:grasp,lift\nDoor1\n\nTable : flat , wooden\n";
        let words = parse_word_list(text, None).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].word, "pick_up");
        assert_eq!(
            words[0]
                .keywords
                .iter()
                .map(Keyword::token)
                .collect::<Vec<_>>(),
            vec!["grasp", "lift"]
        );
        assert_eq!(words[1].word, "door");
        assert!(words[1].keywords.is_empty());
        assert_eq!(words[2].word, "table");
        assert_eq!(words[2].keywords.len(), 2);
    }

    #[test]
    fn empty_word_label_is_malformed() {
        let err = parse_word_list(":x,y", None).unwrap_err();
        assert!(matches!(err, InputError::MalformedLine { line_no: 1, .. }));
    }

    #[test]
    fn sense_like_keyword_without_lookup_stays_text() {
        let words = parse_word_list("run:sprint.v.01", None).unwrap();
        let kw = words[0].keywords.iter().next().unwrap();
        assert!(matches!(kw, Keyword::Text(_)));
    }

    #[test]
    fn add_keywords_extends_every_word() {
        let mut words = vec![
            AmbiguousWord::new("a").with_keywords(["x"]),
            AmbiguousWord::new("b"),
        ];
        let extra: BTreeSet<Keyword> = [Keyword::Text("shared".into())].into();
        add_keywords(&mut words, &extra);
        assert_eq!(words[0].keywords.len(), 2);
        assert_eq!(words[1].keywords.len(), 1);
    }

    #[test]
    fn eval_report_rates() {
        let mut report = EvalReport::default();
        report.tally("a", vec!["a.n.01".into()], &["a.n.01".to_string()].into());
        report.tally("b", vec![], &["b.n.01".to_string()].into());
        report.tally("c", vec!["c.n.02".into()], &BTreeSet::new());
        report.tally("d", vec!["d.n.02".into()], &["d.n.01".to_string()].into());
        assert_eq!(report.total, 4);
        assert_eq!(report.correct, 1);
        assert_eq!(report.missed, 1);
        assert_eq!(report.false_hits, 1);
        assert_eq!(report.incorrect, 1);
        assert_eq!(report.mismatches.len(), 2);
        assert!((report.correct_rate() - 0.25).abs() < 1e-9);
    }
}
