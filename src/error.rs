//! Rich diagnostic error types for synsieve.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Resolution outcomes such as "no candidate
//! senses" or "below threshold" are *data states* on the resolver, not errors;
//! the enums here cover input parsing, ontology loading, configuration, and
//! state-restore failures only.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for synsieve.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source chains) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum SynsieveError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("I/O error reading ontology: {source}")]
    #[diagnostic(
        code(synsieve::ontology::io),
        help("Check that the ontology file exists and is readable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("ontology parse error: {message}")]
    #[diagnostic(
        code(synsieve::ontology::parse),
        help(
            "The ontology file is not valid JSON for the expected schema: \
             an array of objects with `name`, `lemmas`, `definition`, and an \
             optional `parent`."
        )
    )]
    Parse { message: String },

    #[error("sense {sense} names unknown parent {parent}")]
    #[diagnostic(
        code(synsieve::ontology::unknown_parent),
        help(
            "Every `parent` field must name another sense defined in the same \
             file. Add the missing sense or fix the reference."
        )
    )]
    UnknownParent { sense: String, parent: String },

    #[error("duplicate sense name: {sense}")]
    #[diagnostic(
        code(synsieve::ontology::duplicate_sense),
        help("Sense names are canonical identifiers and must be unique.")
    )]
    DuplicateSense { sense: String },

    #[error("cycle in ancestor chain through {sense}")]
    #[diagnostic(
        code(synsieve::ontology::cycle),
        help(
            "The is-a hierarchy must be acyclic. Follow the `parent` fields \
             from this sense to find the loop."
        )
    )]
    Cycle { sense: String },
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("malformed word list entry on line {line_no}: {line:?}")]
    #[diagnostic(
        code(synsieve::input::malformed_line),
        help(
            "Each non-empty line must be `word` or `word:keyword1,keyword2,...` \
             with a non-empty word label."
        )
    )]
    MalformedLine { line_no: usize, line: String },

    #[error("I/O error reading word list: {source}")]
    #[diagnostic(
        code(synsieve::input::io),
        help("Check that the word list file exists and is readable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Resolver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("invalid resolver configuration: {message}")]
    #[diagnostic(
        code(synsieve::resolve::invalid_config),
        help("Check the ResolverConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("hand clustering is enabled but no chooser was provided")]
    #[diagnostic(
        code(synsieve::resolve::chooser_missing),
        help(
            "With `hand_cluster` set, `resolve` needs a SenseChooser to fall \
             back on. Pass a ConsoleChooser, a ScriptedChooser, or disable \
             hand clustering."
        )
    )]
    ChooserMissing,

    #[error("saved resolution references unknown sense {name}")]
    #[diagnostic(
        code(synsieve::resolve::unknown_sense),
        help(
            "Restoring resolution state looks every sense name up in the \
             ontology. The state was probably saved against a different \
             ontology file."
        )
    )]
    UnknownSense { name: String },
}

/// Convenience alias for functions returning synsieve results.
pub type SynsieveResult<T> = std::result::Result<T, SynsieveError>;
