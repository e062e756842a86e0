//! # synsieve
//!
//! Word-sense disambiguation and hierarchy generation over a WordNet-like
//! lexical ontology. Ambiguous word labels plus sparse keyword evidence go
//! in; a resolved word-to-sense mapping and a merged ancestor hierarchy with
//! propagated properties come out.
//!
//! ## Pipeline
//!
//! - **Resolution** (`resolver`): candidate senses per word, scored by
//!   pluggable sieves (`sieve`, `heuristics`) and accepted against a
//!   threshold or fitted model.
//! - **Forest building** (`forest`): accepted senses stitched into ancestor
//!   chains, duplicate ancestors merged by canonical name.
//! - **Propagation** (`propagate`): shared properties relocated to the most
//!   general node that still holds them.
//!
//! The ontology itself stays behind the traits in `sense`; `ontology` ships
//! a JSON-backed implementation.
//!
//! ## Library usage
//!
//! ```no_run
//! use synsieve::heuristics::LemmaSieve;
//! use synsieve::input::AmbiguousWord;
//! use synsieve::ontology::StaticOntology;
//! use synsieve::resolver::{Alpha, Method, ResolverConfig, SenseResolver};
//! use synsieve::sieve::Sieve;
//!
//! let ontology = StaticOntology::from_path("ontology.json").unwrap();
//! let words = vec![AmbiguousWord::new("dog").with_keywords(["hound"])];
//! let config = ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.4));
//! let mut resolver = SenseResolver::new(words, config);
//! resolver
//!     .resolve(&ontology, &[Sieve::independent(LemmaSieve)], None)
//!     .unwrap();
//! let forest = resolver.build_forest();
//! ```

pub mod error;
pub mod forest;
pub mod heuristics;
pub mod input;
pub mod node;
pub mod ontology;
pub mod propagate;
pub mod resolver;
pub mod sense;
pub mod sieve;
