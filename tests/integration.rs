//! End-to-end pipeline tests: word list in, resolved answers and a merged,
//! property-propagated hierarchy out.

use std::collections::BTreeSet;
use std::io::Write as _;

use synsieve::forest::{build_forest, render_bfs, Forest};
use synsieve::heuristics::LemmaSieve;
use synsieve::input::{parse_word_file, parse_word_list, AmbiguousWord};
use synsieve::node::{NodeArena, NodeId};
use synsieve::ontology::{SenseSpec, StaticOntology};
use synsieve::propagate::propagate;
use synsieve::resolver::{Alpha, Method, Resolution, ResolverConfig, SenseResolver};
use synsieve::sense::Keyword;
use synsieve::sieve::{apply_score, IndependentSieve, Sieve};

fn spec(name: &str, lemmas: &[&str], definition: &str, parent: Option<&str>) -> SenseSpec {
    SenseSpec {
        name: name.into(),
        lemmas: lemmas.iter().map(|l| l.to_string()).collect(),
        definition: definition.into(),
        parent: parent.map(Into::into),
    }
}

fn ontology() -> StaticOntology {
    StaticOntology::from_specs(vec![
        spec("entity.n.01", &["entity"], "that which exists", None),
        spec("animal.n.01", &["animal"], "a living organism", Some("entity.n.01")),
        spec(
            "dog.n.01",
            &["dog", "hound"],
            "a domesticated animal that barks",
            Some("animal.n.01"),
        ),
        spec(
            "dog.n.02",
            &["dog", "pawl"],
            "a hinged catch in a machine",
            Some("entity.n.01"),
        ),
        spec(
            "cat.n.01",
            &["cat"],
            "a small domesticated animal",
            Some("animal.n.01"),
        ),
        spec(
            "bank.n.01",
            &["bank"],
            "a financial institution",
            Some("entity.n.01"),
        ),
        spec(
            "bank.n.02",
            &["bank"],
            "sloping land beside water",
            Some("entity.n.01"),
        ),
    ])
    .unwrap()
}

/// Assigns fixed primary scores by canonical sense name.
struct ScriptedScores(Vec<(&'static str, f64)>);

impl IndependentSieve for ScriptedScores {
    fn score(
        &self,
        arena: &mut NodeArena,
        _word: &str,
        _keywords: &BTreeSet<Keyword>,
        candidates: &[NodeId],
        replace: bool,
    ) {
        for &c in candidates {
            let key = arena.key(c);
            if let Some((_, score)) = self.0.iter().find(|(n, _)| *n == key) {
                apply_score(arena, c, *score, replace);
            }
        }
    }
}

fn edge_keys(arena: &NodeArena, forest: &Forest) -> Vec<(String, String)> {
    let mut edges = Vec::new();
    for &root in &forest.roots {
        for id in arena.breadth_first_order(root) {
            for &child in arena.children(id) {
                edges.push((arena.key(id), arena.key(child)));
            }
        }
    }
    edges.sort();
    edges
}

#[test]
fn threshold_resolution_builds_merged_forest() {
    // Two candidates for "bank" scoring 0.9 and 0.2, one for "dog" scoring
    // 0.95, alpha 0.5: each word resolves to its high scorer and the forest
    // merges at the shared entity root.
    let mut resolver = SenseResolver::new(
        vec![AmbiguousWord::new("bank"), AmbiguousWord::new("dog")],
        ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.5)),
    );
    let sieve = Sieve::independent(ScriptedScores(vec![
        ("bank.n.01", 0.9),
        ("bank.n.02", 0.2),
        ("dog.n.01", 0.95),
        ("dog.n.02", 0.1),
    ]));
    resolver.resolve(&ontology(), &[sieve], None).unwrap();

    let forest = resolver.build_forest();
    assert_eq!(forest.roots.len(), 1);
    let arena = resolver.arena();
    assert_eq!(arena.key(forest.roots[0]), "entity.n.01");

    let edges = edge_keys(arena, &forest);
    assert!(edges.contains(&("bank.n.01".to_string(), "bank".to_string())));
    assert!(edges.contains(&("dog.n.01".to_string(), "dog".to_string())));
    assert!(edges.contains(&("animal.n.01".to_string(), "dog.n.01".to_string())));
    assert!(!edges.iter().any(|(p, _)| p == "bank.n.02"));
}

#[test]
fn single_parent_mode_never_yields_lists() {
    let mut resolver = SenseResolver::new(
        vec![AmbiguousWord::new("bank"), AmbiguousWord::new("dog")],
        ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.5)),
    );
    // Both bank senses tie above alpha; single-parent mode keeps the first.
    let sieve = Sieve::independent(ScriptedScores(vec![
        ("bank.n.01", 0.8),
        ("bank.n.02", 0.8),
        ("dog.n.01", 0.9),
    ]));
    resolver.resolve(&ontology(), &[sieve], None).unwrap();

    for answer in resolver.answers() {
        assert!(!matches!(answer, Resolution::Multiple(_)));
    }
    let accepted = resolver.answer("bank").unwrap().accepted();
    assert_eq!(accepted.len(), 1);
    assert_eq!(resolver.arena().key(accepted[0]), "bank.n.01");
}

#[test]
fn multi_parent_tie_yields_two_element_list() {
    let mut resolver = SenseResolver::new(
        vec![AmbiguousWord::new("bank")],
        ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.5)).multi_parent(true),
    );
    let sieve = Sieve::independent(ScriptedScores(vec![
        ("bank.n.01", 0.8),
        ("bank.n.02", 0.8),
    ]));
    resolver.resolve(&ontology(), &[sieve], None).unwrap();

    let accepted = resolver.answer("bank").unwrap().accepted();
    assert_eq!(accepted.len(), 2);

    // The word leaf ends up under both accepted senses.
    let forest = resolver.build_forest();
    let arena = resolver.arena();
    let edges = edge_keys(arena, &forest);
    assert!(edges.contains(&("bank.n.01".to_string(), "bank".to_string())));
    assert!(edges.contains(&("bank.n.02".to_string(), "bank".to_string())));
}

#[test]
fn zero_candidates_appear_as_isolated_leaves() {
    let mut resolver = SenseResolver::new(
        vec![AmbiguousWord::new("unicorn"), AmbiguousWord::new("dog")],
        ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.5)),
    );
    let sieve = Sieve::independent(ScriptedScores(vec![("dog.n.01", 0.9)]));
    resolver.resolve(&ontology(), &[sieve], None).unwrap();

    assert_eq!(*resolver.answer("unicorn").unwrap(), Resolution::NoCandidate);
    assert!(resolver.render_answers().contains("Unicorn:False"));

    let forest = resolver.build_forest();
    let arena = resolver.arena();
    let isolated: Vec<NodeId> = forest
        .roots
        .iter()
        .copied()
        .filter(|&r| arena.key(r) == "unicorn")
        .collect();
    assert_eq!(isolated.len(), 1);
    assert!(arena.children(isolated[0]).is_empty());
}

#[test]
fn raising_alpha_only_removes_accepted_words() {
    let scores = vec![
        ("bank.n.01", 0.6),
        ("bank.n.02", 0.3),
        ("dog.n.01", 0.9),
        ("cat.n.01", 0.4),
    ];
    let accepted_words = |alpha: f64| -> BTreeSet<String> {
        let mut resolver = SenseResolver::new(
            vec![
                AmbiguousWord::new("bank"),
                AmbiguousWord::new("dog"),
                AmbiguousWord::new("cat"),
            ],
            ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(alpha)),
        );
        let sieve = Sieve::independent(ScriptedScores(scores.clone()));
        resolver.resolve(&ontology(), &[sieve], None).unwrap();
        resolver
            .words()
            .iter()
            .zip(resolver.answers())
            .filter(|(_, a)| a.is_accepted())
            .map(|(w, _)| w.word.clone())
            .collect()
    };

    let low = accepted_words(0.2);
    let mid = accepted_words(0.5);
    let high = accepted_words(0.95);
    assert!(mid.is_subset(&low));
    assert!(high.is_subset(&mid));
    assert!(high.is_empty());
}

#[test]
fn forest_depth_first_numbering_terminates_acyclically() {
    let mut resolver = SenseResolver::new(
        vec![
            AmbiguousWord::new("dog"),
            AmbiguousWord::new("cat"),
            AmbiguousWord::new("bank"),
        ],
        ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.5)),
    );
    let sieve = Sieve::independent(ScriptedScores(vec![
        ("dog.n.01", 0.9),
        ("cat.n.01", 0.9),
        ("bank.n.02", 0.9),
    ]));
    resolver.resolve(&ontology(), &[sieve], None).unwrap();
    let forest = resolver.build_forest();

    let mut next = 0;
    for &root in &forest.roots {
        next = resolver.arena_mut().depth_first_number(root, next);
    }
    // Every parent's pre-number precedes its children's.
    let arena = resolver.arena();
    for &root in &forest.roots {
        for id in arena.breadth_first_order(root) {
            let pre = arena.node(id).pre_number.unwrap();
            for &child in arena.children(id) {
                assert!(arena.node(child).pre_number.unwrap() > pre);
            }
        }
    }
}

#[test]
fn resolving_same_input_twice_gives_isomorphic_forests() {
    let run = || {
        let mut resolver = SenseResolver::new(
            vec![AmbiguousWord::new("dog"), AmbiguousWord::new("cat")],
            ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.5)),
        );
        let sieve = Sieve::independent(ScriptedScores(vec![
            ("dog.n.01", 0.9),
            ("cat.n.01", 0.9),
        ]));
        resolver.resolve(&ontology(), &[sieve], None).unwrap();
        let forest = resolver.build_forest();
        edge_keys(resolver.arena(), &forest)
    };
    assert_eq!(run(), run());
}

#[test]
fn keyword_driven_resolution_from_word_file() {
    let ontology = ontology();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Dog1:hound").unwrap();
    writeln!(file, "Cat:cat").unwrap();
    file.flush().unwrap();

    let words = parse_word_file(file.path(), Some(&ontology)).unwrap();
    assert_eq!(words.len(), 2);
    assert_eq!(words[0].word, "dog");

    let mut resolver = SenseResolver::new(
        words,
        ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.1)),
    );
    resolver
        .resolve(&ontology, &[Sieve::independent(LemmaSieve)], None)
        .unwrap();

    // "hound" is a lemma of dog.n.01 only.
    let accepted = resolver.answer("dog").unwrap().accepted();
    assert_eq!(resolver.arena().key(accepted[0]), "dog.n.01");
}

#[test]
fn properties_propagate_through_resolved_forest() {
    let mut resolver = SenseResolver::new(
        vec![AmbiguousWord::new("dog"), AmbiguousWord::new("cat")],
        ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.5)),
    );
    let sieve = Sieve::independent(ScriptedScores(vec![
        ("dog.n.01", 0.9),
        ("cat.n.01", 0.9),
    ]));
    resolver.resolve(&ontology(), &[sieve], None).unwrap();
    let forest = resolver.build_forest();

    // Tag both word leaves with a shared property and one distinct each.
    let arena = resolver.arena_mut();
    let mut leaves = Vec::new();
    for &root in &forest.roots {
        for id in arena.breadth_first_order(root) {
            if matches!(arena.key(id).as_str(), "dog" | "cat") {
                leaves.push(id);
            }
        }
    }
    assert_eq!(leaves.len(), 2);
    arena.add_property(leaves[0], "alive");
    arena.add_property(leaves[0], "barks");
    arena.add_property(leaves[1], "alive");

    propagate(arena, &forest);

    // "alive" climbed to the root; "barks" climbed one level, to the sense
    // node above the dog leaf (a sole child hands its whole set upward), and
    // no further because cat.n.01 does not share it.
    let root = forest.roots[0];
    assert!(arena.properties(root).contains("alive"));
    let dog_sense = forest
        .roots
        .iter()
        .flat_map(|&r| arena.breadth_first_order(r))
        .find(|&id| arena.key(id) == "dog.n.01")
        .unwrap();
    assert_eq!(
        arena.properties(dog_sense),
        &BTreeSet::from(["barks".to_string()])
    );
    assert!(arena.properties(leaves[0]).is_empty());
    assert!(arena.properties(leaves[1]).is_empty());
}

#[test]
fn ontology_file_round_trip_drives_pipeline() {
    let json = serde_json::json!([
        {"name": "entity.n.01", "lemmas": ["entity"], "definition": "that which exists"},
        {"name": "tool.n.01", "lemmas": ["tool"], "definition": "an implement", "parent": "entity.n.01"},
        {"name": "hammer.n.01", "lemmas": ["hammer"], "definition": "a pounding tool", "parent": "tool.n.01"}
    ]);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{json}").unwrap();
    file.flush().unwrap();

    let ontology = StaticOntology::from_path(file.path()).unwrap();
    let words = parse_word_list("Hammer3", Some(&ontology)).unwrap();
    let mut resolver = SenseResolver::new(
        words,
        ResolverConfig::new(Method::Default, Alpha::Threshold(0.0)),
    );
    resolver.resolve(&ontology, &[], None).unwrap();

    let forest = resolver.build_forest();
    let rendered = render_bfs(resolver.arena(), &forest);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(
        lines,
        vec![
            "entity.n.01",
            "tool.n.01: entity.n.01",
            "hammer.n.01: tool.n.01",
            "Hammer: hammer.n.01",
        ]
    );
}

#[test]
fn saved_state_rebuilds_identical_forest() {
    let ontology = ontology();
    let mut resolver = SenseResolver::new(
        vec![AmbiguousWord::new("dog"), AmbiguousWord::new("unicorn")],
        ResolverConfig::new(Method::MultiSieve, Alpha::Threshold(0.5)),
    );
    let sieve = Sieve::independent(ScriptedScores(vec![("dog.n.01", 0.9)]));
    resolver.resolve(&ontology, &[sieve], None).unwrap();
    let forest = resolver.build_forest();
    let original = edge_keys(resolver.arena(), &forest);

    let json = serde_json::to_string(&resolver.export_state()).unwrap();
    let saved = serde_json::from_str(&json).unwrap();

    let mut restored = SenseResolver::new(
        Vec::new(),
        ResolverConfig::new(Method::Default, Alpha::Threshold(0.0)),
    );
    restored.import_state(&saved, &ontology).unwrap();
    let entries: Vec<(String, Resolution)> = restored
        .words()
        .iter()
        .zip(restored.answers())
        .map(|(w, a)| (w.word.clone(), a.clone()))
        .collect();
    let rebuilt_forest = build_forest(restored.arena_mut(), &entries, false);
    assert_eq!(original, edge_keys(restored.arena(), &rebuilt_forest));
}
