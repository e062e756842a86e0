//! synsieve CLI: resolve word senses and print the merged hierarchy.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use synsieve::forest::render_bfs;
use synsieve::heuristics::{ClusterMaxSieve, DefinitionSieve, LemmaSieve, PathSieve};
use synsieve::input::{parse_word_file, strip_trailing_digits, to_ontology_format};
use synsieve::ontology::StaticOntology;
use synsieve::propagate::propagate;
use synsieve::resolver::{Alpha, Method, ResolverConfig, SavedResolution, SenseResolver};
use synsieve::sense::{descends_from, ConsoleChooser, FilteredGenerator, SenseChooser};
use synsieve::sieve::Sieve;

#[derive(Parser)]
#[command(name = "synsieve", version, about = "Word-sense resolution and hierarchy generation")]
struct Cli {
    /// Ontology JSON file.
    #[arg(long, global = true, default_value = "ontology.json")]
    ontology: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    Default,
    MultiSieve,
    ClusterProb,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Default => Method::Default,
            MethodArg::MultiSieve => Method::MultiSieve,
            MethodArg::ClusterProb => Method::ClusterProb,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a word list and print answers and the merged forest.
    Resolve {
        /// Word list, one `word[:keyword1,keyword2,...]` per line.
        #[arg(long)]
        words: PathBuf,

        /// Resolution method.
        #[arg(long, value_enum, default_value = "multi-sieve")]
        method: MethodArg,

        /// Acceptance threshold.
        #[arg(long, default_value = "0.4")]
        alpha: f64,

        /// Allow a word to keep several equally-scored senses.
        #[arg(long)]
        multi_parent: bool,

        /// Ask interactively for words the sieves cannot settle.
        #[arg(long)]
        interactive: bool,

        /// Skip acceptance and print the full scored candidate sets.
        #[arg(long)]
        no_prune: bool,

        /// Only consider senses descending from this canonical name.
        #[arg(long)]
        restrict: Option<String>,

        /// Write the resolution state to this JSON file.
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Score a resolution run against gold answers.
    Eval {
        /// Word list, one `word[:keyword1,keyword2,...]` per line.
        #[arg(long)]
        words: PathBuf,

        /// Gold answers, one `word:sense1,sense2` line per word; `False`
        /// expects no resolution.
        #[arg(long)]
        gold: PathBuf,

        /// Resolution method.
        #[arg(long, value_enum, default_value = "multi-sieve")]
        method: MethodArg,

        /// Acceptance threshold.
        #[arg(long, default_value = "0.4")]
        alpha: f64,
    },

    /// Rebuild answers and forest from a saved resolution state.
    Restore {
        /// Saved state JSON, as written by `resolve --save`.
        #[arg(long)]
        state: PathBuf,

        /// Rebuild the forest in multi-parent mode.
        #[arg(long)]
        multi_parent: bool,
    },
}

fn default_sieves() -> Vec<Sieve> {
    vec![
        Sieve::independent(LemmaSieve),
        Sieve::independent(DefinitionSieve),
        Sieve::dependent_repeat(PathSieve),
        Sieve::dependent(ClusterMaxSieve),
    ]
}

fn print_hierarchy(resolver: &mut SenseResolver) {
    let forest = resolver.build_forest();
    propagate(resolver.arena_mut(), &forest);
    resolver
        .arena_mut()
        .breadth_first_number_forest(&forest.roots, 0);
    println!("{}", render_bfs(resolver.arena(), &forest));
}

/// Parse `word:sense1,sense2` gold lines; `False` (or nothing after the
/// colon) expects no resolution.
fn parse_gold(text: &str) -> Vec<(String, BTreeSet<String>)> {
    let mut gold = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (label, senses) = line.split_once(':').unwrap_or((line, ""));
        let word = strip_trailing_digits(&to_ontology_format(label)).to_string();
        let expected: BTreeSet<String> = senses
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "False")
            .map(str::to_string)
            .collect();
        gold.push((word, expected));
    }
    gold
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let ontology = StaticOntology::from_path(&cli.ontology)?;

    match cli.command {
        Commands::Resolve {
            words,
            method,
            alpha,
            multi_parent,
            interactive,
            no_prune,
            restrict,
            save,
        } => {
            let words = parse_word_file(&words, Some(&ontology))?;
            let config = ResolverConfig::new(method.into(), Alpha::Threshold(alpha))
                .multi_parent(multi_parent)
                .hand_cluster(interactive)
                .no_prune(no_prune);
            let mut resolver = SenseResolver::new(words, config);

            let chooser = ConsoleChooser::new();
            let chooser: Option<&dyn SenseChooser> =
                if interactive { Some(&chooser) } else { None };
            let sieves = default_sieves();
            match restrict {
                Some(ancestor) => {
                    let generator =
                        FilteredGenerator::new(ontology.clone(), descends_from(&ancestor));
                    resolver.resolve(&generator, &sieves, chooser)?;
                }
                None => {
                    resolver.resolve(&ontology, &sieves, chooser)?;
                }
            }

            print!("{}", resolver.render_answers());
            println!();
            print_hierarchy(&mut resolver);

            if let Some(path) = save {
                let state = resolver.export_state();
                let json = serde_json::to_string_pretty(&state).into_diagnostic()?;
                std::fs::write(path, json).into_diagnostic()?;
            }
        }

        Commands::Eval {
            words,
            gold,
            method,
            alpha,
        } => {
            let mut words = parse_word_file(&words, Some(&ontology))?;
            let gold_text = std::fs::read_to_string(&gold).into_diagnostic()?;
            for (word, expected) in parse_gold(&gold_text) {
                if let Some(entry) = words.iter_mut().find(|w| w.word == word) {
                    entry.gold = Some(expected);
                }
            }

            let config = ResolverConfig::new(method.into(), Alpha::Threshold(alpha));
            let mut resolver = SenseResolver::new(words, config);
            resolver.resolve(&ontology, &default_sieves(), None)?;

            let report = resolver.evaluate();
            println!("scored:     {}", report.total);
            println!(
                "correct:    {} ({:.1}%)",
                report.correct,
                report.correct_rate() * 100.0
            );
            println!(
                "missed:     {} ({:.1}%)",
                report.missed,
                report.missed_rate() * 100.0
            );
            println!(
                "false hits: {} ({:.1}%)",
                report.false_hits,
                report.false_hit_rate() * 100.0
            );
            println!("incorrect:  {}", report.incorrect);
            for m in &report.mismatches {
                println!(
                    "  {}: got [{}], expected [{}]",
                    m.word,
                    m.got.join(","),
                    m.expected.iter().cloned().collect::<Vec<_>>().join(",")
                );
            }
        }

        Commands::Restore { state, multi_parent } => {
            let json = std::fs::read_to_string(&state).into_diagnostic()?;
            let saved: SavedResolution = serde_json::from_str(&json).into_diagnostic()?;

            let config = ResolverConfig::new(Method::Default, Alpha::Threshold(0.0))
                .multi_parent(multi_parent);
            let mut resolver = SenseResolver::new(Vec::new(), config);
            resolver.import_state(&saved, &ontology)?;

            print!("{}", resolver.render_answers());
            println!();
            print_hierarchy(&mut resolver);
        }
    }

    Ok(())
}
