//! Forest construction and merging.
//!
//! Takes a finished resolution and stitches the accepted senses into a
//! hierarchy mirroring the ontology's ancestor structure: each word becomes a
//! leaf under its accepted sense node, every sense's ancestor chain is
//! materialized up to its root, and ancestor nodes reached independently from
//! several words are merged by canonical sense name. Words without an
//! accepted sense still appear, as isolated leaves.

use std::collections::BTreeMap;

use tracing::debug;

use crate::input::to_space_format;
use crate::node::{NodeArena, NodeId};
use crate::resolver::{Resolution, SenseResolver};

/// The surviving roots of one built hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    pub roots: Vec<NodeId>,
}

impl Forest {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl SenseResolver {
    /// Build the forest for this resolver's current answers.
    pub fn build_forest(&mut self) -> Forest {
        let entries: Vec<(String, Resolution)> = self
            .words()
            .iter()
            .zip(self.answers())
            .map(|(w, a)| (w.word.clone(), a.clone()))
            .collect();
        let multi_parent = self.config().multi_parent;
        build_forest(self.arena_mut(), &entries, multi_parent)
    }
}

/// Stitch resolved `(word, answer)` pairs into a forest.
pub fn build_forest(
    arena: &mut NodeArena,
    entries: &[(String, Resolution)],
    multi_parent: bool,
) -> Forest {
    // Registry of accepted sense nodes, first node per canonical name wins.
    // `tracked` keeps every node the merge pass must visit, in creation order.
    let mut registry: BTreeMap<String, NodeId> = BTreeMap::new();
    let mut tracked: Vec<NodeId> = Vec::new();
    for (_, answer) in entries {
        for id in answer.accepted() {
            let key = arena.key(id);
            if !registry.contains_key(&key) {
                registry.insert(key, id);
                tracked.push(id);
            }
        }
    }

    for (word, answer) in entries {
        let accepted = answer.accepted();
        if accepted.is_empty() {
            continue;
        }
        // One leaf per word, shared across all its accepted senses.
        let leaf = arena.alloc_label(word.clone());
        for id in accepted {
            let hyp = registry[&arena.key(id)];
            arena.attach_child(hyp, leaf, true, multi_parent);
            if !arena.parent(hyp).is_none() {
                // Chain already materialized through an earlier word.
                continue;
            }
            let sense = match arena.node(hyp).payload.sense() {
                Some(s) => s.clone(),
                None => continue,
            };
            // Walk the ancestor chain nearest-first, materializing a fresh
            // node per ancestor; cross-word duplicates are fixed below.
            let mut prev = hyp;
            for ancestor in sense.ancestors().into_iter().rev() {
                let node = arena.alloc_sense(ancestor);
                arena.attach_child(node, prev, true, multi_parent);
                tracked.push(node);
                prev = node;
            }
        }
    }

    // Merge pass: the first node seen for a canonical name is canonical;
    // later ones hand their children over and are detached.
    let mut roots = Vec::new();
    let mut seen: BTreeMap<String, NodeId> = BTreeMap::new();
    for id in tracked {
        let key = arena.key(id);
        let mut swapped = false;
        match seen.get(&key).copied() {
            None => {
                seen.insert(key, id);
            }
            Some(canonical) => {
                swapped = true;
                debug!(duplicate = %id, canonical = %canonical, sense = %arena.key(id), "merging");
                for child in arena.children(id).to_vec() {
                    arena.attach_child(canonical, child, true, multi_parent);
                    arena.remove_parent(child, id);
                }
                for parent in arena.parent_ids(id) {
                    arena.remove_child(parent, id);
                }
            }
        }
        if !swapped && arena.parent(id).is_none() {
            roots.push(id);
        }
    }

    // Every input word appears in the output, resolved or not.
    for (word, answer) in entries {
        if !answer.is_accepted() {
            roots.push(arena.alloc_label(word.clone()));
        }
    }

    Forest { roots }
}

/// Render the forest breadth-first, one `payload: parent1,parent2` line per
/// node. Word leaves print in space format; sense nodes print their
/// canonical name.
pub fn render_bfs(arena: &NodeArena, forest: &Forest) -> String {
    let mut out = String::new();
    for &root in &forest.roots {
        for id in arena.breadth_first_order(root) {
            let node = arena.node(id);
            let label = match node.payload.sense() {
                Some(_) => node.payload.key(),
                None => to_space_format(&node.payload.key()),
            };
            let parents: Vec<String> = arena
                .parent_ids(id)
                .iter()
                .map(|&p| arena.key(p))
                .collect();
            if parents.is_empty() {
                out.push_str(&label);
            } else {
                out.push_str(&format!("{label}: {}", parents.join(",")));
            }
            out.push('\n');
        }
    }
    out
}
