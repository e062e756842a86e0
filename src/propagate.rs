//! Property propagation over a built forest.
//!
//! Moves each descriptive property to the most general node that still holds
//! it: a bottom-up pass intersects children's property sets into their
//! parents, then an upward sweep from the sinks deletes properties from
//! children once a parent carries them. Runs in place; only relocates
//! properties, never invents them.

use std::collections::{BTreeSet, VecDeque};

use crate::forest::Forest;
use crate::node::{NodeArena, NodeId};

/// Propagate properties across every tree of the forest.
pub fn propagate(arena: &mut NodeArena, forest: &Forest) {
    for &root in &forest.roots {
        propagate_root(arena, root);
    }
}

fn propagate_root(arena: &mut NodeArena, root: NodeId) {
    // Visit leaves before ancestors by walking the breadth-first order in
    // reverse. Each parent combines exactly once, even when reached from
    // several children.
    let order = arena.breadth_first_order(root);
    let mut combined: BTreeSet<NodeId> = BTreeSet::new();
    for &id in order.iter().rev() {
        for parent in arena.parent_ids(id) {
            if combined.insert(parent) {
                arena.combine_properties(parent);
            }
        }
    }

    // Upward sweep from the sinks, expanding into every parent. Nodes may be
    // revisited along different paths; the removal is idempotent.
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    let mut enqueued: BTreeSet<NodeId> = BTreeSet::new();
    for sink in arena.sinks(root) {
        if enqueued.insert(sink) {
            queue.push_back(sink);
        }
    }
    while let Some(id) = queue.pop_front() {
        arena.remove_properties_from_children(id);
        queue.extend(arena.parent_ids(id));
    }
}
