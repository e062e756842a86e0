//! Hierarchy nodes and the arena that owns them.
//!
//! Every node in a resolution/forest run lives in one [`NodeArena`] and is
//! addressed by a [`NodeId`]. Parent/child links are ids, so "merging" two
//! nodes that denote the same sense is index re-pointing, never aliasing.
//! A node wraps either an opaque ontology sense or a plain word label
//! ([`Payload`]); the payload's canonical string is the merge key.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::sense::SenseRef;

/// Index of a node in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// What a hierarchy node wraps: an ontology sense or a plain label.
#[derive(Debug, Clone)]
pub enum Payload {
    /// An opaque sense handle from the external ontology.
    Sense(SenseRef),
    /// A plain string label (word leaves, materialized placeholders).
    Label(String),
}

impl Payload {
    /// Canonical merge key: two nodes denote the same sense iff their keys match.
    pub fn key(&self) -> String {
        match self {
            Payload::Sense(s) => s.canonical_name(),
            Payload::Label(l) => l.clone(),
        }
    }

    /// Short human label: the first dot-segment of the key (`"run"` for `"run.v.01"`).
    pub fn label(&self) -> String {
        let key = self.key();
        key.split('.').next().unwrap_or(&key).to_string()
    }

    /// The wrapped sense handle, if any.
    pub fn sense(&self) -> Option<&SenseRef> {
        match self {
            Payload::Sense(s) => Some(s),
            Payload::Label(_) => None,
        }
    }
}

/// Parent link of a node.
///
/// Promotion from `Single` to `Multiple` happens only through
/// [`NodeArena::attach_to_parent`] in multi-parent mode; the list never
/// shrinks implicitly. An explicit [`NodeArena::remove_parent`] may leave an
/// empty `Multiple`, which is deliberately distinct from `None` for root
/// detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Parent {
    #[default]
    None,
    Single(NodeId),
    Multiple(Vec<NodeId>),
}

impl Parent {
    pub fn is_none(&self) -> bool {
        matches!(self, Parent::None)
    }

    /// All parent ids, in order.
    pub fn ids(&self) -> Vec<NodeId> {
        match self {
            Parent::None => vec![],
            Parent::Single(p) => vec![*p],
            Parent::Multiple(ps) => ps.clone(),
        }
    }
}

/// A node in the sense hierarchy.
///
/// Created when candidate senses are generated or when the forest builder
/// materializes ancestors; destroyed only by becoming unreachable after a
/// merge re-homes its children.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub payload: Payload,
    pub parent: Parent,
    /// Insertion-ordered; order is irrelevant for correctness but kept for
    /// determinism.
    pub children: Vec<NodeId>,
    /// Append-only unless explicitly replaced.
    pub scores: Vec<f64>,
    pub properties: BTreeSet<String>,
    /// Traversal numbers; unset until a numbering pass visits the node, then
    /// set-once.
    pub pre_number: Option<u64>,
    pub post_number: Option<u64>,
}

impl HierarchyNode {
    fn new(payload: Payload) -> Self {
        Self {
            payload,
            parent: Parent::None,
            children: Vec::new(),
            scores: Vec::new(),
            properties: BTreeSet::new(),
            pre_number: None,
            post_number: None,
        }
    }
}

/// Arena owning every [`HierarchyNode`] of one resolution/forest run.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<HierarchyNode>,
    /// Diagnostic counter: how often a primary score was requested from an
    /// empty score list (the masked upstream-scoring condition).
    empty_score_fallbacks: AtomicU64,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node wrapping `payload`.
    pub fn alloc(&mut self, payload: Payload) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(HierarchyNode::new(payload));
        id
    }

    /// Allocate a node wrapping an ontology sense.
    pub fn alloc_sense(&mut self, sense: SenseRef) -> NodeId {
        self.alloc(Payload::Sense(sense))
    }

    /// Allocate a node wrapping a plain label.
    pub fn alloc_label(&mut self, label: impl Into<String>) -> NodeId {
        self.alloc(Payload::Label(label.into()))
    }

    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut HierarchyNode {
        &mut self.nodes[id.index()]
    }

    /// Canonical merge key of a node's payload.
    pub fn key(&self, id: NodeId) -> String {
        self.node(id).payload.key()
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// Append `child` to `parent`'s child list; with `reciprocal`, also set
    /// the child's parent link (promoting to a parent list in multi mode).
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId, reciprocal: bool, multi: bool) {
        self.node_mut(parent).children.push(child);
        if reciprocal {
            self.attach_to_parent(child, parent, multi);
        }
    }

    /// Set or extend `child`'s parent link.
    ///
    /// Outside multi-parent mode, or when the child has no parent yet, the
    /// link is replaced outright (discarding any previous value). In
    /// multi-parent mode with an existing parent, the link is promoted to a
    /// list (or appended to one).
    pub fn attach_to_parent(&mut self, child: NodeId, parent: NodeId, multi: bool) {
        let node = self.node_mut(child);
        if !multi || node.parent.is_none() {
            node.parent = Parent::Single(parent);
            return;
        }
        match &mut node.parent {
            Parent::Single(existing) => {
                node.parent = Parent::Multiple(vec![*existing, parent]);
            }
            Parent::Multiple(list) => list.push(parent),
            Parent::None => unreachable!("handled above"),
        }
    }

    /// Remove `child` from `parent`'s child list, if present.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.retain(|&c| c != child);
    }

    /// Remove `parent` from `child`'s parent link, if present.
    ///
    /// A single link becomes `None`; a parent list is filtered and may end up
    /// empty without collapsing back to `None`.
    pub fn remove_parent(&mut self, child: NodeId, parent: NodeId) {
        let node = self.node_mut(child);
        match &mut node.parent {
            Parent::None => {}
            Parent::Single(p) => {
                if *p == parent {
                    node.parent = Parent::None;
                }
            }
            Parent::Multiple(list) => list.retain(|&p| p != parent),
        }
    }

    pub fn parent(&self, id: NodeId) -> &Parent {
        &self.node(id).parent
    }

    /// All parent ids of a node, in order.
    pub fn parent_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).parent.ids()
    }

    /// Parent at `pos`: a single link ignores the position, a list indexes
    /// into it.
    pub fn parent_at(&self, id: NodeId, pos: usize) -> Option<NodeId> {
        match &self.node(id).parent {
            Parent::None => None,
            Parent::Single(p) => Some(*p),
            Parent::Multiple(list) => list.get(pos).copied(),
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    // -----------------------------------------------------------------------
    // Scores
    // -----------------------------------------------------------------------

    /// Append a score, or with `replace` reset the whole list to this single
    /// value (an empty list is appended to either way).
    ///
    /// Replacing discards comparison history; callers relying on earlier
    /// sieve scores must read them first.
    pub fn set_score(&mut self, id: NodeId, score: f64, replace: bool) {
        let scores = &mut self.node_mut(id).scores;
        if !replace || scores.is_empty() {
            scores.push(score);
        } else {
            *scores = vec![score];
        }
    }

    /// Replace the whole score list.
    pub fn set_scores(&mut self, id: NodeId, scores: Vec<f64>) {
        self.node_mut(id).scores = scores;
    }

    pub fn scores(&self, id: NodeId) -> &[f64] {
        &self.node(id).scores
    }

    pub fn score_at(&self, id: NodeId, pos: usize) -> Option<f64> {
        self.node(id).scores.get(pos).copied()
    }

    /// The primary (index 0) score.
    ///
    /// An empty score list yields 0.0 — acceptance policies compare
    /// "no evidence" candidates through this exact fallback. Each firing is
    /// counted in [`NodeArena::empty_score_fallbacks`].
    pub fn primary_score(&self, id: NodeId) -> f64 {
        match self.node(id).scores.first() {
            Some(&s) => s,
            None => {
                self.empty_score_fallbacks.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(node = %id, "primary score requested from empty score list");
                0.0
            }
        }
    }

    /// How often [`NodeArena::primary_score`] fell back to 0.0 on an empty list.
    pub fn empty_score_fallbacks(&self) -> u64 {
        self.empty_score_fallbacks.load(Ordering::Relaxed)
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    pub fn properties(&self, id: NodeId) -> &BTreeSet<String> {
        &self.node(id).properties
    }

    pub fn set_properties(&mut self, id: NodeId, properties: BTreeSet<String>) {
        self.node_mut(id).properties = properties;
    }

    pub fn add_property(&mut self, id: NodeId, property: impl Into<String>) {
        self.node_mut(id).properties.insert(property.into());
    }

    /// Pull shared child properties onto this node.
    ///
    /// With no own properties, the node takes the intersection of all its
    /// children's property sets. With own properties, shared ones are
    /// absorbed: the result is the union of the own set with (own ∩
    /// children-intersection), so properties unique to this node are never
    /// discarded.
    pub fn combine_properties(&mut self, id: NodeId) {
        let children = self.node(id).children.clone();
        if children.is_empty() {
            return;
        }

        let mut shared = self.node(children[0]).properties.clone();
        for &child in &children[1..] {
            shared = shared
                .intersection(&self.node(child).properties)
                .cloned()
                .collect();
        }

        let own = self.node(id).properties.clone();
        if own.is_empty() {
            self.node_mut(id).properties = shared;
        } else {
            let absorbed: BTreeSet<String> = own.intersection(&shared).cloned().collect();
            if !absorbed.is_empty() {
                self.node_mut(id).properties = own.union(&absorbed).cloned().collect();
            }
        }
    }

    /// Delete from each child any property this node also holds (the property
    /// is now represented at the higher level). Idempotent on stable input.
    pub fn remove_properties_from_children(&mut self, id: NodeId) {
        let own = self.node(id).properties.clone();
        if own.is_empty() {
            return;
        }
        for child in self.node(id).children.clone() {
            self.node_mut(child)
                .properties
                .retain(|p| !own.contains(p));
        }
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// All sinks (nodes without children) reachable below `id`, including
    /// `id` itself when it is a leaf. A DAG may yield duplicates; callers
    /// deduplicate when it matters.
    pub fn sinks(&self, id: NodeId) -> Vec<NodeId> {
        if self.node(id).children.is_empty() {
            return vec![id];
        }
        let mut leaves = Vec::new();
        for &child in &self.node(id).children {
            leaves.extend(self.sinks(child));
        }
        leaves
    }

    /// Breadth-first visiting order from `root`, each node once.
    pub fn breadth_first_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        let mut queue = std::collections::VecDeque::new();
        seen.insert(root);
        queue.push_back(root);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &child in &self.node(node).children {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        order
    }

    /// Depth-first numbering from `root`, assigning pre- and post-numbers.
    ///
    /// Already-numbered nodes are skipped, so repeated passes are idempotent.
    /// Returns the next unused number.
    pub fn depth_first_number(&mut self, root: NodeId, start: u64) -> u64 {
        let mut num = start;
        if self.node(root).pre_number.is_none() {
            self.node_mut(root).pre_number = Some(num);
            num += 1;
            for child in self.node(root).children.clone() {
                num = self.depth_first_number(child, num);
            }
            if self.node(root).post_number.is_none() {
                self.node_mut(root).post_number = Some(num);
                num += 1;
            }
        }
        num
    }

    /// Breadth-first numbering over a single tree, assigning pre-numbers only.
    ///
    /// An already-numbered root resumes counting from its own number; numbered
    /// nodes are never renumbered. Returns the next unused number.
    pub fn breadth_first_number(&mut self, root: NodeId, start: u64) -> u64 {
        let mut counter = match self.node(root).pre_number {
            None => {
                self.node_mut(root).pre_number = Some(start);
                start + 1
            }
            Some(n) => n,
        };

        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        let mut queue = std::collections::VecDeque::new();
        seen.insert(root);
        queue.push_back(root);
        while let Some(node) = queue.pop_front() {
            for &child in &self.node(node).children {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
            if self.node(node).pre_number.is_none() {
                self.node_mut(node).pre_number = Some(counter);
                counter += 1;
            }
        }
        counter
    }

    /// Breadth-first numbering over a whole forest, sharing one counter.
    ///
    /// Returns the next unused number; an empty forest returns `start`.
    pub fn breadth_first_number_forest(&mut self, roots: &[NodeId], start: u64) -> u64 {
        let mut counter = start;
        for &root in roots {
            counter = self.breadth_first_number(root, counter);
        }
        counter
    }
}
