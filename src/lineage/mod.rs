// lineage/mod.rs - merge ancestor and descendant edge lists into one rooted tree
//
// The storage layer hands back two flat edge lists from depth-capped recursive walks.
// Everything here is pure so the merge rules can be tested without a database.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One `ancestor -> descendant` link, `depth` edges away from the focus concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub ancestor: String,
    pub descendant: String,
    pub depth: i64,
}

/// Parent/child structure keyed by concept identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageTree {
    root: String,
    children: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

/// A rendered node, carrying whatever view the caller resolved for its identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageNode<T> {
    pub data: T,
    pub children: Vec<LineageNode<T>>,
}

impl LineageTree {
    fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut children = HashMap::new();
        children.insert(root.clone(), Vec::new());
        Self { order: vec![root.clone()], root, children }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.children.contains_key(identifier)
    }

    pub fn children(&self, identifier: &str) -> &[String] {
        self.children.get(identifier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identifiers in the order they were attached; parents always precede children
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Consumes the edge unless its parent is still missing.
    ///
    /// A descendant that is already placed keeps its first parent.
    fn try_attach(&mut self, edge: &LineageEdge) -> bool {
        if self.contains(&edge.descendant) {
            return true;
        }
        let Some(siblings) = self.children.get_mut(&edge.ancestor) else {
            return false;
        };
        siblings.push(edge.descendant.clone());
        self.children.insert(edge.descendant.clone(), Vec::new());
        self.order.push(edge.descendant.clone());
        true
    }

    /// Attach edges until a full pass makes no progress. Edges whose parent never
    /// appears (branches that do not descend from the root) are dropped.
    fn attach_all(&mut self, edges: Vec<&LineageEdge>) {
        let mut pending = edges;
        loop {
            let before = pending.len();
            pending.retain(|edge| !self.try_attach(edge));
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
    }

    /// Ancestors named by `edges` that did not make it into the tree, sorted and deduplicated
    pub fn unplaced_ancestors<'e>(&self, edges: &'e [LineageEdge]) -> Vec<&'e str> {
        let mut missing: Vec<&str> = edges
            .iter()
            .map(|edge| edge.ancestor.as_str())
            .filter(|ancestor| !self.contains(ancestor))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    pub fn render<T, F>(&self, view: &F) -> LineageNode<T>
    where
        F: Fn(&str) -> T,
    {
        self.render_from(&self.root, view)
    }

    fn render_from<T, F>(&self, identifier: &str, view: &F) -> LineageNode<T>
    where
        F: Fn(&str) -> T,
    {
        LineageNode {
            data: view(identifier),
            children: self
                .children(identifier)
                .iter()
                .map(|child| self.render_from(child, view))
                .collect(),
        }
    }
}

/// Build the lineage tree for `focus`.
///
/// The root is the farthest ancestor reached (ties go to the smallest identifier).
/// Ancestor edges are attached from the root downwards, then descendant edges are
/// attached outwards from the focus in depth order. A focus without edges yields a
/// single-node tree.
pub fn assemble(focus: &str, ancestors: &[LineageEdge], descendants: &[LineageEdge]) -> LineageTree {
    let root = ancestors
        .iter()
        .max_by(|a, b| a.depth.cmp(&b.depth).then_with(|| b.ancestor.cmp(&a.ancestor)))
        .map(|edge| edge.ancestor.clone())
        .unwrap_or_else(|| focus.to_string());

    let mut upward: Vec<&LineageEdge> = ancestors.iter().collect();
    upward.sort_by(|a, b| {
        b.depth
            .cmp(&a.depth)
            .then_with(|| a.ancestor.cmp(&b.ancestor))
            .then_with(|| a.descendant.cmp(&b.descendant))
    });

    let mut tree = LineageTree::new(root);
    tree.attach_all(upward);

    let dropped = tree.unplaced_ancestors(ancestors);
    if !dropped.is_empty() {
        tracing::debug!("Lineage of {} rooted at {} omits ancestors {:?}", focus, tree.root(), dropped);
    }

    if !tree.contains(focus) {
        tracing::warn!("Focus {} unreachable from root {}, rooting at focus", focus, tree.root());
        tree = LineageTree::new(focus);
    }

    let mut downward: Vec<&LineageEdge> = descendants.iter().collect();
    downward.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then_with(|| a.ancestor.cmp(&b.ancestor))
            .then_with(|| a.descendant.cmp(&b.descendant))
    });
    tree.attach_all(downward);

    tree
}
