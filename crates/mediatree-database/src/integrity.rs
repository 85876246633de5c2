//! Structural integrity checks over committed rows.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use mediatree_core::error::AppError;
use mediatree_core::result::AppResult;
use mediatree_core::types::{NodeId, TreeId};
use mediatree_entity::Node;

use crate::table::TableState;

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Tree the violation was found in.
    pub tree_id: TreeId,
    /// Offending node, when the violation is about a single row.
    pub node_id: Option<NodeId>,
    /// What is wrong.
    pub message: String,
}

/// Result of checking one tree or the whole forest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Trees inspected.
    pub trees_checked: usize,
    /// Rows inspected.
    pub nodes_checked: usize,
    /// Every violation found.
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    /// Whether no violation was found.
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// `TreeCorruption` listing the first violations, or the report.
    pub fn into_result(self) -> AppResult<Self> {
        if self.is_ok() {
            return Ok(self);
        }
        let summary: Vec<String> = self
            .violations
            .iter()
            .take(5)
            .map(|v| match v.node_id {
                Some(id) => format!("tree {} node {id}: {}", v.tree_id, v.message),
                None => format!("tree {}: {}", v.tree_id, v.message),
            })
            .collect();
        Err(AppError::tree_corruption(format!(
            "{} violation(s): {}",
            self.violations.len(),
            summary.join("; ")
        )))
    }
}

/// Check every tree, or only `scope`.
pub(crate) fn check(state: &TableState, scope: Option<TreeId>) -> IntegrityReport {
    let trees: BTreeSet<TreeId> = match scope {
        Some(tree) => [tree].into_iter().collect(),
        None => state.tree_ids(),
    };
    let mut report = IntegrityReport::default();
    for tree in &trees {
        let ordered: Vec<&Node> = state.tree_rows(*tree).collect();
        report.nodes_checked += ordered.len();
        check_tree(*tree, &ordered, |id| state.get(id), &mut report.violations);
    }
    report.trees_checked = trees.len();

    if scope.is_none() {
        let mut seen: HashMap<&str, NodeId> = HashMap::new();
        for root in state.roots() {
            if let Some(first) = seen.insert(root.name.as_str(), root.id) {
                report.violations.push(Violation {
                    tree_id: root.tree_id,
                    node_id: Some(root.id),
                    message: format!("top-level name '{}' also used by node {first}", root.name),
                });
            }
        }
    }
    report
}

/// Check one tree given its rows ordered by left bound.
pub(crate) fn check_tree<'a>(
    tree: TreeId,
    ordered: &[&'a Node],
    lookup: impl Fn(NodeId) -> Option<&'a Node>,
    out: &mut Vec<Violation>,
) {
    let mut violation = |node: Option<&Node>, message: String| {
        out.push(Violation {
            tree_id: tree,
            node_id: node.map(|n| n.id),
            message,
        });
    };
    let Some(&first) = ordered.first() else {
        return;
    };

    let total = ordered.len() as u64;
    let mut bounds: Vec<u64> = ordered.iter().flat_map(|n| [n.left, n.right]).collect();
    bounds.sort_unstable();
    if bounds.iter().copied().ne(1..=2 * total) {
        violation(None, format!("bounds are not exactly 1..={}", 2 * total));
    }

    if first.parent_id.is_some() || first.depth != 0 || first.left != 1 || first.right != 2 * total {
        violation(
            Some(first),
            format!(
                "tree root must be top-level at depth 0 spanning 1..{} (found {}..{} depth {})",
                2 * total,
                first.left,
                first.right,
                first.depth
            ),
        );
    }

    let mut names: HashMap<(Option<NodeId>, &str), NodeId> = HashMap::new();
    let mut open: Vec<&Node> = Vec::new();
    for &node in ordered {
        if node.left >= node.right {
            violation(Some(node), format!("left {} is not below right {}", node.left, node.right));
        }
        while open.last().is_some_and(|top| top.right < node.left) {
            open.pop();
        }
        match open.last() {
            Some(top) => {
                if node.right > top.right {
                    violation(Some(node), format!("bounds overlap node {}", top.id));
                }
                if node.parent_id != Some(top.id) {
                    violation(
                        Some(node),
                        format!("parent pointer disagrees with bounds (enclosing node {})", top.id),
                    );
                }
                if !top.is_folder() {
                    violation(Some(node), format!("enclosing node {} is a file", top.id));
                }
            }
            None if node.id != first.id => {
                violation(Some(node), "lies outside the tree root".to_string());
            }
            None => {}
        }
        if node.depth as usize != open.len() {
            violation(
                Some(node),
                format!("depth {} but {} enclosing node(s)", node.depth, open.len()),
            );
        }
        if let Some(parent_id) = node.parent_id {
            match lookup(parent_id) {
                None => violation(Some(node), format!("parent {parent_id} does not exist")),
                Some(parent) if parent.tree_id != tree => violation(
                    Some(node),
                    format!("parent {parent_id} belongs to tree {}", parent.tree_id),
                ),
                Some(_) => {}
            }
        }
        if node.parent_id.is_some() {
            if let Some(other) = names.insert((node.parent_id, node.name.as_str()), node.id) {
                violation(Some(node), format!("name '{}' also used by sibling {other}", node.name));
            }
        }
        open.push(node);
    }
}
