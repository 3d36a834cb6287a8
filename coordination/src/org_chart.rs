//! Observability tree mirroring task decomposition.
//!
//! Modeled as a map keyed by task identity with parent-by-identity rather
//! than by reference, per the flat-graph design note: adding a child
//! mutates both the new node and the parent's child list.

use std::collections::HashMap;

use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Composite,
    Leaf,
}

#[derive(Debug, Clone)]
pub struct OrgChartNode {
    pub id: TaskId,
    pub parent: Option<TaskId>,
    pub children: Vec<TaskId>,
    pub kind: NodeKind,
    pub description: String,
    pub depth: u32,
    pub has_steward: bool,
}

#[derive(Debug, Default)]
pub struct OrgChart {
    nodes: HashMap<TaskId, OrgChartNode>,
    root: Option<TaskId>,
}

impl OrgChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_root(&mut self, id: TaskId, description: String) {
        self.root = Some(id.clone());
        self.nodes.insert(
            id.clone(),
            OrgChartNode {
                id,
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Leaf,
                description,
                depth: 0,
                has_steward: false,
            },
        );
    }

    pub fn insert_child(
        &mut self,
        parent_id: &str,
        child_id: TaskId,
        description: String,
        depth: u32,
    ) {
        self.nodes.insert(
            child_id.clone(),
            OrgChartNode {
                id: child_id.clone(),
                parent: Some(parent_id.to_string()),
                children: Vec::new(),
                kind: NodeKind::Leaf,
                description,
                depth,
                has_steward: false,
            },
        );
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.push(child_id);
        }
    }

    /// Label a node as composite (it decomposed into children) and mark
    /// whether a steward supervises its QA cycle.
    pub fn mark_composite(&mut self, id: &str, has_steward: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.kind = NodeKind::Composite;
            node.has_steward = has_steward;
        }
    }

    pub fn get(&self, id: &str) -> Option<&OrgChartNode> {
        self.nodes.get(id)
    }

    pub fn root_id(&self) -> Option<&TaskId> {
        self.root.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_insertion_updates_both_nodes() {
        let mut chart = OrgChart::new();
        chart.insert_root("root".into(), "root task".into());
        chart.insert_child("root", "child-1".into(), "first child".into(), 1);

        let root = chart.get("root").unwrap();
        assert_eq!(root.children, vec!["child-1".to_string()]);
        let child = chart.get("child-1").unwrap();
        assert_eq!(child.parent.as_deref(), Some("root"));
        assert_eq!(child.depth, 1);
    }

    #[test]
    fn mark_composite_sets_steward_flag() {
        let mut chart = OrgChart::new();
        chart.insert_root("root".into(), "root".into());
        chart.mark_composite("root", true);
        let root = chart.get("root").unwrap();
        assert_eq!(root.kind, NodeKind::Composite);
        assert!(root.has_steward);
    }
}
