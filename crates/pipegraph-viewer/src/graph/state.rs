use pipegraph_core::{MindMapData, NodeId, NodeKind};
use std::collections::HashMap;

use crate::graph::expansion::ExpansionState;
use crate::graph::model::{GraphEdge, GraphModel};
use crate::graph::tree::{LayoutDirection, LayoutEngine, Point, TreeLayout};

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleNode {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub position: Point,
    pub expanded: bool,
    pub has_children: bool,
}

pub struct GraphState {
    model: GraphModel,
    expansion: ExpansionState,
    visible_nodes: Vec<NodeId>,
    visible_depth: HashMap<NodeId, usize>,
    visible_edges: Vec<GraphEdge>,
    positions: HashMap<NodeId, Point>,
    direction: LayoutDirection,
    max_visible_nodes: usize,
    layout: Box<dyn LayoutEngine>,
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new(LayoutDirection::default(), 1200)
    }
}

impl GraphState {
    pub fn new(direction: LayoutDirection, max_visible_nodes: usize) -> Self {
        Self::with_layout(direction, max_visible_nodes, Box::new(TreeLayout::default()))
    }

    pub fn with_layout(
        direction: LayoutDirection,
        max_visible_nodes: usize,
        layout: Box<dyn LayoutEngine>,
    ) -> Self {
        Self {
            model: GraphModel::default(),
            expansion: ExpansionState::default(),
            visible_nodes: Vec::new(),
            visible_depth: HashMap::new(),
            visible_edges: Vec::new(),
            positions: HashMap::new(),
            direction,
            max_visible_nodes: max_visible_nodes.max(1),
            layout,
        }
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }

    pub fn replace(&mut self, data: MindMapData) {
        self.model = GraphModel::from_mind_map(data);
        self.expansion.clear();
        tracing::info!(
            nodes = self.model.len(),
            edges = self.model.edges().len(),
            "mind map installed"
        );
        self.refresh();
    }

    pub fn clear(&mut self) {
        self.replace(MindMapData::default());
    }

    pub fn set_direction(&mut self, direction: LayoutDirection) {
        if self.direction != direction {
            self.direction = direction;
            self.run_layout();
        }
    }

    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expansion.is_expanded(id, self.depth_of(id))
    }

    pub fn can_expand(&self, id: &NodeId) -> bool {
        self.model.has_children(id)
    }

    pub fn toggle(&mut self, id: &NodeId) -> bool {
        if !self.can_expand(id) {
            return false;
        }
        let next = !self.is_expanded(id);
        tracing::debug!(id = %id.0, expanded = next, "toggle");
        self.expansion.set(id.clone(), next);
        self.refresh();
        true
    }

    pub fn set_expanded(&mut self, id: &NodeId, expanded: bool) -> bool {
        if !self.can_expand(id) || self.is_expanded(id) == expanded {
            return false;
        }
        self.expansion.set(id.clone(), expanded);
        self.refresh();
        true
    }

    pub fn expand_all(&mut self) {
        self.set_all(true);
    }

    pub fn collapse_all(&mut self) {
        self.set_all(false);
    }

    fn set_all(&mut self, expanded: bool) {
        let ids: Vec<NodeId> = self
            .model
            .nodes()
            .filter(|n| !n.child_ids.is_empty())
            .map(|n| n.id.clone())
            .collect();
        for id in ids {
            self.expansion.set(id, expanded);
        }
        self.refresh();
    }

    pub fn reveal(&mut self, id: &NodeId) -> bool {
        if self.model.node(id).is_none() {
            return false;
        }
        for ancestor in self.model.ancestors(id) {
            self.expansion.set(ancestor, true);
        }
        self.refresh();
        self.is_visible(id)
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<NodeId> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<NodeId> = self
            .model
            .nodes()
            .filter(|n| n.id.0.to_lowercase().contains(&q) || n.label.to_lowercase().contains(&q))
            .map(|n| n.id.clone())
            .collect();
        hits.sort();
        hits.truncate(limit);
        hits
    }

    pub fn visible_nodes(&self) -> &[NodeId] {
        &self.visible_nodes
    }

    pub fn visible_edges(&self) -> &[GraphEdge] {
        &self.visible_edges
    }

    pub fn is_visible(&self, id: &NodeId) -> bool {
        self.visible_depth.contains_key(id)
    }

    pub fn position(&self, id: &NodeId) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn positions(&self) -> &HashMap<NodeId, Point> {
        &self.positions
    }

    pub fn view(&self) -> Vec<VisibleNode> {
        self.visible_nodes
            .iter()
            .filter_map(|id| {
                let node = self.model.node(id)?;
                let depth = self.visible_depth.get(id).copied().unwrap_or(0);
                Some(VisibleNode {
                    id: id.clone(),
                    label: node.label.clone(),
                    kind: node.kind,
                    depth,
                    position: self.positions.get(id).copied().unwrap_or_default(),
                    expanded: self.expansion.is_expanded(id, depth),
                    has_children: !node.child_ids.is_empty(),
                })
            })
            .collect()
    }

    pub fn refresh(&mut self) {
        self.compute_visible();
        self.run_layout();
    }

    fn depth_of(&self, id: &NodeId) -> usize {
        self.visible_depth
            .get(id)
            .copied()
            .unwrap_or_else(|| self.model.depth(id))
    }

    fn compute_visible(&mut self) {
        self.visible_nodes.clear();
        self.visible_depth.clear();

        let cap = self.max_visible_nodes;
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        'roots: for root in self.model.roots() {
            stack.push((root, 0));
            while let Some((id, depth)) = stack.pop() {
                if self.visible_depth.contains_key(&id) {
                    continue;
                }
                let Some(node) = self.model.node(&id) else {
                    continue;
                };
                if self.visible_nodes.len() >= cap {
                    tracing::debug!(cap, "visible node cap reached");
                    break 'roots;
                }
                self.visible_depth.insert(id.clone(), depth);
                self.visible_nodes.push(id.clone());
                if self.expansion.is_expanded(&id, depth) {
                    for child in node.child_ids.iter().rev() {
                        stack.push((child.clone(), depth + 1));
                    }
                }
            }
        }

        let vis = &self.visible_depth;
        self.visible_edges = self
            .model
            .edges()
            .iter()
            .filter(|e| vis.contains_key(&e.source) && vis.contains_key(&e.target))
            .cloned()
            .collect();
    }

    fn run_layout(&mut self) {
        self.positions = self
            .layout
            .layout(&self.visible_nodes, &self.visible_edges, self.direction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegraph_core::{MindMapEdge, MindMapNode};
    use std::collections::{BTreeMap, HashSet};

    fn node(id: &str, kind: NodeKind) -> MindMapNode {
        MindMapNode {
            id: NodeId::from(id),
            label: id.replace('_', " "),
            kind,
            data: BTreeMap::new(),
            parent_id: None,
            child_ids: None,
        }
    }

    fn edge(id: &str, s: &str, t: &str) -> MindMapEdge {
        MindMapEdge {
            id: id.to_string(),
            source: NodeId::from(s),
            target: NodeId::from(t),
            label: None,
        }
    }

    fn glp1() -> MindMapData {
        MindMapData {
            nodes: vec![
                node("disease_obesity", NodeKind::Disease),
                node("mol_semaglutide", NodeKind::Molecule),
                node("prod_wegovy", NodeKind::Product),
                node("prod_ozempic", NodeKind::Product),
                node("prod_rybelsus", NodeKind::Product),
            ],
            edges: vec![
                edge("e1", "disease_obesity", "mol_semaglutide"),
                edge("e3", "mol_semaglutide", "prod_wegovy"),
                edge("e4", "mol_semaglutide", "prod_ozempic"),
                edge("e5", "mol_semaglutide", "prod_rybelsus"),
            ],
        }
    }

    fn visible(st: &GraphState) -> HashSet<&str> {
        st.visible_nodes().iter().map(NodeId::as_str).collect()
    }

    fn edge_ids(st: &GraphState) -> HashSet<&str> {
        st.visible_edges().iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn initial_view_expands_roots_only() {
        let mut st = GraphState::default();
        st.replace(glp1());

        assert_eq!(visible(&st), HashSet::from(["disease_obesity", "mol_semaglutide"]));
        assert_eq!(edge_ids(&st), HashSet::from(["e1"]));
        assert!(st.is_expanded(&NodeId::from("disease_obesity")));
        assert!(!st.is_expanded(&NodeId::from("mol_semaglutide")));
    }

    #[test]
    fn toggling_molecule_reveals_products() {
        let mut st = GraphState::default();
        st.replace(glp1());

        assert!(st.toggle(&NodeId::from("mol_semaglutide")));

        assert_eq!(
            visible(&st),
            HashSet::from([
                "disease_obesity",
                "mol_semaglutide",
                "prod_wegovy",
                "prod_ozempic",
                "prod_rybelsus",
            ])
        );
        assert_eq!(edge_ids(&st), HashSet::from(["e1", "e3", "e4", "e5"]));
        assert_eq!(
            st.visible_nodes(),
            &[
                NodeId::from("disease_obesity"),
                NodeId::from("mol_semaglutide"),
                NodeId::from("prod_wegovy"),
                NodeId::from("prod_ozempic"),
                NodeId::from("prod_rybelsus"),
            ]
        );
    }

    #[test]
    fn positions_track_visibility() {
        let mut st = GraphState::default();
        st.replace(glp1());
        assert_eq!(st.positions().len(), 2);

        st.toggle(&NodeId::from("mol_semaglutide"));
        assert_eq!(st.positions().len(), 5);
        assert!(st.visible_nodes().iter().all(|id| st.position(id).is_some()));
    }

    #[test]
    fn toggling_a_leaf_changes_nothing() {
        let mut st = GraphState::default();
        st.replace(glp1());
        st.toggle(&NodeId::from("mol_semaglutide"));
        let before_nodes = st.visible_nodes().to_vec();
        let before_edges = st.visible_edges().to_vec();

        assert!(!st.toggle(&NodeId::from("prod_wegovy")));
        assert!(!st.toggle(&NodeId::from("no_such_node")));

        assert_eq!(st.visible_nodes(), &before_nodes[..]);
        assert_eq!(st.visible_edges(), &before_edges[..]);
        assert_eq!(st.expansion().explicit(&NodeId::from("prod_wegovy")), None);
    }

    #[test]
    fn double_toggle_restores_visible_set() {
        let mut st = GraphState::default();
        st.replace(glp1());
        for id in ["disease_obesity", "mol_semaglutide"] {
            let id = NodeId::from(id);
            let nodes = st.visible_nodes().to_vec();
            let edges = st.visible_edges().to_vec();
            let positions = st.positions().clone();

            st.toggle(&id);
            st.toggle(&id);

            assert_eq!(st.visible_nodes(), &nodes[..]);
            assert_eq!(st.visible_edges(), &edges[..]);
            assert_eq!(st.positions(), &positions);
        }
    }

    #[test]
    fn collapsing_root_hides_descendants() {
        let mut st = GraphState::default();
        st.replace(glp1());
        st.toggle(&NodeId::from("mol_semaglutide"));
        st.toggle(&NodeId::from("disease_obesity"));

        assert_eq!(visible(&st), HashSet::from(["disease_obesity"]));
        assert!(st.visible_edges().is_empty());

        // collapsing again is idempotent
        assert!(!st.set_expanded(&NodeId::from("disease_obesity"), false));
        assert_eq!(visible(&st), HashSet::from(["disease_obesity"]));
    }

    #[test]
    fn replace_resets_to_depth_defaults() {
        let mut st = GraphState::default();
        st.replace(glp1());
        st.toggle(&NodeId::from("mol_semaglutide"));
        st.toggle(&NodeId::from("disease_obesity"));
        assert!(!st.expansion().is_empty());

        st.replace(glp1());

        assert!(st.expansion().is_empty());
        assert_eq!(visible(&st), HashSet::from(["disease_obesity", "mol_semaglutide"]));
    }

    #[test]
    fn edges_with_missing_endpoints_are_never_visible() {
        let mut data = glp1();
        data.edges.push(edge("dangling", "disease_obesity", "ghost"));
        let mut st = GraphState::default();
        st.replace(data);
        st.expand_all();

        assert_eq!(st.visible_nodes().len(), 5);
        assert!(!edge_ids(&st).contains("dangling"));
    }

    #[test]
    fn expand_and_collapse_all() {
        let mut st = GraphState::default();
        st.replace(glp1());

        st.expand_all();
        assert_eq!(st.visible_nodes().len(), 5);

        st.collapse_all();
        assert_eq!(visible(&st), HashSet::from(["disease_obesity"]));
    }

    #[test]
    fn reveal_expands_ancestors() {
        let mut st = GraphState::default();
        st.replace(glp1());

        assert!(st.reveal(&NodeId::from("prod_ozempic")));
        assert!(st.is_visible(&NodeId::from("prod_ozempic")));
        assert!(!st.reveal(&NodeId::from("ghost")));
    }

    #[test]
    fn search_is_sorted_and_limited() {
        let mut st = GraphState::default();
        st.replace(glp1());

        let hits = st.search("PROD", 2);
        assert_eq!(hits, vec![NodeId::from("prod_ozempic"), NodeId::from("prod_rybelsus")]);
        assert!(st.search("   ", 10).is_empty());
        assert_eq!(st.search("semaglutide", 10), vec![NodeId::from("mol_semaglutide")]);
        assert!(st.search("prod", 0).is_empty());
    }

    #[test]
    fn changing_direction_swaps_axes_over_same_nodes() {
        let mut st = GraphState::new(LayoutDirection::LeftRight, 1200);
        st.replace(glp1());
        st.toggle(&NodeId::from("mol_semaglutide"));
        let nodes = st.visible_nodes().to_vec();
        let before = st.positions().clone();

        st.set_direction(LayoutDirection::TopDown);

        assert_eq!(st.direction(), LayoutDirection::TopDown);
        assert_eq!(st.visible_nodes(), &nodes[..]);
        assert_eq!(st.positions().len(), before.len());
        for id in &nodes {
            let (lr, td) = (before[id], st.positions()[id]);
            assert_eq!((lr.x, lr.y), (td.y, td.x));
        }

        // same direction again is a no-op
        let after = st.positions().clone();
        st.set_direction(LayoutDirection::TopDown);
        assert_eq!(st.positions(), &after);
    }

    #[test]
    fn visible_cap_bounds_the_walk() {
        let mut st = GraphState::new(LayoutDirection::TopDown, 3);
        st.replace(glp1());
        st.expand_all();

        assert_eq!(st.visible_nodes().len(), 3);
        assert!(st
            .visible_edges()
            .iter()
            .all(|e| st.is_visible(&e.source) && st.is_visible(&e.target)));
    }

    #[test]
    fn view_reports_depth_and_affordance() {
        let mut st = GraphState::default();
        st.replace(glp1());
        let view = st.view();

        assert_eq!(view.len(), 2);
        assert_eq!(view[0].depth, 0);
        assert!(view[0].expanded && view[0].has_children);
        assert_eq!(view[1].kind, NodeKind::Molecule);
        assert_eq!(view[1].depth, 1);
        assert!(!view[1].expanded && view[1].has_children);
    }
}
