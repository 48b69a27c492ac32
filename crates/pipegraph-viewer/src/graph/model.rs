use pipegraph_core::{MindMapData, MindMapEdge, MindMapNode, NodeId, NodeKind};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub label: Option<String>,
}

impl From<MindMapEdge> for GraphEdge {
    fn from(e: MindMapEdge) -> Self {
        Self {
            id: e.id,
            source: e.source,
            target: e.target,
            label: e.label,
        }
    }
}

// child_ids and parent_id always agree; links to unknown nodes are dropped
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: HashMap<NodeId, GraphNode>,
    order: Vec<NodeId>,
    edges: Vec<GraphEdge>,
}

impl GraphModel {
    pub fn from_mind_map(data: MindMapData) -> Self {
        let hierarchical = data.is_hierarchical();
        let mut model = Self::default();

        let mut declared_children: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        for n in data.nodes {
            if model.nodes.contains_key(&n.id) {
                tracing::warn!(id = %n.id.0, "duplicate mind-map node ignored");
                continue;
            }
            let MindMapNode {
                id,
                label,
                kind,
                data,
                parent_id,
                child_ids,
            } = n;
            if let Some(children) = child_ids {
                declared_children.push((id.clone(), children));
            }
            model.order.push(id.clone());
            model.nodes.insert(
                id.clone(),
                GraphNode {
                    id,
                    kind,
                    label,
                    parent_id,
                    child_ids: Vec::new(),
                    attributes: data,
                },
            );
        }
        model.edges = data.edges.into_iter().map(GraphEdge::from).collect();

        if hierarchical {
            model.link_declared(declared_children);
        } else {
            model.link_from_edges();
        }
        model
    }

    fn link_declared(&mut self, declared_children: Vec<(NodeId, Vec<NodeId>)>) {
        // parent links that point nowhere (or at self) make the node a root
        let ids = self.order.clone();
        for id in &ids {
            let dangling = match self.nodes.get(id).and_then(|n| n.parent_id.as_ref()) {
                Some(p) => p == id || !self.nodes.contains_key(p),
                None => false,
            };
            if dangling {
                if let Some(n) = self.nodes.get_mut(id) {
                    n.parent_id = None;
                }
            }
        }

        // declared child order first
        for (parent, children) in declared_children {
            for child in children {
                self.try_link(&parent, &child);
            }
        }
        // then parents only named on the child side
        for id in &ids {
            let Some(parent) = self.nodes.get(id).and_then(|n| n.parent_id.clone()) else {
                continue;
            };
            let listed = self
                .nodes
                .get(&parent)
                .is_some_and(|p| p.child_ids.contains(id));
            if !listed && !self.is_ancestor(id, &parent) {
                if let Some(p) = self.nodes.get_mut(&parent) {
                    p.child_ids.push(id.clone());
                }
            } else if !listed {
                if let Some(n) = self.nodes.get_mut(id) {
                    n.parent_id = None;
                }
            }
        }
    }

    fn link_from_edges(&mut self) {
        let pairs: Vec<(NodeId, NodeId)> = self
            .edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect();
        for (source, target) in pairs {
            let orphan = self
                .nodes
                .get(&target)
                .is_some_and(|n| n.parent_id.is_none());
            if orphan {
                self.try_link(&source, &target);
            }
        }
    }

    fn try_link(&mut self, parent: &NodeId, child: &NodeId) -> bool {
        if parent == child || !self.nodes.contains_key(parent) {
            return false;
        }
        let Some(current) = self.nodes.get(child).map(|n| n.parent_id.clone()) else {
            return false;
        };
        if current.as_ref().is_some_and(|p| p != parent) {
            return false;
        }
        if self.is_ancestor(child, parent) {
            return false;
        }
        let Some(p) = self.nodes.get_mut(parent) else {
            return false;
        };
        if p.child_ids.contains(child) {
            return false;
        }
        p.child_ids.push(child.clone());
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent_id = Some(parent.clone());
        }
        true
    }

    pub fn is_ancestor(&self, candidate: &NodeId, of: &NodeId) -> bool {
        let mut cur = Some(of.clone());
        let mut steps = 0usize;
        while let Some(id) = cur {
            if &id == candidate {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            cur = self.nodes.get(&id).and_then(|n| n.parent_id.clone());
        }
        false
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.parent_id.is_none())
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn has_children(&self, id: &NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| !n.child_ids.is_empty())
    }

    pub fn ancestors(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.nodes.get(id).and_then(|n| n.parent_id.clone());
        while let Some(p) = cur {
            if out.contains(&p) || out.len() > self.nodes.len() {
                break;
            }
            cur = self.nodes.get(&p).and_then(|n| n.parent_id.clone());
            out.push(p);
        }
        out.reverse();
        out
    }

    pub fn depth(&self, id: &NodeId) -> usize {
        self.ancestors(id).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: NodeKind) -> MindMapNode {
        MindMapNode {
            id: NodeId::from(id),
            label: id.to_string(),
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

    fn ids(v: &[NodeId]) -> Vec<&str> {
        v.iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn derives_hierarchy_from_edges_first_parent_wins() {
        let data = MindMapData {
            nodes: vec![
                node("disease_obesity", NodeKind::Disease),
                node("disease_t2d", NodeKind::Disease),
                node("mol_semaglutide", NodeKind::Molecule),
                node("prod_wegovy", NodeKind::Product),
            ],
            edges: vec![
                edge("e1", "disease_obesity", "mol_semaglutide"),
                edge("e2", "disease_t2d", "mol_semaglutide"),
                edge("e3", "mol_semaglutide", "prod_wegovy"),
            ],
        };
        let m = GraphModel::from_mind_map(data);

        assert_eq!(ids(&m.roots()), vec!["disease_obesity", "disease_t2d"]);
        let mol = m.node(&NodeId::from("mol_semaglutide")).expect("mol");
        assert_eq!(mol.parent_id, Some(NodeId::from("disease_obesity")));
        assert_eq!(ids(&mol.child_ids), vec!["prod_wegovy"]);
        assert!(!m.has_children(&NodeId::from("disease_t2d")));
        assert_eq!(m.depth(&NodeId::from("prod_wegovy")), 2);
        assert_eq!(m.edges().len(), 3);
    }

    #[test]
    fn edge_cycles_do_not_produce_parent_loops() {
        let data = MindMapData {
            nodes: vec![node("a", NodeKind::Category), node("b", NodeKind::Category)],
            edges: vec![edge("e1", "a", "b"), edge("e2", "b", "a"), edge("e3", "a", "a")],
        };
        let m = GraphModel::from_mind_map(data);
        assert_eq!(ids(&m.roots()), vec!["a"]);
        assert_eq!(m.depth(&NodeId::from("b")), 1);
    }

    #[test]
    fn declared_hierarchy_is_reconciled() {
        let mut root = node("root", NodeKind::Category);
        root.child_ids = Some(vec![NodeId::from("a"), NodeId::from("ghost")]);
        let a = node("a", NodeKind::Company);
        let mut b = node("b", NodeKind::Company);
        b.parent_id = Some(NodeId::from("root"));
        let mut orphan = node("orphan", NodeKind::Product);
        orphan.parent_id = Some(NodeId::from("missing"));

        let m = GraphModel::from_mind_map(MindMapData {
            nodes: vec![root, a, b, orphan],
            edges: Vec::new(),
        });

        let root = m.node(&NodeId::from("root")).expect("root");
        assert_eq!(ids(&root.child_ids), vec!["a", "b"]);
        assert_eq!(
            m.node(&NodeId::from("a")).and_then(|n| n.parent_id.clone()),
            Some(NodeId::from("root"))
        );
        assert_eq!(ids(&m.roots()), vec!["root", "orphan"]);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let mut second = node("x", NodeKind::Product);
        second.label = "second".into();
        let m = GraphModel::from_mind_map(MindMapData {
            nodes: vec![node("x", NodeKind::Disease), second],
            edges: Vec::new(),
        });
        assert_eq!(m.len(), 1);
        assert_eq!(m.node(&NodeId::from("x")).map(|n| n.kind), Some(NodeKind::Disease));
    }
}
