use pipegraph_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::graph::model::GraphEdge;

pub const DEPTH_SPACING: f32 = 220.0;
pub const BREADTH_SPACING: f32 = 90.0;
const ROOT_SPACING_UNITS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDirection {
    TopDown,
    LeftRight,
}

impl Default for LayoutDirection {
    fn default() -> Self {
        Self::LeftRight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// must be deterministic and cover exactly the given nodes
pub trait LayoutEngine: Send + Sync {
    fn layout(
        &self,
        nodes: &[NodeId],
        edges: &[GraphEdge],
        direction: LayoutDirection,
    ) -> HashMap<NodeId, Point>;
}

#[derive(Debug, Clone, Copy)]
pub struct TreeLayout {
    pub depth_spacing: f32,
    pub breadth_spacing: f32,
}

impl Default for TreeLayout {
    fn default() -> Self {
        Self {
            depth_spacing: DEPTH_SPACING,
            breadth_spacing: BREADTH_SPACING,
        }
    }
}

impl LayoutEngine for TreeLayout {
    fn layout(
        &self,
        nodes: &[NodeId],
        edges: &[GraphEdge],
        direction: LayoutDirection,
    ) -> HashMap<NodeId, Point> {
        let present: HashSet<&NodeId> = nodes.iter().collect();

        // first in-edge wins; edges that would close a cycle are skipped
        let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for e in edges {
            if e.source == e.target
                || !present.contains(&e.source)
                || !present.contains(&e.target)
                || parent.contains_key(&e.target)
                || reaches(&parent, &e.source, &e.target)
            {
                continue;
            }
            parent.insert(e.target.clone(), e.source.clone());
            children
                .entry(e.source.clone())
                .or_default()
                .push(e.target.clone());
        }

        let mut seen: HashSet<&NodeId> = HashSet::new();
        let roots: Vec<NodeId> = nodes
            .iter()
            .filter(|id| seen.insert(*id) && !parent.contains_key(*id))
            .cloned()
            .collect();

        let mut widths: HashMap<NodeId, f32> = HashMap::new();
        for root in &roots {
            compute_width(root, &children, &mut widths);
        }

        let mut units: HashMap<NodeId, (usize, f32)> = HashMap::new();
        let mut cursor = 0.0;
        for (i, root) in roots.iter().enumerate() {
            if i > 0 {
                cursor += ROOT_SPACING_UNITS;
            }
            cursor = layout_subtree(root, 0, cursor, &children, &widths, &mut units);
        }

        units
            .into_iter()
            .map(|(id, (depth, breadth))| {
                let d = depth as f32 * self.depth_spacing;
                let b = breadth * self.breadth_spacing;
                let p = match direction {
                    LayoutDirection::TopDown => Point::new(b, d),
                    LayoutDirection::LeftRight => Point::new(d, b),
                };
                (id, p)
            })
            .collect()
    }
}

// true if walking up from `from` reaches `target`
fn reaches(parent: &HashMap<NodeId, NodeId>, from: &NodeId, target: &NodeId) -> bool {
    let mut cur = Some(from);
    let mut steps = 0usize;
    while let Some(id) = cur {
        if id == target {
            return true;
        }
        steps += 1;
        if steps > parent.len() + 1 {
            return false;
        }
        cur = parent.get(id);
    }
    false
}

fn compute_width(
    id: &NodeId,
    children: &HashMap<NodeId, Vec<NodeId>>,
    widths: &mut HashMap<NodeId, f32>,
) -> f32 {
    if let Some(width) = widths.get(id) {
        return *width;
    }
    let width = match children.get(id) {
        Some(kids) if !kids.is_empty() => kids
            .iter()
            .map(|kid| compute_width(kid, children, widths))
            .sum(),
        _ => 1.0,
    };
    widths.insert(id.clone(), width);
    width
}

fn layout_subtree(
    id: &NodeId,
    depth: usize,
    start_units: f32,
    children: &HashMap<NodeId, Vec<NodeId>>,
    widths: &HashMap<NodeId, f32>,
    units: &mut HashMap<NodeId, (usize, f32)>,
) -> f32 {
    let width = widths.get(id).copied().unwrap_or(1.0);
    let mut cursor = start_units;
    if let Some(kids) = children.get(id) {
        for kid in kids {
            cursor = layout_subtree(kid, depth + 1, cursor, children, widths, units);
        }
    }
    units.insert(id.clone(), (depth, start_units + width / 2.0));
    start_units + width
}
