use pipegraph_core::NodeId;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    explicit: HashMap<NodeId, bool>,
}

pub fn default_for_depth(depth: usize) -> bool {
    depth == 0
}

impl ExpansionState {
    pub fn is_expanded(&self, id: &NodeId, depth: usize) -> bool {
        self.explicit
            .get(id)
            .copied()
            .unwrap_or_else(|| default_for_depth(depth))
    }

    pub fn explicit(&self, id: &NodeId) -> Option<bool> {
        self.explicit.get(id).copied()
    }

    pub fn set(&mut self, id: NodeId, expanded: bool) {
        self.explicit.insert(id, expanded);
    }

    pub fn clear(&mut self) {
        self.explicit.clear();
    }

    pub fn len(&self) -> usize {
        self.explicit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_entry_overrides_depth_default() {
        let mut st = ExpansionState::default();
        let root = NodeId::from("root");
        let leaf = NodeId::from("leaf");

        assert!(st.is_expanded(&root, 0));
        assert!(!st.is_expanded(&leaf, 3));

        st.set(root.clone(), false);
        st.set(leaf.clone(), true);
        assert!(!st.is_expanded(&root, 0));
        assert!(st.is_expanded(&leaf, 3));

        st.clear();
        assert!(st.is_empty());
        assert_eq!(st.explicit(&root), None);
        assert!(st.is_expanded(&root, 0));
    }
}
