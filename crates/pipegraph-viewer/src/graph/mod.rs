pub mod expansion;
pub mod model;
pub mod state;
pub mod tree;

pub use expansion::ExpansionState;
pub use model::{GraphEdge, GraphModel, GraphNode};
pub use state::{GraphState, VisibleNode};
pub use tree::{LayoutDirection, LayoutEngine, Point, TreeLayout};
