pub mod simulate;
pub mod state;
pub mod tracker;

pub use simulate::Simulator;
pub use state::{Applied, Completion, JobStreamState, ProgressSource, StageMap, StageNode};
pub use tracker::{JobTracker, TrackerOptions};
