pub mod graph;
pub mod net;
pub mod session;
pub mod stream;
pub mod util;

pub use session::Session;
