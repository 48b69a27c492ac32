pub mod api;
pub mod handle;
pub mod poll;
pub mod protocol;
pub mod sse;

pub use api::ApiClient;
pub use handle::ReaderHandle;
pub use poll::{spawn_poller, spawn_ticker};
pub use protocol::{Incoming, IncomingKind};
pub use sse::{spawn_stream, SseCodec};
