use pipegraph_core::{StatusResponse, StreamEvent};

// the tracker drops anything tagged with an older generation
#[derive(Debug, Clone)]
pub struct Incoming {
    pub generation: u64,
    pub kind: IncomingKind,
}

#[derive(Debug, Clone)]
pub enum IncomingKind {
    Connected,
    Disconnected,
    Event(StreamEvent),
    Malformed(String),
    TransportError(String),
    Status(StatusResponse),
    PollFailed(String),
    SimulateTick,
}

impl Incoming {
    pub fn connected(generation: u64) -> Self {
        Self {
            generation,
            kind: IncomingKind::Connected,
        }
    }

    pub fn disconnected(generation: u64) -> Self {
        Self {
            generation,
            kind: IncomingKind::Disconnected,
        }
    }

    pub fn event(generation: u64, ev: StreamEvent) -> Self {
        Self {
            generation,
            kind: IncomingKind::Event(ev),
        }
    }

    pub fn malformed(generation: u64, msg: String) -> Self {
        Self {
            generation,
            kind: IncomingKind::Malformed(msg),
        }
    }

    pub fn transport_error(generation: u64, msg: String) -> Self {
        Self {
            generation,
            kind: IncomingKind::TransportError(msg),
        }
    }

    pub fn status(generation: u64, status: StatusResponse) -> Self {
        Self {
            generation,
            kind: IncomingKind::Status(status),
        }
    }

    pub fn poll_failed(generation: u64, msg: String) -> Self {
        Self {
            generation,
            kind: IncomingKind::PollFailed(msg),
        }
    }

    pub fn tick(generation: u64) -> Self {
        Self {
            generation,
            kind: IncomingKind::SimulateTick,
        }
    }
}
