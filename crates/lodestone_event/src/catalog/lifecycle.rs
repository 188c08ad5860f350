//! Server lifecycle events.

use crate::cause::Cause;
use crate::impl_event;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerLifecyclePhase {
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl fmt::Display for ServerLifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerLifecyclePhase::Starting => "starting",
            ServerLifecyclePhase::Started => "started",
            ServerLifecyclePhase::Stopping => "stopping",
            ServerLifecyclePhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Fired when the server moves to another lifecycle phase. Not cancellable.
#[derive(Debug)]
pub struct ServerLifecycleEvent {
    cause: Cause,
    phase: ServerLifecyclePhase,
}

impl_event!(ServerLifecycleEvent);

impl ServerLifecycleEvent {
    pub fn new(cause: Cause, phase: ServerLifecyclePhase) -> Self {
        Self { cause, phase }
    }

    pub fn phase(&self) -> ServerLifecyclePhase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventContext;
    use crate::error::EventError;
    use crate::event::Event;

    #[test]
    fn test_lifecycle_events_cannot_be_cancelled() {
        let mut event = ServerLifecycleEvent::new(
            Cause::of(EventContext::empty(), "server"),
            ServerLifecyclePhase::Stopping,
        );
        assert_eq!(event.phase(), ServerLifecyclePhase::Stopping);
        assert_eq!(
            event.set_cancelled(true),
            Err(EventError::NotCancellable {
                event: "ServerLifecycleEvent"
            })
        );
    }
}
