//! Wire-format events broadcast to WebSocket clients over `GET /events`:
//! process lifecycle transitions, stdout chunks, and forwarded log lines.

use serde::Serialize;

/// Bounded so a client that never reads can only ever lag, not block a
/// producer.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OptimusEvent {
    Spawned { pid: u32 },
    Output { pid: u32, text: String },
    WaitingInput { pid: u32 },
    Terminated { pid: u32 },
    Killed { pid: u32 },
    LogLine { level: String, target: String, message: String },
}

impl From<optimus_core::ProcessEvent> for OptimusEvent {
    fn from(event: optimus_core::ProcessEvent) -> Self {
        use optimus_core::ProcessEvent as PE;
        match event {
            PE::Spawned { pid } => OptimusEvent::Spawned { pid },
            PE::Output { pid, text } => OptimusEvent::Output { pid, text },
            PE::WaitingInput { pid } => OptimusEvent::WaitingInput { pid },
            PE::Terminated { pid } => OptimusEvent::Terminated { pid },
            PE::Killed { pid } => OptimusEvent::Killed { pid },
        }
    }
}

/// Fan-out point for [`OptimusEvent`]s: one broadcast sender shared by the
/// `optimus_core::Subscriber` bridge, the tracing layer, and every
/// WebSocket connection's receiver.
#[derive(Clone)]
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<OptimusEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<OptimusEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: OptimusEvent) {
        // No receivers is the common case between client connections; a
        // send error there just means nobody's listening right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridges `ProcessManager::subscribe`'s synchronous callback onto the
/// daemon's async broadcast channel.
pub struct EventBusSubscriber {
    pub bus: EventBus,
}

impl optimus_core::Subscriber for EventBusSubscriber {
    fn notify(&mut self, event: optimus_core::ProcessEvent) {
        self.bus.publish(event.into());
    }
}
