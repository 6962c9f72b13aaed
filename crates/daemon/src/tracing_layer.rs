//! Forwards `tracing::Event`s into the daemon's [`EventBus`] alongside
//! process lifecycle events, so a WebSocket client sees both without a
//! second connection. Adapted from the teacher's `WebSocketLayer`.

use crate::events::{EventBus, OptimusEvent};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

pub struct EventStreamLayer {
    bus: EventBus,
}

impl EventStreamLayer {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl<S: Subscriber> Layer<S> for EventStreamLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let Some(message) = visitor.message else { return };

        self.bus.publish(OptimusEvent::LogLine {
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message,
        });
    }
}
