//! Event bus: channel-backed dispatch to pluggable sinks.
//!
//! Producers only hold the sending half, so emitting never blocks and never
//! touches a sink. Sinks run when the owner calls [`EventBus::flush`].

use std::sync::mpsc;

use crate::events::StressEvent;
use crate::sinks::EventSink;

/// Event bus owned by one stress solver (or by the driver of many).
pub struct EventBus {
    sender: mpsc::Sender<StressEvent>,
    receiver: mpsc::Receiver<StressEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    /// Disabled bus is a no-op.
    enabled: bool,
}

impl EventBus {
    /// Creates a new event bus with no sinks.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            sinks: Vec::new(),
            enabled: true,
        }
    }

    /// Registers a sink to receive events.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Builder form of [`Self::add_sink`].
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.add_sink(Box::new(sink));
        self
    }

    /// Enables or disables the bus. Disabled bus drops events silently.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queues an event. No-op while disabled.
    pub fn emit(&self, event: StressEvent) {
        if !self.enabled {
            return;
        }
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.sender.send(event);
    }

    /// Dispatches every queued event to all sinks, returning how many were
    /// dispatched.
    pub fn flush(&mut self) -> usize {
        let mut dispatched = 0;
        while let Ok(event) = self.receiver.try_recv() {
            for sink in &mut self.sinks {
                sink.handle(&event);
            }
            dispatched += 1;
        }
        dispatched
    }

    /// Flushes and lets every sink finalize.
    pub fn finish(&mut self) {
        self.flush();
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .finish()
    }
}
