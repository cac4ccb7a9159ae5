//! Change notifications
//!
//! Events carry no payload; observers re-read whatever list changed.

use std::sync::mpsc::Sender;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigEvent {
    RegisteredHostsChanged,
    ManualHostsChanged,
    ControllerMappingChanged,
}

type Listener = Box<dyn Fn(ConfigEvent) + Send>;

/// Observer list plus a revision counter bumped on every emitted event
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Vec<Listener>,
    channels: Vec<Sender<ConfigEvent>>,
    revision: u64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked synchronously on every event
    pub fn subscribe(&mut self, listener: impl Fn(ConfigEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Register a channel; it is dropped once the receiver hangs up
    pub fn subscribe_channel(&mut self, sender: Sender<ConfigEvent>) {
        self.channels.push(sender);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn emit(&mut self, event: ConfigEvent) {
        self.revision += 1;
        debug!(event = ?event, revision = self.revision, "Emitting config event");

        for listener in &self.listeners {
            listener(event);
        }
        self.channels.retain(|tx| tx.send(event).is_ok());
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .field("channels", &self.channels.len())
            .field("revision", &self.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_reaches_callbacks_and_channels() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = ChangeNotifier::new();
        let sink = Arc::clone(&seen);
        notifier.subscribe(move |e| sink.lock().unwrap().push(e));
        let (tx, rx) = mpsc::channel();
        notifier.subscribe_channel(tx);

        notifier.emit(ConfigEvent::ManualHostsChanged);

        assert_eq!(*seen.lock().unwrap(), vec![ConfigEvent::ManualHostsChanged]);
        assert_eq!(rx.try_recv().unwrap(), ConfigEvent::ManualHostsChanged);
        assert_eq!(notifier.revision(), 1);
    }

    #[test]
    fn test_disconnected_channel_is_pruned() {
        let mut notifier = ChangeNotifier::new();
        let (tx, rx) = mpsc::channel();
        notifier.subscribe_channel(tx);
        drop(rx);

        notifier.emit(ConfigEvent::RegisteredHostsChanged);
        assert!(notifier.channels.is_empty());
        assert_eq!(notifier.revision(), 1);
    }
}
