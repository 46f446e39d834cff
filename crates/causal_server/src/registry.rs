//! Outbound connection registries.
//!
//! A registry maps an id to the sending half of a connection's writer
//! queue. The first link registered for an id wins; later registrations
//! for the same id are ignored and entries are never removed.

use causal_protocol::Message;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::mpsc::UnboundedSender;

/// Id-keyed set of outbound message queues.
#[derive(Debug)]
pub struct ConnectionRegistry<K> {
    links: RwLock<HashMap<K, UnboundedSender<Message>>>,
}

impl<K: Eq + Hash> ConnectionRegistry<K> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `link` for `key` unless one is already present.
    ///
    /// Returns true if this call installed the link.
    pub fn register(&self, key: K, link: UnboundedSender<Message>) -> bool {
        if self.links.read().contains_key(&key) {
            return false;
        }
        let mut links = self.links.write();
        if links.contains_key(&key) {
            return false;
        }
        links.insert(key, link);
        true
    }

    /// Queues `message` on the link for `key`.
    ///
    /// Hands the message back if there is no link or its writer is gone.
    pub fn send(&self, key: &K, message: Message) -> Result<(), Message> {
        match self.links.read().get(key) {
            Some(link) => link.send(message).map_err(|err| err.0),
            None => Err(message),
        }
    }

    /// Number of registered links.
    pub fn len(&self) -> usize {
        self.links.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.links.read().is_empty()
    }
}

impl<K: Eq + Hash> Default for ConnectionRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn first_writer_wins() {
        let registry = ConnectionRegistry::new();
        let (first, mut first_rx) = mpsc::unbounded_channel();
        let (second, mut second_rx) = mpsc::unbounded_channel();

        assert!(registry.register(7u64, first));
        assert!(!registry.register(7u64, second));
        assert_eq!(registry.len(), 1);

        registry.send(&7, Message::Tick).unwrap();
        assert_eq!(first_rx.try_recv().unwrap(), Message::Tick);
        assert!(second_rx.try_recv().is_err());
    }

    #[test]
    fn send_without_link_returns_message() {
        let registry: ConnectionRegistry<u64> = ConnectionRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.send(&1, Message::Tick), Err(Message::Tick));
    }

    #[test]
    fn send_on_closed_link_returns_message() {
        let registry = ConnectionRegistry::new();
        let (link, rx) = mpsc::unbounded_channel();
        registry.register(2u64, link);
        drop(rx);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.send(&2, Message::Tick), Err(Message::Tick));
    }
}
