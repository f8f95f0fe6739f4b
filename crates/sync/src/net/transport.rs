use super::protocol::{Channel, SyncMessage};

/// Outbound side of the network. Both sends are fire-and-forget.
pub trait Transport {
    fn send_unreliable(&mut self, message: SyncMessage);
    fn send_reliable(&mut self, message: SyncMessage);

    fn send(&mut self, message: SyncMessage) {
        match message.channel() {
            Channel::Unreliable => self.send_unreliable(message),
            Channel::Reliable => self.send_reliable(message),
        }
    }
}

/// Collects outbound messages for the caller to flush once per frame.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<(Channel, SyncMessage)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (Channel, SyncMessage)> + '_ {
        self.messages.drain(..)
    }

    pub fn reliable(&self) -> impl Iterator<Item = &SyncMessage> {
        self.messages
            .iter()
            .filter(|(channel, _)| *channel == Channel::Reliable)
            .map(|(_, message)| message)
    }

    pub fn unreliable(&self) -> impl Iterator<Item = &SyncMessage> {
        self.messages
            .iter()
            .filter(|(channel, _)| *channel == Channel::Unreliable)
            .map(|(_, message)| message)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Transport for Outbox {
    fn send_unreliable(&mut self, message: SyncMessage) {
        self.messages.push((Channel::Unreliable, message));
    }

    fn send_reliable(&mut self, message: SyncMessage) {
        self.messages.push((Channel::Reliable, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{NetState, RestState};

    #[test]
    fn send_routes_by_message_channel() {
        let mut outbox = Outbox::new();
        outbox.send(SyncMessage::State(NetState::default()));
        outbox.send(SyncMessage::Rest(RestState::awake()));

        assert_eq!(outbox.unreliable().count(), 1);
        assert_eq!(outbox.reliable().count(), 1);

        let drained: Vec<_> = outbox.drain().collect();
        assert_eq!(drained.len(), 2);
        assert!(outbox.is_empty());
    }
}
