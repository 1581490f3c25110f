//! Outbound transport seam.
//!
//! The wire protocol and socket handling live outside this crate; the
//! scripting core only needs the three operations below. The binary wires a
//! [`NullTransport`] (logs at debug level); tests use
//! [`RecordingTransport`] to assert on the exact packets the core produces.

use parking_lot::Mutex;

/// Packet sink the scripting core posts to.
///
/// `send_to` targets one client by id; `broadcast` reaches every synced
/// client; `disconnect` closes a client's socket after a kick.
pub trait Transport: Send + Sync {
    fn broadcast(&self, packet: &str);
    fn send_to(&self, client_id: i64, packet: &str);
    fn disconnect(&self, client_id: i64);
}

/// Transport used when the server runs without a network stack attached.
#[derive(Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn broadcast(&self, packet: &str) {
        log::debug!("broadcast dropped (no transport): {packet}");
    }

    fn send_to(&self, client_id: i64, packet: &str) {
        log::debug!("unicast to {client_id} dropped (no transport): {packet}");
    }

    fn disconnect(&self, client_id: i64) {
        log::debug!("disconnect of {client_id} dropped (no transport)");
    }
}

/// Target of one recorded send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Broadcast(String),
    To(i64, String),
    Disconnect(i64),
}

/// Test double capturing every packet in order.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn snapshot(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

impl Transport for RecordingTransport {
    fn broadcast(&self, packet: &str) {
        self.sent.lock().push(Sent::Broadcast(packet.to_string()));
    }

    fn send_to(&self, client_id: i64, packet: &str) {
        self.sent.lock().push(Sent::To(client_id, packet.to_string()));
    }

    fn disconnect(&self, client_id: i64) {
        self.sent.lock().push(Sent::Disconnect(client_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_transport_keeps_order() {
        let t = RecordingTransport::new();
        t.broadcast("Od:7-3");
        t.send_to(2, "C:Server: hi");
        t.disconnect(2);
        assert_eq!(
            t.take(),
            vec![
                Sent::Broadcast("Od:7-3".into()),
                Sent::To(2, "C:Server: hi".into()),
                Sent::Disconnect(2),
            ]
        );
    }
}
