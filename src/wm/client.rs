//! Client registry: which frame wraps which client.

use std::collections::HashMap;

use x11rb::protocol::xproto::Window;

/// Bidirectional client <-> frame mapping.
///
/// Holding a handle here does not own the server-side window; frames are
/// created and destroyed explicitly around `insert`/`remove`.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    frames: HashMap<Window, Window>,
    clients: HashMap<Window, Window>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `frame` wraps `client`.
    ///
    /// Inserting a client twice is a framing bug; the old frame is replaced.
    pub fn insert(&mut self, client: Window, frame: Window) -> Option<Window> {
        debug_assert!(
            !self.frames.contains_key(&client),
            "client 0x{:x} is already framed",
            client
        );
        debug_assert!(
            !self.clients.contains_key(&frame),
            "frame 0x{:x} already wraps a client",
            frame
        );

        let previous = self.frames.insert(client, frame);
        if let Some(old) = previous {
            self.clients.remove(&old);
        }
        self.clients.insert(frame, client);
        previous
    }

    pub fn frame_of(&self, client: Window) -> Option<Window> {
        self.frames.get(&client).copied()
    }

    pub fn client_of(&self, frame: Window) -> Option<Window> {
        self.clients.get(&frame).copied()
    }

    pub fn contains(&self, client: Window) -> bool {
        self.frames.contains_key(&client)
    }

    /// Forget `client`, returning the frame it was in
    pub fn remove(&mut self, client: Window) -> Option<Window> {
        let frame = self.frames.remove(&client)?;
        self.clients.remove(&frame);
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (Window, Window)> + '_ {
        self.frames.iter().map(|(&client, &frame)| (client, frame))
    }
}
