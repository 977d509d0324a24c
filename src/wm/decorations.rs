//! Window decorations: wrapping clients in flat bordered frames.
//!
//! The frame is a plain child of root with a solid border. The client is
//! reparented into it at a fixed offset and kept in the save set so the
//! server hands it back to root if we go away.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::wm::display::{substructure_event_mask, WindowSystem};
use crate::wm::WindowManager;

/// Visual style of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStyle {
    pub border_width: u16,
    pub border_color: u32,
    pub background_color: u32,
    /// Position of the client inside its frame
    pub client_offset: (i16, i16),
}

impl FrameStyle {
    pub const DEFAULT: Self = Self {
        border_width: 5,
        border_color: 0x9c9c9c,
        background_color: 0x636363,
        client_offset: (0, 0),
    };
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl<C: WindowSystem> WindowManager<C> {
    /// Wrap `client` in a new frame.
    ///
    /// Windows that existed before we started are only framed when they are
    /// viewable and do not set override-redirect. A failure to read the
    /// client's attributes abandons this client only. After the frame is
    /// created every remaining request is issued and the pair recorded; the
    /// first failure is returned.
    pub fn frame(&mut self, client: Window, created_before_wm: bool) -> Result<()> {
        if self.clients.contains(client) {
            debug!("Window 0x{:x} is already framed", client);
            return Ok(());
        }

        let attrs = match self.conn.window_attributes(client) {
            Ok(attrs) => attrs,
            Err(e) => {
                warn!("Failed to retrieve attributes of window 0x{:x}: {:#}", client, e);
                return Ok(());
            }
        };

        if created_before_wm && (attrs.override_redirect || !attrs.is_viewable()) {
            debug!(
                "Skipping pre-existing window 0x{:x} (override_redirect={}, map_state={:?})",
                client, attrs.override_redirect, attrs.map_state
            );
            return Ok(());
        }

        let style = FrameStyle::DEFAULT;
        let frame = self.conn.create_frame(self.root, attrs.geometry, &style)?;

        // A created frame is always recorded
        let (x, y) = style.client_offset;
        let steps = [
            self.conn.select_events(frame, substructure_event_mask()),
            self.conn.add_to_save_set(client),
            self.conn.reparent(client, frame, x, y),
            self.conn.map(frame),
        ];
        self.clients.insert(client, frame);
        info!("Framed window 0x{:x} [0x{:x}]", client, frame);

        steps.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    /// Undo `frame` for a managed client.
    ///
    /// Every request is issued in order even if an earlier one fails, and
    /// the client is forgotten regardless.
    pub fn unframe(&mut self, client: Window) -> Result<()> {
        let Some(frame) = self.clients.frame_of(client) else {
            debug!("Window 0x{:x} is not framed", client);
            return Ok(());
        };

        let steps = [
            self.conn.unmap(frame),
            self.conn.reparent(client, self.root, 0, 0),
            self.conn.remove_from_save_set(client),
            self.conn.destroy(frame),
        ];
        self.clients.remove(client);
        info!("Unframed window 0x{:x} [0x{:x}]", client, frame);

        steps.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }
}
