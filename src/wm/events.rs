//! Events Module
//!
//! Routes X11 events to one named handler per event kind. Handlers for
//! notifications we don't act on yet are kept so policy can be added
//! without touching the routing table.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;

use crate::wm::display::{WindowChanges, WindowSystem};
use crate::wm::WindowManager;

impl<C: WindowSystem> WindowManager<C> {
    /// Handle one event. Failures are logged and never stop the loop.
    pub fn dispatch(&mut self, event: &Event) {
        let result = match event {
            Event::CreateNotify(e) => self.on_create_notify(e),
            Event::ConfigureRequest(e) => self.on_configure_request(e),
            Event::ConfigureNotify(e) => self.on_configure_notify(e),
            Event::MapRequest(e) => self.on_map_request(e),
            Event::MapNotify(e) => self.on_map_notify(e),
            Event::UnmapNotify(e) => self.on_unmap_notify(e),
            Event::ReparentNotify(e) => self.on_reparent_notify(e),
            Event::DestroyNotify(e) => self.on_destroy_notify(e),
            _ => Ok(()),
        };

        if let Err(e) = result {
            warn!("Failed to handle {}: {:#}", event_name(event), e);
        }
    }

    fn on_create_notify(&mut self, e: &CreateNotifyEvent) -> Result<()> {
        debug!("CreateNotify: window 0x{:x}", e.window);
        Ok(())
    }

    /// Grant the request as asked. A managed client's frame gets the very
    /// same changes.
    fn on_configure_request(&mut self, e: &ConfigureRequestEvent) -> Result<()> {
        let changes = WindowChanges::from(e);

        let framed = match self.clients.frame_of(e.window) {
            Some(frame) => {
                info!("Resize frame 0x{:x} to {}x{}", frame, e.width, e.height);
                self.conn.configure(frame, &changes)
            }
            None => Ok(()),
        };

        // The client's own request is granted even if its frame's failed
        info!("Resize 0x{:x} to {}x{}", e.window, e.width, e.height);
        let granted = self.conn.configure(e.window, &changes);

        framed.and(granted)
    }

    fn on_configure_notify(&mut self, e: &ConfigureNotifyEvent) -> Result<()> {
        debug!("ConfigureNotify: window 0x{:x}", e.window);
        Ok(())
    }

    fn on_map_request(&mut self, e: &MapRequestEvent) -> Result<()> {
        debug!("MapRequest: window 0x{:x}", e.window);
        if let Err(err) = self.frame(e.window, false) {
            warn!("Failed to frame window 0x{:x}: {:#}", e.window, err);
        }
        self.conn.map(e.window)
    }

    fn on_map_notify(&mut self, e: &MapNotifyEvent) -> Result<()> {
        debug!("MapNotify: window 0x{:x}", e.window);
        Ok(())
    }

    fn on_unmap_notify(&mut self, e: &UnmapNotifyEvent) -> Result<()> {
        // We also get this for frames we are tearing down ourselves
        if !self.clients.contains(e.window) {
            match self.clients.client_of(e.window) {
                Some(client) => debug!("Ignore UnmapNotify for frame 0x{:x} of 0x{:x}", e.window, client),
                None => debug!("Ignore UnmapNotify for non-client window 0x{:x}", e.window),
            }
            return Ok(());
        }

        // A client's unmap is reported through its frame. Only reparenting
        // a pre-existing window out of root is reported through root.
        if e.event == self.root {
            debug!("Ignore UnmapNotify for reparented pre-existing window 0x{:x}", e.window);
            return Ok(());
        }

        self.unframe(e.window)
    }

    fn on_reparent_notify(&mut self, e: &ReparentNotifyEvent) -> Result<()> {
        debug!("ReparentNotify: window 0x{:x} -> 0x{:x}", e.window, e.parent);
        Ok(())
    }

    fn on_destroy_notify(&mut self, e: &DestroyNotifyEvent) -> Result<()> {
        debug!("DestroyNotify: window 0x{:x}", e.window);
        Ok(())
    }
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::CreateNotify(_) => "CreateNotify",
        Event::ConfigureRequest(_) => "ConfigureRequest",
        Event::ConfigureNotify(_) => "ConfigureNotify",
        Event::MapRequest(_) => "MapRequest",
        Event::MapNotify(_) => "MapNotify",
        Event::UnmapNotify(_) => "UnmapNotify",
        Event::ReparentNotify(_) => "ReparentNotify",
        Event::DestroyNotify(_) => "DestroyNotify",
        _ => "event",
    }
}
