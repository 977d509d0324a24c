//! Window Manager Module
//!
//! Reparenting core: takes over substructure redirection on the root
//! window, frames top-level clients and keeps frames in step with them.

pub mod client;
pub mod decorations;
pub mod display;
pub mod events;
pub mod failure;
pub mod startup;

#[cfg(test)]
pub mod testing;

use anyhow::Result;
use tracing::info;
use x11rb::protocol::xproto::Window;

use crate::wm::client::ClientRegistry;
use crate::wm::display::WindowSystem;

/// The window manager, generic over the window system it drives.
///
/// Single-threaded: everything happens on the thread that calls `run`.
pub struct WindowManager<C: WindowSystem> {
    conn: C,
    root: Window,
    clients: ClientRegistry,
}

impl<C: WindowSystem> WindowManager<C> {
    pub fn new(conn: C) -> Self {
        let root = conn.root();
        Self {
            conn,
            root,
            clients: ClientRegistry::new(),
        }
    }

    /// Become the window manager, then process events until the
    /// connection fails.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;

        info!("Entering event loop");
        loop {
            let event = self.conn.next_event()?;
            self.dispatch(&event);
        }
    }

    #[cfg(test)]
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    #[cfg(test)]
    pub fn display(&self) -> &C {
        &self.conn
    }

    #[cfg(test)]
    pub fn display_mut(&mut self) -> &mut C {
        &mut self.conn
    }
}
