//! Startup Module
//!
//! Claims the root window and adopts the top-level windows that were
//! already on screen before we started.

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::wm::display::{substructure_event_mask, WindowSystem};
use crate::wm::failure::FailureHandler;
use crate::wm::WindowManager;

/// Reasons startup cannot continue
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("another window manager is already running on display {display}")]
    AnotherManager { display: String },

    #[error("window tree reports root 0x{returned:x}, expected 0x{expected:x}")]
    RootMismatch { expected: Window, returned: Window },
}

/// Try to select substructure redirection on root and report whether the
/// server refused because someone else holds it.
///
/// Leaves the default failure handler installed. The detection flag lives
/// in the handshake strategy and is dropped on return.
pub fn detect_existing_manager<C: WindowSystem>(conn: &mut C) -> Result<bool> {
    conn.set_failure_handler(FailureHandler::handshake());

    let root = conn.root();
    let subscribed = conn
        .select_events(root, substructure_event_mask())
        .and_then(|()| conn.sync(false));

    let handshake = conn.set_failure_handler(FailureHandler::Default);
    subscribed.context("Failed to select substructure redirection on root")?;

    Ok(handshake.wm_detected())
}

impl<C: WindowSystem> WindowManager<C> {
    /// Perform the handshake and frame every pre-existing window.
    ///
    /// The server is grabbed while the window tree is read and framed so it
    /// cannot change underneath us.
    pub fn start(&mut self) -> Result<()> {
        if detect_existing_manager(&mut self.conn)? {
            return Err(StartupError::AnotherManager {
                display: self.conn.display_name().to_owned(),
            }
            .into());
        }
        info!("Registered as window manager");

        self.conn.grab_server()?;
        let adopted = self.adopt_existing_windows();
        let ungrabbed = self.conn.ungrab_server();
        adopted?;
        ungrabbed?;

        Ok(())
    }

    fn adopt_existing_windows(&mut self) -> Result<()> {
        let tree = self
            .conn
            .query_tree(self.root)
            .context("Failed to query tree")?;

        if tree.root != self.root {
            return Err(StartupError::RootMismatch {
                expected: self.root,
                returned: tree.root,
            }
            .into());
        }

        debug!("Found {} existing top-level windows", tree.children.len());
        for &child in &tree.children {
            if let Err(e) = self.frame(child, true) {
                warn!("Failed to frame existing window 0x{:x}: {:#}", child, e);
            }
        }
        info!(
            "Adopted {} of {} existing windows",
            self.clients.len(),
            tree.children.len()
        );

        Ok(())
    }
}
