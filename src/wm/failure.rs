//! Failure Handler Module
//!
//! Strategy for failures the X server reports asynchronously. The display
//! backend owns exactly one handler at a time; the startup handshake swaps
//! in `Handshake` for the root subscription and swaps `Default` back in.

use thiserror::Error;
use tracing::{debug, warn};
use x11rb::protocol::xproto::CHANGE_WINDOW_ATTRIBUTES_REQUEST;
use x11rb::protocol::ErrorKind;
use x11rb::x11_utils::X11Error;

/// A failure reported by the X server for one of our requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} error for request {request} on resource 0x{resource:x} (seq {sequence})")]
pub struct ServerError {
    pub kind: ErrorKind,
    /// Major opcode of the failed request
    pub request: u8,
    /// Offending resource id (window, atom, ...)
    pub resource: u32,
    pub sequence: u16,
}

impl From<&X11Error> for ServerError {
    fn from(e: &X11Error) -> Self {
        Self {
            kind: e.error_kind,
            request: e.major_opcode,
            resource: e.bad_value,
            sequence: e.sequence,
        }
    }
}

/// How server-reported failures are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureHandler {
    /// Active only while subscribing to substructure redirection on root.
    Handshake {
        /// Set when the subscription was refused with BadAccess
        wm_detected: bool,
    },
    /// Log and carry on. Requests routinely race against windows that
    /// disappear underneath us, so no failure is fatal.
    #[default]
    Default,
}

impl FailureHandler {
    /// Fresh handshake strategy with the detection flag cleared
    pub fn handshake() -> Self {
        Self::Handshake { wm_detected: false }
    }

    /// Handle one failure
    pub fn handle(&mut self, error: &ServerError) {
        match self {
            Self::Handshake { wm_detected } => {
                if error.kind == ErrorKind::Access
                    && error.request == CHANGE_WINDOW_ATTRIBUTES_REQUEST
                {
                    *wm_detected = true;
                } else {
                    debug!("Failure during handshake not related to redirection: {}", error);
                }
            }
            Self::Default => {
                warn!("X11 request failed: {}", error);
            }
        }
    }

    /// Whether another window manager refused us the root window
    pub fn wm_detected(&self) -> bool {
        matches!(self, Self::Handshake { wm_detected: true })
    }
}
