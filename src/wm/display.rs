//! Display Module
//!
//! The window manager's view of the X server. `WindowSystem` is the set of
//! primitives the core needs; `X11Display` implements it over an x11rb
//! connection and is the only place that talks to the wire.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::shared::Geometry;
use crate::wm::decorations::FrameStyle;
use crate::wm::failure::{FailureHandler, ServerError};

/// Attributes of a window as needed for framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub geometry: Geometry,
    pub map_state: MapState,
    pub override_redirect: bool,
}

impl WindowAttributes {
    pub fn is_viewable(&self) -> bool {
        self.map_state == MapState::VIEWABLE
    }
}

/// Result of querying a window's position in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub root: Window,
    /// Children in bottom-to-top stacking order
    pub children: Vec<Window>,
}

/// A configure request's field mask together with its values.
///
/// Only fields whose bit is set in `mask` are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowChanges {
    pub mask: ConfigWindow,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    pub sibling: Window,
    pub stack_mode: StackMode,
}

impl WindowChanges {
    pub fn has(&self, field: ConfigWindow) -> bool {
        u16::from(self.mask) & u16::from(field) != 0
    }

    /// Request aux carrying exactly the masked fields
    pub fn to_aux(&self) -> ConfigureWindowAux {
        let mut aux = ConfigureWindowAux::new();
        if self.has(ConfigWindow::X) {
            aux = aux.x(i32::from(self.x));
        }
        if self.has(ConfigWindow::Y) {
            aux = aux.y(i32::from(self.y));
        }
        if self.has(ConfigWindow::WIDTH) {
            aux = aux.width(u32::from(self.width));
        }
        if self.has(ConfigWindow::HEIGHT) {
            aux = aux.height(u32::from(self.height));
        }
        if self.has(ConfigWindow::BORDER_WIDTH) {
            aux = aux.border_width(u32::from(self.border_width));
        }
        if self.has(ConfigWindow::SIBLING) {
            aux = aux.sibling(self.sibling);
        }
        if self.has(ConfigWindow::STACK_MODE) {
            aux = aux.stack_mode(self.stack_mode);
        }
        aux
    }
}

impl From<&ConfigureRequestEvent> for WindowChanges {
    fn from(e: &ConfigureRequestEvent) -> Self {
        Self {
            mask: e.value_mask,
            x: e.x,
            y: e.y,
            width: e.width,
            height: e.height,
            border_width: e.border_width,
            sibling: e.sibling,
            stack_mode: e.stack_mode,
        }
    }
}

/// Substructure redirection plus notification. Selected on root to become
/// the window manager and on every frame to keep its client under control.
pub fn substructure_event_mask() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY
}

/// Primitive operations on the window system.
///
/// Requests that have no reply are fire-and-forget: if the server rejects
/// them, the failure is delivered to the installed `FailureHandler` rather
/// than returned here. An `Err` means the connection itself is unusable or,
/// for requests with a reply, that the reply could not be obtained.
pub trait WindowSystem {
    /// Root window of the managed screen
    fn root(&self) -> Window;

    /// Name of the display, for diagnostics
    fn display_name(&self) -> &str;

    fn select_events(&mut self, window: Window, mask: EventMask) -> Result<()>;

    /// Install a failure handler, returning the one it replaces
    fn set_failure_handler(&mut self, handler: FailureHandler) -> FailureHandler;

    /// Flush and wait until the server has processed every request sent so
    /// far. Failures they caused are handed to the failure handler before
    /// this returns.
    fn sync(&mut self, discard_pending: bool) -> Result<()>;

    fn window_attributes(&mut self, window: Window) -> Result<WindowAttributes>;

    /// Create an unmapped child of `parent` styled as a frame
    fn create_frame(&mut self, parent: Window, geometry: Geometry, style: &FrameStyle) -> Result<Window>;

    fn add_to_save_set(&mut self, window: Window) -> Result<()>;

    fn remove_from_save_set(&mut self, window: Window) -> Result<()>;

    fn reparent(&mut self, window: Window, parent: Window, x: i16, y: i16) -> Result<()>;

    fn map(&mut self, window: Window) -> Result<()>;

    fn unmap(&mut self, window: Window) -> Result<()>;

    fn destroy(&mut self, window: Window) -> Result<()>;

    fn configure(&mut self, window: Window, changes: &WindowChanges) -> Result<()>;

    fn query_tree(&mut self, window: Window) -> Result<Tree>;

    fn grab_server(&mut self) -> Result<()>;

    fn ungrab_server(&mut self) -> Result<()>;

    /// Block until the next event. Server failures never come out of here;
    /// they go to the failure handler.
    fn next_event(&mut self) -> Result<Event>;
}

/// `WindowSystem` over an x11rb connection.
///
/// The connection is closed when this is dropped.
pub struct X11Display {
    conn: RustConnection,
    root: Window,
    root_depth: u8,
    display_name: String,
    failure_handler: FailureHandler,
    /// Events read while synchronising, handed out before reading more
    pending: VecDeque<Event>,
}

impl X11Display {
    /// Connect to `display`, or `$DISPLAY` when `None`
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let display_name = display
            .map(str::to_owned)
            .or_else(|| std::env::var("DISPLAY").ok())
            .unwrap_or_default();

        let (conn, screen_num) = x11rb::connect(display)
            .with_context(|| format!("Failed to connect to X server {:?}", display_name))?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let root_depth = screen.root_depth;

        info!("Connected to X server {}, screen {}, root window 0x{:x}", display_name, screen_num, root);
        info!("Screen size: {}x{}", screen.width_in_pixels, screen.height_in_pixels);

        Ok(Self {
            conn,
            root,
            root_depth,
            display_name,
            failure_handler: FailureHandler::Default,
            pending: VecDeque::new(),
        })
    }

    fn report(&mut self, error: &x11rb::x11_utils::X11Error) {
        self.failure_handler.handle(&ServerError::from(error));
    }
}

impl WindowSystem for X11Display {
    fn root(&self) -> Window {
        self.root
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn select_events(&mut self, window: Window, mask: EventMask) -> Result<()> {
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        Ok(())
    }

    fn set_failure_handler(&mut self, handler: FailureHandler) -> FailureHandler {
        std::mem::replace(&mut self.failure_handler, handler)
    }

    fn sync(&mut self, discard_pending: bool) -> Result<()> {
        self.conn.sync().context("Failed to synchronise with X server")?;

        // Every failure caused by earlier requests is queued by now
        while let Some(event) = self.conn.poll_for_event()? {
            match event {
                Event::Error(e) => self.report(&e),
                other => self.pending.push_back(other),
            }
        }

        if discard_pending {
            debug!("Discarding {} pending events", self.pending.len());
            self.pending.clear();
        }
        Ok(())
    }

    fn window_attributes(&mut self, window: Window) -> Result<WindowAttributes> {
        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        let geom = self.conn.get_geometry(window)?.reply()?;

        Ok(WindowAttributes {
            geometry: Geometry::from(&geom),
            map_state: attrs.map_state,
            override_redirect: attrs.override_redirect,
        })
    }

    fn create_frame(&mut self, parent: Window, geometry: Geometry, style: &FrameStyle) -> Result<Window> {
        let frame = self.conn.generate_id()?;
        self.conn.create_window(
            self.root_depth,
            frame,
            parent,
            geometry.x,
            geometry.y,
            geometry.width,
            geometry.height,
            style.border_width,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new()
                .border_pixel(style.border_color)
                .background_pixel(style.background_color),
        )?;
        Ok(frame)
    }

    fn add_to_save_set(&mut self, window: Window) -> Result<()> {
        self.conn.change_save_set(SetMode::INSERT, window)?;
        Ok(())
    }

    fn remove_from_save_set(&mut self, window: Window) -> Result<()> {
        self.conn.change_save_set(SetMode::DELETE, window)?;
        Ok(())
    }

    fn reparent(&mut self, window: Window, parent: Window, x: i16, y: i16) -> Result<()> {
        self.conn.reparent_window(window, parent, x, y)?;
        Ok(())
    }

    fn map(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&mut self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn destroy(&mut self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn configure(&mut self, window: Window, changes: &WindowChanges) -> Result<()> {
        self.conn.configure_window(window, &changes.to_aux())?;
        Ok(())
    }

    fn query_tree(&mut self, window: Window) -> Result<Tree> {
        let reply = self.conn.query_tree(window)?.reply()?;
        Ok(Tree {
            root: reply.root,
            children: reply.children,
        })
    }

    fn grab_server(&mut self) -> Result<()> {
        self.conn.grab_server()?;
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.conn.ungrab_server()?;
        self.conn.flush()?;
        Ok(())
    }

    fn next_event(&mut self) -> Result<Event> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }

        loop {
            self.conn.flush()?;
            match self.conn.wait_for_event().context("X server connection lost")? {
                Event::Error(e) => self.report(&e),
                event => return Ok(event),
            }
        }
    }
}
