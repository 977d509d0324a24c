//! Recording `WindowSystem` for tests.
//!
//! Keeps a small window table so framing has something to read, records
//! every request in order, and replays scripted events.

use std::collections::{HashMap, VecDeque};

use anyhow::{anyhow, bail, Result};
use x11rb::protocol::xproto::{EventMask, MapState, Window, CHANGE_WINDOW_ATTRIBUTES_REQUEST};
use x11rb::protocol::{ErrorKind, Event};

use crate::shared::Geometry;
use crate::wm::decorations::FrameStyle;
use crate::wm::display::{Tree, WindowAttributes, WindowChanges, WindowSystem};
use crate::wm::failure::{FailureHandler, ServerError};

pub const ROOT: Window = 0x100;

const FIRST_FRAME_ID: Window = 0xa00001;

/// One request as seen by the fake server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SelectEvents(Window, u32),
    Sync(bool),
    GetAttributes(Window),
    CreateFrame {
        parent: Window,
        frame: Window,
        geometry: (i16, i16, u16, u16),
        style: FrameStyle,
    },
    AddToSaveSet(Window),
    RemoveFromSaveSet(Window),
    Reparent(Window, Window, i16, i16),
    Map(Window),
    Unmap(Window),
    Destroy(Window),
    Configure(Window, WindowChanges),
    QueryTree(Window),
    GrabServer,
    UngrabServer,
}

#[derive(Debug, Clone)]
struct FakeWindow {
    geometry: Geometry,
    map_state: MapState,
    override_redirect: bool,
    parent: Window,
}

pub struct FakeDisplay {
    windows: HashMap<Window, FakeWindow>,
    /// Creation order, used as stacking order for `query_tree`
    order: Vec<Window>,
    calls: Vec<Call>,
    events: VecDeque<Event>,
    failure_handler: FailureHandler,
    queued_failures: Vec<ServerError>,
    next_id: Window,
    other_manager: bool,
    fail_requests: bool,
    fail_when: Option<fn(&Call) -> bool>,
    fail_query_tree: bool,
    reported_root: Window,
}

impl FakeDisplay {
    pub fn new() -> Self {
        Self {
            windows: HashMap::new(),
            order: Vec::new(),
            calls: Vec::new(),
            events: VecDeque::new(),
            failure_handler: FailureHandler::Default,
            queued_failures: Vec::new(),
            next_id: FIRST_FRAME_ID,
            other_manager: false,
            fail_requests: false,
            fail_when: None,
            fail_query_tree: false,
            reported_root: ROOT,
        }
    }

    /// Add a top-level window
    pub fn add_window(
        &mut self,
        window: Window,
        (x, y, width, height): (i16, i16, u16, u16),
        map_state: MapState,
        override_redirect: bool,
    ) {
        self.windows.insert(
            window,
            FakeWindow {
                geometry: Geometry::new(x, y, width, height),
                map_state,
                override_redirect,
                parent: ROOT,
            },
        );
        self.order.push(window);
    }

    /// Behave as if another manager already selected redirection on root
    pub fn refuse_redirect(&mut self) {
        self.other_manager = true;
    }

    /// Make every request without a reply fail after being recorded
    pub fn fail_requests(&mut self, fail: bool) {
        self.fail_requests = fail;
    }

    /// Make only the requests matching `pred` fail after being recorded
    pub fn fail_when(&mut self, pred: fn(&Call) -> bool) {
        self.fail_when = Some(pred);
    }

    pub fn fail_query_tree(&mut self) {
        self.fail_query_tree = true;
    }

    /// Root id that `query_tree` will claim
    pub fn report_root(&mut self, root: Window) {
        self.reported_root = root;
    }

    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn failure_handler(&self) -> FailureHandler {
        self.failure_handler
    }

    pub fn exists(&self, window: Window) -> bool {
        self.windows.contains_key(&window)
    }

    pub fn is_mapped(&self, window: Window) -> bool {
        self.windows
            .get(&window)
            .is_some_and(|w| w.map_state != MapState::UNMAPPED)
    }

    pub fn parent_of(&self, window: Window) -> Option<Window> {
        self.windows.get(&window).map(|w| w.parent)
    }

    fn request(&mut self, call: Call) -> Result<()> {
        let fails = self.fail_requests || self.fail_when.is_some_and(|pred| pred(&call));
        self.calls.push(call);
        if fails {
            bail!("connection closed");
        }
        Ok(())
    }

    fn window_mut(&mut self, window: Window) -> Option<&mut FakeWindow> {
        self.windows.get_mut(&window)
    }
}

impl WindowSystem for FakeDisplay {
    fn root(&self) -> Window {
        ROOT
    }

    fn display_name(&self) -> &str {
        ":99"
    }

    fn select_events(&mut self, window: Window, mask: EventMask) -> Result<()> {
        self.request(Call::SelectEvents(window, u32::from(mask)))?;
        let redirect = u32::from(mask) & u32::from(EventMask::SUBSTRUCTURE_REDIRECT) != 0;
        if window == ROOT && redirect && self.other_manager {
            self.queued_failures.push(ServerError {
                kind: ErrorKind::Access,
                request: CHANGE_WINDOW_ATTRIBUTES_REQUEST,
                resource: ROOT,
                sequence: self.calls.len() as u16,
            });
        }
        Ok(())
    }

    fn set_failure_handler(&mut self, handler: FailureHandler) -> FailureHandler {
        std::mem::replace(&mut self.failure_handler, handler)
    }

    fn sync(&mut self, discard_pending: bool) -> Result<()> {
        self.request(Call::Sync(discard_pending))?;
        for failure in std::mem::take(&mut self.queued_failures) {
            self.failure_handler.handle(&failure);
        }
        if discard_pending {
            self.events.clear();
        }
        Ok(())
    }

    fn window_attributes(&mut self, window: Window) -> Result<WindowAttributes> {
        self.calls.push(Call::GetAttributes(window));
        let w = self
            .windows
            .get(&window)
            .ok_or_else(|| anyhow!("BadWindow 0x{:x}", window))?;
        Ok(WindowAttributes {
            geometry: w.geometry,
            map_state: w.map_state,
            override_redirect: w.override_redirect,
        })
    }

    fn create_frame(&mut self, parent: Window, geometry: Geometry, style: &FrameStyle) -> Result<Window> {
        let frame = self.next_id;
        self.next_id += 1;
        self.request(Call::CreateFrame {
            parent,
            frame,
            geometry: (geometry.x, geometry.y, geometry.width, geometry.height),
            style: *style,
        })?;
        self.windows.insert(
            frame,
            FakeWindow {
                geometry,
                map_state: MapState::UNMAPPED,
                override_redirect: false,
                parent,
            },
        );
        self.order.push(frame);
        Ok(frame)
    }

    fn add_to_save_set(&mut self, window: Window) -> Result<()> {
        self.request(Call::AddToSaveSet(window))
    }

    fn remove_from_save_set(&mut self, window: Window) -> Result<()> {
        self.request(Call::RemoveFromSaveSet(window))
    }

    fn reparent(&mut self, window: Window, parent: Window, x: i16, y: i16) -> Result<()> {
        self.request(Call::Reparent(window, parent, x, y))?;
        if let Some(w) = self.window_mut(window) {
            w.parent = parent;
        }
        Ok(())
    }

    fn map(&mut self, window: Window) -> Result<()> {
        self.request(Call::Map(window))?;
        if let Some(w) = self.window_mut(window) {
            w.map_state = MapState::VIEWABLE;
        }
        Ok(())
    }

    fn unmap(&mut self, window: Window) -> Result<()> {
        self.request(Call::Unmap(window))?;
        if let Some(w) = self.window_mut(window) {
            w.map_state = MapState::UNMAPPED;
        }
        Ok(())
    }

    fn destroy(&mut self, window: Window) -> Result<()> {
        self.request(Call::Destroy(window))?;
        self.windows.remove(&window);
        self.order.retain(|&w| w != window);
        Ok(())
    }

    fn configure(&mut self, window: Window, changes: &WindowChanges) -> Result<()> {
        self.request(Call::Configure(window, *changes))
    }

    fn query_tree(&mut self, window: Window) -> Result<Tree> {
        self.calls.push(Call::QueryTree(window));
        if self.fail_query_tree {
            bail!("BadWindow 0x{:x}", window);
        }
        let children = self
            .order
            .iter()
            .copied()
            .filter(|w| self.windows.get(w).is_some_and(|fw| fw.parent == window))
            .collect();
        Ok(Tree {
            root: self.reported_root,
            children,
        })
    }

    fn grab_server(&mut self) -> Result<()> {
        self.request(Call::GrabServer)
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.request(Call::UngrabServer)
    }

    fn next_event(&mut self) -> Result<Event> {
        self.events
            .pop_front()
            .ok_or_else(|| anyhow!("event stream closed"))
    }
}
