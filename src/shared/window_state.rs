//! Window state shared between the framing engine and the display backend.

use x11rb::protocol::xproto::GetGeometryReply;

/// Window geometry, in the units the X server reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    pub fn new(x: i16, y: i16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }
}

impl From<&GetGeometryReply> for Geometry {
    fn from(reply: &GetGeometryReply) -> Self {
        Self::new(reply.x, reply.y, reply.width, reply.height)
    }
}
