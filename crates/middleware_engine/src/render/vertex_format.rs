//! Vertex format codes and their batching keys
//!
//! The surrounding renderer defines the integer codes; the buffer manager
//! treats them as opaque map keys. Only the two layouts skeletal middleware
//! emits are known here, so their stride can be derived.

use std::fmt;

/// Accessory id for middleware batches that bypass material batching
pub const MIDDLEWARE_ACCESSORY_ID: u16 = 65534;

/// Accessory id for the UI/sprite vertex layout (`VertexFormat::XYZUVCC`)
pub const UI_MIDDLEWARE_ACCESSORY_ID: u16 = 65535;

/// Bytes in one vertex word (every attribute is packed into 32-bit words)
pub const BYTES_PER_WORD: usize = 4;

/// Integer code identifying a GPU vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexFormat(pub i32);

impl VertexFormat {
    /// Position (x, y, z), texture coordinate (u, v) and one packed colour
    pub const XYZUVC: Self = Self(5);

    /// Position, texture coordinate, colour and dark (tint-black) colour.
    /// This is the UI/sprite layout.
    pub const XYZUVCC: Self = Self(6);

    /// Words per vertex for known layouts
    pub const fn known_words_per_vertex(self) -> Option<usize> {
        match self {
            Self::XYZUVC => Some(6),
            Self::XYZUVCC => Some(7),
            _ => None,
        }
    }

    /// Words per vertex, falling back to the `XYZUVC` stride for unknown codes
    pub fn words_per_vertex(self) -> usize {
        self.known_words_per_vertex().unwrap_or(6)
    }

    /// Bytes per vertex
    pub fn stride_bytes(self) -> usize {
        self.words_per_vertex() * BYTES_PER_WORD
    }

    /// Whether this is the UI/sprite layout
    pub fn is_ui_layout(self) -> bool {
        self == Self::XYZUVCC
    }

    /// Accessory id the batcher groups this format's sub-buffers under
    pub fn accessory_id(self) -> u16 {
        accessory_id_for(self)
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::XYZUVC => write!(f, "VF_XYZUVC"),
            Self::XYZUVCC => write!(f, "VF_XYZUVCC"),
            Self(code) => write!(f, "VF({})", code),
        }
    }
}

impl From<i32> for VertexFormat {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

/// Batching key for a format: the UI layout gets its own reserved id,
/// every other format shares the generic middleware id.
pub fn accessory_id_for(format: VertexFormat) -> u16 {
    if format.is_ui_layout() {
        UI_MIDDLEWARE_ACCESSORY_ID
    } else {
        MIDDLEWARE_ACCESSORY_ID
    }
}
