//! # Middleware Buffers
//!
//! CPU-side storage filled by animation middleware every frame.
//!
//! - **IoBuffer**: growable aligned byte stream with a write cursor
//! - **SharedBufferManager**: one typed stream per auxiliary purpose
//!   (render info, attach info)
//! - **MeshBuffer**: per-vertex-format vertex/index pool split into
//!   16-bit addressable sub-buffers

pub mod io_buffer;
pub mod mesh_buffer;
pub mod shared_buffer;

pub use io_buffer::{IoBuffer, ResizeCallback};
pub use mesh_buffer::{MeshBuffer, UploadState};
pub use shared_buffer::{SharedBufferManager, SharedView, TypedArrayType};

use crate::render::vertex_format::VertexFormat;

/// Errors raised by buffer writes and lookups
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// The buffer was uploaded this frame and belongs to the batcher until reset
    #[error("{format} mesh buffer was already uploaded this frame")]
    Sealed {
        /// Format of the sealed buffer
        format: VertexFormat,
    },

    /// A single request needs more vertices than one sub-buffer can address
    #[error("Requested {requested} vertices, a sub-buffer holds at most {max}")]
    RequestTooLarge {
        /// Vertices requested
        requested: usize,
        /// Per sub-buffer limit
        max: usize,
    },

    /// Sub-buffer index past the allocated sub-buffers
    #[error("Sub-buffer {pos} does not exist ({count} allocated)")]
    InvalidSubBuffer {
        /// Requested position
        pos: usize,
        /// Allocated sub-buffers
        count: usize,
    },

    /// Access outside the written region of a stream
    #[error("Access of {len} bytes at {offset} is past the written region ({written} bytes)")]
    OutOfRange {
        /// Byte offset
        offset: usize,
        /// Access length
        len: usize,
        /// Bytes written so far
        written: usize,
    },
}
