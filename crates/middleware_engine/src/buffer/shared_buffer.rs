//! Per-purpose shared stream buffers
//!
//! The manager owns two of these: a `u32` render-info stream and an `f32`
//! attach-info stream. Participants append to them during a frame phase and
//! the boundary layer reads them back through a typed view.

use crate::buffer::io_buffer::{IoBuffer, ResizeCallback};

/// Element type of the view a shared buffer exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedArrayType {
    /// 32-bit unsigned integers
    Uint32,
    /// 32-bit floats
    Float32,
}

/// Typed view over a shared buffer's written region
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SharedView<'a> {
    /// `u32` elements
    Uint32(&'a [u32]),
    /// `f32` elements
    Float32(&'a [f32]),
}

impl SharedView<'_> {
    /// Number of elements in the view
    pub fn len(&self) -> usize {
        match self {
            SharedView::Uint32(values) => values.len(),
            SharedView::Float32(values) => values.len(),
        }
    }

    /// Whether the view is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single reusable buffer with a fixed element type
#[derive(Debug)]
pub struct SharedBufferManager {
    array_type: TypedArrayType,
    buffer: IoBuffer,
}

impl SharedBufferManager {
    /// Create a shared buffer with `initial_bytes` reserved
    pub fn new(array_type: TypedArrayType, initial_bytes: usize) -> Self {
        Self {
            array_type,
            buffer: IoBuffer::new(initial_bytes),
        }
    }

    /// Element type fixed at construction
    pub fn array_type(&self) -> TypedArrayType {
        self.array_type
    }

    /// Rewind the write cursor to zero
    pub fn reset(&mut self) {
        self.buffer.reset();
    }

    /// Rewind and write the leading zero header slot.
    ///
    /// Downstream consumers patch the header with a record count once the
    /// phase is done (see `IoBuffer::write_u32_at`).
    pub fn reset_with_header(&mut self) {
        self.buffer.reset();
        self.buffer.write_u32(0);
    }

    /// Underlying stream
    pub fn buffer(&self) -> &IoBuffer {
        &self.buffer
    }

    /// Underlying stream for writes
    pub fn buffer_mut(&mut self) -> &mut IoBuffer {
        &mut self.buffer
    }

    /// Typed view of everything written this phase
    pub fn shared_view(&self) -> SharedView<'_> {
        match self.array_type {
            TypedArrayType::Uint32 => SharedView::Uint32(self.buffer.as_u32()),
            TypedArrayType::Float32 => SharedView::Float32(self.buffer.as_f32()),
        }
    }

    /// Register a callback fired when the storage reallocates, so a boundary
    /// layer holding a view can rebuild it
    pub fn set_resize_callback(&mut self, callback: ResizeCallback) {
        self.buffer.set_resize_callback(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_after_reset() {
        let mut render_info = SharedBufferManager::new(TypedArrayType::Uint32, 64);
        render_info.buffer_mut().write_u32(9);
        render_info.reset_with_header();

        assert_eq!(render_info.shared_view(), SharedView::Uint32(&[0]));
        assert_eq!(render_info.buffer().cur_pos(), 4);
    }

    #[test]
    fn test_view_matches_type() {
        let mut attach_info = SharedBufferManager::new(TypedArrayType::Float32, 16);
        attach_info.buffer_mut().write_f32(0.5);
        attach_info.buffer_mut().write_f32(-2.0);

        match attach_info.shared_view() {
            SharedView::Float32(values) => assert_eq!(values, &[0.5, -2.0]),
            SharedView::Uint32(_) => panic!("attach info should be a float view"),
        }
        assert_eq!(attach_info.shared_view().len(), 2);

        attach_info.reset();
        assert!(attach_info.shared_view().is_empty());
    }
}
