//! Mesh Buffer
//!
//! Pooled vertex/index storage for one vertex format, shared by every
//! middleware instance that renders with that format.
//!
//! # Sub-buffers
//!
//! Indices are 16-bit, so one vertex buffer can address at most
//! `max_vertices_per_buffer` vertices. When a participant asks for more room
//! than the current sub-buffer has left, `check_space` moves on to the next
//! sub-buffer (creating it on first use). Each sub-buffer is forwarded to the
//! batcher as its own `UiMeshBuffer`.
//!
//! # Frame lifecycle
//!
//! ```text
//! reset() -> check_space()/write_*() ... -> upload_ib() + upload_vb() -> ui_mesh_buffers()
//!    ^                                                                          |
//!    +------------------------------- next frame -------------------------------+
//! ```
//!
//! Once either upload has run the contents belong to the batcher and writes
//! are refused until the next `reset`.

use crate::buffer::io_buffer::IoBuffer;
use crate::buffer::BufferError;
use crate::config::MiddlewareConfig;
use crate::render::ui_mesh_buffer::UiMeshBuffer;
use crate::render::vertex_format::VertexFormat;
use bitflags::bitflags;

const INDEX_BYTES: usize = std::mem::size_of::<u16>();

bitflags! {
    /// Which halves of the mesh buffer were uploaded this frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UploadState: u8 {
        /// Vertex data handed off
        const VERTEX = 0b01;
        /// Index data handed off
        const INDEX = 0b10;
    }
}

/// Vertex and index sub-buffers for one vertex format
#[derive(Debug)]
pub struct MeshBuffer {
    format: VertexFormat,
    vertex_buffers: Vec<IoBuffer>,
    index_buffers: Vec<IoBuffer>,
    ui_mesh_buffers: Vec<UiMeshBuffer>,
    buffer_pos: usize,
    max_vertices: usize,
    initial_vertex_bytes: usize,
    initial_index_bytes: usize,
    upload_state: UploadState,
}

impl MeshBuffer {
    /// Create a mesh buffer with a single empty sub-buffer
    pub fn new(format: VertexFormat, config: &MiddlewareConfig) -> Self {
        let mut buffer = Self {
            format,
            vertex_buffers: Vec::new(),
            index_buffers: Vec::new(),
            ui_mesh_buffers: Vec::new(),
            buffer_pos: 0,
            max_vertices: config.max_vertices_per_buffer as usize,
            initial_vertex_bytes: config.initial_vertex_bytes,
            initial_index_bytes: config.initial_index_bytes,
            upload_state: UploadState::empty(),
        };
        buffer.push_sub_buffer();
        buffer
    }

    fn push_sub_buffer(&mut self) {
        let pos = self.vertex_buffers.len();
        self.vertex_buffers.push(IoBuffer::new(self.initial_vertex_bytes));
        self.index_buffers.push(IoBuffer::new(self.initial_index_bytes));
        self.ui_mesh_buffers.push(UiMeshBuffer::new(self.format, pos));
    }

    /// Vertex format served by this buffer
    pub fn format(&self) -> VertexFormat {
        self.format
    }

    /// Sub-buffer currently being written
    pub fn buffer_pos(&self) -> usize {
        self.buffer_pos
    }

    /// Sub-buffers in use this frame
    pub fn buffer_count(&self) -> usize {
        self.buffer_pos + 1
    }

    /// Sub-buffers ever allocated (kept across frames for reuse)
    pub fn allocated_buffer_count(&self) -> usize {
        self.vertex_buffers.len()
    }

    /// What has been uploaded since the last reset
    pub fn upload_state(&self) -> UploadState {
        self.upload_state
    }

    /// Rewind every sub-buffer for a new frame
    pub fn reset(&mut self) {
        self.buffer_pos = 0;
        for buffer in &mut self.vertex_buffers {
            buffer.reset();
        }
        for buffer in &mut self.index_buffers {
            buffer.reset();
        }
        self.upload_state = UploadState::empty();
    }

    fn ensure_writable(&self) -> Result<(), BufferError> {
        if self.upload_state.is_empty() {
            Ok(())
        } else {
            Err(BufferError::Sealed { format: self.format })
        }
    }

    /// Vertices already in the current sub-buffer.
    ///
    /// Indices written next must be offset by this value.
    pub fn vertex_offset(&self) -> usize {
        self.vertex_buffers[self.buffer_pos].cur_pos() / self.format.stride_bytes()
    }

    /// Reserve room for `vertex_count` vertices and `index_count` indices,
    /// rolling over to the next sub-buffer when the vertex limit would be hit
    pub fn check_space(&mut self, vertex_count: usize, index_count: usize) -> Result<(), BufferError> {
        self.ensure_writable()?;
        if vertex_count > self.max_vertices {
            return Err(BufferError::RequestTooLarge {
                requested: vertex_count,
                max: self.max_vertices,
            });
        }

        if self.vertex_offset() + vertex_count > self.max_vertices {
            self.next();
        }

        let stride = self.format.stride_bytes();
        self.vertex_buffers[self.buffer_pos].check_space(vertex_count * stride);
        self.index_buffers[self.buffer_pos].check_space(index_count * INDEX_BYTES);
        Ok(())
    }

    /// Move writes to the next sub-buffer, creating it if this is the
    /// furthest the buffer has been filled
    pub fn next(&mut self) {
        self.buffer_pos += 1;
        if self.buffer_pos >= self.vertex_buffers.len() {
            self.push_sub_buffer();
            log::debug!(
                "{} mesh buffer grew to {} sub-buffers",
                self.format,
                self.vertex_buffers.len()
            );
        }
    }

    /// Current vertex sub-buffer for direct writes
    pub fn current_vb_mut(&mut self) -> Result<&mut IoBuffer, BufferError> {
        self.ensure_writable()?;
        Ok(&mut self.vertex_buffers[self.buffer_pos])
    }

    /// Current index sub-buffer for direct writes
    pub fn current_ib_mut(&mut self) -> Result<&mut IoBuffer, BufferError> {
        self.ensure_writable()?;
        Ok(&mut self.index_buffers[self.buffer_pos])
    }

    /// Append vertex words to the current sub-buffer
    pub fn write_vertices(&mut self, data: &[f32]) -> Result<(), BufferError> {
        self.current_vb_mut()?.write_f32_slice(data);
        Ok(())
    }

    /// Append indices to the current sub-buffer
    pub fn write_indices(&mut self, indices: &[u16]) -> Result<(), BufferError> {
        self.current_ib_mut()?.write_u16_slice(indices);
        Ok(())
    }

    fn check_pos(&self, pos: usize) -> Result<(), BufferError> {
        if pos < self.vertex_buffers.len() {
            Ok(())
        } else {
            Err(BufferError::InvalidSubBuffer {
                pos,
                count: self.vertex_buffers.len(),
            })
        }
    }

    /// Vertex view of sub-buffer `pos`
    pub fn vb_typed_array(&self, pos: usize) -> Option<&[f32]> {
        self.vertex_buffers.get(pos).map(IoBuffer::as_f32)
    }

    /// Index view of sub-buffer `pos`
    pub fn ib_typed_array(&self, pos: usize) -> Option<&[u16]> {
        self.index_buffers.get(pos).map(IoBuffer::as_u16)
    }

    /// Mutable vertex view of sub-buffer `pos`
    pub fn vb_typed_array_mut(&mut self, pos: usize) -> Result<&mut [f32], BufferError> {
        self.ensure_writable()?;
        self.check_pos(pos)?;
        Ok(self.vertex_buffers[pos].as_f32_mut())
    }

    /// Mutable index view of sub-buffer `pos`
    pub fn ib_typed_array_mut(&mut self, pos: usize) -> Result<&mut [u16], BufferError> {
        self.ensure_writable()?;
        self.check_pos(pos)?;
        Ok(self.index_buffers[pos].as_u16_mut())
    }

    /// Bytes written to vertex sub-buffer `pos` this frame
    pub fn vb_typed_array_length(&self, pos: usize) -> usize {
        self.vertex_buffers.get(pos).map_or(0, IoBuffer::cur_pos)
    }

    /// Bytes written to index sub-buffer `pos` this frame
    pub fn ib_typed_array_length(&self, pos: usize) -> usize {
        self.index_buffers.get(pos).map_or(0, IoBuffer::cur_pos)
    }

    /// Stage every sub-buffer's vertex data for the batcher
    pub fn upload_vb(&mut self) {
        for (buffer, ui_buffer) in self.vertex_buffers.iter().zip(&mut self.ui_mesh_buffers) {
            ui_buffer.set_vertex_data(buffer.as_u32());
        }
        self.upload_state |= UploadState::VERTEX;
    }

    /// Stage every sub-buffer's index data for the batcher
    pub fn upload_ib(&mut self) {
        for (buffer, ui_buffer) in self.index_buffers.iter().zip(&mut self.ui_mesh_buffers) {
            ui_buffer.set_index_data(buffer.as_u16());
        }
        self.upload_state |= UploadState::INDEX;
    }

    /// Uploaded sub-buffers in order, as consumed by the batcher
    pub fn ui_mesh_buffers(&self) -> &[UiMeshBuffer] {
        &self.ui_mesh_buffers
    }
}
