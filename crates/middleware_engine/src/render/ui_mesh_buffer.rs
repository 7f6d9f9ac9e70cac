//! Uploaded sub-buffer handed to the 2D batcher
//!
//! A `UiMeshBuffer` is the staging copy of one logical sub-buffer after
//! `upload_vb`/`upload_ib`. Data is reference counted so the batcher can keep
//! a frame's submission alive while the owning `MeshBuffer` is refilled.

use crate::render::vertex_format::VertexFormat;
use std::sync::Arc;

/// One uploaded vertex/index sub-buffer
#[derive(Debug, Clone)]
pub struct UiMeshBuffer {
    vertex_format: VertexFormat,
    sub_buffer: usize,
    vertex_words: Arc<[u32]>,
    indices: Arc<[u16]>,
    vertex_count: usize,
}

impl UiMeshBuffer {
    /// Create an empty sub-buffer handle
    pub fn new(vertex_format: VertexFormat, sub_buffer: usize) -> Self {
        Self {
            vertex_format,
            sub_buffer,
            vertex_words: Arc::from(Vec::<u32>::new()),
            indices: Arc::from(Vec::<u16>::new()),
            vertex_count: 0,
        }
    }

    /// Replace the vertex data with this frame's words
    pub fn set_vertex_data(&mut self, words: &[u32]) {
        let words_per_vertex = self.vertex_format.words_per_vertex();
        self.vertex_count = words.len() / words_per_vertex;
        self.vertex_words = Arc::from(words);
    }

    /// Replace the index data with this frame's indices
    pub fn set_index_data(&mut self, indices: &[u16]) {
        self.indices = Arc::from(indices);
    }

    /// Vertex layout of this sub-buffer
    pub fn vertex_format(&self) -> VertexFormat {
        self.vertex_format
    }

    /// Position of this sub-buffer inside its `MeshBuffer`
    pub fn sub_buffer(&self) -> usize {
        self.sub_buffer
    }

    /// Raw vertex words
    pub fn vertex_words(&self) -> &[u32] {
        &self.vertex_words
    }

    /// Vertex data reinterpreted as floats
    pub fn vertex_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertex_words)
    }

    /// Vertex data as bytes, ready for a GPU upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertex_words)
    }

    /// Index data
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Number of complete vertices uploaded
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of indices uploaded
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing was uploaded into this sub-buffer
    pub fn is_empty(&self) -> bool {
        self.vertex_words.is_empty() && self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_count_follows_stride() {
        let mut buffer = UiMeshBuffer::new(VertexFormat::XYZUVCC, 0);
        assert!(buffer.is_empty());

        buffer.set_vertex_data(&[0u32; 14]);
        buffer.set_index_data(&[0, 1, 0]);
        assert_eq!(buffer.vertex_count(), 2);
        assert_eq!(buffer.index_count(), 3);
        assert_eq!(buffer.vertex_bytes().len(), 56);
        assert_eq!(buffer.index_bytes().len(), 6);
    }

    #[test]
    fn test_clones_share_frame_data() {
        let mut buffer = UiMeshBuffer::new(VertexFormat::XYZUVC, 1);
        buffer.set_vertex_data(&[1.5f32.to_bits(); 6]);
        let submitted = buffer.clone();

        buffer.set_vertex_data(&[]);
        assert_eq!(submitted.vertex_count(), 1);
        assert_eq!(submitted.vertex_floats()[0], 1.5);
        assert_eq!(submitted.sub_buffer(), 1);
        assert_eq!(buffer.vertex_count(), 0);
    }
}
