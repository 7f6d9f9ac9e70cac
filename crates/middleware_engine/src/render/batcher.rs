//! # Batcher Handoff
//!
//! The buffer manager never talks to the GPU. Once a frame's mesh buffers are
//! uploaded it forwards each format's sub-buffers to a `Batcher2d`, keyed by
//! an accessory id that tells the batcher these draws bypass normal material
//! batching.
//!
//! ## Architecture
//!
//! - **Batcher2d**: the handoff point implemented by the 2D renderer
//! - **MeshBatch**: one format's submission for one frame
//! - **QueuedBatcher**: in-process batcher that queues submissions until the
//!   render loop drains them

use crate::render::ui_mesh_buffer::UiMeshBuffer;

/// Receiver of uploaded middleware sub-buffers
pub trait Batcher2d {
    /// Take ownership of one format's sub-buffers for this frame.
    ///
    /// Called once per vertex format per frame, after upload.
    fn sync_mesh_buffers_to_native(&mut self, accessory_id: u16, buffers: Vec<UiMeshBuffer>);
}

/// One format's sub-buffers submitted in one frame
#[derive(Debug, Clone)]
pub struct MeshBatch {
    /// Batching key (see `render::vertex_format::accessory_id_for`)
    pub accessory_id: u16,

    /// Sub-buffers in `MeshBuffer` order
    pub buffers: Vec<UiMeshBuffer>,
}

impl MeshBatch {
    /// Total vertices across all sub-buffers
    pub fn vertex_count(&self) -> usize {
        self.buffers.iter().map(UiMeshBuffer::vertex_count).sum()
    }

    /// Total indices across all sub-buffers
    pub fn index_count(&self) -> usize {
        self.buffers.iter().map(UiMeshBuffer::index_count).sum()
    }

    /// Whether every sub-buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffers.iter().all(UiMeshBuffer::is_empty)
    }
}

/// Batcher that queues submissions for the render loop
#[derive(Debug, Default)]
pub struct QueuedBatcher {
    batches: Vec<MeshBatch>,
}

impl QueuedBatcher {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Submissions queued since the last drain
    pub fn batches(&self) -> &[MeshBatch] {
        &self.batches
    }

    /// Take every queued submission
    pub fn drain(&mut self) -> Vec<MeshBatch> {
        std::mem::take(&mut self.batches)
    }

    /// Number of queued submissions
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Drop every queued submission
    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

impl Batcher2d for QueuedBatcher {
    fn sync_mesh_buffers_to_native(&mut self, accessory_id: u16, buffers: Vec<UiMeshBuffer>) {
        log::trace!(
            "Queued middleware batch {} with {} sub-buffers",
            accessory_id,
            buffers.len()
        );
        self.batches.push(MeshBatch { accessory_id, buffers });
    }
}
