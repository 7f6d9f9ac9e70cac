//! # Rendering Handoff
//!
//! The pieces of the 2D renderer the middleware buffers talk to. Nothing in
//! here encodes GPU commands; it describes what gets handed over and to whom.
//!
//! - **VertexFormat**: opaque layout codes and their batching keys
//! - **UiMeshBuffer**: one uploaded sub-buffer
//! - **Batcher2d**: receiver of each frame's uploaded sub-buffers

pub mod batcher;
pub mod ui_mesh_buffer;
pub mod vertex_format;

pub use batcher::{Batcher2d, MeshBatch, QueuedBatcher};
pub use ui_mesh_buffer::UiMeshBuffer;
pub use vertex_format::{
    accessory_id_for, VertexFormat, MIDDLEWARE_ACCESSORY_ID, UI_MIDDLEWARE_ACCESSORY_ID,
};
