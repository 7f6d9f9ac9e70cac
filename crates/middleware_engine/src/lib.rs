//! # Middleware Engine
//!
//! Per-frame buffer pools that bridge skeletal animation middleware to a 2D
//! batching renderer.
//!
//! ## Features
//!
//! - **Mesh Buffers**: one pooled vertex/index buffer per vertex format, split
//!   into 16-bit addressable sub-buffers and refilled every frame
//! - **Shared Streams**: render-info (`u32`) and attach-info (`f32`) streams
//!   reset once per frame
//! - **Deferred Registration**: participants join or leave the update list
//!   only at flush points, so the list never changes mid-iteration, even
//!   when a participant queues the request itself
//! - **Batcher Handoff**: uploaded sub-buffers are forwarded per format with
//!   a reserved accessory id
//!
//! ## Quick Start
//!
//! ```rust
//! use middleware_engine::prelude::*;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct Sprite;
//!
//! impl Middleware for Sprite {
//!     fn update(&mut self, _dt: f32, _frame: &mut FrameContext<'_>) {}
//!
//!     fn render(&mut self, _dt: f32, frame: &mut FrameContext<'_>) {
//!         let mesh = frame.buffers.mesh_buffer(VertexFormat::XYZUVCC);
//!         mesh.check_space(1, 1).unwrap();
//!         let index = mesh.vertex_offset() as u16;
//!         mesh.write_vertices(&[0.0; 7]).unwrap();
//!         mesh.write_indices(&[index]).unwrap();
//!     }
//! }
//!
//! let sprite = Rc::new(RefCell::new(Sprite));
//! let mut manager = MiddlewareManager::new(MiddlewareConfig::default());
//! let handle = manager.register(sprite.clone());
//! manager.add_participant(handle);
//!
//! let mut batcher = QueuedBatcher::new();
//! manager.update(1.0 / 60.0);
//! manager.render(1.0 / 60.0, &mut batcher);
//!
//! let batches = batcher.drain();
//! assert_eq!(batches[0].accessory_id, UI_MIDDLEWARE_ACCESSORY_ID);
//! assert_eq!(batches[0].vertex_count(), 1);
//!
//! manager.unregister(handle);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod buffer;
pub mod config;
pub mod foundation;
pub mod middleware;
pub mod render;

/// Common imports for middleware users
pub mod prelude {
    pub use crate::{
        buffer::{BufferError, IoBuffer, MeshBuffer, SharedBufferManager, SharedView, TypedArrayType},
        config::{Config, ConfigError, MiddlewareConfig},
        middleware::{
            FrameBuffers, FrameContext, FrameStats, Middleware, MiddlewareHandle, MiddlewareManager,
            ParticipantState, SharedMiddleware,
        },
        render::{
            Batcher2d, MeshBatch, QueuedBatcher, UiMeshBuffer, VertexFormat,
            MIDDLEWARE_ACCESSORY_ID, UI_MIDDLEWARE_ACCESSORY_ID,
        },
    };
}
