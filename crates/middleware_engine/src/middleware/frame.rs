//! Buffers participants write into during a frame
//!
//! `FrameBuffers` owns one `MeshBuffer` per vertex format and the two shared
//! streams. Participants reach it through a `FrameContext`, which also
//! collects the add/remove requests they make while the manager is iterating
//! the update list.

use crate::buffer::{MeshBuffer, SharedBufferManager, TypedArrayType};
use crate::config::MiddlewareConfig;
use crate::middleware::participant::MiddlewareHandle;
use crate::render::vertex_format::VertexFormat;
use std::collections::BTreeMap;

/// What a participant gets during `update` and `render`
#[derive(Debug)]
pub struct FrameContext<'a> {
    /// Buffers to write this phase's output into
    pub buffers: &'a mut FrameBuffers,
    requests: Vec<(MiddlewareHandle, bool)>,
}

impl<'a> FrameContext<'a> {
    /// Wrap the frame's buffers with an empty request queue
    pub fn new(buffers: &'a mut FrameBuffers) -> Self {
        Self {
            buffers,
            requests: Vec::new(),
        }
    }

    /// Ask for a participant to join the update list.
    ///
    /// Queued once the current phase finishes; it joins at the next `update`.
    pub fn add_participant(&mut self, handle: MiddlewareHandle) {
        self.requests.push((handle, true));
    }

    /// Ask for a participant to leave the update list.
    ///
    /// A removal made during `update` takes effect before that frame's
    /// `render`.
    pub fn remove_participant(&mut self, handle: MiddlewareHandle) {
        self.requests.push((handle, false));
    }

    /// Requests made so far this phase, in order
    pub fn requests(&self) -> &[(MiddlewareHandle, bool)] {
        &self.requests
    }

    pub(crate) fn into_requests(self) -> Vec<(MiddlewareHandle, bool)> {
        self.requests
    }
}

/// Mesh buffers by format plus the render-info and attach-info streams
#[derive(Debug)]
pub struct FrameBuffers {
    config: MiddlewareConfig,
    mesh_buffers: BTreeMap<VertexFormat, MeshBuffer>,
    render_info: SharedBufferManager,
    attach_info: SharedBufferManager,
}

impl FrameBuffers {
    /// Create the shared streams; mesh buffers are created on first use
    pub fn new(config: MiddlewareConfig) -> Self {
        let render_info = SharedBufferManager::new(TypedArrayType::Uint32, config.initial_render_info_bytes);
        let attach_info = SharedBufferManager::new(TypedArrayType::Float32, config.initial_attach_info_bytes);
        Self {
            config,
            mesh_buffers: BTreeMap::new(),
            render_info,
            attach_info,
        }
    }

    /// Configuration new mesh buffers are sized from
    pub fn config(&self) -> &MiddlewareConfig {
        &self.config
    }

    /// Mesh buffer for `format`, created on first request
    pub fn mesh_buffer(&mut self, format: VertexFormat) -> &mut MeshBuffer {
        let config = &self.config;
        self.mesh_buffers.entry(format).or_insert_with(|| {
            log::debug!("Creating mesh buffer for {}", format);
            MeshBuffer::new(format, config)
        })
    }

    /// Mesh buffer for `format` if one exists. Never allocates.
    pub fn find_mesh_buffer(&self, format: VertexFormat) -> Option<&MeshBuffer> {
        self.mesh_buffers.get(&format)
    }

    /// Mutable mesh buffer for `format` if one exists. Never allocates.
    pub fn find_mesh_buffer_mut(&mut self, format: VertexFormat) -> Option<&mut MeshBuffer> {
        self.mesh_buffers.get_mut(&format)
    }

    /// Formats with a mesh buffer, in ascending code order
    pub fn formats(&self) -> impl Iterator<Item = VertexFormat> + '_ {
        self.mesh_buffers.keys().copied()
    }

    /// Number of mesh buffers
    pub fn mesh_buffer_count(&self) -> usize {
        self.mesh_buffers.len()
    }

    pub(crate) fn mesh_buffers_mut(&mut self) -> impl Iterator<Item = (VertexFormat, &mut MeshBuffer)> + '_ {
        self.mesh_buffers.iter_mut().map(|(format, buffer)| (*format, buffer))
    }

    /// `u32` render-info stream
    pub fn render_info_mgr(&self) -> &SharedBufferManager {
        &self.render_info
    }

    /// `u32` render-info stream for writes
    pub fn render_info_mgr_mut(&mut self) -> &mut SharedBufferManager {
        &mut self.render_info
    }

    /// `f32` attach-info stream
    pub fn attach_info_mgr(&self) -> &SharedBufferManager {
        &self.attach_info
    }

    /// `f32` attach-info stream for writes
    pub fn attach_info_mgr_mut(&mut self) -> &mut SharedBufferManager {
        &mut self.attach_info
    }

    /// Drop every mesh buffer and rewind the streams
    pub(crate) fn clear(&mut self) {
        log::debug!("Releasing {} mesh buffers", self.mesh_buffers.len());
        self.mesh_buffers.clear();
        self.render_info.reset();
        self.attach_info.reset();
    }
}
