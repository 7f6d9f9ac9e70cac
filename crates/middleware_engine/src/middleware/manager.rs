//! # Middleware Manager
//!
//! Drives the two-phase frame pipeline for every animation middleware
//! participant and hands the filled buffers to the 2D batcher.
//!
//! ## Frame
//!
//! ```text
//! update(dt)
//!   ├── flush pending add/remove requests into the update list
//!   ├── reset attach info and render info (header slot = 0 in each)
//!   ├── participant.update(dt) for each active participant, in order
//!   └── queue the add/remove requests participants made
//! render(dt, batcher)
//!   ├── apply removals queued since the flush
//!   ├── reset every mesh buffer
//!   ├── participant.render(dt) for each active participant, same order
//!   └── for each mesh buffer: upload_ib + upload_vb, then
//!       batcher.sync_mesh_buffers_to_native(accessory_id, sub-buffers)
//! ```
//!
//! The manager is an ordinary value owned by the render loop. Everything
//! runs on that thread; participants are `Rc<RefCell<_>>` so the compiler
//! keeps it that way.

use crate::buffer::{MeshBuffer, SharedBufferManager};
use crate::config::{ConfigError, MiddlewareConfig};
use crate::middleware::frame::{FrameBuffers, FrameContext};
use crate::middleware::participant::{
    MiddlewareHandle, ParticipantRegistry, ParticipantState, SharedMiddleware,
};
use crate::render::batcher::Batcher2d;
use crate::render::vertex_format::{accessory_id_for, VertexFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePhase {
    Update,
    Render,
}

/// Per-frame counters, reset at the start of every `update`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1 for the first `update`
    pub frame: u64,
    /// Participants whose `update` ran
    pub participants_updated: usize,
    /// Participants whose `render` ran
    pub participants_rendered: usize,
    /// Formats forwarded to the batcher
    pub formats_submitted: usize,
    /// Sub-buffers forwarded to the batcher
    pub sub_buffers_submitted: usize,
    /// Vertex bytes staged by uploads
    pub vertex_bytes_uploaded: usize,
    /// Index bytes staged by uploads
    pub index_bytes_uploaded: usize,
    /// Participants dropped by their owner without unregistering
    pub participants_pruned: usize,
}

/// Owner of the middleware buffer pools and the participant update list
#[derive(Debug)]
pub struct MiddlewareManager {
    buffers: FrameBuffers,
    participants: ParticipantRegistry,
    stats: FrameStats,
}

impl Default for MiddlewareManager {
    fn default() -> Self {
        Self::new(MiddlewareConfig::default())
    }
}

impl MiddlewareManager {
    /// Create a manager; mesh buffers are allocated lazily per format
    pub fn new(config: MiddlewareConfig) -> Self {
        log::debug!("Creating middleware manager: {:?}", config);
        Self {
            buffers: FrameBuffers::new(config),
            participants: ParticipantRegistry::new(),
            stats: FrameStats::default(),
        }
    }

    /// Create a manager from a TOML or RON config file
    pub fn from_config_file(path: &str) -> Result<Self, ConfigError> {
        let config = MiddlewareConfig::load_validated(path)?;
        log::info!("Loaded middleware config from {}", path);
        Ok(Self::new(config))
    }

    /// Buffers handed to participants
    pub fn buffers(&self) -> &FrameBuffers {
        &self.buffers
    }

    /// Buffers handed to participants, for writes outside a frame phase
    pub fn buffers_mut(&mut self) -> &mut FrameBuffers {
        &mut self.buffers
    }

    /// Mesh buffer for `format`, created on first request
    pub fn mesh_buffer(&mut self, format: VertexFormat) -> &mut MeshBuffer {
        self.buffers.mesh_buffer(format)
    }

    // ---------------------------------------------------------------------
    // Participants
    // ---------------------------------------------------------------------

    /// Issue a handle for a participant. The manager keeps only a weak
    /// reference; call `unregister` before dropping the participant.
    pub fn register(&mut self, participant: SharedMiddleware) -> MiddlewareHandle {
        let handle = self.participants.register(participant);
        log::trace!("Registered middleware participant {:?}", handle);
        handle
    }

    /// Forget a participant now, whatever its queued state
    pub fn unregister(&mut self, handle: MiddlewareHandle) -> bool {
        self.participants.unregister(handle)
    }

    /// Queue the participant to join the update list at the next `update`
    pub fn add_participant(&mut self, handle: MiddlewareHandle) -> bool {
        self.participants.request(handle, true)
    }

    /// Queue the participant to leave the update list. Takes effect at the
    /// next `update` or `render`, whichever comes first.
    pub fn remove_participant(&mut self, handle: MiddlewareHandle) -> bool {
        self.participants.request(handle, false)
    }

    /// Apply queued add/remove requests. `update` calls this first thing.
    pub fn flush_pending_operations(&mut self) {
        self.participants.flush_pending_operations();
    }

    /// Where a participant stands in the update list
    pub fn participant_state(&self, handle: MiddlewareHandle) -> ParticipantState {
        self.participants.state(handle)
    }

    /// Update list in call order
    pub fn active_participants(&self) -> &[MiddlewareHandle] {
        self.participants.active()
    }

    /// Number of queued add/remove requests
    pub fn pending_len(&self) -> usize {
        self.participants.pending_len()
    }

    // ---------------------------------------------------------------------
    // Frame pipeline
    // ---------------------------------------------------------------------

    /// Logic phase of a frame
    pub fn update(&mut self, dt: f32) {
        self.stats = FrameStats {
            frame: self.stats.frame + 1,
            ..FrameStats::default()
        };

        self.participants.flush_pending_operations();
        self.buffers.attach_info_mgr_mut().reset_with_header();
        self.buffers.render_info_mgr_mut().reset_with_header();

        self.stats.participants_updated = self.dispatch(dt, FramePhase::Update);
        log::trace!(
            "Frame {} update: {} participants",
            self.stats.frame,
            self.stats.participants_updated
        );
    }

    /// Render phase of a frame: refill, upload and forward every mesh buffer.
    ///
    /// The shared streams keep what `update` wrote.
    pub fn render(&mut self, dt: f32, batcher: &mut dyn Batcher2d) {
        self.stats = FrameStats {
            frame: self.stats.frame,
            participants_updated: self.stats.participants_updated,
            participants_pruned: self.stats.participants_pruned,
            ..FrameStats::default()
        };

        self.participants.flush_pending_removals();
        for (_, buffer) in self.buffers.mesh_buffers_mut() {
            buffer.reset();
        }

        self.stats.participants_rendered = self.dispatch(dt, FramePhase::Render);

        for (format, buffer) in self.buffers.mesh_buffers_mut() {
            buffer.upload_ib();
            buffer.upload_vb();

            let sub_buffers = buffer.ui_mesh_buffers().to_vec();
            self.stats.formats_submitted += 1;
            self.stats.sub_buffers_submitted += sub_buffers.len();
            for sub_buffer in &sub_buffers {
                self.stats.vertex_bytes_uploaded += sub_buffer.vertex_bytes().len();
                self.stats.index_bytes_uploaded += sub_buffer.index_bytes().len();
            }

            batcher.sync_mesh_buffers_to_native(accessory_id_for(format), sub_buffers);
        }

        log::trace!(
            "Frame {} render: {} participants, {} formats submitted",
            self.stats.frame,
            self.stats.participants_rendered,
            self.stats.formats_submitted
        );
    }

    fn dispatch(&mut self, dt: f32, phase: FramePhase) -> usize {
        let mut dispatched = 0;
        let mut dead = Vec::new();
        let mut frame = FrameContext::new(&mut self.buffers);

        for &handle in self.participants.active() {
            let Some(participant) = self.participants.resolve(handle) else {
                log::warn!(
                    "Middleware participant {:?} was dropped without being unregistered",
                    handle
                );
                dead.push(handle);
                continue;
            };

            let Ok(mut participant) = participant.try_borrow_mut() else {
                log::warn!(
                    "Skipping {:?} for participant {:?}: it is already borrowed",
                    phase,
                    handle
                );
                continue;
            };

            match phase {
                FramePhase::Update => participant.update(dt, &mut frame),
                FramePhase::Render => participant.render(dt, &mut frame),
            }
            dispatched += 1;
        }

        let requests = frame.into_requests();
        if !requests.is_empty() {
            log::trace!("{} update-list requests made during {:?}", requests.len(), phase);
        }
        for (handle, active) in requests {
            self.participants.request(handle, active);
        }

        if !dead.is_empty() {
            self.stats.participants_pruned += dead.len();
            self.participants.prune(&dead);
        }
        dispatched
    }

    /// Counters for the current (or last completed) frame
    pub fn frame_stats(&self) -> &FrameStats {
        &self.stats
    }

    // ---------------------------------------------------------------------
    // Read-only accessors. None of these create a mesh buffer.
    // ---------------------------------------------------------------------

    /// Vertex view of sub-buffer `pos` for `format`
    pub fn vb_typed_array(&self, format: VertexFormat, pos: usize) -> Option<&[f32]> {
        self.buffers.find_mesh_buffer(format)?.vb_typed_array(pos)
    }

    /// Index view of sub-buffer `pos` for `format`
    pub fn ib_typed_array(&self, format: VertexFormat, pos: usize) -> Option<&[u16]> {
        self.buffers.find_mesh_buffer(format)?.ib_typed_array(pos)
    }

    /// Bytes written to vertex sub-buffer `pos` for `format`; 0 if absent
    pub fn vb_typed_array_length(&self, format: VertexFormat, pos: usize) -> usize {
        self.buffers
            .find_mesh_buffer(format)
            .map_or(0, |buffer| buffer.vb_typed_array_length(pos))
    }

    /// Bytes written to index sub-buffer `pos` for `format`; 0 if absent
    pub fn ib_typed_array_length(&self, format: VertexFormat, pos: usize) -> usize {
        self.buffers
            .find_mesh_buffer(format)
            .map_or(0, |buffer| buffer.ib_typed_array_length(pos))
    }

    /// Sub-buffers in use for `format`; 0 if absent
    pub fn buffer_count(&self, format: VertexFormat) -> usize {
        self.buffers
            .find_mesh_buffer(format)
            .map_or(0, MeshBuffer::buffer_count)
    }

    /// `u32` render-info stream
    pub fn render_info_mgr(&self) -> &SharedBufferManager {
        self.buffers.render_info_mgr()
    }

    /// `u32` render-info stream for writes
    pub fn render_info_mgr_mut(&mut self) -> &mut SharedBufferManager {
        self.buffers.render_info_mgr_mut()
    }

    /// `f32` attach-info stream
    pub fn attach_info_mgr(&self) -> &SharedBufferManager {
        self.buffers.attach_info_mgr()
    }

    /// `f32` attach-info stream for writes
    pub fn attach_info_mgr_mut(&mut self) -> &mut SharedBufferManager {
        self.buffers.attach_info_mgr_mut()
    }

    /// Release every mesh buffer and forget every participant
    pub fn teardown(&mut self) {
        log::debug!(
            "Tearing down middleware manager ({} participants, {} mesh buffers)",
            self.participants.len(),
            self.buffers.mesh_buffer_count()
        );
        self.buffers.clear();
        self.participants.clear();
        self.stats = FrameStats::default();
    }
}
