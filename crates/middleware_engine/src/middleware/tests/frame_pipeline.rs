//! Integration tests for the update/render pipeline
//!
//! Participants here behave like skeleton players: bone data goes to the
//! attach-info stream in `update`, quads go to the mesh buffers in `render`.

use crate::buffer::{BufferError, UploadState};
use crate::config::MiddlewareConfig;
use crate::middleware::{FrameContext, Middleware, MiddlewareHandle, MiddlewareManager, ParticipantState};
use crate::render::{QueuedBatcher, VertexFormat};
use std::cell::RefCell;
use std::rc::Rc;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Emits `quads` quads per frame in one format
    struct QuadEmitter {
        format: VertexFormat,
        quads: usize,
        x: f32,
        time: f32,
    }

    impl QuadEmitter {
        fn shared(format: VertexFormat, quads: usize, x: f32) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                format,
                quads,
                x,
                time: 0.0,
            }))
        }
    }

    impl Middleware for QuadEmitter {
        fn update(&mut self, dt: f32, frame: &mut FrameContext<'_>) {
            self.time += dt;
            let attach = frame.buffers.attach_info_mgr_mut().buffer_mut();
            attach.write_f32(self.x);
            attach.write_f32(self.time);
        }

        fn render(&mut self, _dt: f32, frame: &mut FrameContext<'_>) {
            let words = self.format.words_per_vertex();
            let mesh = frame.buffers.mesh_buffer(self.format);
            for _ in 0..self.quads {
                mesh.check_space(4, 6).unwrap();
                let base = mesh.vertex_offset() as u16;
                let mut vertex = vec![0.0; words];
                vertex[0] = self.x;
                for _ in 0..4 {
                    mesh.write_vertices(&vertex).unwrap();
                }
                mesh.write_indices(&[base, base + 1, base + 2, base, base + 2, base + 3])
                    .unwrap();
            }

            let render_info = frame.buffers.render_info_mgr_mut().buffer_mut();
            let count = render_info.read_u32_at(0).unwrap();
            render_info.write_u32(self.quads as u32);
            render_info.write_u32_at(0, count + 1).unwrap();
        }
    }

    /// Plays for a fixed number of updates, then takes itself off the
    /// update list and optionally hands over to another participant
    struct Expiring {
        handle: Option<MiddlewareHandle>,
        updates_left: u32,
        successor: Option<MiddlewareHandle>,
        renders: u32,
    }

    impl Middleware for Expiring {
        fn update(&mut self, _dt: f32, frame: &mut FrameContext<'_>) {
            self.updates_left = self.updates_left.saturating_sub(1);
            if self.updates_left > 0 {
                return;
            }
            if let Some(handle) = self.handle {
                frame.remove_participant(handle);
            }
            if let Some(successor) = self.successor.take() {
                frame.add_participant(successor);
            }
        }

        fn render(&mut self, _dt: f32, _frame: &mut FrameContext<'_>) {
            self.renders += 1;
        }
    }

    #[test]
    fn test_two_participants_two_formats() {
        let a = QuadEmitter::shared(VertexFormat::XYZUVC, 1, 1.0);
        let b = QuadEmitter::shared(VertexFormat::XYZUVCC, 2, 2.0);

        let mut manager = MiddlewareManager::default();
        let handle_a = manager.register(a.clone());
        let handle_b = manager.register(b.clone());
        manager.add_participant(handle_a);
        manager.add_participant(handle_b);

        let mut batcher = QueuedBatcher::new();
        manager.update(0.16);
        manager.render(0.16, &mut batcher);

        let batches = batcher.drain();
        assert_eq!(batches.len(), 2);

        // Formats are forwarded in code order
        assert_eq!(batches[0].accessory_id, 65534);
        assert_eq!(batches[0].vertex_count(), 4);
        assert_eq!(batches[1].accessory_id, 65535);
        assert_eq!(batches[1].vertex_count(), 8);
        assert_eq!(batches[1].index_count(), 12);
        assert_relative_eq!(batches[1].buffers[0].vertex_floats()[0], 2.0);

        let stats = manager.frame_stats();
        assert_eq!(stats.frame, 1);
        assert_eq!(stats.formats_submitted, 2);
        assert_eq!(stats.vertex_bytes_uploaded, 4 * 24 + 8 * 28);
        assert_eq!(stats.index_bytes_uploaded, 18 * 2);
    }

    #[test]
    fn test_attach_info_in_update_order() {
        let a = QuadEmitter::shared(VertexFormat::XYZUVC, 0, 1.0);
        let b = QuadEmitter::shared(VertexFormat::XYZUVC, 0, 2.0);

        let mut manager = MiddlewareManager::default();
        let handle_b = manager.register(b.clone());
        let handle_a = manager.register(a.clone());
        manager.add_participant(handle_b);
        manager.add_participant(handle_a);
        manager.update(0.5);

        let attach = manager.attach_info_mgr().buffer();
        assert_eq!(attach.read_u32_at(0).unwrap(), 0);
        let values = &attach.as_f32()[1..];
        assert_eq!(values.len(), 4);
        assert_relative_eq!(values[0], 2.0);
        assert_relative_eq!(values[1], 0.5);
        assert_relative_eq!(values[2], 1.0);
    }

    #[test]
    fn test_render_info_header_counts_participants() {
        let a = QuadEmitter::shared(VertexFormat::XYZUVC, 3, 0.0);
        let b = QuadEmitter::shared(VertexFormat::XYZUVC, 5, 0.0);

        let mut manager = MiddlewareManager::default();
        for participant in [a.clone(), b.clone()] {
            let handle = manager.register(participant);
            manager.add_participant(handle);
        }

        for _ in 0..3 {
            manager.update(0.1);
            manager.render(0.1, &mut QueuedBatcher::new());
        }

        let render_info = manager.render_info_mgr().buffer();
        assert_eq!(render_info.as_u32(), &[2, 3, 5]);
    }

    #[test]
    fn test_writes_outside_render_are_discarded_by_reset() {
        let a = QuadEmitter::shared(VertexFormat::XYZUVC, 1, 1.0);
        let mut manager = MiddlewareManager::default();
        let handle = manager.register(a.clone());
        manager.add_participant(handle);

        manager.update(0.1);
        // Stray write before render: render resets the buffer first
        manager
            .mesh_buffer(VertexFormat::XYZUVC)
            .write_vertices(&[9.0; 6])
            .unwrap();

        let mut batcher = QueuedBatcher::new();
        manager.render(0.1, &mut batcher);
        let batches = batcher.drain();
        assert_eq!(batches[0].vertex_count(), 4);
        assert_relative_eq!(batches[0].buffers[0].vertex_floats()[0], 1.0);

        // Uploaded: the buffer belongs to the batcher until next frame
        let result = manager.mesh_buffer(VertexFormat::XYZUVC).write_vertices(&[0.0; 6]);
        assert_eq!(
            result,
            Err(BufferError::Sealed {
                format: VertexFormat::XYZUVC
            })
        );
        assert_eq!(manager.vb_typed_array_length(VertexFormat::XYZUVC, 0), 4 * 24);
    }

    #[test]
    fn test_idle_format_still_forwarded_empty() {
        let a = QuadEmitter::shared(VertexFormat::XYZUVCC, 1, 0.0);
        let mut manager = MiddlewareManager::default();
        let handle = manager.register(a.clone());
        manager.add_participant(handle);

        manager.update(0.1);
        manager.render(0.1, &mut QueuedBatcher::new());

        manager.remove_participant(handle);
        manager.update(0.1);
        let mut batcher = QueuedBatcher::new();
        manager.render(0.1, &mut batcher);

        let batches = batcher.drain();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].accessory_id, 65535);
        assert!(batches[0].is_empty());
        assert_eq!(manager.frame_stats().participants_rendered, 0);
    }

    #[test]
    fn test_sub_buffer_rollover_through_manager() {
        let config = MiddlewareConfig {
            max_vertices_per_buffer: 8,
            ..MiddlewareConfig::default()
        };
        let a = QuadEmitter::shared(VertexFormat::XYZUVC, 3, 0.0);
        let mut manager = MiddlewareManager::new(config);
        let handle = manager.register(a.clone());
        manager.add_participant(handle);

        let mut batcher = QueuedBatcher::new();
        manager.update(0.1);
        manager.render(0.1, &mut batcher);

        assert_eq!(manager.buffer_count(VertexFormat::XYZUVC), 2);
        assert_eq!(manager.ib_typed_array(VertexFormat::XYZUVC, 1).unwrap(), &[0, 1, 2, 0, 2, 3]);

        let batches = batcher.drain();
        assert_eq!(batches[0].buffers.len(), 2);
        assert_eq!(batches[0].buffers[0].vertex_count(), 8);
        assert_eq!(batches[0].buffers[1].vertex_count(), 4);
    }

    #[test]
    fn test_coalescing_across_participants() {
        let participants: Vec<_> = (0..3)
            .map(|i| QuadEmitter::shared(VertexFormat::XYZUVC, 0, i as f32))
            .collect();
        let mut manager = MiddlewareManager::default();
        let handles: Vec<_> = participants
            .iter()
            .map(|participant| manager.register(participant.clone()))
            .collect();

        manager.add_participant(handles[0]);
        manager.add_participant(handles[1]);
        manager.remove_participant(handles[0]);
        manager.add_participant(handles[2]);
        manager.remove_participant(handles[2]);
        assert_eq!(manager.pending_len(), 3);

        manager.update(0.1);
        assert_eq!(manager.active_participants(), &[handles[1]]);
        assert_eq!(manager.participant_state(handles[0]), ParticipantState::Unregistered);
        assert_eq!(manager.participant_state(handles[2]), ParticipantState::Unregistered);
        assert_eq!(manager.frame_stats().participants_updated, 1);
    }

    #[test]
    fn test_unregister_before_drop() {
        let a = QuadEmitter::shared(VertexFormat::XYZUVC, 1, 0.0);
        let mut manager = MiddlewareManager::default();
        let handle = manager.register(a.clone());
        manager.add_participant(handle);
        manager.update(0.1);

        assert!(manager.unregister(handle));
        drop(a);

        manager.render(0.1, &mut QueuedBatcher::new());
        assert_eq!(manager.frame_stats().participants_pruned, 0);
        assert!(!manager.add_participant(handle));
        assert_eq!(manager.pending_len(), 0);
    }

    #[test]
    fn test_participant_removed_during_update_skips_render() {
        let expiring = Rc::new(RefCell::new(Expiring {
            handle: None,
            updates_left: 2,
            successor: None,
            renders: 0,
        }));
        let follower = QuadEmitter::shared(VertexFormat::XYZUVC, 1, 0.0);

        let mut manager = MiddlewareManager::default();
        let handle = manager.register(expiring.clone());
        let follower_handle = manager.register(follower.clone());
        {
            let mut expiring = expiring.borrow_mut();
            expiring.handle = Some(handle);
            expiring.successor = Some(follower_handle);
        }
        manager.add_participant(handle);

        manager.update(0.1);
        manager.render(0.1, &mut QueuedBatcher::new());
        assert_eq!(expiring.borrow().renders, 1);

        // Second update: it removes itself and queues the follower
        manager.update(0.1);
        assert_eq!(manager.participant_state(handle), ParticipantState::PendingRemove);
        assert_eq!(manager.participant_state(follower_handle), ParticipantState::PendingAdd);

        let mut batcher = QueuedBatcher::new();
        manager.render(0.1, &mut batcher);
        assert_eq!(expiring.borrow().renders, 1);
        assert_eq!(manager.frame_stats().participants_rendered, 0);
        assert_eq!(manager.participant_state(handle), ParticipantState::Unregistered);
        assert!(batcher.is_empty());

        // The follower joins at the next flush
        manager.update(0.1);
        assert_eq!(manager.active_participants(), &[follower_handle]);
        manager.render(0.1, &mut batcher);
        assert_eq!(batcher.drain()[0].vertex_count(), 4);
    }

    #[test]
    fn test_untouched_format_uploaded_once() {
        let a = QuadEmitter::shared(VertexFormat::XYZUVC, 1, 0.0);
        let b = QuadEmitter::shared(VertexFormat::XYZUVCC, 1, 0.0);
        let mut manager = MiddlewareManager::default();
        let handle_a = manager.register(a.clone());
        let handle_b = manager.register(b.clone());
        manager.add_participant(handle_a);
        manager.add_participant(handle_b);
        manager.update(0.1);
        manager.render(0.1, &mut QueuedBatcher::new());

        // Nobody writes the UI layout this frame
        manager.remove_participant(handle_b);
        manager.update(0.1);
        let mut batcher = QueuedBatcher::new();
        manager.render(0.1, &mut batcher);

        let idle = manager.buffers().find_mesh_buffer(VertexFormat::XYZUVCC).unwrap();
        assert_eq!(idle.upload_state(), UploadState::all());
        assert_eq!(idle.vb_typed_array_length(0), 0);

        let batches = batcher.drain();
        for accessory_id in [65534, 65535] {
            let submissions = batches
                .iter()
                .filter(|batch| batch.accessory_id == accessory_id)
                .count();
            assert_eq!(submissions, 1);
        }
        assert_eq!(manager.frame_stats().formats_submitted, 2);
    }
}
