//! Minimal skeletal animation player
//!
//! A chain of bones swinging on sine curves. Each bone carries one quad
//! attachment. Good enough to exercise the middleware buffers the way a
//! real skeleton runtime would: bone transforms go to the attach-info stream
//! during update, quads go to the mesh buffer during render.

use middleware_engine::prelude::*;
use nalgebra::{Isometry2, Point2, Vector2};

/// Half the thickness of every bone quad
const BONE_HALF_WIDTH: f32 = 4.0;

/// One bone in a chain
#[derive(Debug, Clone)]
pub struct Bone {
    /// Distance from this bone's origin to its tip
    pub length: f32,
    /// Angle relative to the parent when the swing is zero
    pub rest_angle: f32,
    /// Swing amplitude in radians
    pub swing: f32,
}

/// Plays a looping swing animation on a bone chain
pub struct SkeletonPlayer {
    name: String,
    handle: Option<MiddlewareHandle>,
    lifetime: Option<f32>,
    format: VertexFormat,
    origin: Vector2<f32>,
    bones: Vec<Bone>,
    world: Vec<Isometry2<f32>>,
    time: f32,
    speed: f32,
    color: u32,
    dark_color: u32,
}

impl SkeletonPlayer {
    /// Create a chain of `bone_count` bones rooted at `origin`
    pub fn new(name: impl Into<String>, format: VertexFormat, origin: Vector2<f32>, bone_count: usize) -> Self {
        let bones = (0..bone_count)
            .map(|i| Bone {
                length: 40.0 - i as f32 * 4.0,
                rest_angle: if i == 0 { std::f32::consts::FRAC_PI_2 } else { 0.0 },
                swing: 0.3,
            })
            .collect::<Vec<_>>();

        Self {
            name: name.into(),
            handle: None,
            lifetime: None,
            format,
            origin,
            world: vec![Isometry2::identity(); bones.len()],
            bones,
            time: 0.0,
            speed: 2.0,
            color: 0xffff_ffff,
            dark_color: 0xff00_0000,
        }
    }

    /// Playback speed multiplier
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Stop after `seconds` of playback: the player takes itself off the
    /// update list once it has a handle (see `set_handle`)
    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.lifetime = Some(seconds);
        self
    }

    /// Handle the manager issued for this player
    pub fn set_handle(&mut self, handle: MiddlewareHandle) {
        self.handle = Some(handle);
    }

    /// Player name for logging
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World transforms from the last update
    pub fn world_transforms(&self) -> &[Isometry2<f32>] {
        &self.world
    }

    fn pose(&mut self) {
        let mut parent = Isometry2::new(self.origin, 0.0);
        let mut parent_length = 0.0;
        for (i, bone) in self.bones.iter().enumerate() {
            let phase = self.time * self.speed + i as f32 * 0.5;
            let angle = bone.rest_angle + bone.swing * phase.sin();
            let local = Isometry2::new(Vector2::new(parent_length, 0.0), angle);
            parent *= local;
            self.world[i] = parent;
            parent_length = bone.length;
        }
    }

    fn write_quad(&self, mesh: &mut MeshBuffer, bone: usize) -> Result<(), BufferError> {
        mesh.check_space(4, 6)?;
        let base = mesh.vertex_offset() as u16;

        let transform = &self.world[bone];
        let length = self.bones[bone].length;
        let corners = [
            (Point2::new(0.0, -BONE_HALF_WIDTH), (0.0, 1.0)),
            (Point2::new(length, -BONE_HALF_WIDTH), (1.0, 1.0)),
            (Point2::new(length, BONE_HALF_WIDTH), (1.0, 0.0)),
            (Point2::new(0.0, BONE_HALF_WIDTH), (0.0, 0.0)),
        ];

        let mut vertex = Vec::with_capacity(self.format.words_per_vertex());
        for (corner, (u, v)) in corners {
            let world = transform.transform_point(&corner);
            vertex.clear();
            vertex.extend_from_slice(&[world.x, world.y, 0.0, u, v, f32::from_bits(self.color)]);
            if self.format == VertexFormat::XYZUVCC {
                vertex.push(f32::from_bits(self.dark_color));
            }
            mesh.write_vertices(&vertex)?;
        }

        mesh.write_indices(&[base, base + 1, base + 2, base, base + 2, base + 3])
    }
}

impl Middleware for SkeletonPlayer {
    fn update(&mut self, dt: f32, frame: &mut FrameContext<'_>) {
        self.time += dt;
        self.pose();

        let attach = frame.buffers.attach_info_mgr_mut().buffer_mut();
        for transform in &self.world {
            attach.write_f32(transform.translation.x);
            attach.write_f32(transform.translation.y);
            attach.write_f32(transform.rotation.angle());
        }

        if self.lifetime.is_some_and(|lifetime| self.time >= lifetime) {
            if let Some(handle) = self.handle {
                log::info!("{}: animation finished after {:.2}s", self.name, self.time);
                frame.remove_participant(handle);
            }
            self.lifetime = None;
        }
    }

    fn render(&mut self, _dt: f32, frame: &mut FrameContext<'_>) {
        let buffers = &mut *frame.buffers;
        let mesh = buffers.mesh_buffer(self.format);
        for bone in 0..self.bones.len() {
            if let Err(err) = self.write_quad(mesh, bone) {
                log::warn!("{}: dropped bone {} this frame: {}", self.name, bone, err);
                return;
            }
        }

        let render_info = buffers.render_info_mgr_mut().buffer_mut();
        render_info.write_u32(self.bones.len() as u32);
        match render_info.read_u32_at(0) {
            Ok(count) => {
                if let Err(err) = render_info.write_u32_at(0, count + 1) {
                    log::warn!("{}: render info header not updated: {}", self.name, err);
                }
            }
            Err(err) => log::warn!("{}: render info header missing: {}", self.name, err),
        }
    }
}
