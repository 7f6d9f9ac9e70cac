//! Skeleton demo application
//!
//! Drives the middleware manager the way a render loop would: a handful of
//! skeleton players are registered, frames are stepped at a fixed rate and
//! the batches handed to the 2D batcher are summarised in the log. One
//! player stops itself when its animation runs out; halfway through, the
//! app pauses another from outside the frame.
//!
//! ```text
//! skeleton_demo [--frames N] [--config middleware.toml]
//! ```

mod skeleton;

use clap::{Arg, ArgMatches, Command};
use middleware_engine::foundation::logging;
use middleware_engine::prelude::*;
use nalgebra::Vector2;
use skeleton::SkeletonPlayer;
use std::cell::RefCell;
use std::rc::Rc;

const FRAME_TIME: f32 = 1.0 / 60.0;
const DEFAULT_FRAMES: u32 = 120;

/// Application errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Config file could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

struct Options {
    frames: u32,
    config_path: Option<String>,
}

fn cli() -> Command {
    Command::new("skeleton_demo")
        .about("Steps skeleton players through the middleware buffer manager")
        .arg(
            Arg::new("frames")
                .help("Number of frames to run")
                .long("frames")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .default_value("120"),
        )
        .arg(
            Arg::new("config")
                .help("Middleware config file (.toml or .ron)")
                .long("config")
                .value_name("PATH"),
        )
}

impl Options {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            frames: matches.get_one::<u32>("frames").copied().unwrap_or(DEFAULT_FRAMES),
            config_path: matches.get_one::<String>("config").cloned(),
        }
    }
}

struct Player {
    skeleton: Rc<RefCell<SkeletonPlayer>>,
    handle: MiddlewareHandle,
}

pub struct SkeletonApp {
    manager: MiddlewareManager,
    batcher: QueuedBatcher,
    players: Vec<Player>,
}

impl SkeletonApp {
    fn new(options: &Options) -> Result<Self, AppError> {
        let manager = match &options.config_path {
            Some(path) => MiddlewareManager::from_config_file(path)?,
            None => MiddlewareManager::default(),
        };

        Ok(Self {
            manager,
            batcher: QueuedBatcher::new(),
            players: Vec::new(),
        })
    }

    fn spawn(&mut self, skeleton: SkeletonPlayer) {
        log::info!("Spawning skeleton '{}'", skeleton.name());
        let skeleton = Rc::new(RefCell::new(skeleton));
        let handle = self.manager.register(skeleton.clone());
        skeleton.borrow_mut().set_handle(handle);
        self.manager.add_participant(handle);
        self.players.push(Player { skeleton, handle });
    }

    fn run(&mut self, frames: u32) {
        self.spawn(SkeletonPlayer::new("arm", VertexFormat::XYZUVC, Vector2::new(-100.0, 0.0), 4));
        self.spawn(SkeletonPlayer::new("tail", VertexFormat::XYZUVC, Vector2::new(100.0, 0.0), 6).with_speed(3.5));
        self.spawn(
            SkeletonPlayer::new("banner", VertexFormat::XYZUVCC, Vector2::new(0.0, 150.0), 3).with_lifetime(1.0),
        );

        for frame in 0..frames {
            if frame == frames / 2 {
                if let Some(player) = self.players.get(1) {
                    log::info!("Frame {}: pausing '{}'", frame, player.skeleton.borrow().name());
                    self.manager.remove_participant(player.handle);
                }
            }

            self.manager.update(FRAME_TIME);
            self.manager.render(FRAME_TIME, &mut self.batcher);
            self.present(frame);
        }

        self.shutdown();
    }

    fn present(&mut self, frame: u32) {
        let batches = self.batcher.drain();
        for batch in &batches {
            log::debug!(
                "Frame {}: accessory {} -> {} sub-buffers, {} vertices, {} indices",
                frame,
                batch.accessory_id,
                batch.buffers.len(),
                batch.vertex_count(),
                batch.index_count()
            );
        }

        if frame % 30 == 0 {
            let stats = self.manager.frame_stats();
            log::info!(
                "Frame {}: {} participants, {} formats, {} vertex bytes, {} index bytes",
                stats.frame,
                stats.participants_rendered,
                stats.formats_submitted,
                stats.vertex_bytes_uploaded,
                stats.index_bytes_uploaded
            );
        }
    }

    fn shutdown(&mut self) {
        for player in self.players.drain(..) {
            self.manager.unregister(player.handle);
        }
        self.manager.teardown();
        log::info!("Skeleton demo shut down");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up panic hook for better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {:?}", panic_info);

        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Initialize logging
    logging::init_with_level(log::LevelFilter::Info);

    log::info!("Starting skeleton demo");

    let options = Options::from_matches(&cli().get_matches());
    let mut app = SkeletonApp::new(&options)?;
    app.run(options.frames);

    log::info!("Skeleton demo finished successfully");
    Ok(())
}
