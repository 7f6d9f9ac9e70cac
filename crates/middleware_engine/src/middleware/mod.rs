//! # Middleware
//!
//! Participant registration and the per-frame pipeline that feeds animation
//! middleware output to the batcher.
//!
//! - **Middleware**: trait implemented by per-frame participants
//! - **ParticipantRegistry**: handle registry with deferred add/remove
//! - **FrameBuffers**: buffers participants write into during a frame
//! - **FrameContext**: buffers plus the request queue handed to participants
//! - **MiddlewareManager**: owns all of the above and runs `update`/`render`

pub mod frame;
pub mod manager;
pub mod participant;

pub use frame::{FrameBuffers, FrameContext};
pub use manager::{FrameStats, MiddlewareManager};
pub use participant::{
    Middleware, MiddlewareHandle, ParticipantRegistry, ParticipantState, SharedMiddleware,
};

#[cfg(test)]
mod tests;
