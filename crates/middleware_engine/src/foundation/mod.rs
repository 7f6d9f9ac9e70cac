//! Foundation module - Core utilities shared by the buffer manager
//!
//! - Logging setup

pub mod logging;
