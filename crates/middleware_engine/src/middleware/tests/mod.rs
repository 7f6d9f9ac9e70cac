//! Frame pipeline tests spanning the manager, buffers and batcher

mod frame_pipeline;
