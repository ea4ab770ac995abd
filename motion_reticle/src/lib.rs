// THEORY:
// This file is the main entry point for the `motion_reticle` library crate.
// It exposes two layers:
//
// - `pipeline`: the per-frame tracking engine (`TrackingPipeline`, its
//   `PipelineConfig` and the `FrameReport` it returns). Feed it RGB frames and it
//   reports where the moving target is.
// - `session`: the interactive loop around the engine. It drives capture,
//   rendering, recording and key handling through the `FrameSource`,
//   `DisplaySink` and `InputSource` traits, so any camera or window toolkit can be
//   plugged in.
//
// The individual stages live in `core_modules` and are public for callers who
// want to assemble their own loop.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;

pub use error::{Result, TrackerError};
