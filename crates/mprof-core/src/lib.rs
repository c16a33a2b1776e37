//! mprof-core — per-process memory sampling engine.
//!
//! Provides:
//! - `collector` — target resolution and sample collection from `/proc`-style
//!   status documents, behind a mockable filesystem seam
//! - `history` — bounded in-memory window of recent sample rounds
//! - `sink` — CSV file output with a console mirror, serialized per round
//! - `profiler` — the sampling loop, its configuration, and the thread handle
//! - `model` — sample data types shared by all of the above
//! - `error` — the public error taxonomy

pub mod collector;
pub mod error;
pub mod history;
pub mod model;
pub mod profiler;
pub mod sink;
