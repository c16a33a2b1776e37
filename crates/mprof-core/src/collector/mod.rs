//! Target resolution and sample collection from kernel status documents.
//!
//! Everything here reads the kernel interface through the [`FileSystem`]
//! trait, so the whole collection path runs against [`MockFs`] in tests
//! (and on non-Linux development machines).
//!
//! ```text
//! ProcessResolver ──▶ ProcessHandle ──▶ SampleCollector ──▶ SampleSet
//!        │                                    │
//!        └──────────── FileSystem ◀───────────┘
//!                     (RealFs | MockFs)
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
mod resolver;
pub mod status;
mod traits;

pub use collector::SampleCollector;
pub use mock::MockFs;
pub use resolver::ProcessResolver;
pub use traits::{FileSystem, RealFs};
