//! Native build driving.
//!
//! relay does not compile anything itself: it configures and builds the
//! project through CMake, remembering enough about the last configure to
//! skip it when nothing relevant changed.

pub mod cmake;
pub mod fingerprint;
pub mod integration;
pub mod orchestrator;

pub use cmake::{BuildTool, CMake, CMakeSettings, ConfigureSpec};
pub use integration::sync_cmakelists;
pub use orchestrator::{BuildOutcome, BuildRequest, BuildState, Orchestrator};
