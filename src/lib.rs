//! relay - a package manager and build driver for C/C++ projects
//!
//! This crate provides the library behind the `relay` binary: manifest
//! handling, triplet resolution, dependency synchronization against vcpkg,
//! and CMake build orchestration.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod sync;
pub mod util;

/// Test utilities and mocks for relay unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a scripted command runner and project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{Dependency, LockManifest, ManifestStore, ProjectManifest, Triplet};
pub use util::context::GlobalContext;
