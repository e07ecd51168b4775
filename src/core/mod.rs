//! Core data types: manifests, lock-manifest, triplets.

pub mod lock_manifest;
pub mod manifest;
pub mod store;
pub mod triplet;

pub use lock_manifest::{LockEntry, LockManifest};
pub use manifest::{Dependency, ProjectManifest};
pub use store::ManifestStore;
pub use triplet::{ResolvedTriplet, ToolchainResolver, Triplet, TripletSource};
