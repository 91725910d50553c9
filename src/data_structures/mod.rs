//! Engine data structures: meshes, instances and render targets.
//!
//! - `mesh` contains CPU geometry and its GPU buffers
//! - `instance` holds the per-instance transform
//! - `batch` groups instances per mesh and uploads them
//! - `texture` creates depth and multisample targets

pub mod batch;
pub mod instance;
pub mod mesh;
pub mod texture;
