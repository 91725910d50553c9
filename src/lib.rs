//! vector-ngin
//!
//! A small cross-platform game template for vector art. Art is authored as SVG,
//! tessellated into triangle meshes and drawn with GPU instancing; paths whose id
//! starts with `collider` become physics colliders. Rigid bodies are simulated by
//! a built-in 2D physics world and tied to render instances through a specs ECS.
//! Everything runs natively and on WASM.
//!
//! High-level modules
//! - `camera`: world and screen space orthographic cameras
//! - `config`: startup settings (window, MSAA, tick rate, logging)
//! - `context`: central GPU and window context that owns device/queue/pipeline
//! - `data_structures`: meshes, instances, instance batches and render targets
//! - `flow`: high level flow control (scenes / update loops)
//! - `pipelines`: the vector render pipeline
//! - `render`: render composition and batching
//! - `tessellation`, `svg`, `text`: turning paths, SVG files and glyphs into meshes
//! - `physics`: rigid bodies, colliders and the fixed-step solver
//! - `ecs`, `object`, `unit`: entities tying meshes to bodies
//! - `debug`: physics overlay
//! - `resources`: asset loading from disk or over HTTP
//! - `demo`: the playground scene started by the binary and the web build
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod debug;
pub mod demo;
pub mod ecs;
pub mod flow;
pub mod object;
pub mod physics;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod svg;
pub mod tessellation;
pub mod text;
pub mod unit;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::{Rad, Vector2};
pub use specs;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
