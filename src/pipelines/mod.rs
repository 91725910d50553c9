//! Render pipeline definitions.
//!
//! - `vector` draws instanced, per-vertex coloured triangles produced by the
//!   tessellator. It is used for SVG art, glyphs and debug shapes alike.

pub mod vector;
