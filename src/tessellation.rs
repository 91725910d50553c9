//! Path tessellation with lyon.
//!
//! SVG paths, glyph outlines and debug shapes all end up here and come out as
//! coloured triangle lists ([`MeshData`]).

use lyon::{
    math::{Point, point},
    path::{Path, Winding},
    tessellation::{
        BuffersBuilder, FillOptions, FillTessellator, FillVertex, FillVertexConstructor,
        StrokeOptions, StrokeTessellator, StrokeVertex, StrokeVertexConstructor, VertexBuffers,
    },
};

use crate::data_structures::mesh::{MeshData, Vertex};

pub const PATH_TOLERANCE: f32 = 0.01;

pub type Geometry = VertexBuffers<Vertex, u32>;

/// Row-major 2x3 affine transform `[a, b, c, d, e, f]` mapping
/// `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
pub type Affine = [f32; 6];

pub const IDENTITY: Affine = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

pub fn transform_point(ts: &Affine, p: Point) -> Point {
    point(
        ts[0] * p.x + ts[2] * p.y + ts[4],
        ts[1] * p.x + ts[3] * p.y + ts[5],
    )
}

fn srgb_to_linear(channel: f32) -> f32 {
    if channel <= 0.04045 {
        channel / 12.92
    } else {
        ((channel + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear RGBA from 8 bit sRGB channels and an opacity.
///
/// The surface is sRGB, so colours have to reach the shader in linear space to
/// come out as authored.
pub fn linear_rgba(red: u8, green: u8, blue: u8, alpha: f32) -> [f32; 4] {
    [
        srgb_to_linear(red as f32 / 255.0),
        srgb_to_linear(green as f32 / 255.0),
        srgb_to_linear(blue as f32 / 255.0),
        alpha.clamp(0.0, 1.0),
    ]
}

/// Used by lyon to create vertices.
pub struct VertexCtor {
    color: [f32; 4],
    transform: Affine,
}

impl VertexCtor {
    pub fn new(color: [f32; 4], transform: Affine) -> Self {
        Self { color, transform }
    }
}

impl FillVertexConstructor<Vertex> for VertexCtor {
    fn new_vertex(&mut self, vertex: FillVertex) -> Vertex {
        Vertex {
            position: transform_point(&self.transform, vertex.position()).to_array(),
            color: self.color,
        }
    }
}

impl StrokeVertexConstructor<Vertex> for VertexCtor {
    fn new_vertex(&mut self, vertex: StrokeVertex) -> Vertex {
        Vertex {
            position: transform_point(&self.transform, vertex.position()).to_array(),
            color: self.color,
        }
    }
}

/// Tessellate the inside of `path` and append it to `geometry`.
pub fn fill_path(
    path: &Path,
    options: &FillOptions,
    ctor: VertexCtor,
    geometry: &mut Geometry,
) -> anyhow::Result<()> {
    FillTessellator::new()
        .tessellate_path(path, options, &mut BuffersBuilder::new(geometry, ctor))
        .map_err(|err| anyhow::anyhow!("tesselation failed: {:?}", err))
}

/// Tessellate the outline of `path` and append it to `geometry`.
///
/// A failing stroke only loses the outline, so it is logged instead of failing
/// the whole mesh.
pub fn stroke_path(path: &Path, options: &StrokeOptions, ctor: VertexCtor, geometry: &mut Geometry) {
    if let Err(err) = StrokeTessellator::new().tessellate_path(
        path,
        options,
        &mut BuffersBuilder::new(geometry, ctor),
    ) {
        log::warn!("stroke tesselation failed: {:?}", err);
    }
}

/// A filled circle around the origin.
pub fn circle(radius: f32, color: [f32; 4]) -> anyhow::Result<MeshData> {
    let mut builder = Path::builder();
    builder.add_circle(point(0.0, 0.0), radius, Winding::Positive);
    let path = builder.build();

    let mut geometry = Geometry::new();
    fill_path(
        &path,
        &FillOptions::tolerance(PATH_TOLERANCE * radius.max(1.0)),
        VertexCtor::new(color, IDENTITY),
        &mut geometry,
    )?;
    Ok(geometry.into())
}

impl From<Geometry> for MeshData {
    fn from(geometry: Geometry) -> Self {
        Self {
            vertices: geometry.vertices,
            indices: geometry.indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn circle_is_centred_on_the_origin() {
        let mesh = circle(2.0, [0.0, 0.0, 1.0, 0.5]).unwrap();
        assert!(!mesh.is_empty());
        assert_eq!(mesh.indices.len() % 3, 0);
        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min.x, -2.0, epsilon = 0.05);
        assert_relative_eq!(max.y, 2.0, epsilon = 0.05);
        assert!(mesh.vertices.iter().all(|v| v.color == [0.0, 0.0, 1.0, 0.5]));
    }

    #[test]
    fn vertex_ctor_applies_the_transform() {
        let mut builder = Path::builder();
        builder.begin(point(0.0, 0.0));
        builder.line_to(point(1.0, 0.0));
        builder.line_to(point(1.0, 1.0));
        builder.line_to(point(0.0, 1.0));
        builder.end(true);
        let path = builder.build();

        let mut geometry = Geometry::new();
        let translate_and_scale = [2.0, 0.0, 0.0, 2.0, 10.0, 20.0];
        fill_path(
            &path,
            &FillOptions::default(),
            VertexCtor::new([1.0; 4], translate_and_scale),
            &mut geometry,
        )
        .unwrap();

        let mesh: MeshData = geometry.into();
        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min.x, 10.0);
        assert_relative_eq!(min.y, 20.0);
        assert_relative_eq!(max.x, 12.0);
        assert_relative_eq!(max.y, 22.0);
    }

    #[test]
    fn srgb_extremes_are_preserved() {
        assert_eq!(linear_rgba(0, 0, 0, 1.0), [0.0, 0.0, 0.0, 1.0]);
        let white = linear_rgba(255, 255, 255, 2.0);
        assert_relative_eq!(white[0], 1.0);
        assert_eq!(white[3], 1.0);
        assert!(linear_rgba(128, 0, 0, 1.0)[0] < 0.5);
    }
}
