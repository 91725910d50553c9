//! TrueType text as vector meshes.
//!
//! Every distinct glyph is tessellated once into its own mesh. Drawing text then
//! only means placing one instance per character, so a HUD that changes every
//! frame never touches vertex data.

use std::collections::HashMap;

use anyhow::anyhow;
use cgmath::Vector2;
use lyon::{
    math::point,
    path::{FillRule, Path, path::Builder},
    tessellation::FillOptions,
};
use ttf_parser::{Face, OutlineBuilder};

use crate::{
    data_structures::{
        batch::MeshStore,
        instance::Instance,
        mesh::{MeshData, MeshId},
    },
    tessellation::{Geometry, IDENTITY, VertexCtor, fill_path},
};

/// Tessellation tolerance in em units.
const GLYPH_TOLERANCE: f32 = 0.001;

/// A glyph outline in em units, y pointing down with the baseline at `y = 0`.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub path: Path,
    pub advance: f32,
}

/// A parsed TrueType or OpenType font.
#[derive(Debug, Clone)]
pub struct Font {
    data: Vec<u8>,
    glyphs: u16,
    units_per_em: f32,
    ascender: f32,
    line_height: f32,
}

impl Font {
    pub fn from_bytes(data: Vec<u8>) -> anyhow::Result<Self> {
        let face = Face::parse(&data, 0).map_err(|e| anyhow!("Could not parse font: {e}"))?;
        let units_per_em = face.units_per_em() as f32;
        let glyphs = face.number_of_glyphs();
        let ascender = face.ascender() as f32 / units_per_em;
        let line_height = (face.ascender() as f32 - face.descender() as f32
            + face.line_gap() as f32)
            / units_per_em;
        log::debug!("Loaded font with {} glyphs", glyphs);

        Ok(Self {
            data,
            glyphs,
            units_per_em,
            ascender,
            line_height,
        })
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    /// Amount of glyphs in the font.
    pub fn glyphs(&self) -> u16 {
        self.glyphs
    }

    /// Distance from one baseline to the next, in em.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn ascender(&self) -> f32 {
        self.ascender
    }

    /// The outline of `c`, `None` if the font has no glyph for it.
    ///
    /// Whitespace has a glyph with an empty path.
    pub fn glyph_outline(&self, c: char) -> Option<Glyph> {
        let face = self.face()?;
        let id = face.glyph_index(c)?;
        let advance = face.glyph_hor_advance(id).unwrap_or(0) as f32 / self.units_per_em;

        let mut outline = OutlineConv::new(1.0 / self.units_per_em);
        face.outline_glyph(id, &mut outline);
        Some(Glyph {
            path: outline.build(),
            advance,
        })
    }

    /// Tessellate a glyph, `None` for glyphs without area.
    pub fn glyph_mesh(&self, c: char, color: [f32; 4]) -> anyhow::Result<Option<MeshData>> {
        let Some(glyph) = self.glyph_outline(c) else {
            return Ok(None);
        };
        if glyph.path.iter().next().is_none() {
            return Ok(None);
        }
        let mut geometry = Geometry::new();
        fill_path(
            &glyph.path,
            &FillOptions::tolerance(GLYPH_TOLERANCE).with_fill_rule(FillRule::NonZero),
            VertexCtor::new(color, IDENTITY),
            &mut geometry,
        )?;
        Ok(Some(geometry.into()))
    }

    /// Upload a mesh for every distinct character of `charset`.
    ///
    /// Characters the font does not know are skipped with a warning.
    pub fn upload(
        &self,
        device: &wgpu::Device,
        store: &mut MeshStore,
        charset: &str,
        color: [f32; 4],
    ) -> anyhow::Result<FontInstance> {
        let mut glyphs = HashMap::new();
        for c in charset.chars() {
            if glyphs.contains_key(&c) || c == '\n' {
                continue;
            }
            let Some(outline) = self.glyph_outline(c) else {
                log::warn!("Font has no glyph for {:?}", c);
                continue;
            };
            let mesh = match self.glyph_mesh(c, color)? {
                Some(data) if !data.is_empty() => {
                    Some(store.upload(device, &data, &format!("glyph {c:?}")))
                }
                _ => None,
            };
            glyphs.insert(
                c,
                GlyphMesh {
                    mesh,
                    advance: outline.advance,
                },
            );
        }
        log::info!("Uploaded {} glyphs", glyphs.len());

        Ok(FontInstance {
            glyphs,
            ascender: self.ascender,
            line_height: self.line_height,
        })
    }
}

/// Feeds ttf-parser outlines into a lyon path, scaling to em and flipping y.
struct OutlineConv {
    builder: Builder,
    scale: f32,
    open: bool,
}

impl OutlineConv {
    fn new(scale: f32) -> Self {
        Self {
            builder: Path::builder(),
            scale,
            open: false,
        }
    }

    fn p(&self, x: f32, y: f32) -> lyon::math::Point {
        point(x * self.scale, -y * self.scale)
    }

    fn build(mut self) -> Path {
        if self.open {
            self.builder.end(true);
        }
        self.builder.build()
    }
}

impl OutlineBuilder for OutlineConv {
    fn move_to(&mut self, x: f32, y: f32) {
        if self.open {
            self.builder.end(true);
        }
        let at = self.p(x, y);
        self.builder.begin(at);
        self.open = true;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let to = self.p(x, y);
        self.builder.line_to(to);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (ctrl, to) = (self.p(x1, y1), self.p(x, y));
        self.builder.quadratic_bezier_to(ctrl, to);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (ctrl1, ctrl2, to) = (self.p(x1, y1), self.p(x2, y2), self.p(x, y));
        self.builder.cubic_bezier_to(ctrl1, ctrl2, to);
    }

    fn close(&mut self) {
        if self.open {
            self.builder.end(true);
            self.open = false;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GlyphMesh {
    mesh: Option<MeshId>,
    advance: f32,
}

/// Glyph meshes of a font uploaded into a [`MeshStore`].
#[derive(Debug, Clone)]
pub struct FontInstance {
    glyphs: HashMap<char, GlyphMesh>,
    ascender: f32,
    line_height: f32,
}

impl FontInstance {
    /// One instance per visible character.
    ///
    /// `origin` is the top-left corner of the first line, `size` the em size in
    /// pixels.
    pub fn layout(
        &self,
        text: &str,
        origin: Vector2<f32>,
        size: f32,
        z: u8,
    ) -> Vec<(MeshId, Instance)> {
        let advance = |c: char| self.glyphs.get(&c).map(|g| g.advance);
        layout_glyphs(text, self.line_height, advance)
            .into_iter()
            .filter_map(|(c, pos)| {
                let mesh = self.glyphs.get(&c)?.mesh?;
                let at = origin + (pos + Vector2::new(0.0, self.ascender)) * size;
                let mut instance = Instance::new(at.x, at.y).with_scale(size);
                instance.set_z(z);
                Some((mesh, instance))
            })
            .collect()
    }

    /// Add the instances of `text` to the glyph meshes in `store`.
    pub fn place(
        &self,
        store: &mut MeshStore,
        text: &str,
        origin: Vector2<f32>,
        size: f32,
        z: u8,
    ) {
        for (mesh, instance) in self.layout(text, origin, size, z) {
            store.push_instance(mesh, instance);
        }
    }

    /// Width and height of `text` in pixels.
    pub fn measure(&self, text: &str, size: f32) -> Vector2<f32> {
        let mut width: f32 = 0.0;
        let mut line: f32 = 0.0;
        let mut lines = 1;
        for c in text.chars() {
            if c == '\n' {
                width = width.max(line);
                line = 0.0;
                lines += 1;
            } else if let Some(glyph) = self.glyphs.get(&c) {
                line += glyph.advance;
            }
        }
        Vector2::new(width.max(line), lines as f32 * self.line_height) * size
    }
}

/// Pen positions of every known character in `text`, in em.
///
/// Lines start at `x = 0` and advance by `line_height`. Characters for which
/// `advance` returns `None` are dropped without moving the pen.
pub fn layout_glyphs(
    text: &str,
    line_height: f32,
    mut advance: impl FnMut(char) -> Option<f32>,
) -> Vec<(char, Vector2<f32>)> {
    let mut pen = Vector2::new(0.0, 0.0);
    let mut placed = Vec::with_capacity(text.len());
    for c in text.chars() {
        if c == '\n' {
            pen = Vector2::new(0.0, pen.y + line_height);
            continue;
        }
        let Some(width) = advance(c) else {
            continue;
        };
        placed.push((c, pen));
        pen.x += width;
    }
    placed
}
