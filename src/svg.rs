//! SVG loading.
//!
//! An SVG document is both the art and the physics description of an object.
//! Paths whose id (or whose parent group's id) starts with `collider` are never
//! drawn; they become collision shapes instead:
//!
//! - `collider-ball...` is fitted with a ball around the path bounds.
//! - any other `collider...` becomes the convex hull of the path.
//!
//! Everything else is tessellated into a single coloured mesh.

use std::str::FromStr;

use anyhow::Context as _;
use cgmath::Vector2;
use lyon::{
    math::point,
    path::{FillRule, LineCap, LineJoin, Path, PathEvent, iterator::PathIterator},
    tessellation::{FillOptions, StrokeOptions},
};
use resvg::usvg::{self, tiny_skia_path::PathSegment};

use crate::{
    data_structures::mesh::MeshData,
    physics::shape::Shape,
    tessellation::{
        Affine, Geometry, PATH_TOLERANCE, VertexCtor, fill_path, linear_rgba, stroke_path,
        transform_point,
    },
};

const COLLIDER_PREFIX: &str = "collider";
const BALL_PREFIX: &str = "collider-ball";

#[derive(Debug, Clone)]
struct Painted {
    path: Path,
    transform: Affine,
    fill: Option<([f32; 4], FillRule)>,
    stroke: Option<([f32; 4], StrokeOptions)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColliderKind {
    Ball,
    Hull,
}

#[derive(Debug, Clone)]
struct ColliderPath {
    id: String,
    kind: ColliderKind,
    path: Path,
    transform: Affine,
}

/// A parsed SVG document, split into drawable paths and collider paths.
#[derive(Debug, Clone)]
pub struct Svg {
    size: Vector2<f32>,
    painted: Vec<Painted>,
    colliders: Vec<ColliderPath>,
}

impl FromStr for Svg {
    type Err = anyhow::Error;

    fn from_str(svg: &str) -> Result<Self, Self::Err> {
        let options = usvg::Options {
            shape_rendering: usvg::ShapeRendering::GeometricPrecision,
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &options).context("Could not parse SVG")?;

        let mut parsed = Svg {
            size: Vector2::new(tree.size().width(), tree.size().height()),
            painted: Vec::new(),
            colliders: Vec::new(),
        };
        parsed.visit(tree.root(), None);
        log::debug!(
            "Parsed SVG with {} paths and {} colliders",
            parsed.painted.len(),
            parsed.colliders.len()
        );
        Ok(parsed)
    }
}

impl Svg {
    fn visit(&mut self, group: &usvg::Group, collider_group: Option<&str>) {
        let collider_group = collider_group
            .or_else(|| Some(group.id()).filter(|id| id.starts_with(COLLIDER_PREFIX)));

        for node in group.children() {
            match node {
                usvg::Node::Group(child) => self.visit(child, collider_group),
                usvg::Node::Path(path) => self.add_path(path, collider_group),
                usvg::Node::Image(image) => {
                    log::warn!("Skipping embedded image {}, only paths are drawn", image.id())
                }
                // text is already converted to paths by usvg when fonts are available
                usvg::Node::Text(text) => self.visit(text.flattened(), collider_group),
            }
        }
    }

    fn add_path(&mut self, path: &usvg::Path, collider_group: Option<&str>) {
        let ts = path.abs_transform();
        let transform = [ts.sx, ts.ky, ts.kx, ts.sy, ts.tx, ts.ty];
        let lyon_path = convert_path(path.data());

        let own_id = Some(path.id()).filter(|id| id.starts_with(COLLIDER_PREFIX));
        if let Some(id) = own_id.or(collider_group) {
            let kind = if id.starts_with(BALL_PREFIX) {
                ColliderKind::Ball
            } else {
                ColliderKind::Hull
            };
            self.colliders.push(ColliderPath {
                id: id.to_string(),
                kind,
                path: lyon_path,
                transform,
            });
            return;
        }

        if !path.is_visible() {
            return;
        }

        let fill = path.fill().and_then(|fill| {
            let rule = match fill.rule() {
                usvg::FillRule::NonZero => FillRule::NonZero,
                usvg::FillRule::EvenOdd => FillRule::EvenOdd,
            };
            paint_color(fill.paint(), fill.opacity().get()).map(|color| (color, rule))
        });
        let stroke = path.stroke().and_then(|stroke| {
            paint_color(stroke.paint(), stroke.opacity().get())
                .map(|color| (color, convert_stroke(stroke)))
        });
        if fill.is_none() && stroke.is_none() {
            return;
        }

        self.painted.push(Painted {
            path: lyon_path,
            transform,
            fill,
            stroke,
        });
    }

    /// Width and height of the document in pixels.
    pub fn size(&self) -> Vector2<f32> {
        self.size
    }

    /// Ids of the collider paths, in document order.
    pub fn collider_ids(&self) -> impl Iterator<Item = &str> {
        self.colliders.iter().map(|c| c.id.as_str())
    }

    /// Tessellate every drawable path into one mesh, in paint order.
    pub fn mesh(&self) -> anyhow::Result<MeshData> {
        let mut geometry = Geometry::new();

        for painted in self.painted.iter() {
            let tolerance = PATH_TOLERANCE / scale_factor(&painted.transform);
            if let Some((color, rule)) = painted.fill {
                fill_path(
                    &painted.path,
                    &FillOptions::tolerance(tolerance).with_fill_rule(rule),
                    VertexCtor::new(color, painted.transform),
                    &mut geometry,
                )?;
            }

            if let Some((color, options)) = painted.stroke {
                stroke_path(
                    &painted.path,
                    &options.with_tolerance(tolerance),
                    VertexCtor::new(color, painted.transform),
                    &mut geometry,
                );
            }
        }

        Ok(geometry.into())
    }

    /// Collision shapes in meters, relative to the document origin.
    ///
    /// Collider paths that do not span an area are skipped with a warning.
    pub fn colliders(&self, pixels_per_meter: f32) -> Vec<Shape> {
        self.colliders
            .iter()
            .filter_map(|collider| {
                let points: Vec<Vector2<f32>> = flatten(&collider.path, &collider.transform)
                    .into_iter()
                    .map(|p| p / pixels_per_meter)
                    .collect();
                let shape = match collider.kind {
                    ColliderKind::Ball => fit_ball(&points),
                    ColliderKind::Hull => Shape::convex_hull(&points),
                };
                if shape.is_none() {
                    log::warn!("Collider {} has no area, skipping it", collider.id);
                }
                shape
            })
            .collect()
    }
}

fn scale_factor(ts: &Affine) -> f32 {
    let det = (ts[0] * ts[3] - ts[1] * ts[2]).abs().sqrt();
    if det > f32::EPSILON { det } else { 1.0 }
}

fn paint_color(paint: &usvg::Paint, opacity: f32) -> Option<[f32; 4]> {
    let (color, stop_opacity) = match paint {
        usvg::Paint::Color(color) => (*color, 1.0),
        // gradients are approximated with their first stop
        usvg::Paint::LinearGradient(gradient) => {
            let stop = gradient.stops().first()?;
            (stop.color(), stop.opacity().get())
        }
        usvg::Paint::RadialGradient(gradient) => {
            let stop = gradient.stops().first()?;
            (stop.color(), stop.opacity().get())
        }
        usvg::Paint::Pattern(_) => {
            log::warn!("Pattern paint is not supported, skipping");
            return None;
        }
    };
    Some(linear_rgba(
        color.red,
        color.green,
        color.blue,
        opacity * stop_opacity,
    ))
}

fn convert_stroke(stroke: &usvg::Stroke) -> StrokeOptions {
    let line_cap = match stroke.linecap() {
        usvg::LineCap::Butt => LineCap::Butt,
        usvg::LineCap::Square => LineCap::Square,
        usvg::LineCap::Round => LineCap::Round,
    };
    let line_join = match stroke.linejoin() {
        usvg::LineJoin::Miter => LineJoin::Miter,
        usvg::LineJoin::MiterClip => LineJoin::MiterClip,
        usvg::LineJoin::Bevel => LineJoin::Bevel,
        usvg::LineJoin::Round => LineJoin::Round,
    };

    StrokeOptions::tolerance(PATH_TOLERANCE)
        .with_line_width(stroke.width().get())
        .with_line_cap(line_cap)
        .with_line_join(line_join)
        .with_miter_limit(
            stroke
                .miterlimit()
                .get()
                .max(StrokeOptions::MINIMUM_MITER_LIMIT),
        )
}

/// Convert usvg path data into a lyon path in the path's local coordinates.
fn convert_path(data: &usvg::tiny_skia_path::Path) -> Path {
    let mut builder = Path::builder();
    let mut open = false;
    let mut start = point(0.0, 0.0);

    for segment in data.segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                if open {
                    builder.end(false);
                }
                start = point(p.x, p.y);
                builder.begin(start);
                open = true;
            }
            PathSegment::LineTo(p) => {
                if !open {
                    builder.begin(start);
                    open = true;
                }
                builder.line_to(point(p.x, p.y));
            }
            PathSegment::QuadTo(c, p) => {
                if !open {
                    builder.begin(start);
                    open = true;
                }
                builder.quadratic_bezier_to(point(c.x, c.y), point(p.x, p.y));
            }
            PathSegment::CubicTo(c1, c2, p) => {
                if !open {
                    builder.begin(start);
                    open = true;
                }
                builder.cubic_bezier_to(
                    point(c1.x, c1.y),
                    point(c2.x, c2.y),
                    point(p.x, p.y),
                );
            }
            PathSegment::Close => {
                if open {
                    builder.end(true);
                    open = false;
                }
            }
        }
    }
    if open {
        builder.end(false);
    }
    builder.build()
}

/// Every point of the flattened path, in document coordinates.
fn flatten(path: &Path, transform: &Affine) -> Vec<Vector2<f32>> {
    let tolerance = PATH_TOLERANCE / scale_factor(transform);
    path.iter()
        .flattened(tolerance)
        .filter_map(|event| match event {
            PathEvent::Begin { at } => Some(at),
            PathEvent::Line { to, .. } => Some(to),
            _ => None,
        })
        .map(|p| {
            let p = transform_point(transform, p);
            Vector2::new(p.x, p.y)
        })
        .collect()
}

fn fit_ball(points: &[Vector2<f32>]) -> Option<Shape> {
    let first = points.first()?;
    let (min, max) = points.iter().fold((*first, *first), |(min, max), p| {
        (
            Vector2::new(min.x.min(p.x), min.y.min(p.y)),
            Vector2::new(max.x.max(p.x), max.y.max(p.y)),
        )
    });
    let radius = (max.x - min.x).max(max.y - min.y) / 2.0;
    (radius > f32::EPSILON).then(|| Shape::ball_at((min + max) / 2.0, radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CHARACTER: &str = r##"
        <svg xmlns="http://www.w3.org/2000/svg" width="40" height="60" viewBox="0 0 40 60">
            <rect x="0" y="0" width="40" height="60" fill="#ff0000"/>
            <circle cx="20" cy="20" r="10" fill="#000000" stroke="#ffffff" stroke-width="2"/>
            <rect id="collider" x="0" y="10" width="40" height="50" fill="#00ff00"/>
            <circle id="collider-ball-head" cx="20" cy="10" r="10" fill="#00ff00"/>
        </svg>
    "##;

    #[test]
    fn parses_size() {
        let svg: Svg = CHARACTER.parse().unwrap();
        assert_eq!(svg.size(), Vector2::new(40.0, 60.0));
    }

    #[test]
    fn colliders_are_not_drawn() {
        let svg: Svg = CHARACTER.parse().unwrap();
        let mesh = svg.mesh().unwrap();
        let (min, max) = mesh.bounds().unwrap();
        // the red background is the largest drawn path
        assert_relative_eq!(min.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(max.y, 60.0, epsilon = 1e-3);
        // nothing green made it into the mesh
        assert!(
            mesh.vertices
                .iter()
                .all(|v| v.color[1] < 0.5 || v.color[0] > 0.5)
        );
        assert_eq!(
            svg.collider_ids().collect::<Vec<_>>(),
            vec!["collider", "collider-ball-head"]
        );
    }

    #[test]
    fn collider_shapes_are_in_meters() {
        let svg: Svg = CHARACTER.parse().unwrap();
        let shapes = svg.colliders(10.0);
        assert_eq!(shapes.len(), 2);

        let aabb = shapes[0].aabb();
        assert!(matches!(shapes[0], Shape::Polygon(_)));
        assert_relative_eq!(aabb.min.y, 1.0, epsilon = 1e-4);
        assert_relative_eq!(aabb.max.x, 4.0, epsilon = 1e-4);
        assert_relative_eq!(aabb.max.y, 6.0, epsilon = 1e-4);

        match shapes[1] {
            Shape::Ball { center, radius } => {
                assert_relative_eq!(center.x, 2.0, epsilon = 1e-3);
                assert_relative_eq!(center.y, 1.0, epsilon = 1e-3);
                assert_relative_eq!(radius, 1.0, epsilon = 1e-3);
            }
            _ => panic!("expected a ball"),
        }
    }

    #[test]
    fn collider_groups_mark_their_children() {
        let svg: Svg = r##"
            <svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
                <g id="colliders">
                    <rect x="0" y="0" width="10" height="5" fill="#000"/>
                    <rect x="0" y="5" width="10" height="5" fill="#000"/>
                </g>
            </svg>
        "##
        .parse()
        .unwrap();
        assert_eq!(svg.colliders(1.0).len(), 2);
        assert!(svg.mesh().unwrap().is_empty());
    }

    #[test]
    fn transforms_are_applied() {
        let svg: Svg = r##"
            <svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
                <g transform="translate(50 20)">
                    <rect width="10" height="10" fill="#000"/>
                </g>
            </svg>
        "##
        .parse()
        .unwrap();
        let (min, max) = svg.mesh().unwrap().bounds().unwrap();
        assert_relative_eq!(min.x, 50.0, epsilon = 1e-3);
        assert_relative_eq!(min.y, 20.0, epsilon = 1e-3);
        assert_relative_eq!(max.x, 60.0, epsilon = 1e-3);
    }

    #[test]
    fn gradients_use_their_first_stop() {
        let svg: Svg = r##"
            <svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
                <linearGradient id="g">
                    <stop offset="0" stop-color="#0000ff"/>
                    <stop offset="1" stop-color="#ff0000"/>
                </linearGradient>
                <rect width="10" height="10" fill="url(#g)"/>
            </svg>
        "##
        .parse()
        .unwrap();
        let mesh = svg.mesh().unwrap();
        assert!(!mesh.is_empty());
        assert!(mesh.vertices.iter().all(|v| v.color == [0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn invalid_documents_are_errors() {
        assert!("not an svg".parse::<Svg>().is_err());
    }
}
