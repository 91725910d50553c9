//! Collision shapes and their mass properties.
//!
//! Shapes are stored relative to the origin of the body they are attached to.
//! All coordinates are meters with y pointing down.

use cgmath::{InnerSpace, Vector2};

const EPSILON: f32 = 1.0e-6;

pub(crate) fn cross(a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}

/// `w × r` for an angular velocity `w`.
pub(crate) fn cross_sv(w: f32, r: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(-w * r.y, w * r.x)
}

pub(crate) fn rotate(v: Vector2<f32>, angle: f32) -> Vector2<f32> {
    let (sin, cos) = angle.sin_cos();
    Vector2::new(cos * v.x - sin * v.y, sin * v.x + cos * v.y)
}

/// Rotation followed by translation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Isometry {
    pub translation: Vector2<f32>,
    pub rotation: f32,
}

impl Isometry {
    pub fn new(translation: Vector2<f32>, rotation: f32) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn transform_point(&self, point: Vector2<f32>) -> Vector2<f32> {
        rotate(point, self.rotation) + self.translation
    }

    pub fn transform_vector(&self, vector: Vector2<f32>) -> Vector2<f32> {
        rotate(vector, self.rotation)
    }
}

impl Default for Isometry {
    fn default() -> Self {
        Self::new(Vector2::new(0.0, 0.0), 0.0)
    }
}

/// Axis aligned bounding box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

impl Aabb {
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Vector2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vector2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    fn from_points(points: &[Vector2<f32>]) -> Aabb {
        let first = points.first().copied().unwrap_or(Vector2::new(0.0, 0.0));
        points.iter().fold(
            Aabb {
                min: first,
                max: first,
            },
            |aabb, p| Aabb {
                min: Vector2::new(aabb.min.x.min(p.x), aabb.min.y.min(p.y)),
                max: Vector2::new(aabb.max.x.max(p.x), aabb.max.y.max(p.y)),
            },
        )
    }
}

/// Mass, centre of mass and rotational inertia about the centre of mass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MassProperties {
    pub mass: f32,
    pub center: Vector2<f32>,
    pub inertia: f32,
}

impl MassProperties {
    /// Combine several parts into the properties of one rigid body.
    pub fn combine(parts: &[MassProperties]) -> MassProperties {
        let mass: f32 = parts.iter().map(|p| p.mass).sum();
        if mass <= EPSILON {
            return MassProperties {
                mass: 0.0,
                center: Vector2::new(0.0, 0.0),
                inertia: 0.0,
            };
        }
        let center = parts
            .iter()
            .fold(Vector2::new(0.0, 0.0), |acc, p| acc + p.center * p.mass)
            / mass;
        // parallel axis theorem
        let inertia = parts
            .iter()
            .map(|p| p.inertia + p.mass * (p.center - center).magnitude2())
            .sum();
        MassProperties {
            mass,
            center,
            inertia,
        }
    }
}

/// A convex polygon with counter-clockwise winding (positive signed area) and
/// outward edge normals.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    vertices: Vec<Vector2<f32>>,
    normals: Vec<Vector2<f32>>,
}

impl ConvexPolygon {
    /// Convex hull of a point cloud (Andrew's monotone chain).
    ///
    /// Returns `None` when the points span no area.
    pub fn hull(points: &[Vector2<f32>]) -> Option<ConvexPolygon> {
        let mut sorted: Vec<Vector2<f32>> = points
            .iter()
            .copied()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .collect();
        sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        sorted.dedup_by(|a, b| (*a - *b).magnitude2() < EPSILON * EPSILON);
        if sorted.len() < 3 {
            return None;
        }

        let mut hull: Vec<Vector2<f32>> = Vec::with_capacity(sorted.len() * 2);
        for &p in sorted.iter() {
            while hull.len() >= 2
                && cross(hull[hull.len() - 1] - hull[hull.len() - 2], p - hull[hull.len() - 2])
                    <= EPSILON
            {
                hull.pop();
            }
            hull.push(p);
        }
        let lower_len = hull.len() + 1;
        for &p in sorted.iter().rev().skip(1) {
            while hull.len() >= lower_len
                && cross(hull[hull.len() - 1] - hull[hull.len() - 2], p - hull[hull.len() - 2])
                    <= EPSILON
            {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();

        if hull.len() < 3 {
            return None;
        }
        Some(Self::from_ccw(hull))
    }

    fn from_ccw(vertices: Vec<Vector2<f32>>) -> ConvexPolygon {
        let normals = (0..vertices.len())
            .map(|i| {
                let edge = vertices[(i + 1) % vertices.len()] - vertices[i];
                Vector2::new(edge.y, -edge.x).normalize()
            })
            .collect();
        ConvexPolygon { vertices, normals }
    }

    pub fn vertices(&self) -> &[Vector2<f32>] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vector2<f32>] {
        &self.normals
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn transformed(&self, iso: &Isometry) -> ConvexPolygon {
        ConvexPolygon {
            vertices: self.vertices.iter().map(|&v| iso.transform_point(v)).collect(),
            normals: self.normals.iter().map(|&n| iso.transform_vector(n)).collect(),
        }
    }

    /// Box2D's triangle fan integration.
    fn mass_properties(&self, density: f32) -> MassProperties {
        let reference = self.vertices[0];
        let mut area = 0.0;
        let mut center = Vector2::new(0.0, 0.0);
        let mut inertia = 0.0;
        for i in 1..self.vertices.len() - 1 {
            let e1 = self.vertices[i] - reference;
            let e2 = self.vertices[i + 1] - reference;
            let d = cross(e1, e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            center += (e1 + e2) * (triangle_area / 3.0);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 / 3.0) * d * (intx2 + inty2);
        }

        let mass = density * area;
        let local_center = center / area;
        // inertia about the reference point, shifted to the centroid
        let inertia = density * inertia - mass * local_center.magnitude2();
        MassProperties {
            mass,
            center: local_center + reference,
            inertia,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Ball { center: Vector2<f32>, radius: f32 },
    Polygon(ConvexPolygon),
}

impl Shape {
    /// A ball around the body origin.
    pub fn ball(radius: f32) -> Shape {
        Shape::ball_at(Vector2::new(0.0, 0.0), radius)
    }

    pub fn ball_at(center: Vector2<f32>, radius: f32) -> Shape {
        Shape::Ball {
            center,
            radius: radius.abs(),
        }
    }

    /// A box with the given half extents, centred on the body origin.
    pub fn cuboid(half_width: f32, half_height: f32) -> Shape {
        let (hx, hy) = (half_width.abs(), half_height.abs());
        Shape::Polygon(ConvexPolygon::from_ccw(vec![
            Vector2::new(-hx, -hy),
            Vector2::new(hx, -hy),
            Vector2::new(hx, hy),
            Vector2::new(-hx, hy),
        ]))
    }

    /// The convex hull of `points`, `None` for fewer than three non-collinear points.
    pub fn convex_hull(points: &[Vector2<f32>]) -> Option<Shape> {
        ConvexPolygon::hull(points).map(Shape::Polygon)
    }

    pub fn mass_properties(&self, density: f32) -> MassProperties {
        match self {
            Shape::Ball { center, radius } => {
                let mass = density * std::f32::consts::PI * radius * radius;
                MassProperties {
                    mass,
                    center: *center,
                    inertia: 0.5 * mass * radius * radius,
                }
            }
            Shape::Polygon(polygon) => polygon.mass_properties(density),
        }
    }

    /// The same shape moved into the frame described by `iso`.
    pub fn transformed(&self, iso: &Isometry) -> Shape {
        match self {
            Shape::Ball { center, radius } => Shape::Ball {
                center: iso.transform_point(*center),
                radius: *radius,
            },
            Shape::Polygon(polygon) => Shape::Polygon(polygon.transformed(iso)),
        }
    }

    pub fn aabb(&self) -> Aabb {
        match self {
            Shape::Ball { center, radius } => Aabb {
                min: center - Vector2::new(*radius, *radius),
                max: center + Vector2::new(*radius, *radius),
            },
            Shape::Polygon(polygon) => Aabb::from_points(polygon.vertices()),
        }
    }

    /// Distance from `point` to the farthest point of the shape.
    pub fn bounding_radius(&self, point: Vector2<f32>) -> f32 {
        match self {
            Shape::Ball { center, radius } => (center - point).magnitude() + radius,
            Shape::Polygon(polygon) => polygon
                .vertices()
                .iter()
                .map(|v| (v - point).magnitude())
                .fold(0.0, f32::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 2.0),
        ];
        let hull = ConvexPolygon::hull(&points).unwrap();
        assert_eq!(hull.len(), 4);
        assert!(!hull.vertices().contains(&Vector2::new(1.0, 1.0)));
        assert!(!hull.vertices().contains(&Vector2::new(1.0, 0.0)));
    }

    #[test]
    fn degenerate_hulls_are_rejected() {
        assert!(Shape::convex_hull(&[Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0)]).is_none());
        let line = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(2.0, 2.0),
        ];
        assert!(Shape::convex_hull(&line).is_none());
    }

    #[test]
    fn normals_point_outwards() {
        let Shape::Polygon(square) = Shape::cuboid(1.0, 1.0) else {
            panic!("cuboid is a polygon");
        };
        for (v, n) in square.vertices().iter().zip(square.normals()) {
            // the centre is behind every face
            assert!(n.dot(-*v) < 0.0);
        }
    }

    #[test]
    fn cuboid_mass_properties() {
        let props = Shape::cuboid(1.0, 0.5).mass_properties(2.0);
        // 2 x 1 box
        assert_relative_eq!(props.mass, 4.0, epsilon = 1e-5);
        assert_relative_eq!(props.center.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(props.center.y, 0.0, epsilon = 1e-5);
        // m * (w^2 + h^2) / 12
        assert_relative_eq!(props.inertia, 4.0 * 5.0 / 12.0, epsilon = 1e-4);
    }

    #[test]
    fn offset_hull_has_offset_centroid() {
        let points = [
            Vector2::new(2.0, 2.0),
            Vector2::new(4.0, 2.0),
            Vector2::new(4.0, 4.0),
            Vector2::new(2.0, 4.0),
        ];
        let props = Shape::convex_hull(&points).unwrap().mass_properties(1.0);
        assert_relative_eq!(props.mass, 4.0, epsilon = 1e-5);
        assert_relative_eq!(props.center.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(props.center.y, 3.0, epsilon = 1e-5);
        assert_relative_eq!(props.inertia, 4.0 * 8.0 / 12.0, epsilon = 1e-4);
    }

    #[test]
    fn combined_mass_uses_parallel_axis() {
        let part = Shape::ball_at(Vector2::new(1.0, 0.0), 1.0).mass_properties(1.0);
        let other = Shape::ball_at(Vector2::new(-1.0, 0.0), 1.0).mass_properties(1.0);
        let combined = MassProperties::combine(&[part, other]);
        assert_relative_eq!(combined.center.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(
            combined.inertia,
            2.0 * (part.inertia + part.mass),
            epsilon = 1e-4
        );
    }

    #[test]
    fn transformed_ball_and_aabb() {
        let iso = Isometry::new(Vector2::new(5.0, 0.0), std::f32::consts::FRAC_PI_2);
        let ball = Shape::ball_at(Vector2::new(1.0, 0.0), 0.5).transformed(&iso);
        let aabb = ball.aabb();
        assert_relative_eq!(aabb.min.x, 4.5, epsilon = 1e-5);
        assert_relative_eq!(aabb.min.y, 0.5, epsilon = 1e-5);
        assert_relative_eq!(aabb.max.y, 1.5, epsilon = 1e-5);
    }
}
