//! Contact generation between pairs of world-space shapes.

use cgmath::{InnerSpace, Vector2};

use super::shape::{ConvexPolygon, Shape};

/// A point where two shapes touch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ContactPoint {
    pub position: Vector2<f32>,
    /// Penetration depth, positive when overlapping.
    pub depth: f32,
}

/// Contact points of one shape pair. `normal` points from the first shape to the
/// second.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    pub normal: Vector2<f32>,
    pub points: Vec<ContactPoint>,
}

impl Manifold {
    fn single(normal: Vector2<f32>, position: Vector2<f32>, depth: f32) -> Self {
        Self {
            normal,
            points: vec![ContactPoint { position, depth }],
        }
    }

    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

/// Collide two shapes that are already in world space.
pub fn collide(a: &Shape, b: &Shape) -> Option<Manifold> {
    match (a, b) {
        (
            Shape::Ball {
                center: ca,
                radius: ra,
            },
            Shape::Ball {
                center: cb,
                radius: rb,
            },
        ) => collide_balls(*ca, *ra, *cb, *rb),
        (Shape::Polygon(polygon), Shape::Ball { center, radius }) => {
            collide_polygon_ball(polygon, *center, *radius)
        }
        (Shape::Ball { center, radius }, Shape::Polygon(polygon)) => {
            collide_polygon_ball(polygon, *center, *radius).map(Manifold::flipped)
        }
        (Shape::Polygon(pa), Shape::Polygon(pb)) => collide_polygons(pa, pb),
    }
}

fn collide_balls(ca: Vector2<f32>, ra: f32, cb: Vector2<f32>, rb: f32) -> Option<Manifold> {
    let d = cb - ca;
    let distance = d.magnitude();
    if distance > ra + rb {
        return None;
    }
    let normal = if distance > f32::EPSILON {
        d / distance
    } else {
        Vector2::new(0.0, 1.0)
    };
    let depth = ra + rb - distance;
    Some(Manifold::single(
        normal,
        ca + normal * (ra - 0.5 * depth),
        depth,
    ))
}

fn collide_polygon_ball(
    polygon: &ConvexPolygon,
    center: Vector2<f32>,
    radius: f32,
) -> Option<Manifold> {
    let vertices = polygon.vertices();
    let normals = polygon.normals();

    let mut separation = f32::MIN;
    let mut face = 0;
    for (i, (v, n)) in vertices.iter().zip(normals).enumerate() {
        let s = n.dot(center - v);
        if s > radius {
            return None;
        }
        if s > separation {
            separation = s;
            face = i;
        }
    }

    let v1 = vertices[face];
    let v2 = vertices[(face + 1) % vertices.len()];
    let face_normal = normals[face];

    if separation < f32::EPSILON {
        // centre inside the polygon
        let depth = radius - separation;
        return Some(Manifold::single(
            face_normal,
            center - face_normal * (radius - 0.5 * depth),
            depth,
        ));
    }

    let u1 = (center - v1).dot(v2 - v1);
    let u2 = (center - v2).dot(v1 - v2);
    let corner = if u1 <= 0.0 {
        Some(v1)
    } else if u2 <= 0.0 {
        Some(v2)
    } else {
        None
    };

    match corner {
        Some(corner) => {
            let d = center - corner;
            let distance = d.magnitude();
            if distance > radius || distance <= f32::EPSILON {
                return None;
            }
            Some(Manifold::single(d / distance, corner, radius - distance))
        }
        None => {
            let depth = radius - separation;
            Some(Manifold::single(
                face_normal,
                center - face_normal * (radius - 0.5 * depth),
                depth,
            ))
        }
    }
}

/// Largest separation of `b` along the face normals of `a`, with the face index.
fn max_separation(a: &ConvexPolygon, b: &ConvexPolygon) -> (f32, usize) {
    let mut best = (f32::MIN, 0);
    for (i, (v, n)) in a.vertices().iter().zip(a.normals()).enumerate() {
        let s = b
            .vertices()
            .iter()
            .map(|w| n.dot(w - v))
            .fold(f32::MAX, f32::min);
        if s > best.0 {
            best = (s, i);
        }
    }
    best
}

/// Keep the part of a segment behind the plane `normal · x = offset`.
fn clip_segment(
    segment: [Vector2<f32>; 2],
    normal: Vector2<f32>,
    offset: f32,
) -> Option<[Vector2<f32>; 2]> {
    let d0 = normal.dot(segment[0]) - offset;
    let d1 = normal.dot(segment[1]) - offset;
    let mut out = Vec::with_capacity(2);
    if d0 <= 0.0 {
        out.push(segment[0]);
    }
    if d1 <= 0.0 {
        out.push(segment[1]);
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        out.push(segment[0] + (segment[1] - segment[0]) * t);
    }
    match out.as_slice() {
        [p, q, ..] => Some([*p, *q]),
        _ => None,
    }
}

fn collide_polygons(a: &ConvexPolygon, b: &ConvexPolygon) -> Option<Manifold> {
    let (separation_a, face_a) = max_separation(a, b);
    if separation_a > 0.0 {
        return None;
    }
    let (separation_b, face_b) = max_separation(b, a);
    if separation_b > 0.0 {
        return None;
    }

    // prefer faces of `a` to keep the reference face stable between steps
    let (reference, incident, face, flip) = if separation_b > separation_a + 1.0e-3 {
        (b, a, face_b, true)
    } else {
        (a, b, face_a, false)
    };

    let ref_normal = reference.normals()[face];
    let v1 = reference.vertices()[face];
    let v2 = reference.vertices()[(face + 1) % reference.len()];

    let incident_face = incident
        .normals()
        .iter()
        .enumerate()
        .map(|(i, n)| (i, n.dot(ref_normal)))
        .fold((0, f32::MAX), |best, (i, d)| if d < best.1 { (i, d) } else { best })
        .0;
    let incident_edge = [
        incident.vertices()[incident_face],
        incident.vertices()[(incident_face + 1) % incident.len()],
    ];

    let tangent = (v2 - v1).normalize();
    let clipped = clip_segment(incident_edge, -tangent, -tangent.dot(v1))
        .and_then(|edge| clip_segment(edge, tangent, tangent.dot(v2)))?;

    let points: Vec<ContactPoint> = clipped
        .iter()
        .filter_map(|&p| {
            let separation = ref_normal.dot(p - v1);
            (separation <= 0.0).then_some(ContactPoint {
                position: p,
                depth: -separation,
            })
        })
        .collect();
    if points.is_empty() {
        return None;
    }

    let manifold = Manifold {
        normal: ref_normal,
        points,
    };
    Some(if flip { manifold.flipped() } else { manifold })
}
