//! Sequential impulse contact solver.

use cgmath::{InnerSpace, Vector2};

use super::{
    narrow_phase::Manifold,
    shape::{cross, cross_sv},
};

pub const VELOCITY_ITERATIONS: usize = 8;
/// Penetration that is tolerated without positional correction.
pub const LINEAR_SLOP: f32 = 0.005;
/// Fraction of the remaining penetration resolved per step.
pub const BAUMGARTE: f32 = 0.2;
/// Closing speeds below this do not bounce.
pub const RESTITUTION_THRESHOLD: f32 = 1.0;

/// The part of a body the solver reads and writes.
#[derive(Debug, Copy, Clone)]
pub struct SolverBody {
    pub center: Vector2<f32>,
    pub linvel: Vector2<f32>,
    pub angvel: f32,
    pub inv_mass: f32,
    pub inv_inertia: f32,
}

/// A manifold between the solver bodies at index `a` and `b`.
#[derive(Debug, Clone)]
pub struct Contact {
    pub a: usize,
    pub b: usize,
    pub manifold: Manifold,
    pub friction: f32,
    pub restitution: f32,
}

struct PointConstraint {
    ra: Vector2<f32>,
    rb: Vector2<f32>,
    normal_mass: f32,
    tangent_mass: f32,
    bias: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
}

fn velocity_at(body: &SolverBody, r: Vector2<f32>) -> Vector2<f32> {
    body.linvel + cross_sv(body.angvel, r)
}

fn effective_mass(
    a: &SolverBody,
    b: &SolverBody,
    ra: Vector2<f32>,
    rb: Vector2<f32>,
    dir: Vector2<f32>,
) -> f32 {
    let rna = cross(ra, dir);
    let rnb = cross(rb, dir);
    let k = a.inv_mass + b.inv_mass + a.inv_inertia * rna * rna + b.inv_inertia * rnb * rnb;
    if k > 0.0 { 1.0 / k } else { 0.0 }
}

fn apply(
    bodies: &mut [SolverBody],
    a: usize,
    b: usize,
    ra: Vector2<f32>,
    rb: Vector2<f32>,
    impulse: Vector2<f32>,
) {
    let body = &mut bodies[a];
    body.linvel -= impulse * body.inv_mass;
    body.angvel -= body.inv_inertia * cross(ra, impulse);
    let body = &mut bodies[b];
    body.linvel += impulse * body.inv_mass;
    body.angvel += body.inv_inertia * cross(rb, impulse);
}

/// Resolve contact velocities with accumulated, clamped impulses.
pub fn solve_velocities(bodies: &mut [SolverBody], contacts: &[Contact]) {
    let mut constraints: Vec<Vec<PointConstraint>> = contacts
        .iter()
        .map(|contact| {
            let (a, b) = (&bodies[contact.a], &bodies[contact.b]);
            let normal = contact.manifold.normal;
            let tangent = Vector2::new(-normal.y, normal.x);
            contact
                .manifold
                .points
                .iter()
                .map(|point| {
                    let ra = point.position - a.center;
                    let rb = point.position - b.center;
                    let closing = (velocity_at(b, rb) - velocity_at(a, ra)).dot(normal);
                    let bias = if closing < -RESTITUTION_THRESHOLD {
                        -contact.restitution * closing
                    } else {
                        0.0
                    };
                    PointConstraint {
                        ra,
                        rb,
                        normal_mass: effective_mass(a, b, ra, rb, normal),
                        tangent_mass: effective_mass(a, b, ra, rb, tangent),
                        bias,
                        normal_impulse: 0.0,
                        tangent_impulse: 0.0,
                    }
                })
                .collect()
        })
        .collect();

    for _ in 0..VELOCITY_ITERATIONS {
        for (contact, points) in contacts.iter().zip(constraints.iter_mut()) {
            let normal = contact.manifold.normal;
            let tangent = Vector2::new(-normal.y, normal.x);
            for point in points.iter_mut() {
                // friction first, it is less important than non-penetration
                let dv = velocity_at(&bodies[contact.b], point.rb)
                    - velocity_at(&bodies[contact.a], point.ra);
                let lambda = -dv.dot(tangent) * point.tangent_mass;
                let max_friction = (contact.friction * point.normal_impulse).max(0.0);
                let accumulated =
                    (point.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                let lambda = accumulated - point.tangent_impulse;
                point.tangent_impulse = accumulated;
                apply(bodies, contact.a, contact.b, point.ra, point.rb, tangent * lambda);

                let dv = velocity_at(&bodies[contact.b], point.rb)
                    - velocity_at(&bodies[contact.a], point.ra);
                let lambda = (-dv.dot(normal) + point.bias) * point.normal_mass;
                let accumulated = (point.normal_impulse + lambda).max(0.0);
                let lambda = accumulated - point.normal_impulse;
                point.normal_impulse = accumulated;
                apply(bodies, contact.a, contact.b, point.ra, point.rb, normal * lambda);
            }
        }
    }
}

/// Push overlapping bodies apart along the contact normal.
///
/// Uses the depth measured before integration, so it only removes a fraction of
/// the overlap each step.
pub fn correct_positions(bodies: &mut [SolverBody], contacts: &[Contact]) {
    for contact in contacts {
        let inv_mass = bodies[contact.a].inv_mass + bodies[contact.b].inv_mass;
        if inv_mass <= 0.0 {
            continue;
        }
        let depth = contact
            .manifold
            .points
            .iter()
            .map(|p| p.depth)
            .fold(0.0, f32::max);
        let correction = (depth - LINEAR_SLOP).max(0.0) * BAUMGARTE / inv_mass;
        if correction <= 0.0 {
            continue;
        }
        let push = contact.manifold.normal * correction;
        bodies[contact.a].center -= push * bodies[contact.a].inv_mass;
        bodies[contact.b].center += push * bodies[contact.b].inv_mass;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::narrow_phase::ContactPoint;
    use approx::assert_relative_eq;

    fn body(x: f32, y: f32, vy: f32, inv_mass: f32) -> SolverBody {
        SolverBody {
            center: Vector2::new(x, y),
            linvel: Vector2::new(0.0, vy),
            angvel: 0.0,
            inv_mass,
            inv_inertia: inv_mass,
        }
    }

    fn falling_on_ground(restitution: f32, speed: f32) -> (Vec<SolverBody>, Vec<Contact>) {
        // ground below the ball, y points down
        let bodies = vec![body(0.0, 0.0, speed, 1.0), body(0.0, 1.0, 0.0, 0.0)];
        let contacts = vec![Contact {
            a: 0,
            b: 1,
            manifold: Manifold {
                normal: Vector2::new(0.0, 1.0),
                points: vec![ContactPoint {
                    position: Vector2::new(0.0, 0.5),
                    depth: 0.1,
                }],
            },
            friction: 0.5,
            restitution,
        }];
        (bodies, contacts)
    }

    #[test]
    fn inelastic_contact_stops_the_body() {
        let (mut bodies, contacts) = falling_on_ground(0.0, 3.0);
        solve_velocities(&mut bodies, &contacts);
        assert_relative_eq!(bodies[0].linvel.y, 0.0, epsilon = 1e-5);
        assert_eq!(bodies[1].linvel, Vector2::new(0.0, 0.0));
    }

    #[test]
    fn restitution_bounces_fast_contacts() {
        let (mut bodies, contacts) = falling_on_ground(0.5, 4.0);
        solve_velocities(&mut bodies, &contacts);
        assert_relative_eq!(bodies[0].linvel.y, -2.0, epsilon = 1e-4);
    }

    #[test]
    fn separating_bodies_are_left_alone() {
        let (mut bodies, contacts) = falling_on_ground(0.5, -1.0);
        solve_velocities(&mut bodies, &contacts);
        assert_relative_eq!(bodies[0].linvel.y, -1.0);
    }

    #[test]
    fn positional_correction_only_moves_dynamic_bodies() {
        let (mut bodies, contacts) = falling_on_ground(0.0, 0.0);
        correct_positions(&mut bodies, &contacts);
        assert!(bodies[0].center.y < 0.0);
        assert_eq!(bodies[1].center, Vector2::new(0.0, 1.0));
    }
}
