//! 2D rigid body physics.
//!
//! A small impulse based engine: fixed timestep integration, sweep-and-prune broad
//! phase, SAT narrow phase and a sequential impulse solver. Units are meters with
//! y pointing down, matching SVG and screen coordinates once scaled by
//! pixels-per-meter.
//!
//! ```
//! use cgmath::Vector2;
//! use vector_ngin::physics::{Physics, shape::Shape};
//!
//! let mut physics = Physics::default();
//! let ground = physics.spawn_ground(
//!     Vector2::new(0.0, 5.0),
//!     &[Physics::default_collider_builder(Shape::cuboid(10.0, 0.5))],
//! );
//! let ball = physics.spawn_rigid_body(
//!     &Physics::default_rigid_body_builder(),
//!     &[Physics::default_collider_builder(Shape::ball(0.5))],
//! );
//! physics.update(1.0);
//! assert!(physics.position(ball).unwrap().1 > 0.0);
//! assert!((physics.position(ground).unwrap().1 - 5.0).abs() < 1e-5);
//! ```

pub mod broad_phase;
pub mod narrow_phase;
pub mod shape;
pub mod solver;

use std::collections::HashSet;

use cgmath::{InnerSpace, Vector2};
use slotmap::{SecondaryMap, SlotMap};

use self::{
    narrow_phase::collide,
    shape::{Aabb, Isometry, MassProperties, Shape, rotate},
    solver::{Contact, SolverBody},
};

/// Fixed simulation step in seconds.
pub const DEFAULT_TIMESTEP: f32 = 1.0 / 60.0;
/// Upper bound of steps one `update` call may take to catch up.
pub const MAX_SUBSTEPS: usize = 8;
pub const DEFAULT_GRAVITY: Vector2<f32> = Vector2 { x: 0.0, y: 9.81 };

slotmap::new_key_type! {
    /// Generational handle of a body. Stale handles of removed bodies never alias
    /// new ones.
    pub struct BodyHandle;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BodyStatus {
    #[default]
    Dynamic,
    Static,
}

/// Describes a rigid body before it is spawned.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDesc {
    pub status: BodyStatus,
    /// Position of the body origin.
    pub translation: Vector2<f32>,
    pub rotation: f32,
    pub linear_velocity: Vector2<f32>,
    pub angular_velocity: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_enabled: bool,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            status: BodyStatus::Dynamic,
            translation: Vector2::new(0.0, 0.0),
            rotation: 0.0,
            linear_velocity: Vector2::new(0.0, 0.0),
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_enabled: true,
        }
    }
}

impl RigidBodyDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: BodyStatus) -> Self {
        self.status = status;
        self
    }

    pub fn translation(mut self, translation: Vector2<f32>) -> Self {
        self.translation = translation;
        self
    }

    pub fn rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn linear_velocity(mut self, velocity: Vector2<f32>) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn angular_velocity(mut self, velocity: f32) -> Self {
        self.angular_velocity = velocity;
        self
    }

    pub fn linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping.max(0.0);
        self
    }

    pub fn angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping.max(0.0);
        self
    }

    pub fn gravity_enabled(mut self, enabled: bool) -> Self {
        self.gravity_enabled = enabled;
        self
    }
}

/// Describes a collider, relative to the origin of the body it is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderDesc {
    pub shape: Shape,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl ColliderDesc {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            friction: 0.5,
            restitution: 0.0,
        }
    }

    pub fn density(mut self, density: f32) -> Self {
        self.density = density.max(0.0);
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }
}

#[derive(Debug, Clone)]
struct Body {
    status: BodyStatus,
    colliders: Vec<ColliderDesc>,
    /// Centre of mass relative to the body origin, unrotated.
    local_center: Vector2<f32>,
    /// World position of the centre of mass.
    center: Vector2<f32>,
    rotation: f32,
    linvel: Vector2<f32>,
    angvel: f32,
    inv_mass: f32,
    inv_inertia: f32,
    linear_damping: f32,
    angular_damping: f32,
    gravity_enabled: bool,
}

impl Body {
    fn new(desc: &RigidBodyDesc, colliders: &[ColliderDesc]) -> Self {
        let parts: Vec<MassProperties> = colliders
            .iter()
            .map(|c| c.shape.mass_properties(c.density))
            .collect();
        let props = MassProperties::combine(&parts);

        let dynamic = desc.status == BodyStatus::Dynamic;
        let (inv_mass, inv_inertia) = match (dynamic, props.mass > 0.0) {
            (false, _) => (0.0, 0.0),
            (true, true) => (
                1.0 / props.mass,
                if props.inertia > 0.0 {
                    1.0 / props.inertia
                } else {
                    0.0
                },
            ),
            (true, false) => {
                log::warn!("Dynamic body without mass, falling back to unit mass");
                (1.0, 1.0)
            }
        };

        Self {
            status: desc.status,
            colliders: colliders.to_vec(),
            local_center: props.center,
            center: desc.translation + rotate(props.center, desc.rotation),
            rotation: desc.rotation,
            linvel: if dynamic {
                desc.linear_velocity
            } else {
                Vector2::new(0.0, 0.0)
            },
            angvel: if dynamic { desc.angular_velocity } else { 0.0 },
            inv_mass,
            inv_inertia,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            gravity_enabled: desc.gravity_enabled,
        }
    }

    fn is_dynamic(&self) -> bool {
        self.status == BodyStatus::Dynamic
    }

    /// Pose of the body origin.
    fn isometry(&self) -> Isometry {
        Isometry::new(
            self.center - rotate(self.local_center, self.rotation),
            self.rotation,
        )
    }

    fn world_shapes(&self) -> Vec<(usize, Shape)> {
        let iso = self.isometry();
        self.colliders
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.shape.transformed(&iso)))
            .collect()
    }

    fn aabb(&self) -> Option<Aabb> {
        self.world_shapes()
            .iter()
            .map(|(_, shape)| shape.aabb())
            .reduce(|a, b| a.merged(&b))
    }

    fn bounding_radius(&self) -> f32 {
        let iso = self.isometry();
        self.colliders
            .iter()
            .map(|c| c.shape.transformed(&iso).bounding_radius(self.center))
            .fold(0.0, f32::max)
    }

    fn solver_body(&self) -> SolverBody {
        SolverBody {
            center: self.center,
            linvel: self.linvel,
            angvel: self.angvel,
            inv_mass: self.inv_mass,
            inv_inertia: self.inv_inertia,
        }
    }
}

/// Physics world.
#[derive(Debug, Clone)]
pub struct Physics {
    bodies: SlotMap<BodyHandle, Body>,
    gravity: Vector2<f32>,
    timestep: f32,
    accumulator: f32,
    contacts: Vec<(BodyHandle, BodyHandle)>,
}

impl Default for Physics {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVITY)
    }
}

impl Physics {
    /// Instantiate the physics world.
    pub fn new(gravity: Vector2<f32>) -> Self {
        Self {
            bodies: SlotMap::with_key(),
            gravity,
            timestep: DEFAULT_TIMESTEP,
            accumulator: 0.0,
            contacts: Vec::new(),
        }
    }

    pub fn gravity(&self) -> Vector2<f32> {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vector2<f32>) {
        self.gravity = gravity;
    }

    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    /// Non-positive or non-finite values are ignored.
    pub fn set_timestep(&mut self, timestep: f32) {
        if timestep > 0.0 && timestep.is_finite() {
            self.timestep = timestep;
        } else {
            log::warn!("Ignoring invalid physics timestep {}", timestep);
        }
    }

    /// Helps making constructing rigid bodies easier.
    pub fn default_rigid_body_builder() -> RigidBodyDesc {
        RigidBodyDesc::new()
            .gravity_enabled(true)
            .status(BodyStatus::Dynamic)
            .linear_damping(0.1)
    }

    /// Helps making constructing colliders for rigid bodies easier.
    pub fn default_collider_builder(shape: Shape) -> ColliderDesc {
        ColliderDesc::new(shape)
            .density(0.2)
            .restitution(0.1)
            .friction(0.5)
    }

    /// Spawn a rigid body with the given colliders.
    pub fn spawn_rigid_body(
        &mut self,
        desc: &RigidBodyDesc,
        colliders: &[ColliderDesc],
    ) -> BodyHandle {
        if colliders.is_empty() {
            log::debug!("Spawning body without colliders, it will not collide");
        }
        self.bodies.insert(Body::new(desc, colliders))
    }

    /// Spawn a static body that never moves.
    pub fn spawn_ground(
        &mut self,
        translation: Vector2<f32>,
        colliders: &[ColliderDesc],
    ) -> BodyHandle {
        let desc = RigidBodyDesc::new()
            .status(BodyStatus::Static)
            .translation(translation)
            .gravity_enabled(false);
        self.spawn_rigid_body(&desc, colliders)
    }

    /// Remove a body. Returns `false` if the handle was already invalid.
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        let removed = self.bodies.remove(handle).is_some();
        if removed {
            self.contacts.retain(|(a, b)| *a != handle && *b != handle);
        }
        removed
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Get the position (with rotation) of the body origin.
    pub fn position(&self, handle: BodyHandle) -> Option<(f32, f32, f32)> {
        self.bodies.get(handle).map(|body| {
            let iso = body.isometry();
            (iso.translation.x, iso.translation.y, iso.rotation)
        })
    }

    /// Origin positions (with rotation) of all bodies.
    pub fn positions(&self) -> Vec<(BodyHandle, (f32, f32, f32))> {
        self.bodies
            .iter()
            .map(|(handle, body)| {
                let iso = body.isometry();
                (handle, (iso.translation.x, iso.translation.y, iso.rotation))
            })
            .collect()
    }

    /// A circle around every body: centre of mass and bounding radius.
    pub fn debug_circles(&self) -> Vec<(Vector2<f32>, f32)> {
        self.bodies
            .values()
            .map(|body| (body.center, body.bounding_radius()))
            .collect()
    }

    pub fn linear_velocity(&self, handle: BodyHandle) -> Option<Vector2<f32>> {
        self.bodies.get(handle).map(|body| body.linvel)
    }

    pub fn angular_velocity(&self, handle: BodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|body| body.angvel)
    }

    /// Only affects dynamic bodies.
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vector2<f32>) {
        if let Some(body) = self.bodies.get_mut(handle).filter(|b| b.is_dynamic()) {
            body.linvel = velocity;
        }
    }

    /// Apply an impulse at the centre of mass. Only affects dynamic bodies.
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vector2<f32>) {
        if let Some(body) = self.bodies.get_mut(handle).filter(|b| b.is_dynamic()) {
            body.linvel += impulse * body.inv_mass;
        }
    }

    /// Body pairs that were touching after the last step.
    pub fn contacts(&self) -> &[(BodyHandle, BodyHandle)] {
        &self.contacts
    }

    /// Advance by real elapsed time, in as many fixed steps as fit.
    ///
    /// At most [`MAX_SUBSTEPS`] steps run per call; time that still does not fit
    /// afterwards is dropped so a long stall cannot snowball. Returns the number of
    /// steps taken.
    pub fn update(&mut self, dt: f32) -> usize {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= self.timestep && steps < MAX_SUBSTEPS {
            self.step();
            self.accumulator -= self.timestep;
            steps += 1;
        }
        if self.accumulator >= self.timestep {
            log::debug!(
                "Physics is falling behind, dropping {:.3}s",
                self.accumulator
            );
            self.accumulator = 0.0;
        }
        steps
    }

    /// Run the simulation for one fixed timestep.
    pub fn step(&mut self) {
        let dt = self.timestep;

        for body in self.bodies.values_mut().filter(|b| b.is_dynamic()) {
            if body.gravity_enabled {
                body.linvel += self.gravity * dt;
            }
            body.linvel *= 1.0 / (1.0 + dt * body.linear_damping);
            body.angvel *= 1.0 / (1.0 + dt * body.angular_damping);
        }

        let mut index = SecondaryMap::new();
        let mut handles = Vec::with_capacity(self.bodies.len());
        let mut solver_bodies = Vec::with_capacity(self.bodies.len());
        for (handle, body) in self.bodies.iter() {
            index.insert(handle, solver_bodies.len());
            handles.push(handle);
            solver_bodies.push(body.solver_body());
        }

        let contacts = self.find_contacts(&index);
        solver::solve_velocities(&mut solver_bodies, &contacts);

        for (i, solved) in solver_bodies.iter_mut().enumerate() {
            if let Some(body) = self.bodies.get_mut(handles[i]).filter(|b| b.is_dynamic()) {
                body.linvel = solved.linvel;
                body.angvel = solved.angvel;
                body.center += body.linvel * dt;
                body.rotation += body.angvel * dt;
                solved.center = body.center;
            }
        }

        solver::correct_positions(&mut solver_bodies, &contacts);
        for (i, solved) in solver_bodies.iter().enumerate() {
            if let Some(body) = self.bodies.get_mut(handles[i]).filter(|b| b.is_dynamic()) {
                body.center = solved.center;
            }
        }

        let mut touching = HashSet::new();
        self.contacts = contacts
            .iter()
            .map(|c| (handles[c.a], handles[c.b]))
            .filter(|pair| touching.insert(*pair))
            .collect();
    }

    fn find_contacts(&self, index: &SecondaryMap<BodyHandle, usize>) -> Vec<Contact> {
        let entries: Vec<(BodyHandle, Aabb)> = self
            .bodies
            .iter()
            .filter_map(|(handle, body)| body.aabb().map(|aabb| (handle, aabb)))
            .collect();

        let mut contacts = Vec::new();
        for (ha, hb) in broad_phase::sweep_and_prune(&entries) {
            let (a, b) = (&self.bodies[ha], &self.bodies[hb]);
            if !a.is_dynamic() && !b.is_dynamic() {
                continue;
            }
            let shapes_b = b.world_shapes();
            for (ia, shape_a) in a.world_shapes() {
                for (ib, shape_b) in shapes_b.iter() {
                    let Some(manifold) = collide(&shape_a, shape_b) else {
                        continue;
                    };
                    let (ca, cb) = (&a.colliders[ia], &b.colliders[*ib]);
                    contacts.push(Contact {
                        a: index[ha],
                        b: index[hb],
                        manifold,
                        friction: (ca.friction * cb.friction).sqrt(),
                        restitution: ca.restitution.max(cb.restitution),
                    });
                }
            }
        }
        contacts
    }

    /// Speed of the fastest body, handy to check whether a scene has settled.
    pub fn max_speed(&self) -> f32 {
        self.bodies
            .values()
            .map(|b| b.linvel.magnitude())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ground(physics: &mut Physics) -> BodyHandle {
        physics.spawn_ground(
            Vector2::new(0.0, 5.0),
            &[Physics::default_collider_builder(Shape::cuboid(20.0, 0.5))],
        )
    }

    fn crate_at(physics: &mut Physics, x: f32, y: f32) -> BodyHandle {
        physics.spawn_rigid_body(
            &Physics::default_rigid_body_builder().translation(Vector2::new(x, y)),
            &[Physics::default_collider_builder(Shape::cuboid(0.5, 0.5))],
        )
    }

    #[test]
    fn free_fall_follows_gravity() {
        let mut physics = Physics::new(Vector2::new(0.0, 10.0));
        let body = physics.spawn_rigid_body(
            &RigidBodyDesc::new(),
            &[ColliderDesc::new(Shape::ball(0.5))],
        );
        for _ in 0..60 {
            physics.step();
        }
        // semi-implicit Euler: v = g t, slightly ahead of the analytic 5 m
        let (x, y, _) = physics.position(body).unwrap();
        assert_relative_eq!(x, 0.0);
        assert!(y > 5.0 && y < 5.2, "y = {}", y);
        let velocity = physics.linear_velocity(body).unwrap();
        assert_relative_eq!(velocity.y, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn damping_slows_bodies_down() {
        let mut physics = Physics::new(Vector2::new(0.0, 0.0));
        let body = physics.spawn_rigid_body(
            &Physics::default_rigid_body_builder().linear_velocity(Vector2::new(1.0, 0.0)),
            &[Physics::default_collider_builder(Shape::ball(0.5))],
        );
        physics.step();
        assert!(physics.linear_velocity(body).unwrap().x < 1.0);
    }

    #[test]
    fn static_bodies_never_move() {
        let mut physics = Physics::default();
        let ground = ground(&mut physics);
        physics.set_linear_velocity(ground, Vector2::new(1.0, 0.0));
        physics.apply_impulse(ground, Vector2::new(0.0, -100.0));
        for _ in 0..120 {
            physics.step();
        }
        let (x, y, rotation) = physics.position(ground).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(y, 5.0, epsilon = 1e-5);
        assert_eq!(rotation, 0.0);
    }

    #[test]
    fn box_comes_to_rest_on_the_ground() {
        let mut physics = Physics::default();
        let ground = ground(&mut physics);
        let body = crate_at(&mut physics, 0.0, 0.0);
        for _ in 0..600 {
            physics.step();
        }
        let (x, y, rotation) = physics.position(body).unwrap();
        // ground surface at 4.5, box half height 0.5
        assert_relative_eq!(y, 4.0, epsilon = 0.05);
        assert_relative_eq!(x, 0.0, epsilon = 0.01);
        assert_relative_eq!(rotation, 0.0, epsilon = 0.01);
        assert!(physics.linear_velocity(body).unwrap().magnitude() < 0.1);
        let contacts = physics.contacts();
        assert!(contacts.contains(&(ground, body)) || contacts.contains(&(body, ground)));
    }

    #[test]
    fn update_runs_fixed_steps_and_keeps_remainder() {
        let mut physics = Physics::default();
        assert_eq!(physics.update(DEFAULT_TIMESTEP * 2.5), 2);
        assert_eq!(physics.update(DEFAULT_TIMESTEP * 0.5), 1);
        assert_eq!(physics.update(0.0), 0);
        assert_eq!(physics.update(f32::NAN), 0);
    }

    #[test]
    fn update_drops_time_it_cannot_catch_up() {
        let mut physics = Physics::default();
        assert_eq!(physics.update(10.0), MAX_SUBSTEPS);
        assert_eq!(physics.update(DEFAULT_TIMESTEP * 0.5), 0);
    }

    #[test]
    fn removed_handles_are_invalid() {
        let mut physics = Physics::default();
        let body = crate_at(&mut physics, 0.0, 0.0);
        assert!(physics.remove(body));
        assert!(!physics.remove(body));
        let other = crate_at(&mut physics, 1.0, 0.0);
        assert_ne!(body, other);
        assert!(physics.position(body).is_none());
        assert_eq!(physics.len(), 1);
    }

    #[test]
    fn origin_is_derived_from_the_centre_of_mass() {
        let mut physics = Physics::new(Vector2::new(0.0, 0.0));
        // collider offset from the body origin
        let points = [
            Vector2::new(1.0, 0.0),
            Vector2::new(3.0, 0.0),
            Vector2::new(3.0, 2.0),
            Vector2::new(1.0, 2.0),
        ];
        let body = physics.spawn_rigid_body(
            &RigidBodyDesc::new()
                .translation(Vector2::new(10.0, 10.0))
                .angular_velocity(1.0),
            &[ColliderDesc::new(Shape::convex_hull(&points).unwrap())],
        );
        let center = physics.debug_circles()[0].0;
        assert_relative_eq!(center.x, 12.0, epsilon = 1e-5);
        assert_relative_eq!(center.y, 11.0, epsilon = 1e-5);

        for _ in 0..30 {
            physics.step();
        }
        // spinning about the centre of mass keeps it in place
        let center = physics.debug_circles()[0].0;
        assert_relative_eq!(center.x, 12.0, epsilon = 1e-4);
        assert_relative_eq!(center.y, 11.0, epsilon = 1e-4);
        let (x, y, rotation) = physics.position(body).unwrap();
        assert_relative_eq!(rotation, 0.5, epsilon = 1e-4);
        let offset = Vector2::new(x, y) - center;
        assert_relative_eq!(offset.magnitude(), 5.0f32.sqrt(), epsilon = 1e-4);
    }
}
