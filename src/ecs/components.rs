//! Components shared by the engine systems.

use specs::{Component, VecStorage};

use crate::{
    data_structures::{instance::Instance, mesh::MeshId},
    physics::BodyHandle,
};

impl Component for Instance {
    type Storage = VecStorage<Self>;
}

/// The mesh an entity is drawn with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeshRef(pub MeshId);

impl Component for MeshRef {
    type Storage = VecStorage<Self>;
}

/// The physics body that drives an entity's [`Instance`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RigidBody(pub BodyHandle);

impl Component for RigidBody {
    type Storage = VecStorage<Self>;
}
