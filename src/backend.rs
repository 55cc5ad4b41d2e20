//! Physics backend abstraction.
//!
//! The controller never talks to a physics engine directly. Everything it
//! needs from the rigid bodies of a skeleton (mass, pose, velocity, impulses,
//! and grab couplings) goes through [`RagdollPhysicsBackend`], so physics
//! engines can be swapped without touching the control logic.

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this trait to drive ragdolls with a physics engine. All methods
/// are static and operate on the ECS world directly, so they can be called
/// from the controller's exclusive systems.
///
/// Besides these methods, a backend plugin is expected to:
/// - write [`GroundSensor`](crate::state::GroundSensor) for every character in
///   [`RagdollSet::Sensors`](crate::RagdollSet::Sensors),
/// - translate its collision events into the events of
///   [`collision`](crate::collision),
/// - push [`RagdollJoint`](crate::skeleton::RagdollJoint) targets and drives
///   into its joints in [`RagdollSet::FinalApplication`](crate::RagdollSet::FinalApplication).
///
/// See [`KinematicBackend`](crate::kinematic::KinematicBackend) for a minimal
/// implementation.
pub trait RagdollPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the mass of a rigid body. Zero when unknown.
    fn get_mass(world: &World, entity: Entity) -> f32;

    /// Get the linear velocity of a rigid body.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of a rigid body.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Apply an impulse to a rigid body.
    ///
    /// Impulse is an instantaneous change in momentum.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3);

    /// Fix `hand` to `target` at their current relative pose.
    ///
    /// Returns a handle to the coupling, or `None` if it could not be made.
    fn attach_grab(world: &mut World, hand: Entity, target: Entity) -> Option<Entity>;

    /// Break a coupling made by [`attach_grab`](Self::attach_grab).
    fn release_grab(world: &mut World, coupling: Entity);

    /// Get the world-space position of a rigid body.
    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    /// Get the world-space rotation of a rigid body.
    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation)
            .or_else(|| {
                world.get::<GlobalTransform>(entity).map(|t| {
                    let (_, rotation, _) = t.to_scale_rotation_translation();
                    rotation
                })
            })
            .unwrap_or(Quat::IDENTITY)
    }

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}
