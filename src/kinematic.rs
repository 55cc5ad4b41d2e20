//! Kinematic physics backend.
//!
//! A physics-free backend that integrates point bodies against a flat ground
//! plane. It has no joints or collision shapes. Joint targets and drives are
//! left on [`RagdollJoint`] for inspection, which makes this backend suitable
//! for tests and headless simulations.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::collision::FeetGrounded;
use crate::config::RagdollConfig;
use crate::skeleton::{BodyPart, RagdollJoint, Skeleton};
use crate::state::GroundSensor;
use crate::RagdollSet;

/// Backend backed by [`KinematicBody`] components.
pub struct KinematicBackend;

/// Point mass integrated by [`KinematicBackend`].
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct KinematicBody {
    pub mass: f32,
    pub velocity: Vec3,
    /// Impulse accumulated since the last integration step.
    pub impulse: Vec3,
    /// Whether the body rested on the ground after the last step.
    pub on_ground: bool,
}

impl Default for KinematicBody {
    fn default() -> Self {
        Self::with_mass(1.0)
    }
}

impl KinematicBody {
    pub fn with_mass(mass: f32) -> Self {
        Self {
            mass,
            velocity: Vec3::ZERO,
            impulse: Vec3::ZERO,
            on_ground: false,
        }
    }
}

/// Ground plane and gravity of the kinematic world.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Resource)]
pub struct KinematicEnvironment {
    pub ground_height: f32,
    pub gravity: Vec3,
}

impl Default for KinematicEnvironment {
    fn default() -> Self {
        Self {
            ground_height: 0.0,
            gravity: Vec3::ZERO,
        }
    }
}

/// Rigid link between a hand and a held body.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct KinematicCoupling {
    pub hand: Entity,
    pub target: Entity,
    /// Target position relative to the hand at the moment of the grab.
    pub offset: Vec3,
}

impl RagdollPhysicsBackend for KinematicBackend {
    fn plugin() -> impl Plugin {
        KinematicBackendPlugin
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        world
            .get::<KinematicBody>(entity)
            .map(|b| b.mass)
            .unwrap_or(0.0)
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<KinematicBody>(entity)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<KinematicBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        if let Some(mut body) = world.get_mut::<KinematicBody>(entity) {
            body.impulse += impulse;
        }
    }

    fn attach_grab(world: &mut World, hand: Entity, target: Entity) -> Option<Entity> {
        if !world.entities().contains(hand) || !world.entities().contains(target) {
            return None;
        }
        let offset = Self::get_position(world, target) - Self::get_position(world, hand);
        let coupling = world
            .spawn(KinematicCoupling {
                hand,
                target,
                offset,
            })
            .id();
        Some(coupling)
    }

    fn release_grab(world: &mut World, coupling: Entity) {
        if world.entities().contains(coupling) {
            world.despawn(coupling);
        }
    }
}

/// Plugin that senses ground and integrates [`KinematicBody`] motion.
pub struct KinematicBackendPlugin;

impl Plugin for KinematicBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<KinematicBody>();
        app.register_type::<KinematicCoupling>();
        app.register_type::<KinematicEnvironment>();
        app.init_resource::<KinematicEnvironment>();

        app.add_systems(Update, kinematic_ground_sensing.in_set(RagdollSet::Sensors));
        app.add_systems(
            FixedUpdate,
            (integrate_kinematic_bodies, follow_kinematic_couplings)
                .chain()
                .after(RagdollSet::Motion),
        );
    }
}

/// Probe straight down from each root against the ground plane.
pub fn kinematic_ground_sensing(
    env: Res<KinematicEnvironment>,
    mut q_characters: Query<(&Skeleton, &RagdollConfig, &mut GroundSensor)>,
    q_bodies: Query<&Transform, With<KinematicBody>>,
) {
    for (skeleton, config, mut sensor) in &mut q_characters {
        let Some(root) = skeleton.get(BodyPart::Root) else {
            continue;
        };
        let Ok(transform) = q_bodies.get(root) else {
            continue;
        };
        let distance = transform.translation.y - env.ground_height;
        *sensor = if (0.0..=config.balance_height).contains(&distance) {
            GroundSensor::hit(distance)
        } else {
            GroundSensor::miss()
        };
    }
}

/// Integrate impulses, gravity and velocity, then resolve ground contact.
///
/// A foot landing on the ground reports [`FeetGrounded`] for its owner.
pub fn integrate_kinematic_bodies(
    time: Res<Time>,
    env: Res<KinematicEnvironment>,
    mut q_bodies: Query<(&mut Transform, &mut KinematicBody, Option<&RagdollJoint>)>,
    mut grounded: EventWriter<FeetGrounded>,
) {
    let dt = time.delta_secs();
    for (mut transform, mut body, joint) in &mut q_bodies {
        let (mass, impulse) = (body.mass, body.impulse);
        if mass > 0.0 {
            body.velocity += impulse / mass;
        }
        body.impulse = Vec3::ZERO;
        body.velocity += env.gravity * dt;
        transform.translation += body.velocity * dt;

        let was_on_ground = body.on_ground;
        body.on_ground = transform.translation.y <= env.ground_height;
        if body.on_ground {
            transform.translation.y = env.ground_height;
            body.velocity.y = body.velocity.y.max(0.0);
        }

        let Some(joint) = joint else {
            continue;
        };
        if body.on_ground && !was_on_ground && joint.part.is_foot() {
            if let Some(character) = joint.owner {
                grounded.send(FeetGrounded { character });
            }
        }
    }
}

/// Move held bodies along with the hands holding them.
pub fn follow_kinematic_couplings(
    q_couplings: Query<&KinematicCoupling>,
    mut q_transforms: Query<&mut Transform>,
) {
    for coupling in &q_couplings {
        let Ok(hand) = q_transforms.get(coupling.hand).map(|t| t.translation) else {
            continue;
        };
        if let Ok(mut target) = q_transforms.get_mut(coupling.target) {
            target.translation = hand + coupling.offset;
        }
    }
}
