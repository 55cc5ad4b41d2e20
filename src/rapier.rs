//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! Each body part is a dynamic rigid body attached to its parent part by an
//! [`ImpulseJoint`] on the child. The joint's three angular motors are driven
//! toward the [`RagdollJoint`] target with its drive profile. Parts without a
//! parent joint (the root) are driven by a spring-damper torque instead.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use bevy_rapier3d::rapier::prelude::MotorModel;

use crate::backend::RagdollPhysicsBackend;
use crate::collision::{FeetGrounded, Ground, HandContact, RagdollImpact};
use crate::config::RagdollConfig;
use crate::skeleton::{BodyPart, GrabHand, RagdollJoint, Skeleton};
use crate::state::GroundSensor;
use crate::RagdollSet;

const ANGULAR_AXES: [JointAxis; 3] = [JointAxis::AngX, JointAxis::AngY, JointAxis::AngZ];

/// Rapier3D physics backend for the ragdoll controller.
///
/// This backend uses `bevy_rapier3d` for velocity manipulation, impulses and
/// grab couplings. Ground probing and contact routing are handled by dedicated
/// Rapier systems that receive `RapierContext` as a system parameter.
pub struct Rapier3dBackend;

impl RagdollPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.get().mass)
            .unwrap_or(0.0)
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
        } else {
            // Fallback: apply as velocity change if no ExternalImpulse component
            let mass = Self::get_mass(world, entity);
            if mass <= 0.0 {
                return;
            }
            if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
                vel.linvel += impulse / mass;
            }
        }
    }

    fn attach_grab(world: &mut World, hand: Entity, target: Entity) -> Option<Entity> {
        if !world.entities().contains(hand) || !world.entities().contains(target) {
            return None;
        }

        let hand_rotation = Self::get_rotation(world, hand);
        let target_rotation = Self::get_rotation(world, target);
        let offset = Self::get_position(world, hand) - Self::get_position(world, target);
        let inverse = target_rotation.inverse();

        let joint = FixedJointBuilder::new()
            .local_anchor1(inverse * offset)
            .local_basis1(inverse * hand_rotation);

        // The joint lives on a child of the hand so a hand can keep its own
        // limb joint.
        let coupling = world.spawn(ImpulseJoint::new(target, joint)).id();
        world.entity_mut(hand).add_child(coupling);
        Some(coupling)
    }

    fn release_grab(world: &mut World, coupling: Entity) {
        if world.entities().contains(coupling) {
            world.entity_mut(coupling).despawn_recursive();
        }
    }
}

/// Plugin that sets up Rapier3D-specific systems for the ragdoll controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (rapier_ground_sensing, rapier_contact_routing).in_set(RagdollSet::Sensors),
        );
        app.add_systems(
            Update,
            (sync_joint_motors, drive_unjointed_parts).in_set(RagdollSet::FinalApplication),
        );
    }
}

/// Cast a ray straight down from each root, looking for [`Ground`] within
/// `balance_height`.
fn rapier_ground_sensing(
    rapier_context: ReadRapierContext,
    mut q_characters: Query<(&Skeleton, &RagdollConfig, &mut GroundSensor)>,
    q_transforms: Query<&GlobalTransform>,
    q_ground: Query<(), With<Ground>>,
) {
    let context = rapier_context.single();

    let is_ground = |entity: Entity| q_ground.contains(entity);
    let filter = QueryFilter::new().exclude_sensors().predicate(&is_ground);

    for (skeleton, config, mut sensor) in &mut q_characters {
        let Some(root) = skeleton.get(BodyPart::Root) else {
            continue;
        };
        let Ok(transform) = q_transforms.get(root) else {
            continue;
        };

        *sensor = match context.cast_ray(
            transform.translation(),
            Vec3::NEG_Y,
            config.balance_height,
            true,
            filter,
        ) {
            Some((_, distance)) => GroundSensor::hit(distance),
            None => GroundSensor::miss(),
        };
    }
}

/// Translate Rapier collision starts into ragdoll contact events.
///
/// Contacts between two parts of the same character are ignored.
fn rapier_contact_routing(
    mut collisions: EventReader<CollisionEvent>,
    q_joints: Query<&RagdollJoint>,
    q_hands: Query<&GrabHand>,
    q_velocities: Query<&Velocity>,
    q_ground: Query<(), With<Ground>>,
    mut impacts: EventWriter<RagdollImpact>,
    mut landings: EventWriter<FeetGrounded>,
    mut hand_contacts: EventWriter<HandContact>,
) {
    let owner_of = |entity: Entity| {
        q_joints
            .get(entity)
            .ok()
            .and_then(|j| j.owner)
            .or_else(|| q_hands.get(entity).ok().and_then(|h| h.owner))
    };
    let velocity_of = |entity: Entity| {
        q_velocities
            .get(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    };

    for event in collisions.read() {
        let CollisionEvent::Started(a, b, _) = *event else {
            continue;
        };
        let relative_velocity = (velocity_of(a) - velocity_of(b)).length();

        for (this, other) in [(a, b), (b, a)] {
            let Some(character) = owner_of(this) else {
                continue;
            };
            if owner_of(other) == Some(character) {
                continue;
            }

            if let Ok(joint) = q_joints.get(this) {
                impacts.send(RagdollImpact::new(character, joint.part, relative_velocity));
                if joint.part.is_foot() && q_ground.contains(other) {
                    landings.send(FeetGrounded { character });
                }
            }
            if let Ok(hand) = q_hands.get(this) {
                hand_contacts.send(HandContact {
                    character,
                    side: hand.side,
                    target: other,
                });
            }
        }
    }
}

/// Push changed joint targets and drives into the angular motors.
pub fn sync_joint_motors(
    mut q_joints: Query<(&RagdollJoint, &mut ImpulseJoint), Changed<RagdollJoint>>,
) {
    for (joint, mut impulse_joint) in &mut q_joints {
        let target = Vec4::from(joint.target)
            .try_normalize()
            .map_or(Quat::IDENTITY, Quat::from_vec4);
        let (x, y, z) = target.to_euler(EulerRot::XYZ);
        let drive = joint.drive;

        let generic = impulse_joint.data.as_mut();
        for (axis, angle) in ANGULAR_AXES.into_iter().zip([x, y, z]) {
            generic
                .set_motor_model(axis, MotorModel::ForceBased)
                .set_motor(axis, angle, 0.0, drive.stiffness, drive.damping)
                .set_motor_max_force(axis, drive.max_force);
        }
    }
}

/// Pull parts that have no parent joint toward their target with a torque.
///
/// The body orientation a target asks for is its inverse, the same convention
/// the turning code authors root targets in.
pub fn drive_unjointed_parts(
    mut q_parts: Query<
        (&RagdollJoint, &Transform, &Velocity, &mut ExternalForce),
        Without<ImpulseJoint>,
    >,
) {
    for (joint, transform, velocity, mut force) in &mut q_parts {
        force.torque = drive_torque(joint, transform.rotation, velocity.angvel);
    }
}

/// Spring-damper torque turning `rotation` toward the orientation `joint`
/// asks for, clamped to the drive's maximum force.
fn drive_torque(joint: &RagdollJoint, rotation: Quat, angular_velocity: Vec3) -> Vec3 {
    let target = Vec4::from(joint.target)
        .try_normalize()
        .map_or(Quat::IDENTITY, Quat::from_vec4);
    let mut error = target.inverse() * rotation.inverse();
    if error.w < 0.0 {
        error = -error;
    }
    let (axis, angle) = error.to_axis_angle();
    let drive = joint.drive;

    let torque = axis * angle * drive.stiffness - angular_velocity * drive.damping;
    if drive.max_force.is_finite() {
        torque.clamp_length_max(drive.max_force.max(0.0))
    } else {
        torque
    }
}

/// Bundle for creating a ragdoll body part with Rapier3D physics.
///
/// This bundle provides the Rapier3D components a body part needs besides its
/// collider and its joint to the parent part: the rigid body, velocity
/// tracking, external impulses for punches and foot planting, an external
/// force for the root drive, collision event reporting for impacts and grabs,
/// damping, and mass properties for the center of mass.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use active_ragdoll_controller::prelude::*;
///
/// fn spawn_forearm(mut commands: Commands, upper_arm: Entity) -> Entity {
///     let joint = SphericalJointBuilder::new()
///         .local_anchor1(Vec3::new(0.0, -0.15, 0.0))
///         .local_anchor2(Vec3::new(0.0, 0.15, 0.0));
///     commands
///         .spawn((
///             Transform::from_xyz(0.6, 1.45, 0.0),
///             Rapier3dPartBundle::new(),
///             Collider::capsule_y(0.15, 0.05),
///             ImpulseJoint::new(upper_arm, joint),
///             RagdollJoint::new(BodyPart::LowerRightArm),
///         ))
///         .id()
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `active_events`: [`ActiveEvents::COLLISION_EVENTS`]
/// - `damping`: Linear 0.1, Angular 0.5
#[derive(Bundle, Default)]
pub struct Rapier3dPartBundle {
    /// The rigid body type. Should be [`RigidBody::Dynamic`] for ragdoll parts.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Updated by Rapier each physics step.
    pub velocity: Velocity,
    /// Accumulated impulses applied this frame.
    pub external_impulse: ExternalImpulse,
    /// Drive torque of a part without a parent joint.
    pub external_force: ExternalForce,
    /// Collision event reporting, needed for impacts, landings and grabs.
    pub active_events: ActiveEvents,
    pub damping: Damping,
    /// Computed mass properties. Rapier updates this based on the entity's collider.
    pub mass_properties: ReadMassProperties,
}

impl Rapier3dPartBundle {
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_impulse: ExternalImpulse::default(),
            external_force: ExternalForce::default(),
            active_events: ActiveEvents::COLLISION_EVENTS,
            damping: Damping {
                linear_damping: 0.1,
                angular_damping: 0.5,
            },
            // Rapier will update this based on collider after first physics step
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Set the damping coefficients for velocity reduction.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }
}
