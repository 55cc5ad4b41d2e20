//! Core controller systems.
//!
//! These systems run the per-character engines. They are exclusive systems
//! generic over the physics backend: each character's components are copied
//! out, the engines run against a [`Rig`], and the updated state is written
//! back.

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::balance;
use crate::collision::{FeetGrounded, HandContact, RagdollImpact};
use crate::config::RagdollConfig;
use crate::controller::{self, ControlContext};
use crate::drive::DriveProfiles;
use crate::grab;
use crate::impact;
use crate::intent::RagdollIntent;
use crate::jump;
use crate::pose::DefaultPose;
use crate::rig::Rig;
use crate::skeleton::{GrabHand, RagdollJoint, Side, Skeleton};
use crate::state::{CenterOfMass, GroundSensor, RagdollState};

/// Set up characters that have a [`Skeleton`] but no [`RagdollState`] yet.
///
/// Missing parts are reported but do not block setup. The character runs
/// with whatever parts it has.
pub fn initialize_ragdolls<B: RagdollPhysicsBackend>(world: &mut World) {
    let pending: Vec<(Entity, Skeleton, Option<RagdollConfig>)> = world
        .query_filtered::<(Entity, &Skeleton, Option<&RagdollConfig>), Without<RagdollState>>()
        .iter(world)
        .map(|(e, skeleton, config)| (e, *skeleton, config.copied()))
        .collect();

    for (character, skeleton, config) in pending {
        if let Err(err) = skeleton.validate() {
            error!("ragdoll {character}: {err}");
        }
        link_parts(world, character, &skeleton);

        let config = config.unwrap_or_default();
        let drives = DriveProfiles::from_config(&config);
        let state = RagdollState::default();

        let mut rig = Rig::<B>::new(world, skeleton);
        let pose = DefaultPose::capture(&rig);
        balance::apply_drive_set(&mut rig, &state, drives.balance_on, drives.pose_on);
        let center = rig.center_of_mass().unwrap_or_default();

        let mut entity = world.entity_mut(character);
        if !entity.contains::<RagdollConfig>() {
            entity.insert(config);
        }
        if !entity.contains::<RagdollIntent>() {
            entity.insert(RagdollIntent::default());
        }
        entity.insert((
            drives,
            pose,
            state,
            CenterOfMass(center),
            GroundSensor::default(),
        ));
        debug!("ragdoll {character} initialized");
    }
}

/// Point every part and hand entity back at its character.
fn link_parts(world: &mut World, character: Entity, skeleton: &Skeleton) {
    for (part, entity) in skeleton.iter() {
        if !world.entities().contains(entity) {
            error!("ragdoll {character}: {part} entity {entity} does not exist");
            continue;
        }
        let mut entity = world.entity_mut(entity);
        match entity.get_mut::<RagdollJoint>() {
            Some(mut joint) => {
                joint.part = part;
                joint.owner = Some(character);
            }
            None => {
                let mut joint = RagdollJoint::new(part);
                joint.owner = Some(character);
                entity.insert(joint);
            }
        }
    }

    for side in Side::BOTH {
        let Some(hand) = skeleton.hand(side) else {
            continue;
        };
        if !world.entities().contains(hand) {
            error!("ragdoll {character}: {side:?} hand {hand} does not exist");
            continue;
        }
        let mut grab_hand = GrabHand::new(side);
        grab_hand.owner = Some(character);
        world.entity_mut(hand).insert(grab_hand);
    }
}

fn characters(world: &mut World) -> Vec<Entity> {
    world
        .query_filtered::<Entity, With<RagdollState>>()
        .iter(world)
        .collect()
}

/// Run `f` against one character and store the resulting state.
///
/// Returns `None` if the character is not fully initialized.
fn drive_character<B, R>(
    world: &mut World,
    character: Entity,
    f: impl FnOnce(&mut Rig<B>, &mut RagdollState, &ControlContext) -> R,
) -> Option<R>
where
    B: RagdollPhysicsBackend,
{
    let skeleton = *world.get::<Skeleton>(character)?;
    let config = *world.get::<RagdollConfig>(character)?;
    let drives = *world.get::<DriveProfiles>(character)?;
    let pose = *world.get::<DefaultPose>(character)?;
    let intent = world
        .get::<RagdollIntent>(character)
        .copied()
        .unwrap_or_default();
    let mut state = world.get::<RagdollState>(character)?.clone();

    let ctx = ControlContext {
        config: &config,
        drives: &drives,
        pose: &pose,
        intent: &intent,
    };
    let result = {
        let mut rig = Rig::<B>::new(world, skeleton);
        f(&mut rig, &mut state, &ctx)
    };

    if let Some(mut current) = world.get_mut::<RagdollState>(character) {
        current.set_if_neq(state);
    }
    Some(result)
}

/// Variable-rate phase: input, reach, punch, balance and center of mass.
pub fn run_frame_phase<B: RagdollPhysicsBackend>(world: &mut World) {
    let dt = world
        .get_resource::<Time>()
        .map(|t| t.delta_secs())
        .unwrap_or(0.0);

    for character in characters(world) {
        let sensor = world
            .get::<GroundSensor>(character)
            .copied()
            .unwrap_or_default();
        let center = drive_character::<B, _>(world, character, |rig, state, ctx| {
            controller::frame_update(rig, state, ctx, sensor, dt)
        });
        if let Some(Some(center)) = center {
            if let Some(mut com) = world.get_mut::<CenterOfMass>(character) {
                com.set_if_neq(CenterOfMass(center));
            }
        }
    }
}

/// Fixed-rate phase: movement, turning, gait, pose reset and jump.
pub fn run_physics_phase<B: RagdollPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);
    for character in characters(world) {
        drive_character::<B, _>(world, character, |rig, state, ctx| {
            controller::fixed_update(rig, state, ctx, dt);
        });
    }
}

fn drain<E: Event + Copy>(world: &World, cursor: &mut EventCursor<E>) -> Vec<E> {
    world
        .get_resource::<Events<E>>()
        .map(|events| cursor.read(events).copied().collect())
        .unwrap_or_default()
}

/// Route contact events to their characters.
pub fn process_contacts<B: RagdollPhysicsBackend>(
    world: &mut World,
    mut impacts: Local<EventCursor<RagdollImpact>>,
    mut landings: Local<EventCursor<FeetGrounded>>,
    mut hand_contacts: Local<EventCursor<HandContact>>,
) {
    for event in drain(world, &mut impacts) {
        drive_character::<B, _>(world, event.character, |rig, state, ctx| {
            if impact::on_impact(rig, state, ctx, event.relative_velocity) {
                debug!("{} knocked out through {}", event.character, event.part);
            }
        });
    }

    for event in drain(world, &mut landings) {
        if let Some(mut state) = world.get_mut::<RagdollState>(event.character) {
            jump::on_feet_grounded(&mut state);
        }
    }

    for event in drain(world, &mut hand_contacts) {
        drive_character::<B, _>(world, event.character, |rig, state, ctx| {
            grab::on_hand_contact(rig, state, ctx, event.side, event.target);
        });
    }
}
