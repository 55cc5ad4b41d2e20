//! Balance state machine.
//!
//! Decides whether the character is balanced and keeps the joint drives in
//! agreement with that decision. Drives are only rewritten when they are
//! stale (`balanced == is_ragdoll`), so repeated ticks with unchanged
//! conditions are no-ops.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::controller::ControlContext;
use crate::drive::{DriveProfile, DriveProfiles};
use crate::rig::Rig;
use crate::skeleton::{BodyPart, Side};
use crate::state::{GroundSensor, RagdollState};

/// Apply `root` to the root joint and `limbs` to every other driven joint.
///
/// Arms that are reaching keep their reach drive, and the torso keeps its
/// core drive while either arm reaches.
pub fn apply_drive_set<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &RagdollState,
    root: DriveProfile,
    limbs: DriveProfile,
) {
    rig.set_drive(BodyPart::Root, root);
    rig.set_drive(BodyPart::Head, limbs);
    if !state.any_reaching() {
        rig.set_drive(BodyPart::Body, limbs);
    }
    for side in Side::BOTH {
        if !state.is_reaching(side) {
            rig.set_drive(side.upper_arm(), limbs);
            rig.set_drive(side.lower_arm(), limbs);
        }
        rig.set_drive(side.upper_leg(), limbs);
        rig.set_drive(side.lower_leg(), limbs);
        rig.set_drive(side.foot(), limbs);
    }
}

/// Go limp.
pub fn activate_ragdoll<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    drives: &DriveProfiles,
) {
    apply_drive_set(rig, state, drives.drive_off, drives.drive_off);
    state.is_ragdoll = true;
    debug!("ragdoll activated");
}

/// Get back up and request a pose reset.
pub fn deactivate_ragdoll<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    drives: &DriveProfiles,
) {
    apply_drive_set(rig, state, drives.balance_on, drives.pose_on);
    state.is_ragdoll = false;
    state.reset_pose = true;
    debug!("ragdoll deactivated");
}

/// Knock the character down regardless of ground contact.
pub fn force_ragdoll<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    drives: &DriveProfiles,
) {
    state.balanced = false;
    resolve_drives(rig, state, drives);
}

/// Re-apply drives if they disagree with the balance flag.
pub fn resolve_drives<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    drives: &DriveProfiles,
) {
    if !state.drives_stale() {
        return;
    }
    if state.balanced {
        deactivate_ragdoll(rig, state, drives);
    } else {
        activate_ragdoll(rig, state, drives);
    }
}

/// Whether a grounded, unbalanced character may get back up.
pub fn should_recover(state: &RagdollState, ctx: &ControlContext, root_speed: f32) -> bool {
    ctx.config.auto_recover
        && !state.balanced
        && !state.airborne
        && !state.is_jumping()
        && !state.any_reaching()
        && root_speed < ctx.config.recovery_speed
}

/// Update `balanced` from the ground probe and resolve stale drives.
pub fn ground_check<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    sensor: GroundSensor,
) {
    if !sensor.grounded {
        state.balanced = false;
    } else {
        let root_speed = rig.velocity(BodyPart::Root).map_or(0.0, |v| v.length());
        if should_recover(state, ctx, root_speed) {
            state.balanced = true;
        }
    }
    resolve_drives(rig, state, ctx.drives);
}
