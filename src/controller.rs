//! Per-character tick orchestration.
//!
//! The controller runs twice per frame: a variable-rate frame phase that reads
//! input and senses the world, and a fixed-rate physics phase that blends
//! velocities and drives the gait. Both phases take the character's
//! [`RagdollState`] by reference and hand it to each engine in turn.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::config::RagdollConfig;
use crate::drive::DriveProfiles;
use crate::intent::RagdollIntent;
use crate::pose::DefaultPose;
use crate::rig::Rig;
use crate::state::{GroundSensor, RagdollState};
use crate::{balance, grab, jump, locomotion, punch, reach};

/// Read-only inputs shared by every engine during a tick.
#[derive(Debug, Clone, Copy)]
pub struct ControlContext<'a> {
    pub config: &'a RagdollConfig,
    pub drives: &'a DriveProfiles,
    pub pose: &'a DefaultPose,
    pub intent: &'a RagdollIntent,
}

/// Variable-rate update.
///
/// Returns the refreshed center of mass, or `None` when the skeleton has no
/// mass to average.
pub fn frame_update<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    sensor: GroundSensor,
    dt: f32,
) -> Option<Vec3> {
    if !state.airborne {
        locomotion::update_walk_intent(rig, state, ctx);
        punch::perform_punch(rig, state, ctx);
    }

    reach::perform_reach(rig, state, ctx);
    grab::release_grabs(rig, state, ctx);

    if ctx.config.use_step_prediction {
        if state.balanced {
            locomotion::predict_steps(rig, state);
        }
    } else {
        locomotion::reset_walk_cycle_if_idle(state);
    }

    punch::tick_punch_returns(rig, state, ctx, dt);
    balance::ground_check(rig, state, ctx, sensor);

    rig.center_of_mass()
}

/// Fixed-rate update.
pub fn fixed_update<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    dt: f32,
) {
    if !state.airborne {
        locomotion::apply_movement(rig, ctx);
    }
    locomotion::apply_rotation(rig, ctx, dt);
    if !state.airborne {
        locomotion::perform_walking(rig, state, ctx, dt);
    }
    if state.reset_pose && !state.jump.requested {
        reach::apply_pose_reset(rig, state, ctx);
    }
    jump::perform_jump(rig, state, ctx, dt);
}
