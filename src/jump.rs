//! Jump engine.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::balance;
use crate::controller::ControlContext;
use crate::rig::Rig;
use crate::skeleton::BodyPart;
use crate::state::RagdollState;

/// Handle the jump input and drive an active jump.
///
/// A rising edge while balanced and grounded starts a jump. While down, the
/// same edge knocks the character fully limp instead. The jump velocity is
/// driven for `jump_window` seconds, after which the character is airborne
/// until its feet report ground contact.
pub fn perform_jump<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    dt: f32,
) {
    if ctx.intent.is_jump_pressed() {
        if !state.jump_axis_used {
            state.jump_axis_used = true;
            if state.balanced && !state.airborne {
                state.jump.requested = true;
            } else if !state.balanced {
                balance::force_ragdoll(rig, state, ctx.drives);
            }
        }
    } else {
        state.jump_axis_used = false;
    }

    if !state.jump.requested {
        return;
    }

    state.jump.in_progress = true;
    if let Some(velocity) = rig.velocity(BodyPart::Root) {
        rig.set_velocity(
            BodyPart::Root,
            Vec3::new(velocity.x, ctx.config.jump_speed, velocity.z),
        );
    }

    state.jump.timer += dt;
    if state.jump.timer > ctx.config.jump_window {
        state.jump.timer = 0.0;
        state.jump.requested = false;
        state.jump.in_progress = false;
        state.airborne = true;
    }
}

/// Feet touched ground. Ends the airborne phase unless a jump is still
/// being driven.
pub fn on_feet_grounded(state: &mut RagdollState) {
    if state.airborne && !state.is_jumping() {
        state.airborne = false;
        state.reset_pose = true;
    }
}
