//! Knockout on hard impacts.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::balance;
use crate::controller::ControlContext;
use crate::rig::Rig;
use crate::state::RagdollState;

/// Knock the character down if the collision was hard enough.
///
/// Returns whether the character was knocked out.
pub fn on_impact<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    relative_velocity: f32,
) -> bool {
    if !ctx.config.can_be_knocked_out || relative_velocity.abs() < ctx.config.knockout_velocity {
        return false;
    }
    debug!("knocked out by impact at {relative_velocity:.1} m/s");
    balance::force_ragdoll(rig, state, ctx.drives);
    true
}
