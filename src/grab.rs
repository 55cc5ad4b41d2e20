//! Grab couplings.
//!
//! A reaching hand that touches a [`Grabbable`] object holds on to it through
//! a physics coupling until the grab input is released.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::collision::Grabbable;
use crate::controller::ControlContext;
use crate::rig::Rig;
use crate::skeleton::Side;
use crate::state::RagdollState;

/// A hand touched `target`. Couple them if the side may grab.
pub fn on_hand_contact<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    side: Side,
    target: Entity,
) {
    let i = side.index();
    if !ctx.intent.is_grabbing(side) || state.punching[i] || state.grab_coupling[i].is_some() {
        return;
    }
    if rig.world().get::<Grabbable>(target).is_none() {
        return;
    }
    if let Some(coupling) = rig.attach_grab(side, target) {
        debug!("{side:?} hand grabbed {target}");
        state.grab_coupling[i] = Some(coupling);
    }
}

/// Break couplings of hands whose grab input is released.
pub fn release_grabs<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
) {
    for side in Side::BOTH {
        if ctx.intent.is_grabbing(side) {
            continue;
        }
        if let Some(coupling) = state.grab_coupling[side.index()].take() {
            rig.release_grab(coupling);
        }
    }
}
