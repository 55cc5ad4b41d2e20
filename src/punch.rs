//! Punch engine.
//!
//! A punch is edge-triggered per side. Pressing winds the arm up, releasing
//! throws it with a forward impulse, and a short while later the arm returns
//! to rest unless the button is held again by then.

use std::time::Duration;

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::controller::ControlContext;
use crate::rig::Rig;
use crate::skeleton::{BodyPart, Side};
use crate::state::RagdollState;

/// Joint targets of one punch phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PunchPose {
    pub body: Quat,
    pub upper_arm: Quat,
    pub lower_arm: Quat,
}

impl PunchPose {
    /// Cocked pose held while the button is down.
    pub fn wind_up(side: Side) -> Self {
        let s = side.sign();
        Self {
            body: Quat::from_xyzw(-0.15, -0.15 * s, 0.0, 1.0),
            upper_arm: Quat::from_xyzw(-0.62 * s, -0.51, 0.02, 1.0),
            lower_arm: Quat::from_xyzw(1.31 * s, 0.5, -0.5 * s, 1.0),
        }
    }

    /// Extended pose set when the punch is thrown.
    pub fn release(side: Side) -> Self {
        let s = side.sign();
        Self {
            body: Quat::from_xyzw(-0.15, 0.15 * s, 0.0, 1.0),
            upper_arm: Quat::from_xyzw(0.74 * s, 0.04, 0.0, 1.0),
            lower_arm: Quat::from_xyzw(0.2 * s, 0.0, 0.0, 1.0),
        }
    }

    fn apply<B: RagdollPhysicsBackend>(&self, rig: &mut Rig<B>, side: Side) {
        rig.set_target(BodyPart::Body, self.body);
        rig.set_target(side.upper_arm(), self.upper_arm);
        rig.set_target(side.lower_arm(), self.lower_arm);
    }
}

/// Detect punch edges on both sides.
pub fn perform_punch<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
) {
    if !ctx.config.can_punch {
        return;
    }

    for side in Side::BOTH {
        let i = side.index();
        let pressed = ctx.intent.punch(side);

        if pressed && !state.punching[i] {
            state.punching[i] = true;
            PunchPose::wind_up(side).apply(rig, side);
        } else if !pressed && state.punching[i] {
            state.punching[i] = false;
            PunchPose::release(side).apply(rig, side);

            if let Some(forward) = rig.forward(BodyPart::Root) {
                let impulse = forward * ctx.config.punch_force;
                rig.apply_hand_impulse(side, impulse);
                rig.apply_impulse(BodyPart::Body, impulse);
            }

            state.punch_return[i] = Some(Timer::from_seconds(
                ctx.config.punch_return_delay,
                TimerMode::Once,
            ));
        }
    }
}

/// Advance pending punch returns.
///
/// At expiry the arm returns to rest only if the button is not held at that
/// moment.
pub fn tick_punch_returns<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    dt: f32,
) {
    let delta = Duration::from_secs_f32(dt.max(0.0));
    for side in Side::BOTH {
        let slot = &mut state.punch_return[side.index()];
        let Some(timer) = slot.as_mut() else {
            continue;
        };
        if !timer.tick(delta).finished() {
            continue;
        }
        *slot = None;
        if !ctx.intent.punch(side) {
            ctx.pose.restore(rig, side.upper_arm());
            ctx.pose.restore(rig, side.lower_arm());
        }
    }
}
