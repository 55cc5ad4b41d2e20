//! Locomotion engine.
//!
//! Movement blends the root's horizontal velocity toward the input direction.
//! The gait is a two-leg step cycle: a crossing trigger starts the first
//! step, then each finished step arms the opposite leg until walking stops.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::controller::ControlContext;
use crate::pose::nlerp;
use crate::rig::Rig;
use crate::skeleton::{BodyPart, Side};
use crate::state::RagdollState;

/// Fraction of the gap to the target velocity closed every physics tick.
pub const MOVEMENT_BLEND: f32 = 0.8;

/// Bound on the y component of the root target in body-relative turning.
pub const TURN_LIMIT: f32 = 0.98;

/// Rate of the body-relative turn blend.
const TURN_BLEND_RATE: f32 = 6.0;

/// Per-tick swing of the legs while stepping, scaled by step height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOffsets {
    pub upper: f32,
    pub lower: f32,
    /// Counter-swing of the other leg's upper joint.
    pub opposite_upper: f32,
}

/// Direction of travel of the gait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Backward,
}

impl StepDirection {
    /// Current direction, forward taking precedence.
    pub fn of(state: &RagdollState) -> Option<Self> {
        if state.walk_forward {
            Some(StepDirection::Forward)
        } else if state.walk_backward {
            Some(StepDirection::Backward)
        } else {
            None
        }
    }

    /// Sign along world Z.
    pub fn sign(self) -> f32 {
        match self {
            StepDirection::Forward => 1.0,
            StepDirection::Backward => -1.0,
        }
    }

    pub fn offsets(self) -> StepOffsets {
        match self {
            StepDirection::Forward => StepOffsets {
                upper: 0.09,
                lower: -0.18,
                opposite_upper: -0.06,
            },
            StepDirection::Backward => StepOffsets {
                upper: 0.0,
                lower: -0.14,
                opposite_upper: 0.01,
            },
        }
    }
}

/// Rates at which an idle leg settles back to its rest pose (upper, lower).
fn settle_rates(side: Side) -> (f32, f32) {
    match side {
        Side::Right => (8.0, 17.0),
        Side::Left => (7.0, 18.0),
    }
}

/// Translate movement input into walk flags.
pub fn update_walk_intent<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
) {
    let input = ctx.intent.movement;

    if ctx.config.camera_relative_movement {
        let wants_walk = input.x != 0.0 || (input.y != 0.0 && state.balanced);
        if wants_walk && !state.walk_forward && !state.move_axis_used {
            state.walk_forward = true;
            state.move_axis_used = true;
            state.key_held = true;
        }
        if input == Vec2::ZERO && state.walk_forward && state.move_axis_used {
            state.walk_forward = false;
            state.move_axis_used = false;
            state.key_held = false;
        }
        return;
    }

    if input.y > 0.0 {
        if !state.walk_forward && !state.move_axis_used {
            state.walk_backward = false;
            state.walk_forward = true;
            state.move_axis_used = true;
            state.key_held = true;
            if state.is_ragdoll {
                set_leg_drives(rig, ctx, true);
            }
        }
    } else if input.y < 0.0 {
        if !state.walk_backward && !state.move_axis_used {
            state.walk_forward = false;
            state.walk_backward = true;
            state.move_axis_used = true;
            state.key_held = true;
            if state.is_ragdoll {
                set_leg_drives(rig, ctx, true);
            }
        }
    } else if state.walk_forward || (state.walk_backward && state.move_axis_used) {
        state.walk_forward = false;
        state.walk_backward = false;
        state.move_axis_used = false;
        state.key_held = false;
        if state.is_ragdoll {
            set_leg_drives(rig, ctx, false);
        }
    }
}

fn set_leg_drives<B: RagdollPhysicsBackend>(rig: &mut Rig<B>, ctx: &ControlContext, on: bool) {
    let drive = if on {
        ctx.drives.pose_on
    } else {
        ctx.drives.drive_off
    };
    for side in Side::BOTH {
        rig.set_drive(side.upper_leg(), drive);
        rig.set_drive(side.lower_leg(), drive);
    }
}

/// Blend the root's horizontal velocity toward the input direction.
///
/// Vertical velocity is never touched.
pub fn apply_movement<B: RagdollPhysicsBackend>(rig: &mut Rig<B>, ctx: &ControlContext) {
    let (Some(rotation), Some(velocity)) =
        (rig.rotation(BodyPart::Root), rig.velocity(BodyPart::Root))
    else {
        return;
    };
    let input = ctx.intent.movement;
    let speed = ctx.config.move_speed;

    if ctx.config.camera_relative_movement {
        let mut direction = rotation * Vec3::new(input.x, 0.0, input.y);
        direction.y = 0.0;
        let target = direction * speed;
        let horizontal = velocity.xz().lerp(target.xz(), MOVEMENT_BLEND);
        rig.set_velocity(
            BodyPart::Root,
            Vec3::new(horizontal.x, velocity.y, horizontal.y),
        );
    } else if input.y != 0.0 {
        let planar = rotation * Vec3::Z * input.y * speed;
        rig.set_velocity(BodyPart::Root, Vec3::new(planar.x, velocity.y, planar.z));
    }
}

/// Turn the root target.
pub fn apply_rotation<B: RagdollPhysicsBackend>(rig: &mut Rig<B>, ctx: &ControlContext, dt: f32) {
    let Some(current) = rig.target(BodyPart::Root) else {
        return;
    };

    if ctx.config.camera_relative_movement {
        let mut look = ctx.intent.look_direction;
        look.y = 0.0;
        let Some(look) = look.try_normalize() else {
            return;
        };
        let facing = Quat::from_rotation_y(look.x.atan2(look.z));
        let from = Vec4::from(current)
            .try_normalize()
            .map_or(Quat::IDENTITY, Quat::from_vec4);
        let t = (dt * ctx.config.turn_speed).clamp(0.0, 1.0);
        rig.set_target(BodyPart::Root, from.slerp(facing.inverse(), t));
        return;
    }

    let turn = ctx.intent.movement.x;
    if turn == 0.0 {
        return;
    }
    let mut desired = current;
    desired.y -= turn * ctx.config.turn_speed;
    let mut next = nlerp(current, desired, TURN_BLEND_RATE * dt);
    // Past the bound the yaw wraps to the opposite side instead of saturating.
    if next.y < -TURN_LIMIT {
        next.y = TURN_LIMIT;
    } else if next.y > TURN_LIMIT {
        next.y = -TURN_LIMIT;
    }
    rig.set_target(BodyPart::Root, next);
}

/// Derive walk flags from the center of mass relative to the feet.
pub fn predict_steps<B: RagdollPhysicsBackend>(rig: &Rig<B>, state: &mut RagdollState) {
    if !state.is_walking() {
        reset_walk_cycle(state);
    }

    let (Some(com), Some(right), Some(left)) = (
        rig.center_of_mass(),
        rig.position(BodyPart::RightFoot),
        rig.position(BodyPart::LeftFoot),
    ) else {
        return;
    };

    if com.z < right.z && com.z < left.z {
        state.walk_backward = true;
    } else if !state.key_held {
        state.walk_backward = false;
    }

    if com.z > right.z && com.z > left.z {
        state.walk_forward = true;
    } else if !state.key_held {
        state.walk_forward = false;
    }
}

/// Clear every step flag, timer and latch.
pub fn reset_walk_cycle(state: &mut RagdollState) {
    for leg in &mut state.legs {
        leg.stepping = false;
        leg.timer = 0.0;
        leg.alert = false;
    }
}

pub fn reset_walk_cycle_if_idle(state: &mut RagdollState) {
    if !state.is_walking() {
        reset_walk_cycle(state);
    }
}

/// Run one tick of the step cycle for both legs.
pub fn perform_walking<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    dt: f32,
) {
    let direction = StepDirection::of(state);
    if let Some(direction) = direction {
        check_alternation(rig, state, direction);
    }

    for side in Side::BOTH {
        if state.leg(side).stepping {
            take_step(rig, state, ctx, side, direction, dt);
        } else {
            settle_leg(rig, ctx, side, dt);
        }
    }
}

/// Start a step on the leg trailing in the direction of travel.
///
/// A leg may start only while the other leg is idle and its own latch is
/// down. Starting raises both latches.
pub fn check_alternation<B: RagdollPhysicsBackend>(
    rig: &Rig<B>,
    state: &mut RagdollState,
    direction: StepDirection,
) {
    let (Some(right), Some(left)) = (
        rig.position(BodyPart::RightFoot),
        rig.position(BodyPart::LeftFoot),
    ) else {
        return;
    };

    for side in Side::BOTH {
        let (own, other) = match side {
            Side::Right => (right.z, left.z),
            Side::Left => (left.z, right.z),
        };
        let trailing = direction.sign() * (own - other) < 0.0;
        if trailing && !state.leg(side.opposite()).stepping && !state.leg(side).alert {
            state.leg_mut(side).stepping = true;
            for leg in &mut state.legs {
                leg.alert = true;
            }
        }
    }
}

fn plant_foot<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    ctx: &ControlContext,
    side: Side,
    dt: f32,
) {
    rig.apply_impulse(
        side.foot(),
        Vec3::NEG_Y * ctx.config.foot_mount_force * dt,
    );
}

/// Advance a stepping leg.
pub fn take_step<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
    side: Side,
    direction: Option<StepDirection>,
    dt: f32,
) {
    state.leg_mut(side).timer += dt;
    plant_foot(rig, ctx, side, dt);

    if let Some(direction) = direction {
        let offsets = direction.offsets();
        let height = ctx.config.step_height;
        rig.displace_target_x(side.upper_leg(), offsets.upper * height);
        rig.displace_target_x(side.lower_leg(), offsets.lower * height);
        rig.displace_target_x(side.opposite().upper_leg(), offsets.opposite_upper * height);
    }

    if state.leg(side).timer > ctx.config.step_duration {
        let leg = state.leg_mut(side);
        leg.timer = 0.0;
        leg.stepping = false;
        if state.is_walking() {
            state.leg_mut(side.opposite()).stepping = true;
        }
    }
}

/// Ease an idle leg back to its rest pose.
pub fn settle_leg<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    ctx: &ControlContext,
    side: Side,
    dt: f32,
) {
    let (upper_rate, lower_rate) = settle_rates(side);
    for (part, rate) in [(side.upper_leg(), upper_rate), (side.lower_leg(), lower_rate)] {
        if let (Some(current), Some(rest)) = (rig.target(part), ctx.pose.get(part)) {
            rig.set_target(part, nlerp(current, rest, rate * dt));
        }
    }
    plant_foot(rig, ctx, side, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LegState;
    use crate::testing::TestRagdoll;

    const DT: f32 = 1.0 / 60.0;

    fn walk(rd: &mut TestRagdoll) {
        rd.with(|rig, state, ctx| perform_walking(rig, state, ctx, DT));
    }

    fn stepping(rd: &TestRagdoll) -> [bool; 2] {
        [rd.state.legs[0].stepping, rd.state.legs[1].stepping]
    }

    #[test]
    fn camera_movement_blends_horizontal_velocity_only() {
        let mut rd = TestRagdoll::spawn();
        rd.set_velocity(BodyPart::Root, Vec3::new(0.0, -4.0, 0.0));
        rd.intent.set_movement(Vec2::new(0.0, 1.0));

        rd.with(|rig, _, ctx| apply_movement(rig, ctx));

        let v = rd.velocity(BodyPart::Root);
        assert_eq!(v.y, -4.0);
        assert!((v.z - 8.0).abs() < 1e-5);
        assert!(v.x.abs() < 1e-5);
    }

    #[test]
    fn camera_movement_brakes_without_input() {
        let mut rd = TestRagdoll::spawn();
        rd.set_velocity(BodyPart::Root, Vec3::new(5.0, 1.0, 0.0));
        rd.with(|rig, _, ctx| apply_movement(rig, ctx));

        let v = rd.velocity(BodyPart::Root);
        assert!((v.x - 1.0).abs() < 1e-5);
        assert_eq!(v.y, 1.0);
    }

    #[test]
    fn body_movement_follows_root_forward() {
        let mut rd = TestRagdoll::spawn();
        rd.config.camera_relative_movement = false;
        rd.set_rotation(BodyPart::Root, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        rd.set_velocity(BodyPart::Root, Vec3::new(0.0, 2.0, 0.0));
        rd.intent.set_movement(Vec2::new(0.0, -0.5));

        rd.with(|rig, _, ctx| apply_movement(rig, ctx));

        let v = rd.velocity(BodyPart::Root);
        assert!((v.x + 5.0).abs() < 1e-4);
        assert!(v.z.abs() < 1e-4);
        assert_eq!(v.y, 2.0);
    }

    #[test]
    fn camera_walk_flags_latch_and_clear() {
        let mut rd = TestRagdoll::spawn();
        rd.intent.set_movement(Vec2::new(0.0, 1.0));
        rd.with(|rig, state, ctx| update_walk_intent(rig, state, ctx));
        assert!(rd.state.walk_forward && rd.state.move_axis_used && rd.state.key_held);

        rd.intent.set_movement(Vec2::ZERO);
        rd.with(|rig, state, ctx| update_walk_intent(rig, state, ctx));
        assert!(!rd.state.walk_forward && !rd.state.move_axis_used && !rd.state.key_held);
    }

    #[test]
    fn camera_release_keeps_predicted_walk() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_forward = true;
        rd.with(|rig, state, ctx| update_walk_intent(rig, state, ctx));
        assert!(rd.state.walk_forward);

        // A latch without a walk flag is not released.
        rd.state.walk_forward = false;
        rd.state.move_axis_used = true;
        rd.state.key_held = true;
        rd.with(|rig, state, ctx| update_walk_intent(rig, state, ctx));
        assert!(rd.state.move_axis_used && rd.state.key_held);
    }

    #[test]
    fn forward_input_needs_balance_in_camera_mode() {
        let mut rd = TestRagdoll::spawn();
        rd.state.balanced = false;
        rd.intent.set_movement(Vec2::new(0.0, 1.0));
        rd.with(|rig, state, ctx| update_walk_intent(rig, state, ctx));
        assert!(!rd.state.walk_forward);

        rd.intent.set_movement(Vec2::new(1.0, 0.0));
        rd.with(|rig, state, ctx| update_walk_intent(rig, state, ctx));
        assert!(rd.state.walk_forward);
    }

    #[test]
    fn body_mode_walk_toggles_leg_drives_while_ragdolled() {
        let mut rd = TestRagdoll::spawn();
        rd.config.camera_relative_movement = false;
        rd.state.is_ragdoll = true;

        rd.intent.set_movement(Vec2::new(0.0, -1.0));
        rd.with(|rig, state, ctx| update_walk_intent(rig, state, ctx));
        assert!(rd.state.walk_backward);
        assert_eq!(rd.drive(BodyPart::UpperRightLeg), rd.drives.pose_on);

        rd.intent.set_movement(Vec2::ZERO);
        rd.with(|rig, state, ctx| update_walk_intent(rig, state, ctx));
        assert!(!rd.state.walk_backward);
        assert_eq!(rd.drive(BodyPart::LowerLeftLeg), rd.drives.drive_off);
    }

    #[test]
    fn body_mode_turn_stays_within_limit() {
        let mut rd = TestRagdoll::spawn();
        rd.config.camera_relative_movement = false;
        rd.intent.set_movement(Vec2::new(1.0, 0.0));

        for _ in 0..600 {
            rd.with(|rig, _, ctx| apply_rotation(rig, ctx, DT));
            let y = rd.target(BodyPart::Root).y;
            assert!(y.abs() <= TURN_LIMIT, "y = {y}");
        }
    }

    #[test]
    fn body_mode_turn_direction_follows_input() {
        let mut rd = TestRagdoll::spawn();
        rd.config.camera_relative_movement = false;
        rd.intent.set_movement(Vec2::new(1.0, 0.0));
        rd.with(|rig, _, ctx| apply_rotation(rig, ctx, DT));
        assert!(rd.target(BodyPart::Root).y < 0.0);
    }

    #[test]
    fn camera_turn_converges_to_inverse_look() {
        let mut rd = TestRagdoll::spawn();
        rd.intent.set_look_direction(Vec3::new(1.0, -0.3, 0.0));
        for _ in 0..300 {
            rd.with(|rig, _, ctx| apply_rotation(rig, ctx, DT));
        }
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2).inverse();
        let target = rd.target(BodyPart::Root);
        assert!(target.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn prediction_walks_forward_when_mass_leads_the_feet() {
        let mut rd = TestRagdoll::spawn();
        rd.set_position(BodyPart::RightFoot, Vec3::new(0.2, 0.0, -0.6));
        rd.set_position(BodyPart::LeftFoot, Vec3::new(-0.2, 0.0, -0.5));

        rd.with(|rig, state, _| predict_steps(rig, state));
        assert!(rd.state.walk_forward);
        assert!(!rd.state.walk_backward);
    }

    #[test]
    fn prediction_clears_flags_without_key() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_backward = true;
        rd.state.legs[0].alert = true;

        rd.with(|rig, state, _| predict_steps(rig, state));
        assert!(!rd.state.walk_backward);
        assert!(rd.state.legs[0].alert);
    }

    #[test]
    fn prediction_keeps_flags_while_key_held() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_forward = true;
        rd.state.key_held = true;

        rd.with(|rig, state, _| predict_steps(rig, state));
        assert!(rd.state.walk_forward);
    }

    #[test]
    fn idle_cycle_resets() {
        let mut state = RagdollState::default();
        state.legs[1].stepping = true;
        state.legs[1].timer = 0.1;
        state.legs[0].alert = true;
        reset_walk_cycle_if_idle(&mut state);
        assert_eq!(state.legs, [LegState::default(); 2]);
    }

    #[test]
    fn crossing_arms_one_leg_and_both_latches() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_forward = true;
        rd.set_position(BodyPart::RightFoot, Vec3::new(0.2, 0.0, -0.3));
        rd.set_position(BodyPart::LeftFoot, Vec3::new(-0.2, 0.0, 0.3));

        walk(&mut rd);
        assert_eq!(stepping(&rd), [true, false]);
        assert!(rd.state.legs.iter().all(|l| l.alert));
    }

    #[test]
    fn backward_crossing_steps_the_trailing_foot() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_backward = true;
        rd.set_position(BodyPart::RightFoot, Vec3::new(0.2, 0.0, -0.3));
        rd.set_position(BodyPart::LeftFoot, Vec3::new(-0.2, 0.0, 0.3));

        walk(&mut rd);
        assert_eq!(stepping(&rd), [false, true]);
    }

    #[test]
    fn steps_alternate_and_never_overlap() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_forward = true;

        let mut arms = 0;
        let mut previous = stepping(&rd);
        for tick in 0..240 {
            // Feet trade places every 15 ticks.
            let phase = if (tick / 15) % 2 == 0 { 1.0 } else { -1.0 };
            rd.set_position(BodyPart::RightFoot, Vec3::new(0.2, 0.0, -0.3 * phase));
            rd.set_position(BodyPart::LeftFoot, Vec3::new(-0.2, 0.0, 0.3 * phase));

            walk(&mut rd);
            let now = stepping(&rd);
            assert!(!(now[0] && now[1]), "both legs stepping at tick {tick}");
            for i in 0..2 {
                if now[i] && !previous[i] {
                    arms += 1;
                }
            }
            previous = now;
        }

        // 240 ticks at 1/60 s with 0.2 s steps (13 ticks each).
        assert!(arms >= 17, "only {arms} steps armed");
    }

    #[test]
    fn latch_blocks_retrigger_after_first_crossing() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_forward = true;
        rd.set_position(BodyPart::RightFoot, Vec3::new(0.2, 0.0, -0.3));
        rd.set_position(BodyPart::LeftFoot, Vec3::new(-0.2, 0.0, 0.3));
        walk(&mut rd);

        // Right finishes its step without the crossing trigger firing again.
        rd.state.walk_forward = false;
        for _ in 0..13 {
            walk(&mut rd);
        }
        assert_eq!(stepping(&rd), [false, false]);

        rd.state.walk_forward = true;
        rd.set_position(BodyPart::LeftFoot, Vec3::new(-0.2, 0.0, -0.6));
        walk(&mut rd);
        assert_eq!(stepping(&rd), [false, false]);
    }

    #[test]
    fn finished_step_arms_the_other_leg_once() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_forward = true;
        rd.state.legs[0].stepping = true;
        rd.state.legs[0].alert = true;
        rd.state.legs[1].alert = true;

        for _ in 0..12 {
            walk(&mut rd);
        }
        assert_eq!(stepping(&rd), [true, false]);
        walk(&mut rd);
        assert_eq!(stepping(&rd), [false, true]);
        assert_eq!(rd.state.legs[0].timer, 0.0);
    }

    #[test]
    fn forward_step_swings_the_legs() {
        let mut rd = TestRagdoll::spawn();
        rd.state.walk_forward = true;
        rd.state.legs[0].stepping = true;
        rd.state.legs[0].alert = true;
        rd.state.legs[1].alert = true;

        walk(&mut rd);

        let h = rd.config.step_height;
        assert!((rd.target(BodyPart::UpperRightLeg).x - 0.09 * h).abs() < 1e-6);
        assert!((rd.target(BodyPart::LowerRightLeg).x + 0.18 * h).abs() < 1e-6);
        // The opposite upper leg counter-swings, then eases toward rest.
        assert!(rd.target(BodyPart::UpperLeftLeg).x < 0.0);
    }

    #[test]
    fn idle_leg_settles_to_rest_and_plants_the_foot() {
        let mut rd = TestRagdoll::spawn();
        rd.set_target(BodyPart::UpperLeftLeg, Quat::from_xyzw(0.4, 0.0, 0.0, 1.0));

        for _ in 0..120 {
            walk(&mut rd);
        }

        assert!(rd.target(BodyPart::UpperLeftLeg).abs_diff_eq(Quat::IDENTITY, 1e-3));
        assert!(rd.impulse(BodyPart::LeftFoot).y < 0.0);
        assert_eq!(rd.impulse(BodyPart::LeftFoot).x, 0.0);
    }
}
