//! Reach engine.
//!
//! Holding grab on a side raises that arm toward a fixed reach pose, offset
//! by the accumulated aim. The torso pitches with vertical aim at all times.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::controller::ControlContext;
use crate::rig::Rig;
use crate::skeleton::{BodyPart, Side};
use crate::state::RagdollState;

/// Bound on the accumulated torso pitch.
pub const BODY_AIM_LIMIT: f32 = 0.9;

/// Bound on the accumulated arm aim.
pub const ARM_AIM_LIMIT: f32 = 1.2;

/// Upper-arm target of a reaching arm.
pub fn reach_pose(side: Side, arm_aim: f32) -> Quat {
    let s = side.sign();
    Quat::from_xyzw(s * (0.58 + arm_aim), -0.88 - arm_aim, s * 0.8, 1.0)
}

/// The torso is posed by a punch (wind-up held or return pending).
fn torso_owned_by_punch(state: &RagdollState) -> bool {
    state.punching.iter().any(|p| *p) || state.punch_return.iter().any(Option::is_some)
}

/// Pitch the torso and steer reaching arms.
///
/// A side that is punching is left alone.
pub fn perform_reach<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
) {
    let sensitivity = ctx.config.reach_sensitivity.max(f32::EPSILON);
    let aim = ctx.intent.aim.y / sensitivity;

    state.body_aim = (state.body_aim + aim).clamp(-BODY_AIM_LIMIT, BODY_AIM_LIMIT);
    if !torso_owned_by_punch(state) {
        rig.set_target(BodyPart::Body, Quat::from_xyzw(state.body_aim, 0.0, 0.0, 1.0));
    }

    let mut aimed = false;
    for side in Side::BOTH {
        let i = side.index();
        if state.punching[i] {
            continue;
        }

        if ctx.intent.is_grabbing(side) {
            if !state.reaching[i] {
                rig.set_drive(side.upper_arm(), ctx.drives.reach_stiffness);
                rig.set_drive(side.lower_arm(), ctx.drives.reach_stiffness);
                rig.set_drive(BodyPart::Body, ctx.drives.core_stiffness);
                state.reaching[i] = true;
            }
            if !aimed {
                state.arm_aim = (state.arm_aim + aim).clamp(-ARM_AIM_LIMIT, ARM_AIM_LIMIT);
                aimed = true;
            }
            rig.set_target(side.upper_arm(), reach_pose(side, state.arm_aim));
        } else if state.reaching[i] {
            if state.balanced {
                rig.set_drive(side.upper_arm(), ctx.drives.pose_on);
                rig.set_drive(side.lower_arm(), ctx.drives.pose_on);
                rig.set_drive(BodyPart::Body, ctx.drives.pose_on);
            } else {
                rig.set_drive(side.upper_arm(), ctx.drives.drive_off);
                rig.set_drive(side.lower_arm(), ctx.drives.drive_off);
            }
            state.reset_pose = true;
            state.reaching[i] = false;
        }
    }
}

/// Return the torso and arms to the rest pose.
pub fn apply_pose_reset<B: RagdollPhysicsBackend>(
    rig: &mut Rig<B>,
    state: &mut RagdollState,
    ctx: &ControlContext,
) {
    ctx.pose.restore(rig, BodyPart::Body);
    for side in Side::BOTH {
        ctx.pose.restore(rig, side.upper_arm());
        ctx.pose.restore(rig, side.lower_arm());
    }
    state.arm_aim = 0.0;
    state.reset_pose = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRagdoll;

    fn reach(rd: &mut TestRagdoll) {
        rd.with(|rig, state, ctx| perform_reach(rig, state, ctx));
    }

    #[test]
    fn body_pitch_follows_aim_and_clamps() {
        let mut rd = TestRagdoll::spawn();
        rd.intent.set_aim(Vec2::new(0.0, 1.0));

        reach(&mut rd);
        assert!((rd.target(BodyPart::Body).x - 0.04).abs() < 1e-6);

        for _ in 0..100 {
            reach(&mut rd);
        }
        assert_eq!(rd.state.body_aim, BODY_AIM_LIMIT);
        assert_eq!(rd.target(BodyPart::Body), Quat::from_xyzw(0.9, 0.0, 0.0, 1.0));
    }

    #[test]
    fn first_grab_stiffens_arm_and_core() {
        let mut rd = TestRagdoll::spawn();
        rd.intent.set_grab(Side::Left, 1.0);
        reach(&mut rd);

        assert!(rd.state.is_reaching(Side::Left));
        assert!(!rd.state.is_reaching(Side::Right));
        assert_eq!(rd.drive(BodyPart::UpperLeftArm), rd.drives.reach_stiffness);
        assert_eq!(rd.drive(BodyPart::LowerLeftArm), rd.drives.reach_stiffness);
        assert_eq!(rd.drive(BodyPart::Body), rd.drives.core_stiffness);
        assert_eq!(rd.drive(BodyPart::UpperRightArm), rd.drives.pose_on);
        assert_eq!(
            rd.target(BodyPart::UpperLeftArm),
            Quat::from_xyzw(-0.58, -0.88, -0.8, 1.0)
        );
    }

    #[test]
    fn arm_aim_accumulates_once_per_frame() {
        let mut rd = TestRagdoll::spawn();
        rd.intent.set_grab(Side::Left, 1.0);
        rd.intent.set_grab(Side::Right, 1.0);
        rd.intent.set_aim(Vec2::new(0.0, -1.0));

        for _ in 0..5 {
            reach(&mut rd);
        }
        assert!((rd.state.arm_aim + 0.2).abs() < 1e-6);
        let right = rd.target(BodyPart::UpperRightArm);
        let left = rd.target(BodyPart::UpperLeftArm);
        assert!((right.x - 0.38).abs() < 1e-5);
        assert!((left.x + 0.38).abs() < 1e-5);
        assert!((right.y + 0.68).abs() < 1e-5);
    }

    #[test]
    fn arm_aim_is_clamped() {
        let mut rd = TestRagdoll::spawn();
        rd.intent.set_grab(Side::Right, 1.0);
        rd.intent.set_aim(Vec2::new(0.0, 1.0));
        for _ in 0..200 {
            reach(&mut rd);
        }
        assert_eq!(rd.state.arm_aim, ARM_AIM_LIMIT);
    }

    #[test]
    fn release_while_balanced_restores_pose_drives() {
        let mut rd = TestRagdoll::spawn();
        rd.intent.set_grab(Side::Right, 1.0);
        reach(&mut rd);
        rd.state.reset_pose = false;

        rd.intent.set_grab(Side::Right, 0.0);
        reach(&mut rd);

        assert!(!rd.state.is_reaching(Side::Right));
        assert!(rd.state.reset_pose);
        assert_eq!(rd.drive(BodyPart::UpperRightArm), rd.drives.pose_on);
        assert_eq!(rd.drive(BodyPart::Body), rd.drives.pose_on);
    }

    #[test]
    fn release_while_down_leaves_arm_limp() {
        let mut rd = TestRagdoll::spawn();
        rd.intent.set_grab(Side::Right, 1.0);
        reach(&mut rd);
        rd.state.balanced = false;

        rd.intent.set_grab(Side::Right, 0.0);
        reach(&mut rd);

        assert_eq!(rd.drive(BodyPart::UpperRightArm), rd.drives.drive_off);
        assert_eq!(rd.drive(BodyPart::LowerRightArm), rd.drives.drive_off);
        assert_eq!(rd.drive(BodyPart::Body), rd.drives.core_stiffness);
    }

    #[test]
    fn punching_side_does_not_reach() {
        let mut rd = TestRagdoll::spawn();
        rd.state.punching[Side::Right.index()] = true;
        rd.intent.set_grab(Side::Right, 1.0);
        reach(&mut rd);

        assert!(!rd.state.is_reaching(Side::Right));
        assert_eq!(rd.drive(BodyPart::UpperRightArm), rd.drives.pose_on);
    }

    #[test]
    fn punch_owns_the_torso() {
        let mut rd = TestRagdoll::spawn();
        let wind_up = Quat::from_xyzw(-0.15, -0.15, 0.0, 1.0);
        rd.set_target(BodyPart::Body, wind_up);
        rd.state.punching[Side::Right.index()] = true;
        rd.intent.set_aim(Vec2::new(0.0, 1.0));
        reach(&mut rd);
        assert_eq!(rd.target(BodyPart::Body), wind_up);
    }

    #[test]
    fn pose_reset_restores_arms_and_torso() {
        let mut rd = TestRagdoll::spawn();
        rd.set_target(BodyPart::UpperLeftArm, Quat::from_xyzw(1.0, 1.0, 0.0, 1.0));
        rd.set_target(BodyPart::Body, Quat::from_xyzw(0.5, 0.0, 0.0, 1.0));
        rd.set_target(BodyPart::UpperLeftLeg, Quat::from_xyzw(0.5, 0.0, 0.0, 1.0));
        rd.state.arm_aim = 0.7;
        rd.state.reset_pose = true;

        rd.with(|rig, state, ctx| apply_pose_reset(rig, state, ctx));

        assert_eq!(rd.target(BodyPart::UpperLeftArm), Quat::IDENTITY);
        assert_eq!(rd.target(BodyPart::Body), Quat::IDENTITY);
        assert_eq!(
            rd.target(BodyPart::UpperLeftLeg),
            Quat::from_xyzw(0.5, 0.0, 0.0, 1.0)
        );
        assert_eq!(rd.state.arm_aim, 0.0);
        assert!(!rd.state.reset_pose);
    }
}
