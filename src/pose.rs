//! Default pose snapshot.

use bevy::prelude::*;

use crate::backend::RagdollPhysicsBackend;
use crate::rig::Rig;
use crate::skeleton::BodyPart;

/// Rest targets of the steerable joints, captured once at setup.
///
/// Root and feet are not part of the snapshot.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct DefaultPose {
    pub head: Quat,
    pub body: Quat,
    pub upper_right_arm: Quat,
    pub lower_right_arm: Quat,
    pub upper_left_arm: Quat,
    pub lower_left_arm: Quat,
    pub upper_right_leg: Quat,
    pub lower_right_leg: Quat,
    pub upper_left_leg: Quat,
    pub lower_left_leg: Quat,
}

impl Default for DefaultPose {
    fn default() -> Self {
        Self {
            head: Quat::IDENTITY,
            body: Quat::IDENTITY,
            upper_right_arm: Quat::IDENTITY,
            lower_right_arm: Quat::IDENTITY,
            upper_left_arm: Quat::IDENTITY,
            lower_left_arm: Quat::IDENTITY,
            upper_right_leg: Quat::IDENTITY,
            lower_right_leg: Quat::IDENTITY,
            upper_left_leg: Quat::IDENTITY,
            lower_left_leg: Quat::IDENTITY,
        }
    }
}

impl DefaultPose {
    /// Parts covered by the snapshot.
    pub const PARTS: [BodyPart; 10] = [
        BodyPart::Head,
        BodyPart::Body,
        BodyPart::UpperRightArm,
        BodyPart::LowerRightArm,
        BodyPart::UpperLeftArm,
        BodyPart::LowerLeftArm,
        BodyPart::UpperRightLeg,
        BodyPart::LowerRightLeg,
        BodyPart::UpperLeftLeg,
        BodyPart::LowerLeftLeg,
    ];

    /// Snapshot the current joint targets of a rig.
    ///
    /// Missing joints capture identity.
    pub fn capture<B: RagdollPhysicsBackend>(rig: &Rig<B>) -> Self {
        let mut pose = Self::default();
        for part in Self::PARTS {
            match rig.target(part) {
                Some(target) => pose.set(part, target),
                None => warn!("no joint for {part} while capturing the default pose"),
            }
        }
        pose
    }

    /// Rest target of a part, `None` for root and feet.
    pub fn get(&self, part: BodyPart) -> Option<Quat> {
        match part {
            BodyPart::Head => Some(self.head),
            BodyPart::Body => Some(self.body),
            BodyPart::UpperRightArm => Some(self.upper_right_arm),
            BodyPart::LowerRightArm => Some(self.lower_right_arm),
            BodyPart::UpperLeftArm => Some(self.upper_left_arm),
            BodyPart::LowerLeftArm => Some(self.lower_left_arm),
            BodyPart::UpperRightLeg => Some(self.upper_right_leg),
            BodyPart::LowerRightLeg => Some(self.lower_right_leg),
            BodyPart::UpperLeftLeg => Some(self.upper_left_leg),
            BodyPart::LowerLeftLeg => Some(self.lower_left_leg),
            BodyPart::Root | BodyPart::RightFoot | BodyPart::LeftFoot => None,
        }
    }

    fn set(&mut self, part: BodyPart, target: Quat) {
        let slot = match part {
            BodyPart::Head => &mut self.head,
            BodyPart::Body => &mut self.body,
            BodyPart::UpperRightArm => &mut self.upper_right_arm,
            BodyPart::LowerRightArm => &mut self.lower_right_arm,
            BodyPart::UpperLeftArm => &mut self.upper_left_arm,
            BodyPart::LowerLeftArm => &mut self.lower_left_arm,
            BodyPart::UpperRightLeg => &mut self.upper_right_leg,
            BodyPart::LowerRightLeg => &mut self.lower_right_leg,
            BodyPart::UpperLeftLeg => &mut self.upper_left_leg,
            BodyPart::LowerLeftLeg => &mut self.lower_left_leg,
            BodyPart::Root | BodyPart::RightFoot | BodyPart::LeftFoot => return,
        };
        *slot = target;
    }

    /// Move a joint target back to its rest value.
    pub fn restore<B: RagdollPhysicsBackend>(&self, rig: &mut Rig<B>, part: BodyPart) {
        if let Some(rest) = self.get(part) {
            rig.set_target(part, rest);
        }
    }
}

/// Normalized linear interpolation between two rotations, `t` clamped to [0, 1].
///
/// Takes the shorter arc when the two rotations lie in opposite hemispheres.
pub(crate) fn nlerp(from: Quat, to: Quat, t: f32) -> Quat {
    let to = if from.dot(to) < 0.0 { -to } else { to };
    let blended = Vec4::from(from).lerp(Vec4::from(to), t.clamp(0.0, 1.0));
    match blended.try_normalize() {
        Some(v) => Quat::from_vec4(v),
        None => to,
    }
}
